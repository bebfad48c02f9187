use glam::Vec3;

use crate::{MeshData, MeshError, tet::TET_FACE_INDICES};

/// Distances below this fraction of the bounding-box diagonal count as zero.
const DEGENERATE_REL_EPS: f32 = 1e-5;

/// Immutable vertex/index buffer owned by exactly one fragment.
///
/// Positions are in the fragment's own local space.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentGeometry {
    positions: Vec<Vec3>,
    indices: Vec<u32>,
}

impl FragmentGeometry {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    /// Geometry for one tetrahedron: four vertices, four triangular faces.
    pub fn tetrahedron(vertices: [Vec3; 4]) -> Self {
        Self {
            positions: vertices.to_vec(),
            indices: TET_FACE_INDICES.to_vec(),
        }
    }

    /// Copy of a whole mesh's buffers.
    pub fn from_mesh(mesh: &MeshData) -> Self {
        Self {
            positions: mesh.positions.iter().map(|p| Vec3::from_array(*p)).collect(),
            indices: mesh.indices.clone(),
        }
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Mean of the vertex buffer. Zero for an empty buffer.
    pub fn centroid(&self) -> Vec3 {
        if self.positions.is_empty() {
            return Vec3::ZERO;
        }
        self.positions.iter().copied().sum::<Vec3>() / self.positions.len() as f32
    }

    /// Check the buffer spans a volume: at least four vertices, not all coplanar.
    ///
    /// Tolerances are relative to the bounding-box diagonal, so the answer does
    /// not depend on the mesh's units.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.positions.len() < 4 {
            return Err(MeshError::InvalidGeometry {
                reason: format!("{} vertices, need at least 4", self.positions.len()),
            });
        }
        let (min, max) = self
            .positions
            .iter()
            .fold((Vec3::INFINITY, Vec3::NEG_INFINITY), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        let extent = (max - min).length();
        if !extent.is_finite() {
            return Err(MeshError::InvalidGeometry {
                reason: "non-finite vertex".into(),
            });
        }
        if extent <= 0.0 {
            return Err(MeshError::InvalidGeometry {
                reason: "all vertices coincide".into(),
            });
        }
        let tol = extent * DEGENERATE_REL_EPS;

        let p0 = self.positions[0];
        let farthest = |dist: &dyn Fn(Vec3) -> f32| {
            self.positions
                .iter()
                .map(|p| (*p, dist(*p - p0)))
                .max_by(|a, b| a.1.total_cmp(&b.1))
                .unwrap_or((p0, 0.0))
        };

        let (p1, d1) = farthest(&|v: Vec3| v.length());
        if d1 <= tol {
            return Err(MeshError::InvalidGeometry {
                reason: "all vertices coincide".into(),
            });
        }
        let axis = (p1 - p0) / d1;
        let (p2, d2) = farthest(&|v: Vec3| axis.cross(v).length());
        if d2 <= tol {
            return Err(MeshError::InvalidGeometry {
                reason: "vertices are collinear".into(),
            });
        }
        let normal = axis.cross(p2 - p0).normalize();
        let (_, d3) = farthest(&|v: Vec3| normal.dot(v).abs());
        if d3 <= tol {
            return Err(MeshError::InvalidGeometry {
                reason: "vertices are coplanar".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tet() -> FragmentGeometry {
        FragmentGeometry::tetrahedron([
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::Z,
        ])
    }

    #[test]
    fn tetrahedron_has_four_faces() {
        let g = unit_tet();
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(g.indices().len(), 12);
    }

    #[test]
    fn centroid_is_vertex_mean() {
        let g = unit_tet();
        assert!(g.centroid().abs_diff_eq(Vec3::splat(0.25), 1e-6));
    }

    #[test]
    fn valid_tetrahedron_passes() {
        assert!(unit_tet().validate().is_ok());
    }

    #[test]
    fn too_few_vertices_rejected() {
        let g = FragmentGeometry::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2]);
        assert!(matches!(g.validate(), Err(MeshError::InvalidGeometry { .. })));
    }

    #[test]
    fn flat_tetrahedron_rejected() {
        let g = FragmentGeometry::tetrahedron([
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::new(1.0, 1.0, 0.0),
        ]);
        assert!(matches!(g.validate(), Err(MeshError::InvalidGeometry { .. })));
    }

    fn right_tet(edge: f32) -> FragmentGeometry {
        FragmentGeometry::tetrahedron([Vec3::ZERO, Vec3::X * edge, Vec3::Y * edge, Vec3::Z * edge])
    }

    #[test]
    fn small_tetrahedra_pass() {
        for edge in [0.1, 0.01, 0.005, 1e-3, 1e-5] {
            assert!(right_tet(edge).validate().is_ok(), "edge {edge} rejected");
        }
        assert!(right_tet(1e4).validate().is_ok());
    }

    #[test]
    fn nearly_flat_small_tetrahedron_rejected() {
        let s = 1e-3;
        let g = FragmentGeometry::tetrahedron([
            Vec3::ZERO,
            Vec3::X * s,
            Vec3::Y * s,
            Vec3::new(s, s, s * 1e-7),
        ]);
        assert!(matches!(
            g.validate(),
            Err(MeshError::InvalidGeometry { reason }) if reason.contains("coplanar")
        ));
    }

    #[test]
    fn collinear_points_rejected() {
        let g = FragmentGeometry::tetrahedron([Vec3::ZERO, Vec3::X, Vec3::X * 2.0, Vec3::X * 3.0]);
        assert!(matches!(
            g.validate(),
            Err(MeshError::InvalidGeometry { reason }) if reason.contains("collinear")
        ));
    }

    #[test]
    fn repeated_vertex_rejected() {
        let g = FragmentGeometry::tetrahedron([Vec3::ZERO, Vec3::ZERO, Vec3::X, Vec3::Y]);
        assert!(g.validate().is_err());
    }
}
