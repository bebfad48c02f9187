//! Tetrahedron index interchange format.
//!
//! ```text
//! 6            <- fragment count N
//! 0 1 3 7      <- N lines of four 0-based vertex indices
//! 0 1 5 7
//! ...
//! ```
//! Line numbers in errors are 1-based, counting the count line as line 1.

use std::path::Path;

use glam::Vec3;

use crate::{FragmentGeometry, MeshData, MeshError};

/// Face winding for a tetrahedron's four triangles, fixed vertex order.
pub const TET_FACE_INDICES: [u32; 12] = [0, 1, 2, 0, 1, 3, 0, 2, 3, 1, 2, 3];

/// Four vertex indices into the whole mesh's vertex buffer per tetrahedron.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TetIndexFile {
    pub tets: Vec<[u32; 4]>,
}

/// One fragment's vertices, resolved from a tet index line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FragmentDescriptor {
    pub vertices: [Vec3; 4],
}

impl FragmentDescriptor {
    pub fn into_geometry(self) -> FragmentGeometry {
        FragmentGeometry::tetrahedron(self.vertices)
    }
}

impl TetIndexFile {
    pub fn new(tets: Vec<[u32; 4]>) -> Self {
        Self { tets }
    }

    pub fn len(&self) -> usize {
        self.tets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tets.is_empty()
    }

    /// Parse the text format. Lines after the N-th tetrahedron are ignored.
    pub fn parse(text: &str) -> Result<Self, MeshError> {
        let mut lines = text.trim().lines();
        let count_line = lines.next().unwrap_or_default().trim();
        let count: usize = count_line.parse().map_err(|_| MeshError::TetFormat {
            line: 1,
            reason: format!("expected fragment count, got {count_line:?}"),
        })?;

        // The count comes from an external tool; never size buffers from it.
        let mut tets = Vec::new();
        for i in 0..count {
            let line_no = i + 2;
            let line = lines.next().ok_or_else(|| MeshError::TetFormat {
                line: line_no,
                reason: format!("file ends after {i} of {count} tetrahedra"),
            })?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 4 {
                return Err(MeshError::TetFormat {
                    line: line_no,
                    reason: format!("expected 4 vertex indices, got {}", fields.len()),
                });
            }
            let mut tet = [0u32; 4];
            for (slot, field) in tet.iter_mut().zip(&fields) {
                *slot = field.parse().map_err(|_| MeshError::TetFormat {
                    line: line_no,
                    reason: format!("invalid vertex index {field:?}"),
                })?;
            }
            tets.push(tet);
        }

        let trailing = lines.filter(|l| !l.trim().is_empty()).count();
        if trailing > 0 {
            tracing::debug!(trailing, "ignoring lines after the declared tetrahedra");
        }
        Ok(Self { tets })
    }

    /// Render back to the text format.
    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n", self.tets.len());
        for [a, b, c, d] in &self.tets {
            out.push_str(&format!("{a} {b} {c} {d}\n"));
        }
        out
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, MeshError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&text)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), MeshError> {
        std::fs::write(path.as_ref(), self.to_text())?;
        Ok(())
    }

    /// Fail on the first index outside a buffer of `vertex_count` vertices.
    pub fn check_bounds(&self, vertex_count: usize) -> Result<(), MeshError> {
        for tet in &self.tets {
            for &index in tet {
                if index as usize >= vertex_count {
                    return Err(MeshError::IndexOutOfRange {
                        index,
                        vertex_count,
                    });
                }
            }
        }
        Ok(())
    }

    /// Resolve every tetrahedron against the whole mesh's vertex buffer.
    pub fn descriptors(&self, mesh: &MeshData) -> Result<Vec<FragmentDescriptor>, MeshError> {
        self.check_bounds(mesh.positions.len())?;
        Ok(self
            .tets
            .iter()
            .map(|tet| FragmentDescriptor {
                vertices: tet.map(|i| Vec3::from_array(mesh.positions[i as usize])),
            })
            .collect())
    }

    /// Six tetrahedra around the 0→7 diagonal of [`crate::unit_cube`].
    pub fn cube_decomposition() -> Self {
        Self::new(vec![
            [0, 1, 3, 7],
            [0, 1, 5, 7],
            [0, 2, 3, 7],
            [0, 2, 6, 7],
            [0, 4, 5, 7],
            [0, 4, 6, 7],
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_count_then_indices() {
        let f = TetIndexFile::parse("2\n0 1 2 3\n4 5 6 7\n").unwrap();
        assert_eq!(f.tets, vec![[0, 1, 2, 3], [4, 5, 6, 7]]);
    }

    #[test]
    fn tolerates_crlf_and_trailing_lines() {
        let f = TetIndexFile::parse("1\r\n0 1 2 3\r\n9 9 9 9\r\n\r\n").unwrap();
        assert_eq!(f.len(), 1);
    }

    #[test]
    fn short_file_reports_line() {
        let err = TetIndexFile::parse("3\n0 1 2 3\n").unwrap_err();
        assert!(matches!(err, MeshError::TetFormat { line: 3, .. }));
    }

    #[test]
    fn wrong_arity_rejected() {
        let err = TetIndexFile::parse("1\n0 1 2\n").unwrap_err();
        assert!(matches!(err, MeshError::TetFormat { line: 2, .. }));
    }

    #[test]
    fn bad_count_rejected() {
        let err = TetIndexFile::parse("six\n").unwrap_err();
        assert!(matches!(err, MeshError::TetFormat { line: 1, .. }));
    }

    #[test]
    fn negative_index_rejected() {
        assert!(TetIndexFile::parse("1\n0 1 2 -3\n").is_err());
    }

    #[test]
    fn text_roundtrip() {
        let f = TetIndexFile::cube_decomposition();
        assert_eq!(TetIndexFile::parse(&f.to_text()).unwrap(), f);
    }

    #[test]
    fn cube_decomposition_resolves_against_unit_cube() {
        let cube = crate::unit_cube();
        let descriptors = TetIndexFile::cube_decomposition().descriptors(&cube).unwrap();
        assert_eq!(descriptors.len(), 6);
        for d in descriptors {
            assert!(d.into_geometry().validate().is_ok());
        }
    }

    #[test]
    fn out_of_range_index_rejected() {
        let cube = crate::unit_cube();
        let f = TetIndexFile::new(vec![[0, 1, 2, 8]]);
        assert!(matches!(
            f.descriptors(&cube),
            Err(MeshError::IndexOutOfRange {
                index: 8,
                vertex_count: 8
            })
        ));
    }

    #[test]
    fn oversized_count_is_a_format_error() {
        let err = TetIndexFile::parse("18446744073709551615\n0 1 2 3\n").unwrap_err();
        assert!(matches!(err, MeshError::TetFormat { line: 3, .. }));
        assert!(matches!(
            TetIndexFile::parse("10000000000\n"),
            Err(MeshError::TetFormat { line: 2, .. })
        ));
    }

    #[test]
    fn file_roundtrip() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let f = TetIndexFile::cube_decomposition();
        f.write(tmp.path()).unwrap();
        assert_eq!(TetIndexFile::read(tmp.path()).unwrap(), f);
    }
}
