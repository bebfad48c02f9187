//! Mesh data and fragment geometry.
//!
//! The whole mesh arrives as plain buffers (`MeshData`); parsing PLY/GLTF is the
//! loader's job, not ours. `MeshData` doubles as the JSON interchange handed to
//! the external fragmentation tool.
//!
//! # Invariants
//! - A `Mesh` has passed index and color validation; its material is fixed at
//!   construction and never re-checked.

mod geometry;
pub mod tet;

pub use geometry::FragmentGeometry;
pub use tet::{FragmentDescriptor, TET_FACE_INDICES, TetIndexFile};

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw mesh buffers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    /// Triangle list.
    pub indices: Vec<u32>,
    /// Per-vertex colors, when the source file carried them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<[f32; 3]>>,
}

/// How a mesh should be drawn, chosen once from what the source data carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaterialKind {
    /// Shade with the mesh's own vertex colors.
    VertexColors,
    /// Flat-colored wireframe.
    Wireframe { color: [f32; 3] },
}

impl MaterialKind {
    /// Orange-brown wireframe for meshes without vertex colors.
    pub const WHOLE_FALLBACK: Self = Self::Wireframe {
        color: [0.8, 0.478, 0.0],
    };
    /// Red wireframe for cut fragments.
    pub const FRAGMENT: Self = Self::Wireframe {
        color: [1.0, 0.267, 0.267],
    };
}

/// Errors from mesh and tet file operations.
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("tet file line {line}: {reason}")]
    TetFormat { line: usize, reason: String },
    #[error("vertex index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },
    #[error("{colors} vertex colors for {vertices} vertices")]
    ColorCountMismatch { colors: usize, vertices: usize },
    #[error("invalid geometry: {reason}")]
    InvalidGeometry { reason: String },
}

/// A validated mesh with its material resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    data: MeshData,
    material: MaterialKind,
}

impl Mesh {
    /// Validate buffers and pick the material.
    pub fn new(data: MeshData) -> Result<Self, MeshError> {
        let vertex_count = data.positions.len();
        if let Some(&index) = data.indices.iter().find(|i| **i as usize >= vertex_count) {
            return Err(MeshError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
        let material = match &data.colors {
            Some(colors) if colors.len() != vertex_count => {
                return Err(MeshError::ColorCountMismatch {
                    colors: colors.len(),
                    vertices: vertex_count,
                });
            }
            Some(_) => MaterialKind::VertexColors,
            None => MaterialKind::WHOLE_FALLBACK,
        };
        tracing::debug!(name = %data.name, vertex_count, ?material, "mesh resolved");
        Ok(Self { data, material })
    }

    pub fn data(&self) -> &MeshData {
        &self.data
    }

    pub fn material(&self) -> MaterialKind {
        self.material
    }

    pub fn geometry(&self) -> FragmentGeometry {
        FragmentGeometry::from_mesh(&self.data)
    }
}

impl MeshData {
    /// Save as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MeshError> {
        let file = std::fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load from JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MeshError> {
        let file = std::fs::File::open(path)?;
        let mesh: Self = serde_json::from_reader(file)?;
        Ok(mesh)
    }
}

/// Unit cube centered on the origin. Vertex `i` sits at
/// `(i & 1, (i >> 1) & 1, (i >> 2) & 1) - 0.5`.
pub fn unit_cube() -> MeshData {
    let positions = (0..8u32)
        .map(|i| {
            [
                (i & 1) as f32 - 0.5,
                ((i >> 1) & 1) as f32 - 0.5,
                ((i >> 2) & 1) as f32 - 0.5,
            ]
        })
        .collect();
    MeshData {
        name: "unit_cube".into(),
        positions,
        indices: vec![
            0, 2, 1, 1, 2, 3, // -z
            4, 5, 6, 5, 7, 6, // +z
            0, 1, 4, 1, 5, 4, // -y
            2, 6, 3, 3, 6, 7, // +y
            0, 4, 2, 2, 4, 6, // -x
            1, 3, 5, 3, 7, 5, // +x
        ],
        colors: None,
    }
}

pub fn crate_info() -> &'static str {
    "shatter-mesh v0.1.0"
}
