use std::path::PathBuf;

use shatter_mesh::{MeshData, TetIndexFile};

use crate::{FragmentationError, Fragmenter};

/// Reads a precomputed tet file on every request.
#[derive(Debug, Clone)]
pub struct TetFileFragmenter {
    path: PathBuf,
}

impl TetFileFragmenter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Fragmenter for TetFileFragmenter {
    fn fragment(&mut self, mesh: &MeshData) -> Result<TetIndexFile, FragmentationError> {
        let tets = TetIndexFile::read(&self.path)?;
        tracing::info!(path = %self.path.display(), mesh = %mesh.name, count = tets.len(), "tet file loaded");
        Ok(tets)
    }
}

/// Returns the same tetrahedra every time.
#[derive(Debug, Clone)]
pub struct FixedFragmenter {
    tets: TetIndexFile,
}

impl FixedFragmenter {
    pub fn new(tets: TetIndexFile) -> Self {
        Self { tets }
    }

    /// The six-tetrahedron split of [`shatter_mesh::unit_cube`].
    pub fn cube() -> Self {
        Self::new(TetIndexFile::cube_decomposition())
    }
}

impl Fragmenter for FixedFragmenter {
    fn fragment(&mut self, _mesh: &MeshData) -> Result<TetIndexFile, FragmentationError> {
        Ok(self.tets.clone())
    }
}

/// Always reports the given failure.
#[derive(Debug, Clone)]
pub struct FailingFragmenter {
    message: String,
}

impl FailingFragmenter {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Fragmenter for FailingFragmenter {
    fn fragment(&mut self, _mesh: &MeshData) -> Result<TetIndexFile, FragmentationError> {
        Err(FragmentationError::Failed(self.message.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shatter_mesh::unit_cube;

    #[test]
    fn tet_file_fragmenter_reads_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        TetIndexFile::cube_decomposition().write(tmp.path()).unwrap();
        let mut f = TetFileFragmenter::new(tmp.path());
        assert_eq!(f.fragment(&unit_cube()).unwrap().len(), 6);
    }

    #[test]
    fn tet_file_fragmenter_missing_file_is_output_error() {
        let mut f = TetFileFragmenter::new("/definitely/not/here.tet");
        assert!(matches!(
            f.fragment(&unit_cube()),
            Err(FragmentationError::Output(shatter_mesh::MeshError::Io(_)))
        ));
    }

    #[test]
    fn failing_fragmenter_reports_message() {
        let mut f = FailingFragmenter::new("tetgen crashed");
        let err = f.fragment(&unit_cube()).unwrap_err();
        assert_eq!(err.to_string(), "fragmentation failed: tetgen crashed");
    }
}
