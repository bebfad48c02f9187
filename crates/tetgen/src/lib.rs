//! Fragmentation requests.
//!
//! The scene asks a [`Fragmenter`] to split the whole mesh into tetrahedra. The
//! answer is a [`TetIndexFile`] on success or a human-readable failure; the
//! scene never sees how the work was done (external process, precomputed file,
//! fixed table).

mod process;
mod source;

pub use process::{ProcessFragmenter, TetgenConfig};
pub use source::{FailingFragmenter, FixedFragmenter, TetFileFragmenter};

use serde::{Deserialize, Serialize};
use shatter_mesh::{MeshData, MeshError, TetIndexFile};
use std::path::PathBuf;

/// Synchronous fragmentation request.
pub trait Fragmenter {
    fn fragment(&mut self, mesh: &MeshData) -> Result<TetIndexFile, FragmentationError>;
}

/// Errors from a fragmentation request.
#[derive(Debug, thiserror::Error)]
pub enum FragmentationError {
    #[error("fragmentation failed: {0}")]
    Failed(String),
    #[error("fragmentation tool not found: {0}")]
    ToolMissing(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("fragmentation output unreadable: {0}")]
    Output(#[from] MeshError),
}

/// Wire shape of a fragmentation tool response:
/// `{ "success": true, "output": "..." }` or `{ "success": false, "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentationResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FragmentationResponse {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: Some(output.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    pub fn from_json(s: &str) -> Result<Self, FragmentationError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Tool stdout on success, `Failed` with the tool's message otherwise.
    pub fn into_result(self) -> Result<String, FragmentationError> {
        if self.success {
            Ok(self.output.unwrap_or_default())
        } else {
            Err(FragmentationError::Failed(
                self.error.unwrap_or_else(|| "unknown error".into()),
            ))
        }
    }
}

pub fn crate_info() -> &'static str {
    "shatter-tetgen v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_response_yields_output() {
        let r = FragmentationResponse::from_json(r#"{"success":true,"output":"done"}"#).unwrap();
        assert_eq!(r.into_result().unwrap(), "done");
    }

    #[test]
    fn failure_response_carries_message() {
        let r = FragmentationResponse::from_json(
            r#"{"success":false,"error":"PLY file not found: models/Monke.ply"}"#,
        )
        .unwrap();
        let err = r.into_result().unwrap_err();
        assert!(err.to_string().contains("PLY file not found"));
    }

    #[test]
    fn failure_without_message() {
        let err = FragmentationResponse {
            success: false,
            output: None,
            error: None,
        }
        .into_result()
        .unwrap_err();
        assert!(matches!(err, FragmentationError::Failed(m) if m == "unknown error"));
    }

    #[test]
    fn response_serializes_without_empty_fields() {
        let json = serde_json::to_string(&FragmentationResponse::ok("x")).unwrap();
        assert_eq!(json, r#"{"success":true,"output":"x"}"#);
    }
}
