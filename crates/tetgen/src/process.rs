use std::path::PathBuf;
use std::process::Command;

use serde::{Deserialize, Serialize};
use shatter_mesh::{MeshData, TetIndexFile};

use crate::{FragmentationError, FragmentationResponse, Fragmenter};

/// Where the external tetrahedralization tool lives and which files it exchanges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TetgenConfig {
    /// Executable to run.
    pub program: PathBuf,
    /// Arguments placed before the input path.
    pub args: Vec<String>,
    /// Mesh JSON written here and passed as the last argument.
    pub input_path: PathBuf,
    /// Tet index file the tool is expected to produce.
    pub output_path: PathBuf,
}

impl Default for TetgenConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("./build/tetgen_io"),
            args: Vec::new(),
            input_path: PathBuf::from("vertices.json"),
            output_path: PathBuf::from("tetrahedra.tet"),
        }
    }
}

/// Runs the external tool once per request.
///
/// A non-zero exit status or anything on stderr counts as failure, with the
/// tool's own words as the message. A tool that prints a JSON reply object
/// (`{"success": false, "error": "..."}`) on stdout is taken at its word.
#[derive(Debug, Clone)]
pub struct ProcessFragmenter {
    config: TetgenConfig,
}

impl ProcessFragmenter {
    pub fn new(config: TetgenConfig) -> Self {
        Self { config }
    }

    fn run_tool(&self) -> Result<FragmentationResponse, FragmentationError> {
        let program = &self.config.program;
        // Bare names are resolved through PATH by the OS.
        if program.components().count() > 1 && !program.exists() {
            return Err(FragmentationError::ToolMissing(program.clone()));
        }

        tracing::info!(program = %program.display(), input = %self.config.input_path.display(), "running fragmentation tool");
        let output = match Command::new(program)
            .args(&self.config.args)
            .arg(&self.config.input_path)
            .output()
        {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FragmentationError::ToolMissing(program.clone()));
            }
            Err(e) => return Ok(FragmentationResponse::failed(e.to_string())),
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            tracing::warn!(status = %output.status, %stderr, "fragmentation tool exited with failure");
            let message = if stderr.trim().is_empty() {
                format!("tool exited with {}", output.status)
            } else {
                stderr.trim().to_string()
            };
            return Ok(FragmentationResponse::failed(message));
        }
        if !stderr.trim().is_empty() {
            tracing::warn!(%stderr, "fragmentation tool wrote to stderr");
            return Ok(FragmentationResponse::failed(stderr.trim()));
        }
        let stdout = stdout.trim();
        if stdout.starts_with('{') {
            return FragmentationResponse::from_json(stdout);
        }
        Ok(FragmentationResponse::ok(stdout))
    }
}

impl Fragmenter for ProcessFragmenter {
    fn fragment(&mut self, mesh: &MeshData) -> Result<TetIndexFile, FragmentationError> {
        mesh.save(&self.config.input_path)?;
        let output = self.run_tool()?.into_result()?;
        tracing::debug!(%output, "fragmentation tool finished");
        let tets = TetIndexFile::read(&self.config.output_path)?;
        tets.check_bounds(mesh.positions.len())?;
        Ok(tets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shatter_mesh::unit_cube;

    #[test]
    fn missing_tool_path_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = ProcessFragmenter::new(TetgenConfig {
            program: dir.path().join("no_such_tool"),
            input_path: dir.path().join("vertices.json"),
            output_path: dir.path().join("out.tet"),
            ..TetgenConfig::default()
        });
        assert!(matches!(
            f.fragment(&unit_cube()),
            Err(FragmentationError::ToolMissing(_))
        ));
    }

    #[cfg(unix)]
    fn shell(script: String, dir: &std::path::Path) -> ProcessFragmenter {
        ProcessFragmenter::new(TetgenConfig {
            program: PathBuf::from("sh"),
            args: vec!["-c".into(), script, "fragmenter".into()],
            input_path: dir.join("vertices.json"),
            output_path: dir.join("out.tet"),
        })
    }

    #[cfg(unix)]
    #[test]
    fn successful_tool_output_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.tet");
        let script = format!(
            "test -f \"$1\" && printf '2\\n0 1 3 7\\n0 2 3 7\\n' > '{}' && echo ok",
            out.display()
        );
        let mut f = shell(script, dir.path());
        let tets = f.fragment(&unit_cube()).unwrap();
        assert_eq!(tets.tets, vec![[0, 1, 3, 7], [0, 2, 3, 7]]);
        assert!(dir.path().join("vertices.json").exists());
    }

    #[cfg(unix)]
    #[test]
    fn stderr_output_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = shell("echo 'bad mesh' >&2".into(), dir.path());
        let err = f.fragment(&unit_cube()).unwrap_err();
        assert!(matches!(err, FragmentationError::Failed(m) if m == "bad mesh"));
    }

    #[cfg(unix)]
    #[test]
    fn json_failure_reply_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"echo '{"success":false,"error":"mesh not closed"}'"#;
        let mut f = shell(script.into(), dir.path());
        let err = f.fragment(&unit_cube()).unwrap_err();
        assert!(matches!(err, FragmentationError::Failed(m) if m == "mesh not closed"));
    }

    #[cfg(unix)]
    #[test]
    fn json_success_reply_reads_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.tet");
        let script = format!(
            r#"printf '1\n0 1 3 7\n' > '{}' && echo '{{"success":true,"output":"1 tet"}}'"#,
            out.display()
        );
        let mut f = shell(script, dir.path());
        assert_eq!(f.fragment(&unit_cube()).unwrap().tets, vec![[0, 1, 3, 7]]);
    }

    #[cfg(unix)]
    #[test]
    fn malformed_json_reply_is_json_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = shell("echo '{not json'".into(), dir.path());
        assert!(matches!(
            f.fragment(&unit_cube()),
            Err(FragmentationError::Json(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn nonzero_exit_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = shell("exit 3".into(), dir.path());
        assert!(matches!(
            f.fragment(&unit_cube()),
            Err(FragmentationError::Failed(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn out_of_range_output_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.tet");
        let script = format!("printf '1\\n0 1 2 99\\n' > '{}'", out.display());
        let mut f = shell(script, dir.path());
        assert!(matches!(
            f.fragment(&unit_cube()),
            Err(FragmentationError::Output(_))
        ));
    }
}
