//! External metadata writer
//!
//! A writer takes an ordered argument list plus the file it modifies and
//! returns the tool's decoded text output. Every invocation is independent;
//! no process state is shared between jobs.

use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Writer errors (per-file, never fatal to a run)
#[derive(Debug, Error)]
pub enum WriteError {
    /// Writer binary not found
    #[error("Writer binary not found: {0}")]
    BinaryNotFound(PathBuf),

    /// Writer process could not be started
    #[error("Failed to start writer: {0}")]
    Launch(String),

    /// Writer exited unsuccessfully
    #[error("Writer exited with {}: {stderr}", exit_label(.code))]
    Failed { code: Option<i32>, stderr: String },

    /// Target file vanished between discovery and dispatch
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("code {}", c),
        None => "signal".to_string(),
    }
}

/// Writes metadata into one file per call
#[async_trait]
pub trait MetadataWriter: Send + Sync {
    /// Writer name for logs
    fn name(&self) -> &str;

    /// Run the writer with `args` against `target`
    ///
    /// `args` already ends with the target path, unaltered from `target`.
    async fn write(&self, args: &[OsString], target: &Path) -> Result<String, WriteError>;
}

/// exiftool command-line writer
#[derive(Debug, Clone)]
pub struct ExifToolWriter {
    binary: PathBuf,
}

impl ExifToolWriter {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    /// Confirm the binary runs; returns its version string
    pub async fn check_available(&self) -> Result<String, WriteError> {
        let output = Command::new(&self.binary)
            .arg("-ver")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.launch_error(e))?;

        if !output.status.success() {
            return Err(WriteError::Failed {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let version = String::from_utf8_lossy(&output.stdout).trim().to_string();
        debug!(binary = %self.binary.display(), version = %version, "Writer availability check");
        Ok(version)
    }

    fn launch_error(&self, e: std::io::Error) -> WriteError {
        if e.kind() == std::io::ErrorKind::NotFound {
            WriteError::BinaryNotFound(self.binary.clone())
        } else {
            WriteError::Launch(e.to_string())
        }
    }
}

#[async_trait]
impl MetadataWriter for ExifToolWriter {
    fn name(&self) -> &str {
        "exiftool"
    }

    async fn write(&self, args: &[OsString], target: &Path) -> Result<String, WriteError> {
        if !target.exists() {
            return Err(WriteError::FileNotFound(target.to_path_buf()));
        }

        debug!(target = %target.display(), ?args, "Sending commands to writer");

        let output = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.launch_error(e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(WriteError::Failed {
                code: output.status.code(),
                stderr: if stderr.is_empty() { stdout } else { stderr },
            });
        }

        debug!(target = %target.display(), result = %stdout, "Writer result");
        Ok(stdout)
    }
}
