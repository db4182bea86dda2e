//! Still-image capture through an external camera command.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use thiserror::Error;

/// Placeholder in the capture command that is replaced by the output path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// File name of a capture taken at `at`, e.g. `2025-06-01_1200.jpg`.
pub fn capture_file_name(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d_%H%M.jpg").to_string()
}

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("Could not create image directory {path}: {source}")]
    ImageDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Could not start capture command '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Capture command exited with {status}: {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("Capture command succeeded but wrote no image at {0}")]
    MissingImage(PathBuf),
}

/// Something that can take a picture and hand back the file it wrote.
#[async_trait]
pub trait Camera: Send + Sync {
    async fn capture(&self) -> Result<PathBuf, CameraError>;
}

/// A camera driven by an external program such as `libcamera-still`.
///
/// Each argument containing `{output}` has it replaced by the path of the
/// new image. The command is expected to handle sensor warm-up itself.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    program: String,
    args: Vec<String>,
    image_dir: PathBuf,
}

impl CommandCamera {
    pub fn new(program: String, args: Vec<String>, image_dir: PathBuf) -> Self {
        Self {
            program,
            args,
            image_dir,
        }
    }

    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }

    fn args_for(&self, output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace(OUTPUT_PLACEHOLDER, &output))
            .collect()
    }
}

#[async_trait]
impl Camera for CommandCamera {
    async fn capture(&self) -> Result<PathBuf, CameraError> {
        tokio::fs::create_dir_all(&self.image_dir)
            .await
            .map_err(|source| CameraError::ImageDir {
                path: self.image_dir.clone(),
                source,
            })?;

        let output = self.image_dir.join(capture_file_name(&Local::now()));
        tracing::debug!(program = %self.program, path = %output.display(), "Running capture command");

        let result = tokio::process::Command::new(&self.program)
            .args(self.args_for(&output))
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| CameraError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !result.status.success() {
            return Err(CameraError::Failed {
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
            });
        }
        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(CameraError::MissingImage(output));
        }

        tracing::info!("Captured {}", output.display());
        Ok(output)
    }
}
