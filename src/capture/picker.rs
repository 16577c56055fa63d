//! Interactive region capture using the OS screenshot tool.
//!
//! This is the infrastructure layer; it talks to the OS. The picker runs
//! as a child process that writes the selected region to a temp file; the
//! user dismissing it (Escape) leaves no file behind.

use super::{CaptureArtifact, CaptureError, CaptureOutcome, RegionCapture};
use crate::config::AppConfig;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Placeholder substituted with the artifact path in picker arguments.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

pub struct InteractiveCapture {
    command: Vec<String>,
    temp_dir: PathBuf,
}

impl InteractiveCapture {
    /// `command` is program + args; `{output}` marks where the file path
    /// goes, otherwise the path is appended.
    pub fn new(command: Vec<String>) -> Result<Self, CaptureError> {
        if command.is_empty() {
            return Err(CaptureError::NoPicker);
        }
        Ok(Self {
            command,
            temp_dir: std::env::temp_dir(),
        })
    }

    /// Configured override, or the platform's own picker.
    pub fn from_config(config: &AppConfig) -> Result<Self, CaptureError> {
        match &config.capture_command {
            Some(command) => Self::new(command.clone()),
            None => Self::new(platform_command().ok_or(CaptureError::NoPicker)?),
        }
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = dir.into();
        self
    }

    fn program(&self) -> Result<PathBuf, CaptureError> {
        let name = &self.command[0];
        which::which(name).map_err(|_| CaptureError::ToolNotFound(name.clone()))
    }

    fn args_for(&self, output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        let mut substituted = false;
        let mut args: Vec<String> = self.command[1..]
            .iter()
            .map(|arg| {
                if arg.contains(OUTPUT_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(OUTPUT_PLACEHOLDER, &output)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(output.into_owned());
        }
        args
    }
}

#[async_trait]
impl RegionCapture for InteractiveCapture {
    async fn capture_region(&self) -> Result<CaptureOutcome, CaptureError> {
        let start = std::time::Instant::now();
        let program = self.program()?;
        let artifact = CaptureArtifact::new_in(&self.temp_dir);
        let args = self.args_for(artifact.path());

        log::info!("[CAPTURE] Launching picker: {}", program.display());

        let status = tokio::process::Command::new(&program)
            .args(&args)
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| CaptureError::Spawn(e.to_string()))?;

        // Some pickers exit non-zero on Escape; the file decides.
        log::info!(
            "[CAPTURE] Picker exited with {} after {}ms",
            status,
            start.elapsed().as_millis()
        );

        let outcome = artifact.take().await?;
        match &outcome {
            CaptureOutcome::ImageBytes(image) => {
                log::info!("[CAPTURE] Region captured: {} ({} bytes)", image.mime_type(), image.len())
            }
            CaptureOutcome::Cancelled => log::info!("[CAPTURE] Picker cancelled by user"),
        }
        Ok(outcome)
    }
}

/// The built-in picker command for the current OS, if there is one.
pub fn platform_command() -> Option<Vec<String>> {
    let command: &[&str] = if cfg!(target_os = "macos") {
        // -i interactive selection, -x no shutter sound
        &["screencapture", "-i", "-x", OUTPUT_PLACEHOLDER]
    } else if cfg!(target_os = "linux") {
        &["gnome-screenshot", "-a", "-f", OUTPUT_PLACEHOLDER]
    } else {
        return None;
    };
    Some(command.iter().map(|s| s.to_string()).collect())
}
