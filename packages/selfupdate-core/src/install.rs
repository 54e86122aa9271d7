//! Hand-off of a finished artifact to the platform installer.

use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Result, UpdateError};

/// Starts installation of a verified artifact. Implementations must not
/// block until the installation finishes.
pub trait InstallTrigger: Send + Sync {
    fn install(&self, artifact: &Path) -> Result<()>;
}

/// Runs an external program with the artifact path appended as the last
/// argument, e.g. `adb install -r <artifact>`. The child is reaped on a
/// background thread and its exit status is logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInstallTrigger {
    program: String,
    args: Vec<String>,
}

impl CommandInstallTrigger {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Split a whitespace-separated command line. `None` when blank.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self {
            program: program.to_string(),
            args: parts.map(str::to_string).collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl InstallTrigger for CommandInstallTrigger {
    fn install(&self, artifact: &Path) -> Result<()> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(artifact)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| {
                UpdateError::Install(format!("failed to start {}: {}", self.program, e))
            })?;

        tracing::info!(
            "started installer {} (pid {}) for {}",
            self.program,
            child.id(),
            artifact.display()
        );

        let program = self.program.clone();
        std::thread::Builder::new()
            .name("installer-wait".to_string())
            .spawn(move || match child.wait() {
                Ok(status) if status.success() => {
                    tracing::info!("installer {} exited successfully", program)
                }
                Ok(status) => tracing::warn!("installer {} exited with {}", program, status),
                Err(e) => tracing::warn!("failed to wait for installer {}: {}", program, e),
            })
            .map_err(|e| UpdateError::Install(format!("failed to watch {}: {}", self.program, e)))?;
        Ok(())
    }
}
