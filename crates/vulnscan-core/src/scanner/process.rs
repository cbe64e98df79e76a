use std::{
    path::Path,
    process::Stdio,
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{ToolKind, ToolResult};

/// Errors raised while spawning an external tool.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("failed to launch `{binary}`: {source}")]
    Launch {
        binary: String,
        #[source]
        source: std::io::Error,
    },
}

/// Captured output of a finished process.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
}

impl CommandOutput {
    /// Trimmed stdout, else trimmed stderr, else `None`.
    pub fn best_text(&self) -> Option<&str> {
        [self.stdout.trim(), self.stderr.trim()]
            .into_iter()
            .find(|text| !text.is_empty())
    }
}

/// Spawn `binary` and wait for it to exit. No timeout is applied.
pub async fn run_command(
    binary: &str,
    args: &[String],
    cwd: Option<&Path>,
) -> Result<CommandOutput, AdapterError> {
    let mut command = Command::new(binary);
    command.args(args).stdin(Stdio::null());
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }
    debug!(%binary, ?args, "spawning external tool");
    let output = command
        .output()
        .await
        .map_err(|source| AdapterError::Launch {
            binary: binary.to_string(),
            source,
        })?;
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        success: output.status.success(),
    })
}

/// Run a tool and fold every outcome into a [`ToolResult`].
pub async fn run_tool(
    tool: ToolKind,
    binary: &str,
    args: &[String],
    cwd: Option<&Path>,
) -> ToolResult {
    info!(%tool, %binary, "running external tool");
    let started = Instant::now();
    match run_command(binary, args, cwd).await {
        Ok(output) => {
            info!(
                %tool,
                success = output.success,
                elapsed = %format_elapsed(started.elapsed()),
                "external tool finished"
            );
            let text = output
                .best_text()
                .map(str::to_string)
                .unwrap_or_else(|| format!("No output from {tool}."));
            if output.success {
                ToolResult::success(tool, text)
            } else {
                ToolResult::failure(tool, text)
            }
        }
        Err(err) => {
            warn!(%tool, error = %err, "external tool could not be started");
            ToolResult::failure(tool, format!("Error running {tool}: {err}"))
        }
    }
}

pub(crate) fn format_elapsed(elapsed: Duration) -> String {
    humantime::format_duration(Duration::from_millis(elapsed.as_millis() as u64)).to_string()
}
