//! Subprocess invocation shared by the external tool adapters.

use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::domain::errors::ExecutionError;

/// Captured output of a successful tool run.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Stderr is truncated to this many bytes in error messages.
const MAX_STDERR_BYTES: usize = 2048;

/// Run `binary` with `args`, failing on spawn errors, non-zero exit or
/// timeout. The child is killed when the timeout fires.
pub async fn run_tool(
    tool: &str,
    binary: &str,
    args: &[OsString],
    limit: Duration,
) -> Result<ToolOutput, ExecutionError> {
    debug!(tool, binary, ?args, "spawning tool");

    let mut cmd = Command::new(binary);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let child = cmd.spawn().map_err(|e| ExecutionError::Spawn {
        tool: tool.to_string(),
        reason: e.to_string(),
    })?;

    let output = match timeout(limit, child.wait_with_output()).await {
        Ok(result) => result.map_err(|e| ExecutionError::Io {
            tool: tool.to_string(),
            reason: e.to_string(),
        })?,
        Err(_) => {
            return Err(ExecutionError::Timeout {
                tool: tool.to_string(),
                secs: limit.as_secs(),
            })
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(ExecutionError::NonZeroExit {
            tool: tool.to_string(),
            code: output.status.code(),
            stderr: truncate_stderr(&stderr),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

/// Whether `binary` can be spawned with `--version`.
pub async fn responds_to_version(binary: &str) -> bool {
    Command::new(binary)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

fn truncate_stderr(stderr: &str) -> String {
    let trimmed = stderr.trim();
    if trimmed.len() <= MAX_STDERR_BYTES {
        return trimmed.to_string();
    }
    let mut end = MAX_STDERR_BYTES;
    while !trimmed.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &trimmed[..end])
}
