//! Blocking helpers for short-lived OS tools (systemctl, launchctl,
//! PowerShell).

use std::process::{Command, ExitStatus, Stdio};

use crate::error::{PlatformError, Result};

/// Runs `program` and returns its stdout.
///
/// A non-zero exit is an error carrying stderr.
pub(crate) fn capture(program: &str, args: &[&str]) -> Result<String> {
    tracing::trace!(program, ?args, "running command");
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| PlatformError::command(program, e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(PlatformError::command(
            program,
            format!("{}: {}", output.status, stderr.trim()),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Runs `program` to completion and returns its exit status.
pub(crate) fn status(program: &str, args: &[String]) -> Result<ExitStatus> {
    tracing::trace!(program, ?args, "running command");
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| PlatformError::command(program, e))
}
