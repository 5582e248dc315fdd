//! Relaunch of the current process.
//!
//! The executable path, arguments, working directory and environment are
//! captured once, when the adapter is built. By the time an upgrade is
//! detected the installer may already have replaced the host executable,
//! and `/proc/self/exe` can point at a deleted file.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use crate::error::{PlatformError, Result};
use crate::hangup::IGNORE_HANGUP_ENV;

/// Everything needed to start a duplicate of this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchContext {
    program: PathBuf,
    args: Vec<OsString>,
    working_dir: PathBuf,
    env: Vec<(OsString, OsString)>,
}

impl LaunchContext {
    /// Captures the launch context of the current process.
    ///
    /// # Errors
    /// Returns an error if the executable path or working directory cannot
    /// be read.
    pub fn capture() -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|e| PlatformError::spawn(format!("cannot resolve current executable: {e}")))?;
        let working_dir = std::env::current_dir()?;
        Ok(Self {
            program,
            args: std::env::args_os().skip(1).collect(),
            working_dir,
            env: std::env::vars_os().collect(),
        })
    }

    /// Builds a context from explicit parts.
    #[must_use]
    pub fn new(
        program: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<OsString>>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            working_dir: working_dir.into(),
            env: Vec::new(),
        }
    }

    /// Adds an environment variable to the context.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Executable to start.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments, excluding the program name.
    #[must_use]
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    /// Working directory of the new process.
    #[must_use]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Environment the new process receives, hangup marker included.
    #[must_use]
    pub fn child_env(&self) -> Vec<(OsString, OsString)> {
        let mut env: Vec<_> = self
            .env
            .iter()
            .filter(|(key, _)| key != IGNORE_HANGUP_ENV)
            .cloned()
            .collect();
        env.push((IGNORE_HANGUP_ENV.into(), "1".into()));
        env
    }

    /// Prepares the command that starts the duplicate.
    ///
    /// Stdin is detached; stdout and stderr are inherited.
    #[must_use]
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.working_dir)
            .env_clear()
            .envs(self.child_env())
            .stdin(Stdio::null());
        cmd
    }

    /// Starts the duplicate and returns its PID.
    ///
    /// The child is reaped on a background thread so it never lingers as a
    /// zombie while this process keeps running.
    ///
    /// # Errors
    /// Returns an error if the process cannot be spawned.
    pub fn spawn(&self) -> Result<u32> {
        let child = self.command().spawn().map_err(|e| {
            PlatformError::spawn(format!("{}: {e}", self.program.display()))
        })?;
        let pid = child.id();
        tracing::info!(pid, program = %self.program.display(), "spawned replacement process");
        reap(child);
        Ok(pid)
    }
}

fn reap(mut child: Child) {
    let pid = child.id();
    let spawned = std::thread::Builder::new()
        .name(format!("renova-reap-{pid}"))
        .spawn(move || match child.wait() {
            Ok(status) => tracing::debug!(pid, %status, "replacement process exited"),
            Err(e) => tracing::debug!(pid, error = %e, "failed to wait for replacement process"),
        });
    if let Err(e) = spawned {
        tracing::warn!(pid, error = %e, "cannot start reaper thread");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_current_process() {
        let ctx = LaunchContext::capture().unwrap();
        assert!(ctx.program().is_absolute());
        assert_eq!(ctx.working_dir(), std::env::current_dir().unwrap());
    }

    #[test]
    fn test_child_env_sets_hangup_marker_once() {
        let ctx = LaunchContext::new("/bin/true", ["--serve"], "/")
            .with_env("PATH", "/usr/bin")
            .with_env(IGNORE_HANGUP_ENV, "0");
        let env = ctx.child_env();
        let markers: Vec<_> = env
            .iter()
            .filter(|(key, _)| key == IGNORE_HANGUP_ENV)
            .collect();
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].1, "1");
        assert!(env.iter().any(|(key, value)| key == "PATH" && value == "/usr/bin"));
    }

    #[test]
    fn test_command_carries_args_and_dir() {
        let ctx = LaunchContext::new("/usr/bin/orders", ["--port", "8080"], "/srv/orders");
        let cmd = ctx.command();
        assert_eq!(cmd.get_program(), "/usr/bin/orders");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, ["--port", "8080"]);
        assert_eq!(cmd.get_current_dir(), Some(Path::new("/srv/orders")));
    }

    #[test]
    fn test_spawn_missing_program_fails() {
        let ctx = LaunchContext::new("/nonexistent/renova-test-binary", Vec::<String>::new(), "/");
        let err = ctx.spawn().unwrap_err();
        assert!(err.to_string().contains("renova-test-binary"));
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_passes_hangup_marker() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("marker");
        let script = format!("echo \"${IGNORE_HANGUP_ENV}\" > '{}'", out.display());
        let ctx = LaunchContext::new("/bin/sh", ["-c", script.as_str()], dir.path());

        let pid = ctx.spawn().unwrap();
        assert!(pid > 0);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(10);
        let content = loop {
            if let Ok(content) = std::fs::read_to_string(&out) {
                if content.ends_with('\n') {
                    break content;
                }
            }
            assert!(std::time::Instant::now() < deadline, "child never wrote marker");
            std::thread::sleep(std::time::Duration::from_millis(20));
        };
        assert_eq!(content.trim(), "1");
    }
}
