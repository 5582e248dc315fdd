//! Exit strategies.
//!
//! How the current process stops is up to the host: a plain process exit,
//! a graceful shutdown request to an async host, or anything else behind
//! [`ExitStrategy`].

use std::sync::atomic::{AtomicI32, Ordering};

use tokio::sync::watch;

use crate::error::{Result, UpgradeError};

/// Stops the current process.
pub trait ExitStrategy: Send + Sync {
    /// Stops the current process.
    ///
    /// `exit_code` carries an observer-requested code when overrides are
    /// enabled; `None` means the strategy uses its own.
    ///
    /// # Errors
    /// Returns an error if the process cannot be stopped. The engine logs it
    /// and keeps running.
    fn stop(&self, exit_code: Option<i32>) -> Result<()>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Terminates the process with its current exit code.
#[derive(Debug, Default)]
pub struct ProcessExit {
    exit_code: AtomicI32,
}

impl ProcessExit {
    /// Creates an exit strategy using `exit_code` unless overridden.
    #[must_use]
    pub const fn new(exit_code: i32) -> Self {
        Self {
            exit_code: AtomicI32::new(exit_code),
        }
    }

    /// Current exit code.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }

    /// Updates the exit code used on stop.
    pub fn set_exit_code(&self, code: i32) {
        self.exit_code.store(code, Ordering::SeqCst);
    }
}

impl ExitStrategy for ProcessExit {
    fn stop(&self, exit_code: Option<i32>) -> Result<()> {
        let code = exit_code.unwrap_or_else(|| self.exit_code());
        tracing::info!(exit_code = code, "exiting process after runtime upgrade");
        std::process::exit(code)
    }

    fn name(&self) -> &'static str {
        "process"
    }
}

/// Requests a graceful shutdown over a `tokio` watch channel.
///
/// The host awaits the receiver and performs its own orderly stop.
#[derive(Debug)]
pub struct ChannelExit {
    tx: watch::Sender<Option<i32>>,
    default_code: i32,
}

impl ChannelExit {
    /// Creates the strategy and the receiver the host should watch.
    #[must_use]
    pub fn new(default_code: i32) -> (Self, watch::Receiver<Option<i32>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx, default_code }, rx)
    }
}

impl ExitStrategy for ChannelExit {
    fn stop(&self, exit_code: Option<i32>) -> Result<()> {
        let code = exit_code.unwrap_or(self.default_code);
        self.tx
            .send(Some(code))
            .map_err(|_| UpgradeError::exit("shutdown receiver dropped"))
    }

    fn name(&self) -> &'static str {
        "channel"
    }
}

/// Exit strategy backed by a closure.
pub struct FnExit<F> {
    f: F,
}

impl<F> FnExit<F>
where
    F: Fn(Option<i32>) -> Result<()> + Send + Sync,
{
    /// Wraps `f`.
    #[must_use]
    pub const fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> std::fmt::Debug for FnExit<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnExit").finish_non_exhaustive()
    }
}

impl<F> ExitStrategy for FnExit<F>
where
    F: Fn(Option<i32>) -> Result<()> + Send + Sync,
{
    fn stop(&self, exit_code: Option<i32>) -> Result<()> {
        (self.f)(exit_code)
    }

    fn name(&self) -> &'static str {
        "fn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_exit_code() {
        let exit = ProcessExit::new(0);
        assert_eq!(exit.exit_code(), 0);
        exit.set_exit_code(42);
        assert_eq!(exit.exit_code(), 42);
        assert_eq!(exit.name(), "process");
    }

    #[test]
    fn test_channel_exit_delivers_code() {
        let (exit, mut rx) = ChannelExit::new(0);
        exit.stop(None).unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(0));

        exit.stop(Some(9)).unwrap();
        assert_eq!(*rx.borrow_and_update(), Some(9));
    }

    #[test]
    fn test_channel_exit_fails_without_receiver() {
        let (exit, rx) = ChannelExit::new(0);
        drop(rx);
        let err = exit.stop(None).unwrap_err();
        assert!(matches!(err, UpgradeError::Exit(_)));
    }

    #[test]
    fn test_channel_exit_async_receiver() {
        let (exit, mut rx) = ChannelExit::new(5);
        exit.stop(None).unwrap();
        tokio_test::block_on(async {
            rx.changed().await.unwrap();
            assert_eq!(*rx.borrow(), Some(5));
        });
    }

    #[test]
    fn test_fn_exit() {
        let exit = FnExit::new(|code| match code {
            Some(_) => Ok(()),
            None => Err(UpgradeError::exit("permission denied")),
        });
        assert!(exit.stop(Some(1)).is_ok());
        assert!(exit.stop(None).is_err());
    }
}
