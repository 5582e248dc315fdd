//! Hangup guard for relaunched processes.
//!
//! A process started by [`relaunch`](crate::relaunch) outlives its parent.
//! When the parent exits, the controlling terminal may deliver `SIGHUP`
//! to the child. The parent marks the child's environment with
//! [`IGNORE_HANGUP_ENV`]; the child calls [`install_hangup_guard`] early
//! during startup and ignores the signal.

use std::sync::OnceLock;

/// Environment variable set on relaunched processes.
pub const IGNORE_HANGUP_ENV: &str = "RENOVA_IGNORE_SIGHUP";

static INSTALLED: OnceLock<bool> = OnceLock::new();

/// Ignores `SIGHUP` if this process was started by a relaunch.
///
/// Checks the environment once per process; later calls return the first
/// answer. Returns true if the guard is in place. Always false on
/// non-POSIX platforms.
pub fn install_hangup_guard() -> bool {
    *INSTALLED.get_or_init(|| {
        if !is_relaunched(std::env::var_os(IGNORE_HANGUP_ENV).as_deref()) {
            return false;
        }
        ignore_sighup()
    })
}

/// Returns true if `value` of [`IGNORE_HANGUP_ENV`] marks a relaunch.
#[must_use]
pub fn is_relaunched(value: Option<&std::ffi::OsStr>) -> bool {
    value.is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

#[cfg(unix)]
#[allow(unsafe_code)]
fn ignore_sighup() -> bool {
    use nix::sys::signal::{SigHandler, Signal, signal};

    // SAFETY: installing SIG_IGN runs no handler code, so there is no
    // async-signal-safety concern.
    match unsafe { signal(Signal::SIGHUP, SigHandler::SigIgn) } {
        Ok(_) => {
            tracing::info!("relaunched process; ignoring SIGHUP");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to ignore SIGHUP");
            false
        }
    }
}

#[cfg(not(unix))]
fn ignore_sighup() -> bool {
    tracing::debug!("no SIGHUP on this platform");
    false
}
