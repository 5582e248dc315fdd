//! Service manager integration: who hosts this process and how to restart
//! it.
//!
//! | Platform | Identity source | Restart command |
//! |----------|-----------------|-----------------|
//! | Linux | `/proc/self/cgroup`, then `systemctl status <pid>` | `systemctl restart <unit>` |
//! | macOS | `XPC_SERVICE_NAME` | `launchctl kickstart -k system/<label>` |
//! | Windows | `Win32_Service` with our `ProcessId` | `Restart-Service -Name <name>` |

use std::path::Path;

use renova_core::{Platform, UpgradeError};

use crate::cmd;
use crate::error::Result;

/// Exists only when systemd is PID 1.
const SYSTEMD_RUNTIME_DIR: &str = "/run/systemd/system";

/// Service manager able to restart the unit hosting this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceManager {
    /// systemd (Linux).
    Systemd,
    /// launchd (macOS).
    Launchd,
    /// Service Control Manager (Windows).
    WindowsScm,
}

impl ServiceManager {
    /// Service manager native to `platform`, if any.
    #[must_use]
    pub const fn for_platform(platform: Platform) -> Option<Self> {
        match platform {
            Platform::Linux => Some(Self::Systemd),
            Platform::MacOS => Some(Self::Launchd),
            Platform::Windows => Some(Self::WindowsScm),
            Platform::Unix => None,
        }
    }

    /// Program and arguments that restart `unit`.
    #[must_use]
    pub fn restart_command(self, unit: &str) -> (&'static str, Vec<String>) {
        match self {
            Self::Systemd => ("systemctl", vec!["restart".into(), unit.into()]),
            Self::Launchd => (
                "launchctl",
                vec!["kickstart".into(), "-k".into(), format!("system/{unit}")],
            ),
            Self::WindowsScm => (
                "powershell",
                vec![
                    "-NoProfile".into(),
                    "-Command".into(),
                    format!("Restart-Service -Name '{}'", unit.replace('\'', "''")),
                ],
            ),
        }
    }

    /// Restarts `unit` and waits for the command to finish.
    ///
    /// # Errors
    /// Returns [`UpgradeError::ServiceRestart`] with the command's exit code
    /// when it fails or cannot be run.
    pub fn restart(self, unit: &str) -> renova_core::Result<()> {
        let (program, args) = self.restart_command(unit);
        tracing::info!(program, unit, "requesting service restart");

        let status = cmd::status(program, &args).map_err(|e| {
            tracing::error!(program, unit, error = %e, "cannot run service manager");
            UpgradeError::ServiceRestart {
                unit: unit.to_string(),
                code: None,
            }
        })?;
        if status.success() {
            Ok(())
        } else {
            Err(UpgradeError::ServiceRestart {
                unit: unit.to_string(),
                code: status.code(),
            })
        }
    }
}

/// Resolves the name of the service unit hosting this process.
///
/// Returns `Ok(None)` when the process is not running under a service
/// manager.
///
/// # Errors
/// Returns an error if the service manager cannot be queried.
pub fn resolve_identity(platform: Platform) -> Result<Option<String>> {
    match platform {
        Platform::Linux => resolve_systemd(),
        Platform::MacOS => Ok(launchd_label(std::env::var("XPC_SERVICE_NAME").ok())),
        Platform::Windows => resolve_windows(),
        Platform::Unix => Ok(None),
    }
}

fn resolve_systemd() -> Result<Option<String>> {
    if !Path::new(SYSTEMD_RUNTIME_DIR).exists() {
        tracing::debug!("systemd not running; no service identity");
        return Ok(None);
    }
    if let Ok(cgroup) = std::fs::read_to_string("/proc/self/cgroup") {
        if under_user_manager(&cgroup) {
            tracing::debug!("process runs under a per-user systemd manager; no system service identity");
            return Ok(None);
        }
        if let Some(unit) = unit_from_cgroup(&cgroup) {
            return Ok(Some(unit));
        }
    }
    let pid = std::process::id().to_string();
    let output = cmd::capture("systemctl", &["status", &pid, "--no-pager"])?;
    Ok(unit_from_systemctl_status(&output))
}

fn resolve_windows() -> Result<Option<String>> {
    let script = format!(
        "Get-CimInstance Win32_Service -Filter \"ProcessId={}\" | Select-Object -ExpandProperty Name",
        std::process::id()
    );
    let output = cmd::capture("powershell", &["-NoProfile", "-Command", &script])?;
    Ok(output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string))
}

fn cgroup_paths(content: &str) -> impl Iterator<Item = &str> {
    // hierarchy-id:controllers:path
    content
        .lines()
        .filter_map(|line| line.splitn(3, ':').nth(2))
        .map(str::trim_end)
}

fn is_user_manager(segment: &str) -> bool {
    segment.starts_with("user@") && segment.ends_with(".service")
}

/// Returns true if `/proc/self/cgroup` places this process below a
/// `user@<uid>.service` manager.
///
/// Units there belong to `systemctl --user`; the system manager cannot
/// restart them.
#[must_use]
pub fn under_user_manager(content: &str) -> bool {
    cgroup_paths(content).any(|path| path.split('/').any(is_user_manager))
}

/// Picks the system `.service` unit out of `/proc/self/cgroup` content.
///
/// The unit is the last path segment; scopes and slices are not services,
/// and nothing below a per-user manager counts.
#[must_use]
pub fn unit_from_cgroup(content: &str) -> Option<String> {
    cgroup_paths(content).find_map(|path| {
        if path.split('/').any(is_user_manager) {
            return None;
        }
        let unit = path.rsplit('/').next()?;
        unit.ends_with(".service").then(|| unit.to_string())
    })
}

/// Picks the unit name from the first line of `systemctl status <pid>`.
#[must_use]
pub fn unit_from_systemctl_status(output: &str) -> Option<String> {
    output
        .lines()
        .next()?
        .split_whitespace()
        .find(|token| token.ends_with(".service") && !is_user_manager(token))
        .map(str::to_string)
}

/// launchd sets `XPC_SERVICE_NAME=0` for processes it does not manage.
#[must_use]
pub fn launchd_label(xpc_service_name: Option<String>) -> Option<String> {
    xpc_service_name.filter(|label| !label.is_empty() && label != "0")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_from_cgroup_v2() {
        let content = "0::/system.slice/orders.service\n";
        assert_eq!(unit_from_cgroup(content).as_deref(), Some("orders.service"));
    }

    #[test]
    fn test_unit_from_cgroup_v1() {
        let content = "\
12:pids:/system.slice/orders.service
11:memory:/system.slice/orders.service
1:name=systemd:/system.slice/orders.service
";
        assert_eq!(unit_from_cgroup(content).as_deref(), Some("orders.service"));
    }

    #[test]
    fn test_unit_from_cgroup_user_session_is_none() {
        let content = "0::/user.slice/user-1000.slice/session-2.scope\n";
        assert_eq!(unit_from_cgroup(content), None);
    }

    #[test]
    fn test_unit_under_user_manager_is_skipped() {
        let content =
            "0::/user.slice/user-1000.slice/user@1000.service/app.slice/orders.service\n";
        assert!(under_user_manager(content));
        assert_eq!(unit_from_cgroup(content), None);
    }

    #[test]
    fn test_system_unit_is_not_user_managed() {
        assert!(!under_user_manager("0::/system.slice/orders.service\n"));
        assert!(!under_user_manager("0::/user.slice/user-1000.slice/session-2.scope\n"));
    }

    #[test]
    fn test_systemctl_status_user_manager_is_none() {
        let output = "● user@1000.service - User Manager for UID 1000\n";
        assert_eq!(unit_from_systemctl_status(output), None);
    }

    #[test]
    fn test_unit_from_systemctl_status() {
        let output = "\
● orders.service - Orders API
     Loaded: loaded (/etc/systemd/system/orders.service; enabled)
     Active: active (running) since Mon 2026-10-19 08:00:00 UTC
";
        assert_eq!(
            unit_from_systemctl_status(output).as_deref(),
            Some("orders.service")
        );
    }

    #[test]
    fn test_unit_from_systemctl_status_scope() {
        let output = "● session-2.scope - Session 2 of User dev\n";
        assert_eq!(unit_from_systemctl_status(output), None);
        assert_eq!(unit_from_systemctl_status(""), None);
    }

    #[test]
    fn test_launchd_label() {
        assert_eq!(
            launchd_label(Some("com.example.orders".into())).as_deref(),
            Some("com.example.orders")
        );
        assert_eq!(launchd_label(Some("0".into())), None);
        assert_eq!(launchd_label(Some(String::new())), None);
        assert_eq!(launchd_label(None), None);
    }

    #[test]
    fn test_service_manager_for_platform() {
        assert_eq!(
            ServiceManager::for_platform(Platform::Linux),
            Some(ServiceManager::Systemd)
        );
        assert_eq!(
            ServiceManager::for_platform(Platform::MacOS),
            Some(ServiceManager::Launchd)
        );
        assert_eq!(
            ServiceManager::for_platform(Platform::Windows),
            Some(ServiceManager::WindowsScm)
        );
        assert_eq!(ServiceManager::for_platform(Platform::Unix), None);
    }

    #[test]
    fn test_restart_commands() {
        assert_eq!(
            ServiceManager::Systemd.restart_command("orders.service"),
            ("systemctl", vec!["restart".to_string(), "orders.service".to_string()])
        );
        let (program, args) = ServiceManager::Launchd.restart_command("com.example.orders");
        assert_eq!(program, "launchctl");
        assert_eq!(args, ["kickstart", "-k", "system/com.example.orders"]);
    }

    #[test]
    fn test_windows_restart_command_quotes_name() {
        let (program, args) = ServiceManager::WindowsScm.restart_command("Bob's Service");
        assert_eq!(program, "powershell");
        assert_eq!(args[2], "Restart-Service -Name 'Bob''s Service'");
    }

    #[test]
    fn test_unix_has_no_identity() {
        assert_eq!(resolve_identity(Platform::Unix).unwrap(), None);
    }
}
