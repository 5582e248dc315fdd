//! Enumeration of native modules loaded into the current process.
//!
//! - **Linux**: file-backed mappings in `/proc/self/maps`
//! - **macOS**: dyld image list
//! - **Windows**: `Process.Modules` via PowerShell

use std::path::PathBuf;

use crate::error::Result;

/// Lists the native modules loaded into the current process.
///
/// Paths are deduplicated and returned in load order.
///
/// # Errors
/// Returns an error if the module list cannot be read on this platform.
pub fn loaded_modules() -> Result<Vec<PathBuf>> {
    imp::loaded_modules()
}

/// Extracts the distinct file-backed mappings from `/proc/<pid>/maps`
/// content.
///
/// The pathname is the sixth whitespace-separated field and may itself
/// contain spaces; anonymous and pseudo mappings (`[heap]`, `[vdso]`) are
/// skipped, as are entries for files already deleted.
#[must_use]
pub fn parse_proc_maps(content: &str) -> Vec<PathBuf> {
    let mut modules: Vec<PathBuf> = Vec::new();
    for line in content.lines() {
        let Some(path) = maps_pathname(line) else {
            continue;
        };
        if path.ends_with(" (deleted)") {
            continue;
        }
        let path = PathBuf::from(path);
        if !modules.contains(&path) {
            modules.push(path);
        }
    }
    modules
}

fn maps_pathname(line: &str) -> Option<&str> {
    // address perms offset dev inode pathname
    let mut rest = line.trim_start();
    for _ in 0..5 {
        let end = rest.find(char::is_whitespace)?;
        rest = rest[end..].trim_start();
    }
    rest.starts_with('/').then_some(rest.trim_end())
}

/// Parses one path per line, as printed by the PowerShell module query.
#[must_use]
pub fn parse_module_list(output: &str) -> Vec<PathBuf> {
    let mut modules: Vec<PathBuf> = Vec::new();
    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let path = PathBuf::from(line);
        if !modules.contains(&path) {
            modules.push(path);
        }
    }
    modules
}

#[cfg(target_os = "linux")]
mod imp {
    use std::path::PathBuf;

    use crate::error::Result;

    pub(super) fn loaded_modules() -> Result<Vec<PathBuf>> {
        let maps = std::fs::read_to_string("/proc/self/maps")?;
        Ok(super::parse_proc_maps(&maps))
    }
}

#[cfg(target_os = "macos")]
#[allow(unsafe_code)]
mod imp {
    use std::ffi::CStr;
    use std::path::PathBuf;

    use crate::error::Result;

    pub(super) fn loaded_modules() -> Result<Vec<PathBuf>> {
        // SAFETY: dyld image queries are thread-safe and read-only. A null
        // name means the index raced with an unload; it is skipped.
        let count = unsafe { libc::_dyld_image_count() };
        let mut modules = Vec::with_capacity(count as usize);
        for index in 0..count {
            let name = unsafe { libc::_dyld_get_image_name(index) };
            if name.is_null() {
                continue;
            }
            // SAFETY: non-null names are NUL-terminated strings owned by dyld.
            let name = unsafe { CStr::from_ptr(name) };
            let path = PathBuf::from(name.to_string_lossy().into_owned());
            if !modules.contains(&path) {
                modules.push(path);
            }
        }
        Ok(modules)
    }
}

#[cfg(windows)]
mod imp {
    use std::path::PathBuf;

    use crate::cmd;
    use crate::error::Result;

    pub(super) fn loaded_modules() -> Result<Vec<PathBuf>> {
        let script = format!(
            "(Get-Process -Id {}).Modules | ForEach-Object {{ $_.FileName }}",
            std::process::id()
        );
        let output = cmd::capture("powershell", &["-NoProfile", "-Command", &script])?;
        Ok(super::parse_module_list(&output))
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos", windows)))]
mod imp {
    use std::path::PathBuf;

    use crate::error::{PlatformError, Result};

    pub(super) fn loaded_modules() -> Result<Vec<PathBuf>> {
        Err(PlatformError::not_supported("loaded module enumeration"))
    }
}
