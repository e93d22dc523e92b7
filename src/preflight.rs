//! Pre-flight checks.
//!
//! Run before anything talks to `xcodes`:
//! - The platform is macOS.
//! - `xcodes` is on PATH (`aria2c` is only recommended).
//! - The base directory is readable and writable.

use std::fs::{self, OpenOptions};
use std::path::Path;

use crate::error::UpdateError;
use crate::paths::Paths;
use crate::ui::Ui;

const XCODES_HINT: &str =
    "You must install xcodes from https://github.com/XcodesOrg/xcodes (brew install xcodesorg/made/xcodes)";

/// Run every check needed before a mutating run
pub fn run_preflight(paths: &Paths, ui: &Ui) -> Result<(), UpdateError> {
    check_platform()?;
    check_tools(ui)?;
    check_permissions(&paths.base_dir)?;
    ui.debug(format!("Pre-flight checks passed for {}", paths.base_dir.display()));
    Ok(())
}

pub fn check_platform() -> Result<(), UpdateError> {
    if cfg!(target_os = "macos") {
        Ok(())
    } else {
        Err(UpdateError::PlatformUnsupported {
            os: std::env::consts::OS,
        })
    }
}

/// `xcodes` is required; a missing `aria2c` only slows downloads down
pub fn check_tools(ui: &Ui) -> Result<(), UpdateError> {
    match which::which("xcodes") {
        Ok(path) => ui.debug(format!("Using xcodes at {}", path.display())),
        Err(_) => {
            return Err(UpdateError::ToolMissing {
                tool: "xcodes",
                hint: XCODES_HINT,
            });
        }
    }

    if which::which("aria2c").is_err() {
        ui.warn(
            "aria2 is not installed. This makes downloading Xcode versions significantly slower. \
             You can install it with `brew install aria2`.",
        );
    }

    Ok(())
}

/// Verify `dir` is a directory we can list and create files in
pub fn check_permissions(dir: &Path) -> Result<(), UpdateError> {
    let denied = |reason: String| UpdateError::PermissionDenied {
        path: dir.to_path_buf(),
        reason,
    };

    let meta = fs::metadata(dir).map_err(|e| denied(e.to_string()))?;
    if !meta.is_dir() {
        return Err(denied("not a directory".to_string()));
    }

    fs::read_dir(dir).map_err(|e| denied(format!("cannot read: {}", e)))?;

    let probe = dir.join(format!(".xcode-update-probe-{}", std::process::id()));
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&probe)
        .map_err(|e| denied(format!("cannot write: {}", e)))?;
    fs::remove_file(&probe).map_err(|e| denied(format!("cannot remove probe file: {}", e)))?;

    Ok(())
}
