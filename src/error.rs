//! Error kinds surfaced by the update run.
//!
//! Every variant is fatal: nothing is retried, the message is printed once
//! and the process exits non-zero.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::links::PointerName;

#[derive(Error, Debug)]
pub enum UpdateError {
    /// Not running on macOS.
    #[error("This program only works on macOS (running on {os})")]
    PlatformUnsupported { os: &'static str },

    /// A required external tool is not on PATH.
    #[error("{tool} isn't installed. {hint}")]
    ToolMissing { tool: &'static str, hint: &'static str },

    /// The base directory is not readable and writable.
    #[error("Permission denied: {path:?} must be readable and writable ({reason})")]
    PermissionDenied { path: PathBuf, reason: String },

    /// The listing call failed or did not finish in time.
    #[error("`xcodes {command}` failed: {reason}")]
    ToolUnavailable { command: String, reason: String },

    #[error("`xcodes {command}` timed out after {}s", timeout.as_secs())]
    ToolTimeout { command: String, timeout: Duration },

    /// Tool output could not be parsed.
    #[error("Unexpected output from `xcodes {command}`: {detail}")]
    MalformedOutput { command: String, detail: String },

    /// `xcodes install` succeeded but the version cannot be found afterwards.
    #[error("Xcode {identifier} was reportedly installed but cannot be located")]
    InstallVerificationFailed { identifier: String },

    /// A pointer was about to reference a build that is not on disk.
    #[error("Cannot point {pointer} at Xcode {identifier}: it is not installed")]
    TargetNotInstalled { pointer: PointerName, identifier: String },

    /// A pointer resolves to a path that matches no installed build.
    #[error("{pointer} link resolves to {path:?}, which is not a known installed Xcode")]
    ClassificationLookupFailed { pointer: PointerName, path: PathBuf },

    /// `xcodes install` / `xcodes uninstall` exited with a failure.
    #[error("`xcodes {command}` exited with {status}")]
    ToolFailed { command: String, status: String },

    /// Creating a symlink or Finder alias failed.
    #[error("Failed to link {link:?} to {target:?}: {reason}")]
    LinkFailed { link: PathBuf, target: PathBuf, reason: String },

    /// Invalid environment configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A step failed after earlier steps had already changed the system.
    #[error(
        "Step '{failed}' failed after these steps had already completed: {}. \
         Inspect the Xcode links and installed versions manually",
        committed.join("; ")
    )]
    PartialRun {
        failed: String,
        committed: Vec<String>,
        #[source]
        source: Box<UpdateError>,
    },
}
