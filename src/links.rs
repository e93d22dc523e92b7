//! Pointer links.
//!
//! The two pointers (`Xcode-Beta.app` and `Xcode-Release.app`) are symbolic
//! links inside the base directory, optionally accompanied by a Finder alias
//! so they also show up in Launchpad and Spotlight. This module handles:
//! - Detecting what currently sits at a link path.
//! - Replacing a link without ever clobbering a real bundle.
//! - Resolving a link to the build it points at.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::UpdateError;

/// One of the two named pointers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerName {
    Beta,
    Release,
}

impl PointerName {
    pub fn all() -> [PointerName; 2] {
        [PointerName::Beta, PointerName::Release]
    }
}

impl fmt::Display for PointerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beta => f.write_str("Xcode-Beta"),
            Self::Release => f.write_str("Xcode-Release"),
        }
    }
}

/// What currently sits at a link path
#[derive(Debug)]
pub enum LinkStatus {
    Missing,
    RegularFile,
    Directory,
    Symlink { target: PathBuf },
    BrokenSymlink { target: PathBuf },
}

impl LinkStatus {
    pub fn detect(path: &Path) -> Self {
        if let Ok(target) = fs::read_link(path) {
            // exists() follows the link
            if path.exists() {
                Self::Symlink { target }
            } else {
                Self::BrokenSymlink { target }
            }
        } else if path.exists() {
            if path.is_dir() {
                Self::Directory
            } else {
                Self::RegularFile
            }
        } else {
            Self::Missing
        }
    }
}

/// OS facilities for creating and following pointer links
pub trait AliasTool {
    /// Point `link` at `source`, plus a Finder alias named `alias_name` next to it
    fn create_alias(&self, source: &Path, link: &Path, alias_name: &str) -> Result<(), UpdateError>;

    /// Real path behind `link`, or `None` if missing or dangling
    fn resolve(&self, link: &Path) -> Option<PathBuf>;

    fn exists(&self, path: &Path) -> bool;
}

/// Symlinks on disk, with Finder aliases through `osascript` when enabled
#[derive(Debug, Clone, Default)]
pub struct SystemAliases {
    pub finder_aliases: bool,
}

impl SystemAliases {
    pub fn new(finder_aliases: bool) -> Self {
        Self { finder_aliases }
    }
}

impl AliasTool for SystemAliases {
    fn create_alias(&self, source: &Path, link: &Path, alias_name: &str) -> Result<(), UpdateError> {
        replace_symlink(source, link)?;

        if self.finder_aliases {
            let dir = link.parent().unwrap_or_else(|| Path::new("/"));
            make_finder_alias(source, dir, alias_name)?;
        }

        Ok(())
    }

    fn resolve(&self, link: &Path) -> Option<PathBuf> {
        fs::canonicalize(link).ok()
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Create or re-point a symlink, refusing to replace anything that is not a link
pub fn replace_symlink(source: &Path, link: &Path) -> Result<(), UpdateError> {
    let fail = |reason: String| UpdateError::LinkFailed {
        link: link.to_path_buf(),
        target: source.to_path_buf(),
        reason,
    };

    match LinkStatus::detect(link) {
        LinkStatus::Missing => {}
        LinkStatus::Symlink { .. } | LinkStatus::BrokenSymlink { .. } => {
            // remove_file removes the symlink itself
            fs::remove_file(link).map_err(|e| fail(format!("cannot remove old link: {}", e)))?;
        }
        LinkStatus::RegularFile | LinkStatus::Directory => {
            return Err(fail("a real file or bundle already exists there".to_string()));
        }
    }

    make_symlink(source, link).map_err(|e| fail(e.to_string()))
}

fn make_symlink(source: &Path, link: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    std::os::unix::fs::symlink(source, link)?;

    #[cfg(windows)]
    std::os::windows::fs::symlink_dir(source, link)?;

    Ok(())
}

fn make_finder_alias(source: &Path, dir: &Path, name: &str) -> Result<(), UpdateError> {
    let fail = |reason: String| UpdateError::LinkFailed {
        link: dir.join(name),
        target: source.to_path_buf(),
        reason,
    };

    // Finder refuses to overwrite, so drop the previous alias file first
    let existing = dir.join(name);
    if matches!(LinkStatus::detect(&existing), LinkStatus::RegularFile) {
        fs::remove_file(&existing)
            .map_err(|e| fail(format!("cannot remove old Finder alias: {}", e)))?;
    }

    let status = Command::new("osascript")
        .arg("-e")
        .arg("tell application \"Finder\"")
        .arg("-e")
        .arg(format!(
            "set newAlias to make alias file to (POSIX file {} as alias) at (POSIX file {} as alias)",
            applescript_string(source),
            applescript_string(dir)
        ))
        .arg("-e")
        .arg(format!("set name of newAlias to {}", applescript_quote(name)))
        .arg("-e")
        .arg("end tell")
        .stdout(Stdio::null())
        .status()
        .map_err(|e| fail(format!("cannot run osascript: {}", e)))?;

    if !status.success() {
        return Err(fail(format!("osascript exited with {}", status)));
    }
    Ok(())
}

fn applescript_string(path: &Path) -> String {
    applescript_quote(&path.to_string_lossy())
}

fn applescript_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
