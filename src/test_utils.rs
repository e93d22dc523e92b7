//! Test utilities shared across test modules
//!
//! `FakeManager` stands in for `xcodes`: it keeps an in-memory catalogue and
//! creates or removes real bundle directories inside a temporary base
//! directory, so links can be exercised on disk.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::UpdateError;
use crate::paths::Paths;
use crate::xcodes::VersionManager;

/// Create a Paths struct rooted in a temporary directory, Finder aliases off
pub fn setup_test_paths(temp_dir: &TempDir) -> Paths {
    // canonical so resolved links compare equal on macOS (/var -> /private/var)
    let base = temp_dir.path().canonicalize().unwrap();
    let mut paths = Paths::with_base(base);
    paths.finder_aliases = false;
    paths
}

/// Scripted `xcodes` replacement
#[derive(Debug)]
pub struct FakeManager {
    base_dir: PathBuf,
    available: RefCell<Vec<String>>,
    installed: RefCell<Vec<(String, PathBuf)>>,
    calls: RefCell<Vec<String>>,
    /// `install` reports success without anything appearing
    pub lose_installs: Cell<bool>,
    pub fail_uninstall: Cell<bool>,
    /// `installed` queries answered before the tool starts failing
    pub installed_budget: Cell<Option<usize>>,
}

impl FakeManager {
    pub fn new(paths: &Paths) -> Self {
        Self {
            base_dir: paths.base_dir.clone(),
            available: RefCell::new(Vec::new()),
            installed: RefCell::new(Vec::new()),
            calls: RefCell::new(Vec::new()),
            lose_installs: Cell::new(false),
            fail_uninstall: Cell::new(false),
            installed_budget: Cell::new(None),
        }
    }

    /// Versions `list` reports, oldest first
    pub fn set_available(&self, versions: &[&str]) {
        *self.available.borrow_mut() = versions.iter().map(|v| v.to_string()).collect();
    }

    /// Install a version directly, bypassing the recorded calls
    pub fn preinstall(&self, identifier: &str) -> PathBuf {
        let path = self.bundle_path(identifier);
        fs::create_dir_all(&path).unwrap();
        self.installed
            .borrow_mut()
            .push((identifier.to_string(), path.clone()));
        path
    }

    pub fn bundle_path(&self, identifier: &str) -> PathBuf {
        self.base_dir
            .join(format!("Xcode-{}.app", identifier.replace(' ', "-")))
    }

    /// Mutating calls made so far, e.g. `install 15.1 Beta`
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn is_installed(&self, identifier: &str) -> bool {
        self.installed.borrow().iter().any(|(id, _)| id == identifier)
    }
}

impl VersionManager for FakeManager {
    fn list(&self) -> Result<String, UpdateError> {
        let mut out = String::new();
        for version in self.available.borrow().iter() {
            out.push_str(version);
            if self.is_installed(version) {
                out.push_str(" (Installed)");
            }
            out.push('\n');
        }
        Ok(out)
    }

    fn installed(&self) -> Result<String, UpdateError> {
        if let Some(left) = self.installed_budget.get() {
            if left == 0 {
                return Err(UpdateError::ToolUnavailable {
                    command: "installed".to_string(),
                    reason: "exited with exit status: 1".to_string(),
                });
            }
            self.installed_budget.set(Some(left - 1));
        }

        let mut out = String::new();
        for (identifier, path) in self.installed.borrow().iter() {
            out.push_str(&format!("{}\t{}\n", identifier, path.display()));
        }
        out.push('\n');
        Ok(out)
    }

    fn install(&self, identifier: &str) -> Result<(), UpdateError> {
        self.calls.borrow_mut().push(format!("install {}", identifier));
        if !self.lose_installs.get() {
            self.preinstall(identifier);
        }
        Ok(())
    }

    fn uninstall(&self, identifier: &str) -> Result<(), UpdateError> {
        self.calls
            .borrow_mut()
            .push(format!("uninstall {}", identifier));
        if self.fail_uninstall.get() {
            return Err(UpdateError::ToolFailed {
                command: format!("uninstall {}", identifier),
                status: "exit status: 1".to_string(),
            });
        }

        let mut installed = self.installed.borrow_mut();
        if let Some(idx) = installed.iter().position(|(id, _)| id == identifier) {
            let (_, path) = installed.remove(idx);
            fs::remove_dir_all(&path).unwrap();
        }
        Ok(())
    }
}

/// Point a link at a bundle the way a previous run would have
pub fn link(link: &Path, bundle: &Path) {
    crate::links::replace_symlink(bundle, link).unwrap();
}
