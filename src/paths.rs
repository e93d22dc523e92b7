use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::UpdateError;
use crate::links::PointerName;

/// Environment variable overriding the directory holding Xcode builds and links
pub const BASE_DIR_ENV: &str = "XCODE_UPDATE_DIR";

/// Environment variable overriding the `xcodes list` wait, in seconds
pub const LIST_TIMEOUT_ENV: &str = "XCODE_UPDATE_LIST_TIMEOUT";

const DEFAULT_BASE_DIR: &str = "/Applications";
const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(10);

/// All computed paths and tunables used by xcode-update
#[derive(Debug, Clone)]
pub struct Paths {
    /// /Applications (or $XCODE_UPDATE_DIR)
    pub base_dir: PathBuf,
    /// /Applications/Xcode-Beta.app
    pub beta_link: PathBuf,
    /// /Applications/Xcode-Release.app
    pub release_link: PathBuf,
    /// Finder alias name for the beta pointer
    pub beta_alias_name: String,
    /// Finder alias name for the release pointer
    pub release_alias_name: String,
    /// Upper bound on the networked `xcodes list` call
    pub list_timeout: Duration,
    /// Whether a Finder alias is created next to each symlink
    pub finder_aliases: bool,
}

impl Paths {
    /// Build paths from `XCODE_UPDATE_DIR` / `XCODE_UPDATE_LIST_TIMEOUT`
    pub fn from_env() -> Result<Self, UpdateError> {
        let base_dir = match std::env::var_os(BASE_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from(DEFAULT_BASE_DIR),
        };

        let mut paths = Self::with_base(base_dir);

        if let Ok(raw) = std::env::var(LIST_TIMEOUT_ENV) {
            paths.list_timeout = parse_timeout(&raw)?;
        }

        Ok(paths)
    }

    /// Build paths rooted at an explicit base directory
    pub fn with_base(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let beta_link = base_dir.join("Xcode-Beta.app");
        let release_link = base_dir.join("Xcode-Release.app");

        Self {
            base_dir,
            beta_link,
            release_link,
            beta_alias_name: "Xcode Beta".to_string(),
            release_alias_name: "Xcode Release".to_string(),
            list_timeout: DEFAULT_LIST_TIMEOUT,
            finder_aliases: cfg!(target_os = "macos"),
        }
    }

    /// Get the symlink path behind a pointer
    pub fn link_path(&self, pointer: PointerName) -> &Path {
        match pointer {
            PointerName::Beta => &self.beta_link,
            PointerName::Release => &self.release_link,
        }
    }

    /// Get the Finder alias name behind a pointer
    pub fn alias_name(&self, pointer: PointerName) -> &str {
        match pointer {
            PointerName::Beta => &self.beta_alias_name,
            PointerName::Release => &self.release_alias_name,
        }
    }

    /// Both managed pointer links
    pub fn pointer_links(&self) -> [PathBuf; 2] {
        [self.beta_link.clone(), self.release_link.clone()]
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, UpdateError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(UpdateError::Config(format!(
            "{} must be a positive number of seconds, got '{}'",
            LIST_TIMEOUT_ENV, raw
        ))),
    }
}
