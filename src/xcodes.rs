//! The external version manager.
//!
//! [`VersionManager`] is the raw command surface of `xcodes`; [`XcodesCli`]
//! runs the real binary. [`VersionSource`] turns the raw output into
//! [`VersionRecord`]s and never caches: every call asks the tool again.

use std::ffi::OsString;
use std::io::Read;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::error::UpdateError;
use crate::paths::Paths;
use crate::ui::Ui;
use crate::versions::{VersionRecord, parse_installed, parse_list};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Raw `xcodes` subcommands
pub trait VersionManager {
    /// Output of `xcodes list`
    fn list(&self) -> Result<String, UpdateError>;

    /// Output of `xcodes installed`
    fn installed(&self) -> Result<String, UpdateError>;

    fn install(&self, identifier: &str) -> Result<(), UpdateError>;

    fn uninstall(&self, identifier: &str) -> Result<(), UpdateError>;
}

/// Runs the `xcodes` executable against one install directory
#[derive(Debug, Clone)]
pub struct XcodesCli {
    program: OsString,
    leading_args: Vec<OsString>,
    directory: PathBuf,
    list_timeout: Duration,
    ui: Ui,
}

impl XcodesCli {
    pub fn new(paths: &Paths, ui: &Ui) -> Self {
        Self::with_command("xcodes", Vec::<OsString>::new(), paths, ui)
    }

    /// Run a different executable (e.g. a wrapper script) in place of `xcodes`
    pub fn with_command(
        program: impl Into<OsString>,
        leading_args: impl IntoIterator<Item = impl Into<OsString>>,
        paths: &Paths,
        ui: &Ui,
    ) -> Self {
        Self {
            program: program.into(),
            leading_args: leading_args.into_iter().map(Into::into).collect(),
            directory: paths.base_dir.clone(),
            list_timeout: paths.list_timeout,
            ui: ui.clone(),
        }
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .args(args)
            .arg("--directory")
            .arg(&self.directory);

        self.ui.debug(format!(
            "$ xcodes {} --directory {}",
            args.join(" "),
            self.directory.display()
        ));
        cmd
    }

    /// Run a query subcommand and capture its stdout
    fn capture(&self, args: &[&str], timeout: Option<Duration>) -> Result<String, UpdateError> {
        let name = args.join(" ");
        let unavailable = |reason: String| UpdateError::ToolUnavailable {
            command: name.clone(),
            reason,
        };

        let mut child = self
            .command(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| unavailable(e.to_string()))?;

        // Drain both pipes so a chatty tool never blocks on a full buffer
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let status = match timeout {
            Some(limit) => match wait_with_timeout(&mut child, limit) {
                Ok(Some(status)) => status,
                Ok(None) => {
                    return Err(UpdateError::ToolTimeout {
                        command: name,
                        timeout: limit,
                    });
                }
                Err(e) => return Err(unavailable(e.to_string())),
            },
            None => child.wait().map_err(|e| unavailable(e.to_string()))?,
        };

        let out = collect(stdout);
        let err = collect(stderr);

        if !status.success() {
            let detail = err.trim();
            return Err(unavailable(if detail.is_empty() {
                format!("exited with {}", status)
            } else {
                format!("exited with {}: {}", status, detail)
            }));
        }

        Ok(out)
    }

    /// Run a mutating subcommand attached to the terminal
    fn run_attached(&self, args: &[&str]) -> Result<(), UpdateError> {
        let name = args.join(" ");
        let status = self
            .command(args)
            .status()
            .map_err(|e| UpdateError::ToolUnavailable {
                command: name.clone(),
                reason: e.to_string(),
            })?;

        if !status.success() {
            return Err(UpdateError::ToolFailed {
                command: name,
                status: status.to_string(),
            });
        }
        Ok(())
    }
}

impl VersionManager for XcodesCli {
    fn list(&self) -> Result<String, UpdateError> {
        self.capture(&["list"], Some(self.list_timeout))
    }

    fn installed(&self) -> Result<String, UpdateError> {
        self.capture(&["installed"], None)
    }

    fn install(&self, identifier: &str) -> Result<(), UpdateError> {
        self.run_attached(&["install", identifier])
    }

    fn uninstall(&self, identifier: &str) -> Result<(), UpdateError> {
        self.run_attached(&["uninstall", identifier])
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn collect(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Wait for `child`, killing it once `timeout` elapses. `Ok(None)` means it was killed.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> std::io::Result<Option<ExitStatus>> {
    let started_at = Instant::now();
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if started_at.elapsed() >= timeout {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Typed queries over a [`VersionManager`]
#[derive(Debug)]
pub struct VersionSource<M> {
    manager: M,
    excluded: Vec<PathBuf>,
}

impl<M: VersionManager> VersionSource<M> {
    pub fn new(manager: M) -> Self {
        Self {
            manager,
            excluded: Vec::new(),
        }
    }

    /// Hide entries at these paths, e.g. our own links reported as installed copies
    pub fn excluding(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.excluded.extend(paths);
        self
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    /// Newest available version and whether `xcodes` reports it installed
    pub fn latest_version(&self) -> Result<(VersionRecord, bool), UpdateError> {
        let output = self.manager.list()?;
        parse_list(&output)
    }

    /// Installed versions, oldest first
    pub fn installed_versions(&self) -> Result<Vec<VersionRecord>, UpdateError> {
        let output = self.manager.installed()?;
        let mut records = parse_installed(&output)?;
        records.retain(|r| {
            r.installed_path
                .as_ref()
                .is_none_or(|p| !self.excluded.contains(p))
        });
        Ok(records)
    }

    pub fn resolve_by_identifier(&self, identifier: &str) -> Result<Option<VersionRecord>, UpdateError> {
        Ok(self
            .installed_versions()?
            .into_iter()
            .find(|r| r.identifier == identifier))
    }
}
