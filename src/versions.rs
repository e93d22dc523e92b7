//! Xcode version records and the text adapter for `xcodes` output.
//!
//! `xcodes` only speaks human-readable text. All of the string matching
//! lives here so the rest of the crate works with [`VersionRecord`] and
//! [`VersionKind`] instead of substrings.
//!
//! Formats understood:
//! - `xcodes list`: one version per line, oldest first, installed builds
//!   annotated inline, e.g. `15.1 Beta 2 (15C5042i) (Installed, Selected)`.
//! - `xcodes installed`: `<descriptor>\t<path>` per line, oldest first.

use std::fmt;
use std::path::PathBuf;

use crate::error::UpdateError;

/// Release classification of an Xcode build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionKind {
    Release,
    Beta,
    ReleaseCandidate,
}

impl VersionKind {
    /// Classify a version identifier such as `15.1 Beta 2` or `15.0 RC`
    pub fn classify(identifier: &str) -> Self {
        let lower = identifier.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();

        if lower.contains("release candidate")
            || words.iter().any(|w| *w == "rc" || *w == "gm")
        {
            Self::ReleaseCandidate
        } else if words
            .iter()
            .any(|w| *w == "beta" || *w == "preview" || *w == "dp")
        {
            Self::Beta
        } else {
            Self::Release
        }
    }

    /// Stable, generally-available build
    pub fn is_release(self) -> bool {
        matches!(self, Self::Release)
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Release => "release",
            Self::Beta => "beta",
            Self::ReleaseCandidate => "release candidate",
        }
    }
}

impl fmt::Display for VersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One Xcode build known to `xcodes`. Rebuilt from tool output on every query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    /// Version as `xcodes` names it, e.g. `15.1 Beta 2`
    pub identifier: String,
    /// Build number, e.g. `15C5042i`
    pub build: Option<String>,
    pub kind: VersionKind,
    /// Location of the .app bundle, when installed
    pub installed_path: Option<PathBuf>,
}

impl VersionRecord {
    pub fn new(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let kind = VersionKind::classify(&identifier);
        Self {
            identifier,
            build: None,
            kind,
            installed_path: None,
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed_path.is_some()
    }

    /// Whether both records name the same build
    pub fn same_version(&self, other: &VersionRecord) -> bool {
        self.identifier == other.identifier
    }
}

impl fmt::Display for VersionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.build {
            Some(build) => write!(f, "Xcode {} ({})", self.identifier, build),
            None => write!(f, "Xcode {}", self.identifier),
        }
    }
}

/// A parsed `15.1 Beta 2 (15C5042i) (Installed, Selected)` line
#[derive(Debug, PartialEq, Eq)]
struct Descriptor<'a> {
    identifier: &'a str,
    build: Option<&'a str>,
    annotations: Vec<&'a str>,
}

impl Descriptor<'_> {
    fn is_installed(&self) -> bool {
        self.annotations
            .iter()
            .flat_map(|a| a.split(','))
            .any(|a| a.trim().eq_ignore_ascii_case("installed"))
    }

    fn to_record(&self) -> VersionRecord {
        let mut record = VersionRecord::new(self.identifier);
        record.build = self.build.map(str::to_string);
        record
    }
}

fn is_annotation(group: &str) -> bool {
    group
        .split(',')
        .map(str::trim)
        .all(|a| a.eq_ignore_ascii_case("installed") || a.eq_ignore_ascii_case("selected"))
}

fn parse_descriptor(text: &str) -> Option<Descriptor<'_>> {
    let text = text.trim();
    if !text.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    let (identifier, mut rest) = match text.find(" (") {
        Some(idx) => (text[..idx].trim(), &text[idx..]),
        None => (text, ""),
    };

    let mut build = None;
    let mut annotations = Vec::new();
    loop {
        rest = rest.trim_start();
        let Some(body) = rest.strip_prefix('(') else {
            break;
        };
        let end = body.find(')')?;
        let group = body[..end].trim();
        if build.is_none() && annotations.is_empty() && !is_annotation(group) {
            build = Some(group);
        } else {
            annotations.push(group);
        }
        rest = &body[end + 1..];
    }

    Some(Descriptor {
        identifier,
        build,
        annotations,
    })
}

/// Parse `xcodes list` into the newest version and whether it is installed.
///
/// The newest version is the last line that parses as a version; banner or
/// progress lines that do not start with a version number are ignored.
pub fn parse_list(output: &str) -> Result<(VersionRecord, bool), UpdateError> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_descriptor)
        .last()
        .map(|d| (d.to_record(), d.is_installed()))
        .ok_or_else(|| UpdateError::MalformedOutput {
            command: "list".to_string(),
            detail: "no Xcode version found in the listing".to_string(),
        })
}

/// Parse `xcodes installed` into records, oldest first.
///
/// Blank lines (including the trailing one) terminate records and are
/// skipped. Any other line must be `<descriptor>\t<path>`.
pub fn parse_installed(output: &str) -> Result<Vec<VersionRecord>, UpdateError> {
    let malformed = |detail: String| UpdateError::MalformedOutput {
        command: "installed".to_string(),
        detail,
    };

    let mut records = Vec::new();
    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let (descriptor, path) = line
            .split_once('\t')
            .ok_or_else(|| malformed(format!("missing tab separator in {:?}", line)))?;
        let descriptor = parse_descriptor(descriptor)
            .ok_or_else(|| malformed(format!("no version in {:?}", line)))?;
        let path = path.trim();
        if path.is_empty() {
            return Err(malformed(format!("no path in {:?}", line)));
        }

        let mut record = descriptor.to_record();
        record.installed_path = Some(PathBuf::from(path));
        records.push(record);
    }

    Ok(records)
}
