//! Terminal output for xcode-update.
//!
//! Reports, tables and the plan preview go to stdout; errors and `--verbose`
//! traces go to stderr. Color is turned off by, in order:
//! 1. `--no-color`
//! 2. `NO_COLOR` (any value)
//! 3. `TERM=dumb`
//! 4. `--color never`, or `--color auto` with stdout not a TTY

use std::borrow::Cow;
use std::io::IsTerminal;
use std::time::Duration;

use anstream::{eprintln, println};
use anstyle::{AnsiColor, Color, Style};
use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets};
use indicatif::{ProgressBar, ProgressStyle};

use crate::links::{LinkStatus, PointerName};
use crate::plan::{PlanStep, PlannedAction, ReconciliationPlan};
use crate::versions::{VersionKind, VersionRecord};

const SPINNER_TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// `--color` setting
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Always,
    #[default]
    Auto,
    Never,
}

impl std::str::FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "auto" => Ok(Self::Auto),
            "never" => Ok(Self::Never),
            other => Err(format!("expected always, auto or never, got '{}'", other)),
        }
    }
}

/// Resolved display settings, passed by reference to everything that prints
#[derive(Debug, Clone)]
pub struct Ui {
    color: bool,
    /// Animated spinner while `xcodes list` runs (TTY and color only)
    animate: bool,
    verbose: bool,
}

impl Ui {
    pub fn new(mode: ColorMode, no_color: bool) -> Self {
        let color = color_wanted(mode, no_color);
        if !color {
            anstream::ColorChoice::write_global(anstream::ColorChoice::Never);
        }

        Self {
            color,
            animate: color && std::io::stdout().is_terminal(),
            verbose: false,
        }
    }

    /// Echo every `xcodes` invocation and check to stderr
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn paint(&self, text: impl AsRef<str>, style: Style) -> String {
        if self.color {
            format!("{style}{}{style:#}", text.as_ref())
        } else {
            text.as_ref().to_string()
        }
    }

    fn fg(color: AnsiColor) -> Style {
        Style::new().fg_color(Some(Color::Ansi(color)))
    }

    fn label(&self, tag: &str, color: AnsiColor) -> String {
        self.paint(tag, Self::fg(color).bold())
    }

    pub fn ok(&self, msg: impl AsRef<str>) {
        println!("{} {}", self.label("OK", AnsiColor::Green), msg.as_ref());
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        println!("{} {}", self.label("WARN", AnsiColor::Yellow), msg.as_ref());
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        println!("{} {}", self.label("INFO", AnsiColor::Cyan), msg.as_ref());
    }

    /// Fatal error, printed once to stderr
    pub fn err(&self, msg: impl AsRef<str>) {
        eprintln!("{} {}", self.label("ERROR", AnsiColor::Red), msg.as_ref());
    }

    pub fn debug(&self, msg: impl AsRef<str>) {
        if self.verbose {
            eprintln!("{}", self.paint(msg, Self::fg(AnsiColor::BrightBlack)));
        }
    }

    pub fn section(&self, title: impl AsRef<str>) {
        println!("{}", self.paint(title, Style::new().bold()));
    }

    pub fn blank(&self) {
        println!();
    }

    fn check_mark(&self) -> String {
        if self.color {
            self.paint("✓", Self::fg(AnsiColor::Green))
        } else {
            "[OK]".to_string()
        }
    }

    fn cross_mark(&self) -> String {
        if self.color {
            self.paint("✗", Self::fg(AnsiColor::Red))
        } else {
            "[X]".to_string()
        }
    }

    fn bullet(&self) -> &'static str {
        if self.color { "•" } else { "-" }
    }

    // Spinner around the networked listing

    pub fn query_spinner(&self, msg: impl Into<Cow<'static, str>>) -> ProgressBar {
        if !self.animate {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars(SPINNER_TICKS)
            .template("{spinner:.cyan} {msg}")
        {
            pb.set_style(style);
        }
        pb.set_message(msg);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Replace the spinner with a final OK or ERROR line
    pub fn finish_spinner(&self, pb: &ProgressBar, succeeded: bool, msg: impl Into<Cow<'static, str>>) {
        let msg = msg.into();
        if !self.animate {
            pb.finish_and_clear();
            if succeeded { self.ok(msg) } else { self.err(msg) }
            return;
        }

        if let Ok(style) = ProgressStyle::default_spinner().template("{msg}") {
            pb.set_style(style);
        }
        let mark = if succeeded { self.check_mark() } else { self.cross_mark() };
        pb.finish_with_message(format!("{} {}", mark, msg));
    }

    // Tables

    fn table(&self, bordered: bool) -> Table {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        let preset = match (bordered, self.color) {
            (false, _) => presets::NOTHING,
            (true, true) => presets::UTF8_FULL_CONDENSED,
            (true, false) => presets::ASCII_MARKDOWN,
        };
        table.load_preset(preset);
        table
    }

    fn heading(&self, text: impl Into<String>) -> Cell {
        let cell = Cell::new(text.into());
        if self.color { cell.add_attribute(Attribute::Bold) } else { cell }
    }

    // comfy-table measures width itself, so color goes on the cell, not into the text
    fn tinted(&self, text: impl Into<String>, color: comfy_table::Color) -> Cell {
        let cell = Cell::new(text.into());
        if self.color { cell.fg(color) } else { cell }
    }

    fn kind_cell(&self, kind: VersionKind) -> Cell {
        let color = match kind {
            VersionKind::Release => comfy_table::Color::Green,
            VersionKind::Beta => comfy_table::Color::Yellow,
            VersionKind::ReleaseCandidate => comfy_table::Color::Cyan,
        };
        self.tinted(kind.label(), color)
    }

    /// Installed builds, oldest first, with the pointers that reference each
    pub fn versions_table(
        &self,
        installed: &[VersionRecord],
        beta: Option<&VersionRecord>,
        release: Option<&VersionRecord>,
    ) -> Table {
        let mut table = self.table(true);
        table.set_header(vec![
            self.heading("Version"),
            self.heading("Build"),
            self.heading("Kind"),
            self.heading("Links"),
        ]);

        for version in installed {
            let pointers: Vec<String> = [(PointerName::Beta, beta), (PointerName::Release, release)]
                .into_iter()
                .filter(|(_, target)| target.is_some_and(|t| t.same_version(version)))
                .map(|(pointer, _)| pointer.to_string())
                .collect();

            table.add_row(vec![
                Cell::new(&version.identifier),
                Cell::new(version.build.as_deref().unwrap_or("-")),
                self.kind_cell(version.kind),
                Cell::new(pointers.join(", ")),
            ]);
        }

        table
    }

    /// On-disk state of each pointer link
    pub fn links_table(&self, links: &[(PointerName, LinkStatus)]) -> Table {
        let mut table = self.table(false);
        for (pointer, status) in links {
            let state = match status {
                LinkStatus::Missing => self.tinted("missing", comfy_table::Color::Yellow),
                LinkStatus::Symlink { target } => Cell::new(format!("symlink → {}", target.display())),
                LinkStatus::BrokenSymlink { target } => self.tinted(
                    format!("broken symlink → {}", target.display()),
                    comfy_table::Color::Red,
                ),
                LinkStatus::RegularFile | LinkStatus::Directory => {
                    self.tinted("not a symlink (left alone)", comfy_table::Color::Red)
                }
            };
            table.add_row(vec![self.heading(format!("{}:", pointer)), state]);
        }
        table
    }

    pub fn print_table(&self, table: &Table) {
        println!("{}", table);
    }

    // Plan preview and progress

    /// Numbered actions interleaved with dimmed notes
    pub fn plan_lines(&self, plan: &ReconciliationPlan) -> Vec<String> {
        let mut n = 0;
        plan.steps()
            .iter()
            .map(|step| match step {
                PlanStep::Action(action) => {
                    n += 1;
                    format!("  {}. {}", n, self.paint(action.to_string(), Style::new().bold()))
                }
                PlanStep::Note(note) => self.paint(
                    format!("  {} {}", self.bullet(), note),
                    Self::fg(AnsiColor::BrightBlack),
                ),
            })
            .collect()
    }

    pub fn plan_preview(&self, plan: &ReconciliationPlan) {
        self.section("Planned changes");
        for line in self.plan_lines(plan) {
            println!("{}", line);
        }
    }

    pub fn step(&self, n: usize, total: usize, action: &PlannedAction) {
        self.info(format!("[{}/{}] {}", n, total, action));
    }

    pub fn pointer_line(&self, pointer: PointerName, target: Option<&VersionRecord>) -> String {
        match target {
            Some(target) => format!("  {} {} → {}", self.check_mark(), pointer, target),
            None => format!("  {} {} is not set", self.paint("!", Self::fg(AnsiColor::Yellow)), pointer),
        }
    }

    pub fn pointer_summary(&self, pointer: PointerName, target: Option<&VersionRecord>) {
        println!("{}", self.pointer_line(pointer, target));
    }
}

fn color_wanted(mode: ColorMode, no_color: bool) -> bool {
    if no_color || std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var("TERM").is_ok_and(|t| t == "dumb") {
        return false;
    }

    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stdout().is_terminal(),
    }
}
