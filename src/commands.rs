//! High-level command orchestration for the CLI.
//!
//! This module is the coordination layer between the pieces:
//! - `crate::preflight` for platform, tool and permission checks.
//! - `crate::xcodes` for querying and driving `xcodes`.
//! - `crate::reconcile` for planning and applying changes.
//! - `crate::ui` for output and the confirmation prompt.

use anyhow::{Context, Result};
use inquire::InquireError;

use crate::error::UpdateError;
use crate::links::{AliasTool, LinkStatus, PointerName, SystemAliases};
use crate::paths::Paths;
use crate::preflight::{check_platform, check_tools, run_preflight};
use crate::reconcile::{PlanOptions, Reconciler, build_plan};
use crate::ui::Ui;
use crate::xcodes::{VersionManager, VersionSource, XcodesCli};

/// Flags controlling an update run
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Skip the preview and confirmation
    pub non_interactive: bool,
    pub skip_delete: bool,
    pub links_only: bool,
}

impl UpdateOptions {
    fn plan_options(&self) -> PlanOptions {
        PlanOptions {
            skip_delete: self.skip_delete,
            links_only: self.links_only,
        }
    }
}

/// How an update run ended. All of these exit with status 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Updated { actions: usize },
    NothingToDo,
    Cancelled,
}

fn system_source(paths: &Paths, ui: &Ui) -> VersionSource<XcodesCli> {
    VersionSource::new(XcodesCli::new(paths, ui)).excluding(paths.pointer_links())
}

/// Full run against the real system: checks, preview, confirmation, changes
pub fn run(paths: &Paths, ui: &Ui, options: UpdateOptions) -> Result<Outcome> {
    run_preflight(paths, ui)?;

    let source = system_source(paths, ui);
    let aliases = SystemAliases::new(paths.finder_aliases);
    update(paths, &source, &aliases, ui, options, prompt_confirmation)
}

/// Ask before changing anything. Empty input means yes.
pub fn prompt_confirmation() -> Result<bool> {
    let answer = inquire::Confirm::new("Apply these changes?")
        .with_default(true)
        .with_help_message("Downloading and installing Xcode can take a long time")
        .prompt();
    confirmation_answer(answer)
}

/// Esc and Ctrl-C at the prompt decline, the same as answering no
fn confirmation_answer(answer: Result<bool, InquireError>) -> Result<bool> {
    match answer {
        Ok(yes) => Ok(yes),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(false),
        Err(e) => Err(e).context("Confirmation prompt failed"),
    }
}

/// Plan and apply one update
pub fn update<M, A>(
    paths: &Paths,
    source: &VersionSource<M>,
    aliases: &A,
    ui: &Ui,
    options: UpdateOptions,
    confirm: impl FnOnce() -> Result<bool>,
) -> Result<Outcome>
where
    M: VersionManager,
    A: AliasTool,
{
    let reconciler = Reconciler::new(paths, source, aliases);

    let spinner = ui.query_spinner("Checking for the newest Xcode...");
    let snapshot = match reconciler.snapshot() {
        Ok(snapshot) => {
            ui.finish_spinner(&spinner, true, format!("Newest available: {}", snapshot.latest));
            snapshot
        }
        Err(e) => {
            ui.finish_spinner(&spinner, false, "Could not read the Xcode versions");
            return Err(e.into());
        }
    };

    let plan = build_plan(&snapshot, options.plan_options())?;

    if plan.is_noop() {
        for note in plan.notes() {
            ui.info(note.to_string());
        }
        ui.ok("Nothing to do.");
        return Ok(Outcome::NothingToDo);
    }

    if !options.non_interactive {
        ui.section("Installed Xcode versions");
        ui.print_table(&ui.versions_table(
            &snapshot.installed,
            snapshot.beta_target.as_ref(),
            snapshot.release_target.as_ref(),
        ));
        ui.blank();
        ui.plan_preview(&plan);
        ui.blank();

        if !confirm()? {
            ui.warn("Update cancelled.");
            return Ok(Outcome::Cancelled);
        }
    }

    let total = plan.actions().count();
    let mut step = 0;
    let applied = reconciler
        .execute(&plan, |action| {
            step += 1;
            ui.step(step, total, action);
        })
        .context("Xcode update failed")?;

    // every step has committed; a failed read-back must not fail the run
    if let Err(e) = report_links(source, &reconciler, ui) {
        ui.warn(format!("All changes were applied, but the links could not be read back: {:#}", e));
    }
    ui.ok(format!("Done: {} change(s) applied.", applied));
    Ok(Outcome::Updated { actions: applied })
}

/// Show installed versions and where both links point, without changing anything
pub fn status(paths: &Paths, ui: &Ui) -> Result<()> {
    check_platform()?;
    check_tools(ui)?;

    let source = system_source(paths, ui);
    let aliases = SystemAliases::new(paths.finder_aliases);
    show_status(paths, &source, &aliases, ui)
}

pub fn show_status<M, A>(paths: &Paths, source: &VersionSource<M>, aliases: &A, ui: &Ui) -> Result<()>
where
    M: VersionManager,
    A: AliasTool,
{
    let installed = source
        .installed_versions()
        .context("Failed to list installed Xcode versions")?;
    let reconciler = Reconciler::new(paths, source, aliases);

    let mut targets = Vec::new();
    for pointer in PointerName::all() {
        let target = match reconciler.resolve_pointer(pointer, &installed) {
            Ok(target) => target,
            Err(e @ UpdateError::ClassificationLookupFailed { .. }) => {
                ui.warn(e.to_string());
                None
            }
            Err(e) => return Err(e.into()),
        };
        targets.push(target);
    }

    ui.section("Installed Xcode versions");
    if installed.is_empty() {
        ui.warn(format!("No Xcode installed in {}", paths.base_dir.display()));
    } else {
        ui.print_table(&ui.versions_table(&installed, targets[0].as_ref(), targets[1].as_ref()));
    }
    ui.blank();

    ui.section("Links");
    let links: Vec<(PointerName, LinkStatus)> = PointerName::all()
        .into_iter()
        .map(|pointer| (pointer, LinkStatus::detect(paths.link_path(pointer))))
        .collect();
    ui.print_table(&ui.links_table(&links));

    Ok(())
}

fn report_links<M, A>(
    source: &VersionSource<M>,
    reconciler: &Reconciler<'_, M, A>,
    ui: &Ui,
) -> Result<(), UpdateError>
where
    M: VersionManager,
    A: AliasTool,
{
    let installed = source.installed_versions()?;
    for pointer in PointerName::all() {
        let target = reconciler.resolve_pointer(pointer, &installed)?;
        ui.pointer_summary(pointer, target.as_ref());
    }
    Ok(())
}
