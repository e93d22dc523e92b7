//! Link reconciliation.
//!
//! This module implements the core of `xcode-update`: deciding, from the
//! newest available version, the installed set and where the two pointers
//! currently resolve, which version to install, which old version to retire
//! and where `Xcode-Beta` / `Xcode-Release` should point afterwards.
//!
//! Planning ([`build_plan`]) is pure. [`Reconciler::execute`] applies a plan
//! in the fixed order Install → Delete → Relink(Beta) → Relink(Release) and
//! reports exactly which steps had already committed when one fails.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::UpdateError;
use crate::links::{AliasTool, PointerName};
use crate::paths::Paths;
use crate::plan::{PlanNote, PlannedAction, ReconciliationPlan};
use crate::versions::VersionRecord;
use crate::xcodes::{VersionManager, VersionSource};

/// Everything the planner looks at, captured once per run
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Newest available version, with its path when installed
    pub latest: VersionRecord,
    pub latest_installed: bool,
    /// Installed versions, oldest first
    pub installed: Vec<VersionRecord>,
    pub beta_target: Option<VersionRecord>,
    pub release_target: Option<VersionRecord>,
}

impl Snapshot {
    /// Position in the oldest-first order; a not-yet-installed `latest` ranks last
    pub fn age_rank(&self, version: &VersionRecord) -> usize {
        self.installed
            .iter()
            .position(|r| r.same_version(version))
            .unwrap_or(self.installed.len())
    }
}

/// Which phases to run
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanOptions {
    pub skip_delete: bool,
    pub links_only: bool,
}

/// Outcome of the deletion selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteDecision {
    /// No Beta pointer yet
    Deferred,
    NoCandidate,
    Retire(VersionRecord),
}

/// Plan the Install phase. Returns whether an install was planned.
pub fn plan_install(snapshot: &Snapshot, plan: &mut ReconciliationPlan) -> bool {
    if snapshot.latest_installed {
        plan.push_note(PlanNote::AlreadyInstalled(snapshot.latest.clone()));
        false
    } else {
        plan.push_action(PlannedAction::Install(snapshot.latest.clone()));
        true
    }
}

/// Pick the oldest installed version that may be retired.
///
/// Prereleases are always candidates. A release is only a candidate while the
/// Beta pointer itself sits on a release, i.e. a newer release is rotating in
/// to replace it. `latest` and a release-classified Beta target (about to be
/// promoted to Release) are never candidates.
pub fn plan_delete(snapshot: &Snapshot) -> DeleteDecision {
    let Some(beta) = &snapshot.beta_target else {
        return DeleteDecision::Deferred;
    };
    let releases_eligible = beta.kind.is_release();

    snapshot
        .installed
        .iter()
        .filter(|r| !r.same_version(&snapshot.latest))
        .filter(|r| !(r.kind.is_release() && r.same_version(beta)))
        .find(|r| !r.kind.is_release() || releases_eligible)
        .cloned()
        .map_or(DeleteDecision::NoCandidate, DeleteDecision::Retire)
}

/// Plan both relinks.
///
/// Beta always moves to `latest`. Release is derived from the Beta target as
/// it was before that move (the outgoing beta): it is promoted only when it
/// is a release, and used as a fallback when no Release pointer exists.
pub fn plan_relink(
    snapshot: &Snapshot,
    install_planned: bool,
    deleted: Option<&VersionRecord>,
    plan: &mut ReconciliationPlan,
) -> Result<(), UpdateError> {
    let latest = &snapshot.latest;
    if !snapshot.latest_installed && !install_planned {
        return Err(UpdateError::TargetNotInstalled {
            pointer: PointerName::Beta,
            identifier: latest.identifier.clone(),
        });
    }

    match &snapshot.beta_target {
        Some(current) if current.same_version(latest) => plan.push_note(PlanNote::PointerUnchanged {
            pointer: PointerName::Beta,
            target: current.clone(),
        }),
        _ => plan.push_action(PlannedAction::Relink {
            pointer: PointerName::Beta,
            target: latest.clone(),
        }),
    }

    let is_deleted = |v: &VersionRecord| deleted.is_some_and(|d| d.same_version(v));

    // Beta already on latest means nothing is rotating out
    let prior_beta = snapshot
        .beta_target
        .as_ref()
        .filter(|b| !b.same_version(latest));

    let current_release = match &snapshot.release_target {
        Some(target) if is_deleted(target) => {
            plan.push_note(PlanNote::ReleaseTargetRetired(target.clone()));
            None
        }
        other => other.as_ref(),
    };

    let new_release = match (current_release, prior_beta) {
        (Some(_), Some(prior)) if is_deleted(prior) => {
            plan.push_note(PlanNote::PriorBetaRemoved(prior.clone()));
            None
        }
        (Some(_), Some(prior)) if prior.kind.is_release() => Some(prior),
        (Some(_), Some(prior)) => {
            plan.push_note(PlanNote::ReleaseNotPromoted(prior.clone()));
            None
        }
        (Some(current), None) => {
            plan.push_note(PlanNote::PointerUnchanged {
                pointer: PointerName::Release,
                target: current.clone(),
            });
            None
        }
        (None, Some(prior)) if !is_deleted(prior) => Some(prior),
        (None, _) => Some(latest),
    };

    if let Some(target) = new_release {
        match current_release {
            Some(current) if current.same_version(target) => {
                plan.push_note(PlanNote::PointerUnchanged {
                    pointer: PointerName::Release,
                    target: current.clone(),
                })
            }
            _ => plan.push_action(PlannedAction::Relink {
                pointer: PointerName::Release,
                target: target.clone(),
            }),
        }
    }

    Ok(())
}

/// Build the full plan for a snapshot
pub fn build_plan(snapshot: &Snapshot, options: PlanOptions) -> Result<ReconciliationPlan, UpdateError> {
    let mut plan = ReconciliationPlan::default();

    let install_planned = if options.links_only {
        plan.push_note(PlanNote::InstallSkipped);
        false
    } else {
        plan_install(snapshot, &mut plan)
    };

    let deleted = if options.links_only || options.skip_delete {
        plan.push_note(PlanNote::DeleteSkipped);
        None
    } else if !install_planned {
        plan.push_note(PlanNote::NothingToRetire);
        None
    } else {
        match plan_delete(snapshot) {
            DeleteDecision::Deferred => {
                plan.push_note(PlanNote::DeleteDeferred);
                None
            }
            DeleteDecision::NoCandidate => {
                plan.push_note(PlanNote::NoDeleteCandidate);
                None
            }
            DeleteDecision::Retire(version) => {
                plan.push_action(PlannedAction::Delete(version.clone()));
                Some(version)
            }
        }
    };

    plan_relink(snapshot, install_planned, deleted.as_ref(), &mut plan)?;
    Ok(plan)
}

/// Captures snapshots and applies plans through the two collaborators
pub struct Reconciler<'a, M, A> {
    paths: &'a Paths,
    source: &'a VersionSource<M>,
    aliases: &'a A,
}

impl<'a, M: VersionManager, A: AliasTool> Reconciler<'a, M, A> {
    pub fn new(paths: &'a Paths, source: &'a VersionSource<M>, aliases: &'a A) -> Self {
        Self {
            paths,
            source,
            aliases,
        }
    }

    pub fn snapshot(&self) -> Result<Snapshot, UpdateError> {
        let (mut latest, listed_installed) = self.source.latest_version()?;
        let installed = self.source.installed_versions()?;

        if let Some(found) = installed.iter().find(|r| r.same_version(&latest)) {
            latest = found.clone();
        }
        let latest_installed = listed_installed || latest.is_installed();

        let beta_target = self.resolve_pointer(PointerName::Beta, &installed)?;
        let release_target = self.resolve_pointer(PointerName::Release, &installed)?;

        Ok(Snapshot {
            latest,
            latest_installed,
            installed,
            beta_target,
            release_target,
        })
    }

    /// Installed version behind a pointer; `None` when the link is missing or dangling
    pub fn resolve_pointer(
        &self,
        pointer: PointerName,
        installed: &[VersionRecord],
    ) -> Result<Option<VersionRecord>, UpdateError> {
        let Some(real) = self.aliases.resolve(self.paths.link_path(pointer)) else {
            return Ok(None);
        };

        installed
            .iter()
            .find(|r| {
                r.installed_path
                    .as_deref()
                    .and_then(|p| self.aliases.resolve(p))
                    .is_some_and(|p| p == real)
            })
            .cloned()
            .map(Some)
            .ok_or(UpdateError::ClassificationLookupFailed {
                pointer,
                path: real,
            })
    }

    /// Apply every action in order, calling `on_step` before each one.
    ///
    /// Returns the number of actions applied. A failure after at least one
    /// committed action is wrapped in [`UpdateError::PartialRun`].
    pub fn execute(
        &self,
        plan: &ReconciliationPlan,
        mut on_step: impl FnMut(&PlannedAction),
    ) -> Result<usize, UpdateError> {
        let mut committed: Vec<String> = Vec::new();
        let mut installed_paths: HashMap<String, PathBuf> = HashMap::new();

        for action in plan.actions() {
            on_step(action);
            if let Err(err) = self.apply(action, &mut installed_paths) {
                if committed.is_empty() {
                    return Err(err);
                }
                return Err(UpdateError::PartialRun {
                    failed: action.to_string(),
                    committed,
                    source: Box::new(err),
                });
            }
            committed.push(action.to_string());
        }

        Ok(committed.len())
    }

    fn apply(
        &self,
        action: &PlannedAction,
        installed_paths: &mut HashMap<String, PathBuf>,
    ) -> Result<(), UpdateError> {
        match action {
            PlannedAction::Install(version) => {
                self.source.manager().install(&version.identifier)?;
                let path = self
                    .source
                    .resolve_by_identifier(&version.identifier)?
                    .and_then(|r| r.installed_path)
                    .ok_or_else(|| UpdateError::InstallVerificationFailed {
                        identifier: version.identifier.clone(),
                    })?;
                installed_paths.insert(version.identifier.clone(), path);
                Ok(())
            }
            PlannedAction::Delete(version) => self.source.manager().uninstall(&version.identifier),
            PlannedAction::Relink { pointer, target } => {
                let known = target
                    .installed_path
                    .clone()
                    .or_else(|| installed_paths.get(&target.identifier).cloned());
                let path = match known {
                    Some(path) => Some(path),
                    None => self
                        .source
                        .resolve_by_identifier(&target.identifier)?
                        .and_then(|r| r.installed_path),
                };

                // never leave a pointer referencing a path that is gone
                let path = path.filter(|p| self.aliases.exists(p)).ok_or_else(|| {
                    UpdateError::TargetNotInstalled {
                        pointer: *pointer,
                        identifier: target.identifier.clone(),
                    }
                })?;

                self.aliases.create_alias(
                    &path,
                    self.paths.link_path(*pointer),
                    self.paths.alias_name(*pointer),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::SystemAliases;
    use crate::test_utils::{FakeManager, link, setup_test_paths};
    use crate::versions::VersionKind;
    use tempfile::TempDir;

    fn record(identifier: &str) -> VersionRecord {
        let mut r = VersionRecord::new(identifier);
        r.installed_path = Some(PathBuf::from(format!(
            "/Applications/Xcode-{}.app",
            identifier.replace(' ', "-")
        )));
        r
    }

    fn snapshot(
        installed: &[&str],
        latest: &str,
        beta: Option<&str>,
        release: Option<&str>,
    ) -> Snapshot {
        let installed: Vec<VersionRecord> = installed.iter().map(|id| record(id)).collect();
        let find = |id: &str| installed.iter().find(|r| r.identifier == id).cloned().unwrap();
        let latest_record = installed
            .iter()
            .find(|r| r.identifier == latest)
            .cloned()
            .unwrap_or_else(|| VersionRecord::new(latest));

        Snapshot {
            latest_installed: latest_record.is_installed(),
            latest: latest_record,
            beta_target: beta.map(find),
            release_target: release.map(find),
            installed,
        }
    }

    fn ids(plan: &ReconciliationPlan) -> Vec<String> {
        plan.actions().map(|a| a.to_string()).collect()
    }

    // -------------------------------------------------------------------------
    // Planning
    // -------------------------------------------------------------------------

    #[test]
    fn test_prerelease_beta_keeps_release_and_skips_promotion() {
        let snap = snapshot(
            &["14.0 Beta", "14.3", "15.0 Beta"],
            "15.1 Beta",
            Some("15.0 Beta"),
            Some("14.3"),
        );

        let plan = build_plan(&snap, PlanOptions::default()).unwrap();

        assert_eq!(plan.install().unwrap().identifier, "15.1 Beta");
        assert_eq!(plan.deletion().unwrap().identifier, "14.0 Beta");
        assert_eq!(plan.relink_target(PointerName::Beta).unwrap().identifier, "15.1 Beta");
        assert!(plan.relink_target(PointerName::Release).is_none());
        assert!(plan.notes().any(|n| matches!(n, PlanNote::ReleaseNotPromoted(v) if v.identifier == "15.0 Beta")));
    }

    #[test]
    fn test_release_rotation_retires_old_release() {
        let snap = snapshot(&["14.3", "15.0"], "15.1 Beta", Some("15.0"), Some("14.3"));

        let plan = build_plan(&snap, PlanOptions::default()).unwrap();

        assert_eq!(
            ids(&plan),
            vec![
                "Install Xcode 15.1 Beta",
                "Delete Xcode 14.3 to reclaim disk space",
                "Point Xcode-Beta at Xcode 15.1 Beta",
                "Point Xcode-Release at Xcode 15.0",
            ]
        );
    }

    #[test]
    fn test_delete_deferred_without_beta() {
        let snap = snapshot(&["14.3"], "15.0", None, Some("14.3"));
        assert_eq!(plan_delete(&snap), DeleteDecision::Deferred);

        let plan = build_plan(&snap, PlanOptions::default()).unwrap();
        assert!(plan.deletion().is_none());
        assert!(plan.notes().any(|n| *n == PlanNote::DeleteDeferred));
    }

    #[test]
    fn test_delete_no_candidate_when_beta_is_prerelease() {
        // 15.0 Beta is the only prerelease and also latest, 14.3 is protected
        let snap = snapshot(&["14.3", "15.0 Beta"], "15.0 Beta", Some("15.0 Beta"), Some("14.3"));
        assert_eq!(plan_delete(&snap), DeleteDecision::NoCandidate);

        // the same set with a newer build coming in frees 15.0 Beta
        let snap = snapshot(&["14.3", "15.0 Beta"], "15.1 Beta", Some("15.0 Beta"), Some("14.3"));
        assert_eq!(plan_delete(&snap), DeleteDecision::Retire(record("15.0 Beta")));
    }

    #[test]
    fn test_deleting_prior_beta_skips_release_update() {
        let snap = snapshot(&["14.3", "15.0 Beta"], "15.1 Beta", Some("15.0 Beta"), Some("14.3"));

        let plan = build_plan(&snap, PlanOptions::default()).unwrap();

        assert_eq!(plan.deletion().unwrap().identifier, "15.0 Beta");
        assert!(plan.relink_target(PointerName::Release).is_none());
        assert!(plan.notes().any(|n| matches!(n, PlanNote::PriorBetaRemoved(_))));
    }

    #[test]
    fn test_retired_release_target_falls_back_to_latest() {
        // both pointers on the only prerelease, which gets retired
        let snap = snapshot(&["15.0 Beta"], "15.1 Beta", Some("15.0 Beta"), Some("15.0 Beta"));

        let plan = build_plan(&snap, PlanOptions::default()).unwrap();

        assert_eq!(plan.deletion().unwrap().identifier, "15.0 Beta");
        assert_eq!(plan.relink_target(PointerName::Release).unwrap().identifier, "15.1 Beta");
        assert!(plan.notes().any(|n| matches!(n, PlanNote::ReleaseTargetRetired(_))));
    }

    #[test]
    fn test_missing_release_uses_prior_beta() {
        let snap = snapshot(&["15.0 Beta"], "15.1 Beta", Some("15.0 Beta"), None);
        let plan = build_plan(&snap, PlanOptions { skip_delete: true, links_only: false }).unwrap();

        assert_eq!(plan.relink_target(PointerName::Release).unwrap().identifier, "15.0 Beta");
        assert!(plan.notes().any(|n| *n == PlanNote::DeleteSkipped));
    }

    #[test]
    fn test_first_run_points_both_at_latest() {
        let snap = snapshot(&["15.0"], "15.0", None, None);

        let plan = build_plan(&snap, PlanOptions::default()).unwrap();

        assert!(plan.install().is_none());
        assert!(plan.deletion().is_none());
        assert_eq!(plan.relink_target(PointerName::Beta).unwrap().identifier, "15.0");
        assert_eq!(plan.relink_target(PointerName::Release).unwrap().identifier, "15.0");
    }

    #[test]
    fn test_consistent_state_is_noop() {
        let snap = snapshot(&["14.3", "15.0"], "15.0", Some("15.0"), Some("14.3"));

        let plan = build_plan(&snap, PlanOptions::default()).unwrap();

        assert!(plan.is_noop());
        assert!(plan.notes().any(|n| matches!(n, PlanNote::AlreadyInstalled(_))));
        assert!(plan.notes().any(|n| *n == PlanNote::NothingToRetire));
    }

    #[test]
    fn test_links_only_never_installs_or_deletes() {
        let snap = snapshot(&["14.3", "15.0"], "15.0", Some("14.3"), Some("14.3"));

        let plan = build_plan(&snap, PlanOptions { skip_delete: false, links_only: true }).unwrap();

        assert!(plan.install().is_none());
        assert!(plan.deletion().is_none());
        assert_eq!(plan.relink_target(PointerName::Beta).unwrap().identifier, "15.0");
    }

    #[test]
    fn test_links_only_requires_installed_latest() {
        let snap = snapshot(&["14.3"], "15.0", Some("14.3"), Some("14.3"));

        let err = build_plan(&snap, PlanOptions { skip_delete: false, links_only: true }).unwrap_err();
        assert!(matches!(
            err,
            UpdateError::TargetNotInstalled { pointer: PointerName::Beta, .. }
        ));
    }

    /// Every installed set of up to four builds, every pointer placement
    fn all_snapshots() -> Vec<Snapshot> {
        let kinds = [VersionKind::Release, VersionKind::Beta, VersionKind::ReleaseCandidate];
        let suffix = |k: VersionKind| match k {
            VersionKind::Release => "",
            VersionKind::Beta => " Beta",
            VersionKind::ReleaseCandidate => " RC",
        };

        let mut out = Vec::new();
        for len in 1..=4usize {
            for combo in 0..kinds.len().pow(len as u32) {
                let mut n = combo;
                let names: Vec<String> = (0..len)
                    .map(|i| {
                        let kind = kinds[n % 3];
                        n /= 3;
                        format!("{}.0{}", 10 + i, suffix(kind))
                    })
                    .collect();
                let names: Vec<&str> = names.iter().map(String::as_str).collect();

                let pointer_choices: Vec<Option<&str>> =
                    std::iter::once(None).chain(names.iter().copied().map(Some)).collect();

                for latest in [names[len - 1].to_string(), "99.0 Beta".to_string()] {
                    for beta in &pointer_choices {
                        for release in &pointer_choices {
                            out.push(snapshot(&names, &latest, *beta, *release));
                        }
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_delete_selection_properties() {
        for snap in all_snapshots() {
            let decision = plan_delete(&snap);
            let Some(beta) = &snap.beta_target else {
                assert_eq!(decision, DeleteDecision::Deferred);
                continue;
            };

            let oldest = snap.installed.first().unwrap();
            if beta.kind.is_release() {
                if !oldest.same_version(beta) && !oldest.same_version(&snap.latest) {
                    assert_eq!(decision, DeleteDecision::Retire(oldest.clone()), "{snap:?}");
                }
            } else {
                let expected = snap
                    .installed
                    .iter()
                    .find(|r| !r.kind.is_release() && !r.same_version(&snap.latest));
                match (decision, expected) {
                    (DeleteDecision::Retire(v), Some(e)) => assert_eq!(&v, e),
                    (DeleteDecision::NoCandidate, None) => {}
                    (d, e) => panic!("got {d:?}, expected {e:?} for {snap:?}"),
                }
            }
        }
    }

    #[test]
    fn test_release_never_newer_than_beta() {
        for snap in all_snapshots() {
            let Ok(plan) = build_plan(&snap, PlanOptions::default()) else {
                continue;
            };

            let beta = plan
                .relink_target(PointerName::Beta)
                .or(snap.beta_target.as_ref())
                .unwrap();
            let release = plan
                .relink_target(PointerName::Release)
                .or(snap.release_target.as_ref())
                .unwrap();

            assert!(snap.age_rank(release) <= snap.age_rank(beta), "{snap:?}");

            // no pointer ends up on the build being deleted
            if let Some(deleted) = plan.deletion() {
                assert!(!beta.same_version(deleted), "{snap:?}");
                assert!(!release.same_version(deleted), "{snap:?}");
            }
        }
    }

    // -------------------------------------------------------------------------
    // Execution
    // -------------------------------------------------------------------------

    fn fixture() -> (TempDir, Paths, VersionSource<FakeManager>, SystemAliases) {
        let temp_dir = TempDir::new().unwrap();
        let paths = setup_test_paths(&temp_dir);
        let source = VersionSource::new(FakeManager::new(&paths)).excluding(paths.pointer_links());
        (temp_dir, paths, source, SystemAliases::new(false))
    }

    #[test]
    fn test_execute_full_cycle_then_idempotent() {
        let (_temp_dir, paths, source, aliases) = fixture();
        let fake = source.manager();
        fake.preinstall("14.0 Beta");
        let release = fake.preinstall("14.3");
        let beta = fake.preinstall("15.0 Beta");
        fake.set_available(&["14.0 Beta", "14.3", "15.0 Beta", "15.1 Beta"]);
        link(&paths.beta_link, &beta);
        link(&paths.release_link, &release);

        let reconciler = Reconciler::new(&paths, &source, &aliases);
        let snap = reconciler.snapshot().unwrap();
        assert_eq!(snap.beta_target.as_ref().unwrap().identifier, "15.0 Beta");
        assert_eq!(snap.release_target.as_ref().unwrap().identifier, "14.3");

        let plan = build_plan(&snap, PlanOptions::default()).unwrap();
        let mut seen = Vec::new();
        let applied = reconciler.execute(&plan, |a| seen.push(a.to_string())).unwrap();

        assert_eq!(applied, 3);
        assert_eq!(seen.len(), 3);
        assert_eq!(fake.calls(), vec!["install 15.1 Beta", "uninstall 14.0 Beta"]);
        assert_eq!(aliases.resolve(&paths.beta_link), aliases.resolve(&fake.bundle_path("15.1 Beta")));
        assert_eq!(aliases.resolve(&paths.release_link), aliases.resolve(&release));

        // second run with no external change
        let snap = reconciler.snapshot().unwrap();
        let plan = build_plan(&snap, PlanOptions::default()).unwrap();
        assert!(plan.is_noop());
        assert_eq!(reconciler.execute(&plan, |_| {}).unwrap(), 0);
        assert_eq!(fake.calls().len(), 2);
    }

    #[test]
    fn test_execute_first_run() {
        let (_temp_dir, paths, source, aliases) = fixture();
        let fake = source.manager();
        let only = fake.preinstall("15.0");
        fake.set_available(&["15.0"]);

        let reconciler = Reconciler::new(&paths, &source, &aliases);
        let plan = build_plan(&reconciler.snapshot().unwrap(), PlanOptions::default()).unwrap();
        reconciler.execute(&plan, |_| {}).unwrap();

        let expected = aliases.resolve(&only);
        assert_eq!(aliases.resolve(&paths.beta_link), expected);
        assert_eq!(aliases.resolve(&paths.release_link), expected);
        assert!(fake.calls().is_empty());
    }

    #[test]
    fn test_execute_links_only_makes_no_tool_calls() {
        let (_temp_dir, paths, source, aliases) = fixture();
        let fake = source.manager();
        let old = fake.preinstall("14.3");
        let new = fake.preinstall("15.0");
        fake.set_available(&["14.3", "15.0"]);
        link(&paths.beta_link, &old);
        link(&paths.release_link, &old);

        let reconciler = Reconciler::new(&paths, &source, &aliases);
        let options = PlanOptions { skip_delete: false, links_only: true };
        let plan = build_plan(&reconciler.snapshot().unwrap(), options).unwrap();
        reconciler.execute(&plan, |_| {}).unwrap();

        assert!(fake.calls().is_empty());
        assert_eq!(aliases.resolve(&paths.beta_link), aliases.resolve(&new));
        assert_eq!(aliases.resolve(&paths.release_link), aliases.resolve(&old));
    }

    #[test]
    fn test_install_verification_failure() {
        let (_temp_dir, paths, source, aliases) = fixture();
        let fake = source.manager();
        fake.preinstall("15.0");
        fake.set_available(&["15.0", "15.1"]);
        fake.lose_installs.set(true);

        let reconciler = Reconciler::new(&paths, &source, &aliases);
        let plan = build_plan(&reconciler.snapshot().unwrap(), PlanOptions::default()).unwrap();
        let err = reconciler.execute(&plan, |_| {}).unwrap_err();

        assert!(matches!(err, UpdateError::InstallVerificationFailed { ref identifier } if identifier == "15.1"));
        assert!(!paths.beta_link.exists());
    }

    #[test]
    fn test_failure_after_commit_reports_partial_run() {
        let (_temp_dir, paths, source, aliases) = fixture();
        let fake = source.manager();
        fake.preinstall("14.0 Beta");
        let beta = fake.preinstall("15.0 Beta");
        fake.set_available(&["14.0 Beta", "15.0 Beta", "15.1 Beta"]);
        link(&paths.beta_link, &beta);
        fake.fail_uninstall.set(true);

        let reconciler = Reconciler::new(&paths, &source, &aliases);
        let plan = build_plan(&reconciler.snapshot().unwrap(), PlanOptions::default()).unwrap();
        let err = reconciler.execute(&plan, |_| {}).unwrap_err();

        match err {
            UpdateError::PartialRun { failed, committed, source } => {
                assert_eq!(failed, "Delete Xcode 14.0 Beta to reclaim disk space");
                assert_eq!(committed, vec!["Install Xcode 15.1 Beta"]);
                assert!(matches!(*source, UpdateError::ToolFailed { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Relink never ran
        assert_eq!(aliases.resolve(&paths.beta_link), aliases.resolve(&beta));
    }

    #[test]
    fn test_unknown_link_target_is_fatal() {
        let (temp_dir, paths, source, aliases) = fixture();
        let fake = source.manager();
        fake.preinstall("15.0");
        fake.set_available(&["15.0"]);
        let stray = temp_dir.path().join("Xcode-Custom.app");
        std::fs::create_dir_all(&stray).unwrap();
        link(&paths.release_link, &stray);

        let reconciler = Reconciler::new(&paths, &source, &aliases);
        let err = reconciler.snapshot().unwrap_err();
        assert!(matches!(
            err,
            UpdateError::ClassificationLookupFailed { pointer: PointerName::Release, .. }
        ));
    }

    #[test]
    fn test_dangling_link_counts_as_absent() {
        let (temp_dir, paths, source, aliases) = fixture();
        let fake = source.manager();
        fake.preinstall("15.0");
        fake.set_available(&["15.0"]);
        let gone = temp_dir.path().join("Xcode-14.3.app");
        std::fs::create_dir_all(&gone).unwrap();
        link(&paths.release_link, &gone);
        std::fs::remove_dir(&gone).unwrap();

        let reconciler = Reconciler::new(&paths, &source, &aliases);
        let snap = reconciler.snapshot().unwrap();
        assert!(snap.release_target.is_none());
    }

    #[test]
    fn test_relink_refuses_vanished_target() {
        let (_temp_dir, paths, source, aliases) = fixture();
        let fake = source.manager();
        let old = fake.preinstall("14.3");
        let new = fake.preinstall("15.0");
        fake.set_available(&["14.3", "15.0"]);
        link(&paths.beta_link, &old);
        link(&paths.release_link, &old);

        let reconciler = Reconciler::new(&paths, &source, &aliases);
        let plan = build_plan(&reconciler.snapshot().unwrap(), PlanOptions::default()).unwrap();
        assert_eq!(ids(&plan), vec!["Point Xcode-Beta at Xcode 15.0"]);

        // removed behind our back after planning
        std::fs::remove_dir_all(&new).unwrap();

        let err = reconciler.execute(&plan, |_| {}).unwrap_err();
        assert!(matches!(
            err,
            UpdateError::TargetNotInstalled { pointer: PointerName::Beta, ref identifier } if identifier == "15.0"
        ));
        assert_eq!(aliases.resolve(&paths.beta_link), aliases.resolve(&old));
        assert_eq!(aliases.resolve(&paths.release_link), aliases.resolve(&old));
    }
}
