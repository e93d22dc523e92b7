//! Reconciliation plans.
//!
//! A plan is an ordered list of steps: the actions that will change the
//! system, interleaved with notes explaining the phases that decided to do
//! nothing. Building a plan never touches the system.

use std::fmt;

use crate::links::PointerName;
use crate::versions::VersionRecord;

/// A change to apply, in plan order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedAction {
    Install(VersionRecord),
    Delete(VersionRecord),
    Relink {
        pointer: PointerName,
        target: VersionRecord,
    },
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Install(version) => write!(f, "Install {}", version),
            Self::Delete(version) => write!(f, "Delete {} to reclaim disk space", version),
            Self::Relink { pointer, target } => write!(f, "Point {} at {}", pointer, target),
        }
    }
}

/// Why a phase produced no action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNote {
    AlreadyInstalled(VersionRecord),
    InstallSkipped,
    DeleteSkipped,
    NothingToRetire,
    DeleteDeferred,
    NoDeleteCandidate,
    PointerUnchanged {
        pointer: PointerName,
        target: VersionRecord,
    },
    ReleaseNotPromoted(VersionRecord),
    PriorBetaRemoved(VersionRecord),
    ReleaseTargetRetired(VersionRecord),
}

impl fmt::Display for PlanNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyInstalled(v) => write!(f, "{} is already installed", v),
            Self::InstallSkipped => f.write_str("Installing is skipped (links only)"),
            Self::DeleteSkipped => f.write_str("Deleting old versions is skipped"),
            Self::NothingToRetire => {
                f.write_str("No new version is being installed, so nothing is retired")
            }
            Self::DeleteDeferred => f.write_str(
                "No Xcode-Beta link exists yet, so deleting old versions is deferred",
            ),
            Self::NoDeleteCandidate => f.write_str("No installed version can safely be deleted"),
            Self::PointerUnchanged { pointer, target } => {
                write!(f, "{} already points at {}", pointer, target)
            }
            Self::ReleaseNotPromoted(v) => write!(
                f,
                "Xcode-Release is left as is: the outgoing beta {} is a {}",
                v, v.kind
            ),
            Self::PriorBetaRemoved(v) => write!(
                f,
                "Xcode-Release is left as is: the outgoing beta {} is being deleted",
                v
            ),
            Self::ReleaseTargetRetired(v) => {
                write!(f, "Xcode-Release currently points at {}, which is being deleted", v)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanStep {
    Action(PlannedAction),
    Note(PlanNote),
}

/// Ordered Install → Delete → Relink(Beta) → Relink(Release) steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    steps: Vec<PlanStep>,
}

impl ReconciliationPlan {
    pub fn push_action(&mut self, action: PlannedAction) {
        self.steps.push(PlanStep::Action(action));
    }

    pub fn push_note(&mut self, note: PlanNote) {
        self.steps.push(PlanStep::Note(note));
    }

    pub fn steps(&self) -> &[PlanStep] {
        &self.steps
    }

    pub fn actions(&self) -> impl Iterator<Item = &PlannedAction> {
        self.steps.iter().filter_map(|s| match s {
            PlanStep::Action(a) => Some(a),
            PlanStep::Note(_) => None,
        })
    }

    pub fn notes(&self) -> impl Iterator<Item = &PlanNote> {
        self.steps.iter().filter_map(|s| match s {
            PlanStep::Note(n) => Some(n),
            PlanStep::Action(_) => None,
        })
    }

    /// The terminal "nothing to do" state
    pub fn is_noop(&self) -> bool {
        self.actions().next().is_none()
    }

    pub fn install(&self) -> Option<&VersionRecord> {
        self.actions().find_map(|a| match a {
            PlannedAction::Install(v) => Some(v),
            _ => None,
        })
    }

    pub fn deletion(&self) -> Option<&VersionRecord> {
        self.actions().find_map(|a| match a {
            PlannedAction::Delete(v) => Some(v),
            _ => None,
        })
    }

    pub fn relink_target(&self, pointer: PointerName) -> Option<&VersionRecord> {
        self.actions().find_map(|a| match a {
            PlannedAction::Relink { pointer: p, target } if *p == pointer => Some(target),
            _ => None,
        })
    }
}
