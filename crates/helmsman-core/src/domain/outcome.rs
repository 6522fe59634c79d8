//! Outcome of a successful reconcile.

use super::release::ReleaseHandle;
use super::status::{ObservedStatus, Phase};

/// What a successful reconcile did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The object does not exist (or vanished before its status could be
    /// written). Nothing was done.
    Absent,

    /// The release matches the spec and the status was persisted.
    Converged {
        status: ObservedStatus,
        handle: ReleaseHandle,
    },
}

impl ReconcileOutcome {
    pub fn phase(&self) -> Option<Phase> {
        match self {
            ReconcileOutcome::Absent => None,
            ReconcileOutcome::Converged { status, .. } => Some(status.phase),
        }
    }

    pub fn status(&self) -> Option<&ObservedStatus> {
        match self {
            ReconcileOutcome::Absent => None,
            ReconcileOutcome::Converged { status, .. } => Some(status),
        }
    }
}
