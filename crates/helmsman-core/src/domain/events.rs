//! Events - reconcile の結果として発行されるイベント
//!
//! status には失敗を書かないため、失敗はここ（EventSink）と
//! reconcile の戻り値でのみ観測できます。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::{ErrorKind, ReconcileError};
use super::ids::ReconcileId;
use super::key::ReleaseKey;
use super::outcome::ReconcileOutcome;
use super::status::ObservedStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReconcileEventKind {
    Converged { status: ObservedStatus, revision: u32 },
    Absent,
    Failed { error_kind: ErrorKind, message: String },
}

/// One finished reconcile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileEvent {
    pub reconcile_id: ReconcileId,
    pub key: ReleaseKey,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: ReconcileEventKind,
}

impl ReconcileEvent {
    pub fn from_result(
        reconcile_id: ReconcileId,
        key: ReleaseKey,
        at: DateTime<Utc>,
        result: &Result<ReconcileOutcome, ReconcileError>,
    ) -> Self {
        let kind = match result {
            Ok(ReconcileOutcome::Absent) => ReconcileEventKind::Absent,
            Ok(ReconcileOutcome::Converged { status, handle }) => ReconcileEventKind::Converged {
                status: status.clone(),
                revision: handle.revision,
            },
            Err(err) => ReconcileEventKind::Failed {
                error_kind: err.kind(),
                message: err.to_string(),
            },
        };
        Self {
            reconcile_id,
            key,
            at,
            kind,
        }
    }
}
