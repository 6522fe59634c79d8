//! Errors - エラー型と分類
//!
//! store / engine のエラーは ports 側で定義し、ここでは reconcile 1 回分の
//! 失敗を ErrorKind に分類します。ErrorKind が retry 方針（Decider）を決めます。

use std::fmt;

use serde::{Deserialize, Serialize};

use super::key::ReleaseKey;
use crate::ports::{EngineError, StoreError};

/// Operational classification of a failed reconcile.
///
/// - TransientApi: store が一時的に使えない（backoff 付き再試行）
/// - ReleaseEngine: upgrade → install の両方が失敗（backoff 付き再試行）
/// - StatusConflict: status 書き込みが楽観ロックで負けた（即時再試行）
/// - Cancelled: shutdown による中断（再試行しない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    TransientApi,
    ReleaseEngine,
    StatusConflict,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::TransientApi => "TransientAPIError",
            ErrorKind::ReleaseEngine => "ReleaseEngineError",
            ErrorKind::StatusConflict => "StatusConflictError",
            ErrorKind::Cancelled => "Cancelled",
        }
    }

    /// Whether the dispatcher should wait before retrying.
    pub fn wants_backoff(self) -> bool {
        matches!(self, ErrorKind::TransientApi | ErrorKind::ReleaseEngine)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single reconcile attempt.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("failed to fetch {key}: {source}")]
    Fetch {
        key: ReleaseKey,
        #[source]
        source: StoreError,
    },

    #[error("release engine could not converge {key}: {source}")]
    Release {
        key: ReleaseKey,
        #[source]
        source: EngineError,
    },

    #[error("status update of {key} lost a concurrent write: {source}")]
    StatusConflict {
        key: ReleaseKey,
        #[source]
        source: StoreError,
    },

    #[error("failed to update status of {key}: {source}")]
    StatusUpdate {
        key: ReleaseKey,
        #[source]
        source: StoreError,
    },

    #[error("reconcile of {key} cancelled")]
    Cancelled { key: ReleaseKey },
}

impl ReconcileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconcileError::Fetch { .. } | ReconcileError::StatusUpdate { .. } => {
                ErrorKind::TransientApi
            }
            ReconcileError::Release { .. } => ErrorKind::ReleaseEngine,
            ReconcileError::StatusConflict { .. } => ErrorKind::StatusConflict,
            ReconcileError::Cancelled { .. } => ErrorKind::Cancelled,
        }
    }

    pub fn key(&self) -> &ReleaseKey {
        match self {
            ReconcileError::Fetch { key, .. }
            | ReconcileError::Release { key, .. }
            | ReconcileError::StatusConflict { key, .. }
            | ReconcileError::StatusUpdate { key, .. }
            | ReconcileError::Cancelled { key } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceVersion;

    fn key() -> ReleaseKey {
        ReleaseKey::new("ns1", "demo")
    }

    #[test]
    fn classifies_store_failures_as_transient() {
        let err = ReconcileError::Fetch {
            key: key(),
            source: StoreError::Unavailable("connection refused".into()),
        };
        assert_eq!(err.kind(), ErrorKind::TransientApi);
        assert!(err.kind().wants_backoff());
        assert!(err.to_string().contains("ns1/demo"));
    }

    #[test]
    fn conflict_requeues_without_backoff() {
        let err = ReconcileError::StatusConflict {
            key: key(),
            source: StoreError::Conflict {
                key: key(),
                expected: ResourceVersion::new("7"),
            },
        };
        assert_eq!(err.kind(), ErrorKind::StatusConflict);
        assert!(!err.kind().wants_backoff());
    }

    #[test]
    fn kind_names_match_operator_vocabulary() {
        assert_eq!(ErrorKind::TransientApi.to_string(), "TransientAPIError");
        assert_eq!(ErrorKind::ReleaseEngine.to_string(), "ReleaseEngineError");
        assert_eq!(ErrorKind::StatusConflict.to_string(), "StatusConflictError");
    }
}
