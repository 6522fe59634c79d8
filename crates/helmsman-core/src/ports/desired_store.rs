//! DesiredStateStore port - desired-state オブジェクトの正本
//!
//! # 実装
//! - **InMemoryDesiredStateStore**（impls）: テスト・デモ用
//! - **KubeDesiredStateStore**（`helmsman-kube`）: Kubernetes API
//!
//! # 設計原則
//! - core は status subresource だけを書く（spec・作成・削除はしない）
//! - status 書き込みは楽観ロック（resource version の check-and-set）
//! - reconcile の途中でロックは取らない

use async_trait::async_trait;

use crate::domain::{DesiredState, GroupVersionKind, ObservedStatus, ReleaseKey, ResourceVersion};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(ReleaseKey),

    #[error("resource version {expected} of {key} is stale")]
    Conflict {
        key: ReleaseKey,
        expected: ResourceVersion,
    },

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("malformed object {key}: {reason}")]
    Malformed { key: ReleaseKey, reason: String },
}

/// Capability set the reconciler needs from the store: get and status update.
#[async_trait]
pub trait DesiredStateStore: Send + Sync {
    /// Kind of object this store serves.
    fn kind(&self) -> GroupVersionKind;

    /// Fetch the object for `key`. Absence is `StoreError::NotFound`.
    async fn get(&self, key: &ReleaseKey) -> Result<DesiredState, StoreError>;

    /// Replace the status subresource if the object is still at `expected`.
    ///
    /// Returns the new resource version. Fails with `StoreError::Conflict`
    /// instead of overwriting when the object changed since it was read.
    async fn update_status(
        &self,
        key: &ReleaseKey,
        expected: &ResourceVersion,
        status: &ObservedStatus,
    ) -> Result<ResourceVersion, StoreError>;
}
