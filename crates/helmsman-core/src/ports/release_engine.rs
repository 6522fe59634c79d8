//! ReleaseEngine port - packaged application の install / upgrade
//!
//! # 実装
//! - **InMemoryReleaseEngine**（impls）: テスト用
//! - **HelmCliEngine**（`helmsman-helm`）: `helm` CLI
//!
//! Engine 自身が同一入力に対して冪等であることを前提にします。

use async_trait::async_trait;

use crate::domain::{ReleaseHandle, ReleaseKey, UpgradeResult, ValueMapping};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("release {key} failed: {reason}")]
    Failed { key: ReleaseKey, reason: String },

    #[error("release engine unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ReleaseEngine: Send + Sync {
    /// Create the release for `key`.
    async fn install(
        &self,
        key: &ReleaseKey,
        values: &ValueMapping,
    ) -> Result<ReleaseHandle, EngineError>;

    /// Upgrade the existing release for `key`.
    async fn upgrade(&self, key: &ReleaseKey, values: &ValueMapping) -> UpgradeResult;
}
