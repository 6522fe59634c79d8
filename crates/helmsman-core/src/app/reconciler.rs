//! Reconciler - desired state への収束手続き
//!
//! # フロー
//! 1. DesiredStateStore::get() で desired state を取得（NotFound は何もしない）
//! 2. map_values() で values を作る
//! 3. ReleaseEngine::upgrade() → 失敗なら install()
//! 4. frontend URL を導出
//! 5. DesiredStateStore::update_status()（楽観ロック）
//!
//! Reconciler は呼び出し間で状態を持ちません。同じ key の並行実行は
//! dispatcher が防ぎ、status の上書き競合は resource version が防ぎます。

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::shutdown::Shutdown;
use crate::domain::{
    ObservedStatus, Phase, ReconcileError, ReconcileOutcome, ReleaseHandle, ReleaseKey,
    UpgradeResult, ValueMapping, map_values,
};
use crate::ports::{DesiredStateStore, ReleaseEngine, StoreError};

pub struct Reconciler {
    store: Arc<dyn DesiredStateStore>,
    engine: Arc<dyn ReleaseEngine>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn DesiredStateStore>, engine: Arc<dyn ReleaseEngine>) -> Self {
        Self { store, engine }
    }

    /// Converge the release for `key` toward its desired state.
    ///
    /// Every external call is abandoned as soon as `shutdown` fires.
    pub async fn reconcile(
        &self,
        key: &ReleaseKey,
        shutdown: &Shutdown,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let desired = match shutdown.guard(key, self.store.get(key)).await? {
            Ok(desired) => desired,
            Err(StoreError::NotFound(_)) => {
                debug!(%key, "desired state not found; nothing to do");
                return Ok(ReconcileOutcome::Absent);
            }
            Err(source @ StoreError::Malformed { .. }) => {
                // API server は生きている。オブジェクトが直るまで backoff で再試行
                warn!(%key, error = %source, "desired state is malformed");
                return Err(ReconcileError::Fetch {
                    key: key.clone(),
                    source,
                });
            }
            Err(source) => {
                return Err(ReconcileError::Fetch {
                    key: key.clone(),
                    source,
                });
            }
        };

        let values = map_values(&desired.spec);
        let (phase, handle) = self.converge(key, &values, shutdown).await?;

        let status = ObservedStatus::converged(phase, key.frontend_url(), desired.generation);
        let write = self
            .store
            .update_status(key, &desired.resource_version, &status);
        match shutdown.guard(key, write).await? {
            Ok(resource_version) => {
                debug!(%key, %resource_version, %phase, "status persisted");
            }
            Err(StoreError::NotFound(_)) => {
                // spec を読んだ後に削除された。次の通知を待つ
                info!(%key, "desired state deleted during reconcile; status not written");
                return Ok(ReconcileOutcome::Absent);
            }
            Err(source @ StoreError::Conflict { .. }) => {
                return Err(ReconcileError::StatusConflict {
                    key: key.clone(),
                    source,
                });
            }
            Err(source) => {
                return Err(ReconcileError::StatusUpdate {
                    key: key.clone(),
                    source,
                });
            }
        }

        Ok(ReconcileOutcome::Converged { status, handle })
    }

    /// Upgrade first; install when the upgrade did not go through.
    async fn converge(
        &self,
        key: &ReleaseKey,
        values: &ValueMapping,
        shutdown: &Shutdown,
    ) -> Result<(Phase, ReleaseHandle), ReconcileError> {
        match shutdown.guard(key, self.engine.upgrade(key, values)).await? {
            UpgradeResult::Upgraded(handle) => {
                info!(%key, revision = handle.revision, "release upgraded");
                return Ok((Phase::Upgraded, handle));
            }
            UpgradeResult::NotExists => {
                debug!(%key, "no existing release; installing");
            }
            UpgradeResult::Failed(reason) => {
                warn!(%key, %reason, "upgrade failed; falling back to install");
            }
        }

        let handle = shutdown
            .guard(key, self.engine.install(key, values))
            .await?
            .map_err(|source| ReconcileError::Release {
                key: key.clone(),
                source,
            })?;
        info!(%key, revision = handle.revision, "release installed");
        Ok((Phase::Installed, handle))
    }
}
