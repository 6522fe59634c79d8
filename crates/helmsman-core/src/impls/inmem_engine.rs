//! InMemoryReleaseEngine - テスト用の release engine
//!
//! # 実装詳細
//! - release は HashMap<ReleaseKey, ReleaseRecord>（revision は 1 から）
//! - 呼び出し履歴（EngineCall）を記録
//! - 同一 key の同時実行数の最大値を記録（single-flight の検証用）
//! - latency を設定すると各呼び出しがその間 sleep する
//!
//! install は既存 release があると失敗します（helm と同じ挙動）。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ReleaseHandle, ReleaseKey, UpgradeResult, ValueMapping};
use crate::ports::{EngineError, ReleaseEngine};

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCall {
    pub op: &'static str,
    pub key: ReleaseKey,
    pub values: ValueMapping,
}

#[derive(Debug, Clone)]
struct ReleaseRecord {
    revision: u32,
    values: ValueMapping,
}

#[derive(Default)]
struct EngineState {
    releases: HashMap<ReleaseKey, ReleaseRecord>,
    calls: Vec<EngineCall>,
    install_failure: Option<String>,
    upgrade_failure: Option<String>,
    in_flight: HashMap<ReleaseKey, u32>,
    max_in_flight_per_key: u32,
}

pub struct InMemoryReleaseEngine {
    state: Mutex<EngineState>,
    latency: Duration,
}

impl InMemoryReleaseEngine {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            state: Mutex::new(EngineState::default()),
            latency,
        }
    }

    /// Make every install fail with `reason` until `clear_failures`.
    pub async fn fail_installs(&self, reason: impl Into<String>) {
        self.state.lock().await.install_failure = Some(reason.into());
    }

    /// Make every upgrade of an existing release report `Failed(reason)`.
    pub async fn fail_upgrades(&self, reason: impl Into<String>) {
        self.state.lock().await.upgrade_failure = Some(reason.into());
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.install_failure = None;
        state.upgrade_failure = None;
    }

    pub async fn revision(&self, key: &ReleaseKey) -> Option<u32> {
        self.state.lock().await.releases.get(key).map(|r| r.revision)
    }

    /// Values of the current revision.
    pub async fn values(&self, key: &ReleaseKey) -> Option<ValueMapping> {
        self.state
            .lock()
            .await
            .releases
            .get(key)
            .map(|r| r.values.clone())
    }

    pub async fn release_count(&self) -> usize {
        self.state.lock().await.releases.len()
    }

    pub async fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().await.calls.clone()
    }

    /// Highest number of overlapping calls seen for any single key.
    pub async fn max_concurrent_per_key(&self) -> u32 {
        self.state.lock().await.max_in_flight_per_key
    }

    async fn enter(&self, op: &'static str, key: &ReleaseKey, values: &ValueMapping) {
        let mut state = self.state.lock().await;
        state.calls.push(EngineCall {
            op,
            key: key.clone(),
            values: values.clone(),
        });
        let per_key = {
            let count = state.in_flight.entry(key.clone()).or_insert(0);
            *count += 1;
            *count
        };
        state.max_in_flight_per_key = state.max_in_flight_per_key.max(per_key);
    }

    async fn exit(&self, key: &ReleaseKey) {
        let mut state = self.state.lock().await;
        if let Some(count) = state.in_flight.get_mut(key) {
            *count = count.saturating_sub(1);
        }
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

impl Default for InMemoryReleaseEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReleaseEngine for InMemoryReleaseEngine {
    async fn install(
        &self,
        key: &ReleaseKey,
        values: &ValueMapping,
    ) -> Result<ReleaseHandle, EngineError> {
        self.enter("install", key, values).await;
        self.simulate_latency().await;

        let result = {
            let mut state = self.state.lock().await;
            if let Some(reason) = state.install_failure.clone() {
                Err(EngineError::Failed {
                    key: key.clone(),
                    reason,
                })
            } else if state.releases.contains_key(key) {
                Err(EngineError::Failed {
                    key: key.clone(),
                    reason: "cannot re-use a name that is still in use".to_string(),
                })
            } else {
                state.releases.insert(
                    key.clone(),
                    ReleaseRecord {
                        revision: 1,
                        values: values.clone(),
                    },
                );
                Ok(ReleaseHandle::new(key.clone(), 1))
            }
        };

        self.exit(key).await;
        result
    }

    async fn upgrade(&self, key: &ReleaseKey, values: &ValueMapping) -> UpgradeResult {
        self.enter("upgrade", key, values).await;
        self.simulate_latency().await;

        let result = {
            let mut state = self.state.lock().await;
            let failure = state.upgrade_failure.clone();
            match (state.releases.get_mut(key), failure) {
                (None, _) => UpgradeResult::NotExists,
                (Some(_), Some(reason)) => UpgradeResult::Failed(reason),
                (Some(record), None) => {
                    record.revision += 1;
                    record.values = values.clone();
                    UpgradeResult::Upgraded(ReleaseHandle::new(key.clone(), record.revision))
                }
            }
        };

        self.exit(key).await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AssistantSpec, map_values};

    fn key() -> ReleaseKey {
        ReleaseKey::new("ns1", "demo")
    }

    #[tokio::test]
    async fn upgrade_without_release_reports_not_exists() {
        let engine = InMemoryReleaseEngine::new();
        let values = map_values(&AssistantSpec::new("1.0.0", "s"));
        assert_eq!(engine.upgrade(&key(), &values).await, UpgradeResult::NotExists);
    }

    #[tokio::test]
    async fn install_then_upgrade_bumps_revision() {
        let engine = InMemoryReleaseEngine::new();
        let v1 = map_values(&AssistantSpec::new("1.0.0", "s"));
        let v2 = map_values(&AssistantSpec::new("2.0.0", "s"));

        let installed = engine.install(&key(), &v1).await.unwrap();
        assert_eq!(installed.revision, 1);

        let upgraded = engine.upgrade(&key(), &v2).await;
        assert_eq!(
            upgraded,
            UpgradeResult::Upgraded(ReleaseHandle::new(key(), 2))
        );
        assert_eq!(engine.values(&key()).await, Some(v2));
    }

    #[tokio::test]
    async fn second_install_is_rejected() {
        let engine = InMemoryReleaseEngine::new();
        let values = map_values(&AssistantSpec::new("1.0.0", "s"));
        engine.install(&key(), &values).await.unwrap();

        let err = engine.install(&key(), &values).await.unwrap_err();
        assert!(err.to_string().contains("still in use"));
        assert_eq!(engine.release_count().await, 1);
    }
}
