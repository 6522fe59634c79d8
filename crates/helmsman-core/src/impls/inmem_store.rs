//! InMemoryDesiredStateStore - 開発・テスト用の desired-state store
//!
//! # 実装詳細
//! - HashMap<ReleaseKey, DesiredState> を tokio Mutex で保護
//! - resource version は単調増加のカウンタ
//! - spec が変わったときだけ generation を上げる（API server と同じ）
//! - 次の get / update_status を失敗させるフック（テスト用）

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    AssistantSpec, DesiredState, GroupVersionKind, ObservedStatus, ReleaseKey, ResourceVersion,
};
use crate::ports::{DesiredStateStore, StoreError};

#[derive(Default)]
struct StoreState {
    objects: HashMap<ReleaseKey, DesiredState>,
    next_version: u64,
    gets: usize,
    status_writes: usize,
    get_failures: VecDeque<StoreError>,
    update_failures: VecDeque<StoreError>,
}

impl StoreState {
    fn bump_version(&mut self) -> ResourceVersion {
        self.next_version += 1;
        ResourceVersion::new(self.next_version.to_string())
    }
}

pub struct InMemoryDesiredStateStore {
    kind: GroupVersionKind,
    state: Mutex<StoreState>,
}

impl InMemoryDesiredStateStore {
    pub fn new() -> Self {
        Self::with_kind(GroupVersionKind::k8s_assistant())
    }

    pub fn with_kind(kind: GroupVersionKind) -> Self {
        Self {
            kind,
            state: Mutex::new(StoreState::default()),
        }
    }

    /// Create or edit the object for `key` the way an external actor would.
    pub async fn apply(&self, key: ReleaseKey, spec: AssistantSpec) -> DesiredState {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.objects.get(&key)
            && existing.spec == spec
        {
            return existing.clone();
        }

        let resource_version = state.bump_version();
        let object = match state.objects.remove(&key) {
            Some(mut existing) => {
                existing.spec = spec;
                existing.generation += 1;
                existing.resource_version = resource_version;
                existing
            }
            None => DesiredState::new(key.clone(), spec, resource_version),
        };
        state.objects.insert(key, object.clone());
        object
    }

    pub async fn delete(&self, key: &ReleaseKey) -> bool {
        self.state.lock().await.objects.remove(key).is_some()
    }

    pub async fn snapshot(&self, key: &ReleaseKey) -> Option<DesiredState> {
        self.state.lock().await.objects.get(key).cloned()
    }

    pub async fn gets(&self) -> usize {
        self.state.lock().await.gets
    }

    /// Number of status writes that went through.
    pub async fn status_writes(&self) -> usize {
        self.state.lock().await.status_writes
    }

    pub async fn fail_next_get(&self, err: StoreError) {
        self.state.lock().await.get_failures.push_back(err);
    }

    pub async fn fail_next_update(&self, err: StoreError) {
        self.state.lock().await.update_failures.push_back(err);
    }
}

impl Default for InMemoryDesiredStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DesiredStateStore for InMemoryDesiredStateStore {
    fn kind(&self) -> GroupVersionKind {
        self.kind.clone()
    }

    async fn get(&self, key: &ReleaseKey) -> Result<DesiredState, StoreError> {
        let mut state = self.state.lock().await;
        state.gets += 1;
        if let Some(err) = state.get_failures.pop_front() {
            return Err(err);
        }
        state
            .objects
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.clone()))
    }

    async fn update_status(
        &self,
        key: &ReleaseKey,
        expected: &ResourceVersion,
        status: &ObservedStatus,
    ) -> Result<ResourceVersion, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(err) = state.update_failures.pop_front() {
            return Err(err);
        }

        let current = match state.objects.get(key) {
            Some(object) => object.resource_version.clone(),
            None => return Err(StoreError::NotFound(key.clone())),
        };
        if &current != expected {
            return Err(StoreError::Conflict {
                key: key.clone(),
                expected: expected.clone(),
            });
        }

        let resource_version = state.bump_version();
        if let Some(object) = state.objects.get_mut(key) {
            object.status = status.clone();
            object.resource_version = resource_version.clone();
        }
        state.status_writes += 1;
        Ok(resource_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Phase;

    fn key() -> ReleaseKey {
        ReleaseKey::new("ns1", "demo")
    }

    #[tokio::test]
    async fn apply_bumps_generation_only_on_spec_change() {
        let store = InMemoryDesiredStateStore::new();
        let first = store.apply(key(), AssistantSpec::new("1.0.0", "s")).await;
        let same = store.apply(key(), AssistantSpec::new("1.0.0", "s")).await;
        let edited = store.apply(key(), AssistantSpec::new("1.1.0", "s")).await;

        assert_eq!(first.generation, 1);
        assert_eq!(same.resource_version, first.resource_version);
        assert_eq!(edited.generation, 2);
        assert_ne!(edited.resource_version, first.resource_version);
    }

    #[tokio::test]
    async fn update_status_rejects_stale_version() {
        let store = InMemoryDesiredStateStore::new();
        let read = store.apply(key(), AssistantSpec::new("1.0.0", "s")).await;

        let winner = ObservedStatus::converged(Phase::Installed, "w", 1);
        store
            .update_status(&key(), &read.resource_version, &winner)
            .await
            .unwrap();

        let loser = ObservedStatus::converged(Phase::Upgraded, "l", 1);
        let err = store
            .update_status(&key(), &read.resource_version, &loser)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.snapshot(&key()).await.unwrap().status, winner);
        assert_eq!(store.status_writes().await, 1);
    }

    #[tokio::test]
    async fn get_of_missing_key_is_not_found() {
        let store = InMemoryDesiredStateStore::new();
        assert_eq!(
            store.get(&key()).await.unwrap_err(),
            StoreError::NotFound(key())
        );
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_once() {
        let store = InMemoryDesiredStateStore::new();
        store.apply(key(), AssistantSpec::new("1.0.0", "s")).await;
        store
            .fail_next_get(StoreError::Unavailable("down".into()))
            .await;

        assert!(store.get(&key()).await.is_err());
        assert!(store.get(&key()).await.is_ok());
        assert_eq!(store.gets().await, 2);
    }
}
