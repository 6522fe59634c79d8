//! Reconciler end-to-end against the in-memory store and engine.

use std::sync::Arc;

use async_trait::async_trait;
use helmsman_core::app::{Reconciler, shutdown};
use helmsman_core::domain::{
    AssistantSpec, ErrorKind, ObservedStatus, Phase, ReconcileOutcome, ReleaseHandle, ReleaseKey,
    UpgradeResult, Value, ValueMapping,
};
use helmsman_core::impls::{InMemoryDesiredStateStore, InMemoryReleaseEngine};
use helmsman_core::ports::{DesiredStateStore, EngineError, ReleaseEngine};

fn demo() -> ReleaseKey {
    ReleaseKey::new("ns1", "demo")
}

fn spec() -> AssistantSpec {
    AssistantSpec::new("1.2.3", "sec-a").with_replicas(2, 3)
}

#[tokio::test]
async fn fresh_key_goes_installed_then_upgraded_then_stays() {
    let store = Arc::new(InMemoryDesiredStateStore::new());
    let engine = Arc::new(InMemoryReleaseEngine::new());
    let reconciler = Reconciler::new(store.clone(), engine.clone());
    let (_trigger, shutdown) = shutdown::channel();
    store.apply(demo(), spec()).await;

    let mut phases = Vec::new();
    for _ in 0..3 {
        let outcome = reconciler.reconcile(&demo(), &shutdown).await.unwrap();
        phases.push(outcome.phase());
    }
    assert_eq!(
        phases,
        vec![Some(Phase::Installed), Some(Phase::Upgraded), Some(Phase::Upgraded)]
    );

    let status = store.snapshot(&demo()).await.unwrap().status;
    assert_eq!(
        status,
        ObservedStatus::converged(
            Phase::Upgraded,
            "http://demo-frontend.ns1.svc.cluster.local",
            1
        )
    );
    assert_eq!(engine.release_count().await, 1);
    assert_eq!(engine.revision(&demo()).await, Some(3));
}

#[tokio::test]
async fn reconcile_is_idempotent_once_upgraded() {
    let store = Arc::new(InMemoryDesiredStateStore::new());
    let engine = Arc::new(InMemoryReleaseEngine::new());
    let reconciler = Reconciler::new(store.clone(), engine.clone());
    let (_trigger, shutdown) = shutdown::channel();
    store.apply(demo(), spec()).await;
    reconciler.reconcile(&demo(), &shutdown).await.unwrap();

    let a = reconciler.reconcile(&demo(), &shutdown).await.unwrap();
    let b = reconciler.reconcile(&demo(), &shutdown).await.unwrap();

    let view = |o: &ReconcileOutcome| {
        let status = o.status().unwrap();
        (status.phase, status.frontend_url.clone())
    };
    assert_eq!(view(&a), view(&b));
}

#[tokio::test]
async fn absent_key_does_nothing() {
    let store = Arc::new(InMemoryDesiredStateStore::new());
    let engine = Arc::new(InMemoryReleaseEngine::new());
    let reconciler = Reconciler::new(store.clone(), engine.clone());
    let (_trigger, shutdown) = shutdown::channel();

    let outcome = reconciler
        .reconcile(&ReleaseKey::new("ns1", "ghost"), &shutdown)
        .await
        .unwrap();

    assert_eq!(outcome, ReconcileOutcome::Absent);
    assert!(engine.calls().await.is_empty());
    assert_eq!(store.status_writes().await, 0);
}

#[tokio::test]
async fn engine_receives_mapped_values() {
    let store = Arc::new(InMemoryDesiredStateStore::new());
    let engine = Arc::new(InMemoryReleaseEngine::new());
    let reconciler = Reconciler::new(store.clone(), engine.clone());
    let (_trigger, shutdown) = shutdown::channel();
    store.apply(demo(), spec()).await;

    reconciler.reconcile(&demo(), &shutdown).await.unwrap();

    let values = engine.values(&demo()).await.unwrap();
    assert_eq!(values.get("image.tag"), Some(&Value::from("1.2.3")));
    assert_eq!(values.get("secret.apiKey"), Some(&Value::from("sec-a")));
    assert_eq!(values.get("replicas.frontend"), Some(&Value::Int(2)));
    assert_eq!(values.get("replicas.backend"), Some(&Value::Int(3)));
    assert_eq!(values.len(), 4);
}

#[tokio::test]
async fn spec_edit_is_rolled_out_with_new_generation() {
    let store = Arc::new(InMemoryDesiredStateStore::new());
    let engine = Arc::new(InMemoryReleaseEngine::new());
    let reconciler = Reconciler::new(store.clone(), engine.clone());
    let (_trigger, shutdown) = shutdown::channel();
    store.apply(demo(), spec()).await;
    reconciler.reconcile(&demo(), &shutdown).await.unwrap();

    store
        .apply(demo(), AssistantSpec::new("2.0.0", "sec-a").with_replicas(2, 3))
        .await;
    reconciler.reconcile(&demo(), &shutdown).await.unwrap();

    let values = engine.values(&demo()).await.unwrap();
    assert_eq!(values.get("image.tag"), Some(&Value::from("2.0.0")));
    let status = store.snapshot(&demo()).await.unwrap().status;
    assert_eq!(status.phase, Phase::Upgraded);
    assert_eq!(status.observed_generation, Some(2));
}

/// Engine that lets another writer win the status race while the upgrade
/// is running.
struct RacingEngine {
    inner: InMemoryReleaseEngine,
    store: Arc<InMemoryDesiredStateStore>,
    winner: ObservedStatus,
}

#[async_trait]
impl ReleaseEngine for RacingEngine {
    async fn install(
        &self,
        key: &ReleaseKey,
        values: &ValueMapping,
    ) -> Result<ReleaseHandle, EngineError> {
        let handle = self.inner.install(key, values).await?;
        self.race(key).await;
        Ok(handle)
    }

    async fn upgrade(&self, key: &ReleaseKey, values: &ValueMapping) -> UpgradeResult {
        let result = self.inner.upgrade(key, values).await;
        self.race(key).await;
        result
    }
}

impl RacingEngine {
    async fn race(&self, key: &ReleaseKey) {
        let current = self.store.get(key).await.unwrap();
        self.store
            .update_status(key, &current.resource_version, &self.winner)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn losing_status_race_reports_conflict_and_keeps_winner() {
    let store = Arc::new(InMemoryDesiredStateStore::new());
    let winner = ObservedStatus::converged(Phase::Installed, "http://winner", 1);
    let engine = Arc::new(RacingEngine {
        inner: InMemoryReleaseEngine::new(),
        store: store.clone(),
        winner: winner.clone(),
    });
    let reconciler = Reconciler::new(store.clone(), engine);
    let (_trigger, shutdown) = shutdown::channel();
    store.apply(demo(), spec()).await;

    let err = reconciler.reconcile(&demo(), &shutdown).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::StatusConflict);
    assert_eq!(store.snapshot(&demo()).await.unwrap().status, winner);
}

#[tokio::test]
async fn install_failure_leaves_status_untouched() {
    let store = Arc::new(InMemoryDesiredStateStore::new());
    let engine = Arc::new(InMemoryReleaseEngine::new());
    let reconciler = Reconciler::new(store.clone(), engine.clone());
    let (_trigger, shutdown) = shutdown::channel();
    store.apply(demo(), spec()).await;
    engine.fail_installs("chart not found").await;

    let err = reconciler.reconcile(&demo(), &shutdown).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ReleaseEngine);
    assert!(store.snapshot(&demo()).await.unwrap().status.phase.is_unset());
    assert_eq!(store.status_writes().await, 0);

    // 次の reconcile で回復する
    engine.clear_failures().await;
    let outcome = reconciler.reconcile(&demo(), &shutdown).await.unwrap();
    assert_eq!(outcome.phase(), Some(Phase::Installed));
}
