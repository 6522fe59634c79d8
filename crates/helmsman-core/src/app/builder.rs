//! ControllerBuilder - コントローラの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - store / engine が未設定なら BuildError
//! - store が扱う kind が KindRegistry に登録されていなければ BuildError
//! - workers = 0 は BuildError

use std::sync::Arc;

use super::dispatcher::{Dispatcher, WorkerContext};
use super::reconciler::Reconciler;
use super::registry::KindRegistry;
use super::shutdown::Shutdown;
use crate::config::ControllerConfig;
use crate::domain::{Decider, DefaultDecider, GroupVersionKind, RetryPolicy};
use crate::impls::TracingEventSink;
use crate::ports::{
    Clock, DesiredStateStore, EventSink, IdGenerator, ReleaseEngine, SystemClock, UlidGenerator,
};

/// ControllerBuilder はコントローラを構築
///
/// # 使用例
/// ```ignore
/// let controller = ControllerBuilder::new(&registry)
///     .store(store)
///     .engine(engine)
///     .config(&config)
///     .build()?;
/// let dispatcher = controller.start(shutdown);
/// dispatcher.handle().enqueue(key).await;
/// ```
pub struct ControllerBuilder<'r> {
    registry: &'r KindRegistry,
    store: Option<Arc<dyn DesiredStateStore>>,
    engine: Option<Arc<dyn ReleaseEngine>>,
    workers: usize,
    retry_policy: RetryPolicy,
    decider: Option<Arc<dyn Decider>>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("no desired-state store configured")]
    MissingStore,

    #[error("no release engine configured")]
    MissingEngine,

    #[error("store serves kind '{0}', which is not registered")]
    UnregisteredKind(GroupVersionKind),

    #[error("worker count must be at least 1")]
    NoWorkers,
}

impl<'r> ControllerBuilder<'r> {
    pub fn new(registry: &'r KindRegistry) -> Self {
        Self {
            registry,
            store: None,
            engine: None,
            workers: 4,
            retry_policy: RetryPolicy::default(),
            decider: None,
            events: Arc::new(TracingEventSink),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn store(mut self, store: Arc<dyn DesiredStateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn engine(mut self, engine: Arc<dyn ReleaseEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Take worker count and retry policy from `config`.
    pub fn config(self, config: &ControllerConfig) -> Self {
        self.workers(config.workers)
            .retry_policy(config.retry.policy())
    }

    /// Replace the default decider (built from the retry policy).
    pub fn decider(mut self, decider: Arc<dyn Decider>) -> Self {
        self.decider = Some(decider);
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> Result<Controller, BuildError> {
        let store = self.store.ok_or(BuildError::MissingStore)?;
        let engine = self.engine.ok_or(BuildError::MissingEngine)?;

        let kind = store.kind();
        if !self.registry.contains(&kind) {
            return Err(BuildError::UnregisteredKind(kind));
        }
        if self.workers == 0 {
            return Err(BuildError::NoWorkers);
        }

        let decider = self
            .decider
            .unwrap_or_else(|| Arc::new(DefaultDecider::new(self.retry_policy)));
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&self.clock)));

        Ok(Controller {
            reconciler: Arc::new(Reconciler::new(store, engine)),
            workers: self.workers,
            decider,
            events: self.events,
            ids,
            clock: self.clock,
        })
    }
}

/// A wired controller, ready to start.
pub struct Controller {
    reconciler: Arc<Reconciler>,
    workers: usize,
    decider: Arc<dyn Decider>,
    events: Arc<dyn EventSink>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl Controller {
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawn the worker pool. Workers stop when `shutdown` fires.
    pub fn start(self, shutdown: Shutdown) -> Dispatcher {
        let ctx = WorkerContext {
            reconciler: self.reconciler,
            decider: self.decider,
            events: self.events,
            ids: self.ids,
            clock: self.clock,
        };
        Dispatcher::spawn(self.workers, ctx, shutdown)
    }
}
