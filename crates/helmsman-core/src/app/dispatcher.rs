//! Dispatcher - reconcile 要求の配送と再試行
//!
//! # 保証
//! - 同じ key の reconcile は同時に 1 つだけ（single-flight）
//! - 異なる key はワーカー間で並行に処理される
//! - 実行中の key への enqueue は dirty として記録し、終了後に 1 度だけ再実行
//! - 待機中の key への重複 enqueue はまとめる
//!
//! # フロー（ワーカー 1 本）
//! 1. WorkQueue::lease() で key を取得（key は InFlight になる）
//! 2. Reconciler::reconcile()
//! 3. Decider で Decision を決める
//! 4. EventSink にイベントを送る
//! 5. WorkQueue::complete() で Decision を反映（Done / backoff / 即時 / 停止）

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, info_span};

use super::reconciler::Reconciler;
use super::shutdown::Shutdown;
use super::status::DispatcherCounts;
use crate::domain::{Decider, Decision, ReconcileEvent, ReleaseKey};
use crate::ports::{Clock, EventSink, IdGenerator};

/// Scheduled retry entry.
///
/// Reverse ordering so BinaryHeap acts as a min-heap (earliest first).
#[derive(Debug, Clone, PartialEq, Eq)]
struct ScheduledKey {
    next_run_at: Instant,
    key: ReleaseKey,
}

impl PartialOrd for ScheduledKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .next_run_at
            .cmp(&self.next_run_at)
            .then_with(|| other.key.cmp(&self.key))
    }
}

/// Where a key currently is. Keys with no slot are idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Ready,
    Scheduled(Instant),
    InFlight { dirty: bool },
}

#[derive(Default)]
struct WorkQueueState {
    slots: HashMap<ReleaseKey, Slot>,

    /// Keys in `Slot::Ready`, in arrival order.
    ready: VecDeque<ReleaseKey>,

    /// Backoff entries. May hold stale entries for keys that were
    /// re-enqueued; promotion skips those.
    scheduled: BinaryHeap<ScheduledKey>,

    /// Consecutive failures per key.
    failures: HashMap<ReleaseKey, u32>,

    succeeded: u64,
    failed: u64,
}

impl WorkQueueState {
    fn mark_ready(&mut self, key: ReleaseKey) {
        self.slots.insert(key.clone(), Slot::Ready);
        self.ready.push_back(key);
    }

    /// Move keys whose backoff has elapsed to the ready queue.
    fn promote_scheduled(&mut self, now: Instant) {
        while let Some(entry) = self.scheduled.peek() {
            if entry.next_run_at > now {
                break;
            }
            let Some(entry) = self.scheduled.pop() else {
                break;
            };
            if self.slots.get(&entry.key) == Some(&Slot::Scheduled(entry.next_run_at)) {
                self.mark_ready(entry.key);
            }
        }
    }

    fn counts(&self) -> DispatcherCounts {
        let mut counts = DispatcherCounts {
            succeeded: self.succeeded,
            failed: self.failed,
            ..DispatcherCounts::default()
        };
        for slot in self.slots.values() {
            match slot {
                Slot::Ready => counts.ready += 1,
                Slot::Scheduled(_) => counts.scheduled += 1,
                Slot::InFlight { .. } => counts.in_flight += 1,
            }
        }
        counts
    }
}

/// Keyed work queue with single-flight and delayed retries.
#[derive(Default)]
pub struct WorkQueue {
    state: Mutex<WorkQueueState>,
    notify: Notify,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a reconcile of `key`.
    ///
    /// A key waiting out a backoff is moved to the front of the line: a new
    /// change notification supersedes the retry timer.
    pub async fn enqueue(&self, key: ReleaseKey) {
        {
            let mut state = self.state.lock().await;
            match state.slots.get_mut(&key) {
                None | Some(Slot::Scheduled(_)) => state.mark_ready(key),
                Some(Slot::Ready) => return,
                Some(Slot::InFlight { dirty }) => {
                    *dirty = true;
                    return;
                }
            }
        }
        self.notify.notify_one();
    }

    /// Take the next ready key, waiting until one is available.
    ///
    /// The returned key is in flight until `complete` is called for it.
    pub async fn lease(&self) -> ReleaseKey {
        loop {
            let next_wake = {
                let mut state = self.state.lock().await;
                state.promote_scheduled(Instant::now());

                while let Some(key) = state.ready.pop_front() {
                    if state.slots.get(&key) != Some(&Slot::Ready) {
                        continue;
                    }
                    state.slots.insert(key.clone(), Slot::InFlight { dirty: false });
                    let more = !state.ready.is_empty();
                    drop(state);
                    if more {
                        // 他の待機ワーカーを起こす
                        self.notify.notify_one();
                    }
                    return key;
                }

                state.scheduled.peek().map(|entry| entry.next_run_at)
            };

            // 通知 か 次の retry 時刻 まで待つ
            match next_wake {
                Some(wake_at) => {
                    tokio::select! {
                        _ = self.notify.notified() => {},
                        _ = tokio::time::sleep_until(wake_at.into()) => {},
                    }
                }
                None => self.notify.notified().await,
            }
        }
    }

    /// Consecutive failures of `key` if the reconcile that just finished
    /// failed too.
    pub async fn failures_including_current(&self, key: &ReleaseKey) -> u32 {
        let state = self.state.lock().await;
        state.failures.get(key).copied().unwrap_or(0).saturating_add(1)
    }

    /// Apply the decision for a leased key.
    pub async fn complete(&self, key: &ReleaseKey, succeeded: bool, decision: &Decision) {
        let should_notify = {
            let mut state = self.state.lock().await;
            let dirty = matches!(
                state.slots.remove(key),
                Some(Slot::InFlight { dirty: true })
            );

            // Stop（shutdown による中断）は成功にも失敗にも数えない
            if matches!(decision, Decision::Stop { .. }) {
                state.failures.remove(key);
            } else if succeeded {
                state.succeeded += 1;
                state.failures.remove(key);
            } else {
                state.failed += 1;
                *state.failures.entry(key.clone()).or_insert(0) += 1;
            }

            match decision {
                Decision::Done | Decision::Stop { .. } if !dirty => false,
                Decision::Requeue { delay, .. } if !dirty => {
                    let next_run_at = Instant::now() + *delay;
                    state.slots.insert(key.clone(), Slot::Scheduled(next_run_at));
                    state.scheduled.push(ScheduledKey {
                        next_run_at,
                        key: key.clone(),
                    });
                    // 待機中のワーカーに wake 時刻を再計算させる
                    true
                }
                // RequeueNow、または実行中に変更通知が来ていた
                _ => {
                    state.mark_ready(key.clone());
                    true
                }
            }
        };

        if should_notify {
            self.notify.notify_one();
        }
    }

    pub async fn counts(&self) -> DispatcherCounts {
        self.state.lock().await.counts()
    }
}

/// Everything a worker needs besides the queue.
pub(crate) struct WorkerContext {
    pub(crate) reconciler: Arc<Reconciler>,
    pub(crate) decider: Arc<dyn Decider>,
    pub(crate) events: Arc<dyn EventSink>,
    pub(crate) ids: Arc<dyn IdGenerator>,
    pub(crate) clock: Arc<dyn Clock>,
}

/// Cloneable handle for feeding keys to a running dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    queue: Arc<WorkQueue>,
}

impl DispatcherHandle {
    pub async fn enqueue(&self, key: ReleaseKey) {
        self.queue.enqueue(key).await;
    }

    pub async fn counts(&self) -> DispatcherCounts {
        self.queue.counts().await
    }
}

/// Worker pool handle.
/// - shutdown を発火するとワーカーは新しい key を取らなくなり、
///   実行中の reconcile も外部呼び出しの途中で中断される
/// - `join()` で全ワーカーの終了を待てる
pub struct Dispatcher {
    queue: Arc<WorkQueue>,
    joins: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawn `workers` workers.
    pub(crate) fn spawn(workers: usize, ctx: WorkerContext, shutdown: Shutdown) -> Self {
        let queue = Arc::new(WorkQueue::new());
        let ctx = Arc::new(ctx);

        let mut joins = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let ctx = Arc::clone(&ctx);
            let shutdown = shutdown.clone();
            joins.push(tokio::spawn(async move {
                worker_loop(worker_id, queue, ctx, shutdown).await;
            }));
        }
        info!(workers, "dispatcher started");

        Self { queue, joins }
    }

    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            queue: Arc::clone(&self.queue),
        }
    }

    /// Wait for all workers. They exit once shutdown is triggered.
    pub async fn join(self) {
        for join in self.joins {
            let _ = join.await;
        }
        info!("dispatcher stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<WorkQueue>,
    ctx: Arc<WorkerContext>,
    shutdown: Shutdown,
) {
    loop {
        // lease は「待つ」可能性があるので shutdown と競合させる
        let key = tokio::select! {
            _ = shutdown.cancelled() => break,
            key = queue.lease() => key,
        };

        let reconcile_id = ctx.ids.generate_reconcile_id();
        let span = info_span!("reconcile", %key, %reconcile_id, worker_id);
        let result = ctx
            .reconciler
            .reconcile(&key, &shutdown)
            .instrument(span)
            .await;

        let failures = if result.is_ok() {
            0
        } else {
            queue.failures_including_current(&key).await
        };
        let decision = ctx.decider.decide(&result, failures);
        debug!(%key, %reconcile_id, ?decision, "reconcile finished");

        let event = ReconcileEvent::from_result(reconcile_id, key.clone(), ctx.clock.now(), &result);
        ctx.events.emit(event).await;

        queue.complete(&key, result.is_ok(), &decision).await;
    }
    debug!(worker_id, "worker stopped");
}
