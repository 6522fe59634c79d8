//! Shutdown signal shared by the dispatcher, its workers and in-flight reconciles.
//!
//! - `ShutdownTrigger::trigger()` か trigger の drop で停止
//! - `Shutdown` は clone して各ワーカーに配る

use std::future::Future;

use tokio::sync::watch;

use crate::domain::{ReconcileError, ReleaseKey};

/// Sending half. Dropping it also counts as shutdown.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // 受信側がすでに drop されていても問題ない
        let _ = self.tx.send(true);
    }
}

/// Receiving half.
#[derive(Debug, Clone)]
pub struct Shutdown {
    rx: watch::Receiver<bool>,
}

pub fn channel() -> (ShutdownTrigger, Shutdown) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, Shutdown { rx })
}

impl Shutdown {
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once shutdown is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // Err は trigger が drop されたということなので、それも停止扱い
        let _ = rx.wait_for(|stop| *stop).await;
    }

    /// Run `fut` unless shutdown wins the race, in which case `fut` is
    /// dropped and the reconcile of `key` reports `Cancelled`.
    pub async fn guard<F: Future>(
        &self,
        key: &ReleaseKey,
        fut: F,
    ) -> Result<F::Output, ReconcileError> {
        if self.is_triggered() {
            return Err(ReconcileError::Cancelled { key: key.clone() });
        }
        tokio::select! {
            out = fut => Ok(out),
            _ = self.cancelled() => Err(ReconcileError::Cancelled { key: key.clone() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn guard_passes_output_through() {
        let (_trigger, shutdown) = channel();
        let key = ReleaseKey::new("ns1", "demo");
        let out = shutdown.guard(&key, async { 7 }).await.unwrap();
        assert_eq!(out, 7);
    }

    #[tokio::test]
    async fn trigger_aborts_pending_call() {
        let (trigger, shutdown) = channel();
        let key = ReleaseKey::new("ns1", "demo");

        let pending = tokio::spawn({
            let shutdown = shutdown.clone();
            let key = key.clone();
            async move {
                shutdown
                    .guard(&key, tokio::time::sleep(Duration::from_secs(60)))
                    .await
            }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.trigger();

        let result = tokio::time::timeout(Duration::from_secs(1), pending)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(ReconcileError::Cancelled { .. })));
    }

    #[tokio::test]
    async fn dropped_trigger_counts_as_shutdown() {
        let (trigger, shutdown) = channel();
        drop(trigger);
        assert!(shutdown.is_triggered());
        tokio::time::timeout(Duration::from_millis(100), shutdown.cancelled())
            .await
            .unwrap();
    }
}
