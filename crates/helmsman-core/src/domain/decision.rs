//! Decision model: what the dispatcher does with a finished reconcile.
//!
//! The Decider is a pure function of the reconcile result and the key's
//! consecutive failure count; the dispatcher carries the decision out.

use std::time::Duration;

use super::errors::{ErrorKind, ReconcileError};
use super::outcome::ReconcileOutcome;
use super::retry::RetryPolicy;

/// The next action for a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Converged or absent: wait for the next change.
    Done,

    /// Retry after a backoff delay.
    Requeue { delay: Duration, reason: String },

    /// Retry as soon as a worker is free.
    RequeueNow { reason: String },

    /// Do not retry (shutdown in progress).
    Stop { reason: String },
}

/// Decides the next action for a key after a reconcile.
pub trait Decider: Send + Sync {
    /// # Arguments
    /// * `result` - The reconcile result
    /// * `failures` - Consecutive failures for this key, including this one
    fn decide(&self, result: &Result<ReconcileOutcome, ReconcileError>, failures: u32)
    -> Decision;
}

/// Default decider.
///
/// - StatusConflict: 即時再試行（次の試行で最新状態を読み直す）
/// - TransientApi / ReleaseEngine: RetryPolicy による指数 backoff
/// - Cancelled: 停止
///
/// There is no attempt budget: a key is retried until it converges.
#[derive(Debug, Clone, Default)]
pub struct DefaultDecider {
    retry_policy: RetryPolicy,
}

impl DefaultDecider {
    pub fn new(retry_policy: RetryPolicy) -> Self {
        Self { retry_policy }
    }
}

impl Decider for DefaultDecider {
    fn decide(
        &self,
        result: &Result<ReconcileOutcome, ReconcileError>,
        failures: u32,
    ) -> Decision {
        // converged / absent は次の変更通知を待つ
        let Err(err) = result else {
            return Decision::Done;
        };

        let kind = err.kind();
        if kind.wants_backoff() {
            let delay = self.retry_policy.next_delay(failures);
            return Decision::Requeue {
                delay,
                reason: format!("{kind} (failure {failures}, retry in {delay:?})"),
            };
        }
        match kind {
            ErrorKind::StatusConflict => Decision::RequeueNow {
                reason: err.to_string(),
            },
            _ => Decision::Stop {
                reason: err.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ReleaseKey, ResourceVersion};
    use crate::ports::{EngineError, StoreError};

    fn key() -> ReleaseKey {
        ReleaseKey::new("ns1", "demo")
    }

    #[test]
    fn absent_is_done() {
        let decider = DefaultDecider::default();
        assert_eq!(decider.decide(&Ok(ReconcileOutcome::Absent), 0), Decision::Done);
    }

    #[test]
    fn engine_failure_backs_off_exponentially() {
        let decider = DefaultDecider::default();
        let result = Err(ReconcileError::Release {
            key: key(),
            source: EngineError::Failed {
                key: key(),
                reason: "chart not found".into(),
            },
        });

        let Decision::Requeue { delay: d1, .. } = decider.decide(&result, 1) else {
            panic!("expected Requeue");
        };
        let Decision::Requeue { delay: d3, .. } = decider.decide(&result, 3) else {
            panic!("expected Requeue");
        };
        assert_eq!(d1, Duration::from_millis(500));
        assert_eq!(d3, Duration::from_secs(2));
    }

    #[test]
    fn conflict_requeues_immediately() {
        let decider = DefaultDecider::default();
        let result = Err(ReconcileError::StatusConflict {
            key: key(),
            source: StoreError::Conflict {
                key: key(),
                expected: ResourceVersion::new("1"),
            },
        });
        assert!(matches!(
            decider.decide(&result, 5),
            Decision::RequeueNow { .. }
        ));
    }

    #[test]
    fn fetch_failure_backs_off() {
        let decider = DefaultDecider::default();
        let result = Err(ReconcileError::Fetch {
            key: key(),
            source: StoreError::Unavailable("connection refused".into()),
        });
        assert_eq!(
            decider.decide(&result, 2),
            Decision::Requeue {
                delay: Duration::from_secs(1),
                reason: "TransientAPIError (failure 2, retry in 1s)".to_string(),
            }
        );
    }

    #[test]
    fn cancelled_stops() {
        let decider = DefaultDecider::default();
        let result = Err(ReconcileError::Cancelled { key: key() });
        assert!(matches!(decider.decide(&result, 1), Decision::Stop { .. }));
    }
}
