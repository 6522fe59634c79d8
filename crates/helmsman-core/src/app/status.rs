//! Status - dispatcher の観測用カウンタ

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherCounts {
    /// Keys waiting for a free worker.
    pub ready: usize,

    /// Keys waiting out a retry backoff.
    pub scheduled: usize,

    /// Keys being reconciled right now.
    pub in_flight: usize,

    /// Finished reconciles that returned Ok.
    pub succeeded: u64,

    /// Finished reconciles that returned an error.
    pub failed: u64,
}
