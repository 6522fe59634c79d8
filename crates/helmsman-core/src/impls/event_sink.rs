//! EventSink 実装
//!
//! - **TracingEventSink**: tracing に出力（本番用）
//! - **RecordingEventSink**: メモリに保持（テスト用）

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::domain::{ReconcileEvent, ReconcileEventKind};
use crate::ports::EventSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: ReconcileEvent) {
        let key = &event.key;
        let id = &event.reconcile_id;
        match &event.kind {
            ReconcileEventKind::Converged { status, revision } => info!(
                %key,
                reconcile_id = %id,
                phase = %status.phase,
                frontend_url = %status.frontend_url,
                revision,
                "reconciled"
            ),
            ReconcileEventKind::Absent => info!(%key, reconcile_id = %id, "reconciled (absent)"),
            ReconcileEventKind::Failed {
                error_kind,
                message,
            } => warn!(
                %key,
                reconcile_id = %id,
                error_kind = %error_kind,
                error = %message,
                "reconcile failed"
            ),
        }
    }
}

#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<ReconcileEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<ReconcileEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for RecordingEventSink {
    async fn emit(&self, event: ReconcileEvent) {
        self.events.lock().await.push(event);
    }
}
