//! EventSink port - reconcile イベントの記録
//!
//! # 実装
//! - TracingEventSink: tracing に出力
//! - RecordingEventSink: メモリに保持（テスト用）

use async_trait::async_trait;

use crate::domain::ReconcileEvent;

/// Receives one event per finished reconcile.
///
/// Emitting must not fail the reconcile; sinks swallow their own errors.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: ReconcileEvent);
}
