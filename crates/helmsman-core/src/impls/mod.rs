//! Impls - ports の実装（開発用・テスト用）
//!
//! # 含まれる実装
//! - **InMemoryDesiredStateStore**: 開発用の desired-state store
//! - **InMemoryReleaseEngine**: テスト用の release engine
//! - **TracingEventSink / RecordingEventSink**
//!
//! # 本番用実装
//! 本番用の実装は別クレートに配置します：
//! - `helmsman-kube`: KubeDesiredStateStore
//! - `helmsman-helm`: HelmCliEngine

pub mod event_sink;
pub mod inmem_engine;
pub mod inmem_store;

pub use self::event_sink::{RecordingEventSink, TracingEventSink};
pub use self::inmem_engine::{EngineCall, InMemoryReleaseEngine};
pub use self::inmem_store::InMemoryDesiredStateStore;
