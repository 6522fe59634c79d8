//! helmsman-core
//!
//! Reconcile loop for `K8sAssistant` releases.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（key, desired, status, values, release, errors, decision, retry, events）
//! - **ports**: 抽象化レイヤー（DesiredStateStore, ReleaseEngine, Clock, IdGenerator, EventSink）
//! - **app**: アプリケーションロジック（builder, reconciler, dispatcher, registry, shutdown）
//! - **impls**: 実装（InMemoryDesiredStateStore, InMemoryReleaseEngine など開発・テスト用）
//! - **config**: 設定ファイルと環境変数

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
