//! Ports - 抽象化レイヤー
//!
//! Hexagonal Architecture の「ポート」を定義します。
//! 各 trait は外部システム（Kubernetes API, helm など）への
//! インターフェースを提供し、実装の詳細を隠蔽します。
//!
//! # 設計原則
//! - desired-state store が source of truth（正本）
//! - release engine は install / upgrade だけを知っている
//! - reconciler は ports だけに依存する

pub mod clock;
pub mod desired_store;
pub mod event_sink;
pub mod id_generator;
pub mod release_engine;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::desired_store::{DesiredStateStore, StoreError};
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::release_engine::{EngineError, ReleaseEngine};
