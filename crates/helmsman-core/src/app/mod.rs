//! App - アプリケーション層
//!
//! ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **ControllerBuilder**: 構築とワイヤリング（起動時検証）
//! - **KindRegistry**: 扱うリソース種別の明示的な登録
//! - **Reconciler**: 収束手続き（fetch → upgrade/install → status）
//! - **Dispatcher**: ワーカープール・single-flight・retry
//! - **Shutdown**: 停止シグナル

pub mod builder;
pub mod dispatcher;
pub mod reconciler;
pub mod registry;
pub mod shutdown;
pub mod status;

pub use self::builder::{BuildError, Controller, ControllerBuilder};
pub use self::dispatcher::{Dispatcher, DispatcherHandle, WorkQueue};
pub use self::reconciler::Reconciler;
pub use self::registry::{KindRegistry, RegistryError};
pub use self::shutdown::{Shutdown, ShutdownTrigger};
pub use self::status::DispatcherCounts;
