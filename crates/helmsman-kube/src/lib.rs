//! helmsman-kube
//!
//! Kubernetes 側のアダプタ。
//! - **crd**: `K8sAssistant` カスタムリソース（kube `CustomResource`）
//! - **store**: `KubeDesiredStateStore`（get / status subresource への書き込み）
//! - **watch**: watch イベントを dispatcher に流す

pub mod crd;
pub mod store;
pub mod watch;

pub use self::crd::{K8sAssistant, K8sAssistantSpec, K8sAssistantStatus, ReplicasSpec};
pub use self::store::KubeDesiredStateStore;
