//! GroupVersionKind - リソース種別の識別子
//!
//! KindRegistry（app::registry）に登録され、store が扱う種別と照合されます。

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a resource kind served by a desired-state store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// The `K8sAssistant` resource this controller converges.
    pub fn k8s_assistant() -> Self {
        Self::new("k8s-assistant.io", "v1alpha1", "K8sAssistant")
    }

    /// `group/version`, as written in a manifest's `apiVersion`.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}
