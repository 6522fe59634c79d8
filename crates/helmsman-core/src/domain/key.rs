//! ReleaseKey - (namespace, name) による一意な識別子
//!
//! 1 つの ReleaseKey は 1 つの release に対応します。
//! Display は `namespace/name` 形式です（ログ・イベント用）。

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one desired application instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReleaseKey {
    pub namespace: String,
    pub name: String,
}

impl ReleaseKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// In-cluster URL of the release's frontend service.
    ///
    /// Format: `http://{name}-frontend.{namespace}.svc.cluster.local`.
    /// Existing clients parse this string, so it must not change.
    pub fn frontend_url(&self) -> String {
        format!(
            "http://{}-frontend.{}.svc.cluster.local",
            self.name, self.namespace
        )
    }
}

impl fmt::Display for ReleaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}
