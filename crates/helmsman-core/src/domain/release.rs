//! Release handles and the tagged upgrade result.

use serde::{Deserialize, Serialize};

use super::key::ReleaseKey;

/// What the release engine returns after a successful install or upgrade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseHandle {
    pub key: ReleaseKey,

    /// Engine-assigned revision (helm starts at 1 and bumps on every upgrade).
    pub revision: u32,
}

impl ReleaseHandle {
    pub fn new(key: ReleaseKey, revision: u32) -> Self {
        Self { key, revision }
    }
}

/// Result of an upgrade attempt.
///
/// The reconciler installs on both `NotExists` and `Failed`; the split only
/// exists so logs and engines that can tell the two apart keep that detail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeResult {
    Upgraded(ReleaseHandle),
    NotExists,
    Failed(String),
}
