//! Desired state: the declared application configuration.
//!
//! The store owns `generation` and `resource_version`; the core only reads
//! them and never edits `spec`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::key::ReleaseKey;
use super::status::ObservedStatus;

/// Scale targets for the two application tiers.
///
/// Values are passed through unvalidated; the release engine decides what a
/// negative count means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replicas {
    pub frontend: i32,
    pub backend: i32,
}

/// The user-editable part of a desired-state object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantSpec {
    /// Image tag of the application.
    pub version: String,

    /// Name of the secret holding the API key (never the key itself).
    pub api_key_secret_ref: String,

    pub replicas: Replicas,
}

impl AssistantSpec {
    pub fn new(version: impl Into<String>, api_key_secret_ref: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            api_key_secret_ref: api_key_secret_ref.into(),
            replicas: Replicas::default(),
        }
    }

    pub fn with_replicas(mut self, frontend: i32, backend: i32) -> Self {
        self.replicas = Replicas { frontend, backend };
        self
    }
}

/// Opaque optimistic-concurrency token issued by the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceVersion(String);

impl ResourceVersion {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A desired-state object as read from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredState {
    pub key: ReleaseKey,
    pub spec: AssistantSpec,

    /// Bumped by the store on every spec edit.
    pub generation: i64,

    /// Version of the whole object at read time; status writes are checked
    /// against it.
    pub resource_version: ResourceVersion,

    #[serde(default)]
    pub status: ObservedStatus,
}

impl DesiredState {
    pub fn new(key: ReleaseKey, spec: AssistantSpec, resource_version: ResourceVersion) -> Self {
        Self {
            key,
            spec,
            generation: 1,
            resource_version,
            status: ObservedStatus::default(),
        }
    }
}
