//! `K8sAssistant` (k8s-assistant.io/v1alpha1)

use helmsman_core::app::{KindRegistry, RegistryError};
use helmsman_core::domain::{AssistantSpec, GroupVersionKind, ObservedStatus, Phase, Replicas};
use kube::{CustomResource, Resource};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, JsonSchema, PartialEq)]
#[kube(
    group = "k8s-assistant.io",
    version = "v1alpha1",
    kind = "K8sAssistant",
    namespaced,
    status = "K8sAssistantStatus",
    printcolumn = r#"{"name":"Phase","type":"string","jsonPath":".status.phase"}"#,
    printcolumn = r#"{"name":"URL","type":"string","jsonPath":".status.frontendURL"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct K8sAssistantSpec {
    pub version: String,
    pub api_key_secret_ref: String,
    pub replicas: ReplicasSpec,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, JsonSchema, PartialEq)]
pub struct ReplicasSpec {
    pub frontend: i32,
    pub backend: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct K8sAssistantStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(rename = "frontendURL", default, skip_serializing_if = "Option::is_none")]
    pub frontend_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl From<&K8sAssistantSpec> for AssistantSpec {
    fn from(spec: &K8sAssistantSpec) -> Self {
        AssistantSpec {
            version: spec.version.clone(),
            api_key_secret_ref: spec.api_key_secret_ref.clone(),
            replicas: Replicas {
                frontend: spec.replicas.frontend,
                backend: spec.replicas.backend,
            },
        }
    }
}

impl From<&K8sAssistantStatus> for ObservedStatus {
    fn from(status: &K8sAssistantStatus) -> Self {
        ObservedStatus {
            phase: Phase::parse(status.phase.as_deref().unwrap_or_default()),
            frontend_url: status.frontend_url.clone().unwrap_or_default(),
            observed_generation: status.observed_generation,
        }
    }
}

impl From<&ObservedStatus> for K8sAssistantStatus {
    fn from(status: &ObservedStatus) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        K8sAssistantStatus {
            phase: non_empty(status.phase.as_str()),
            frontend_url: non_empty(&status.frontend_url),
            observed_generation: status.observed_generation,
        }
    }
}

/// The kind served by this crate.
pub fn kind() -> GroupVersionKind {
    GroupVersionKind::new(
        K8sAssistant::group(&()),
        K8sAssistant::version(&()),
        K8sAssistant::kind(&()),
    )
}

/// Register `K8sAssistant` in `registry`.
pub fn register(registry: &mut KindRegistry) -> Result<(), RegistryError> {
    registry.register(kind())
}
