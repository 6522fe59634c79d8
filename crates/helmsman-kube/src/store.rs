//! KubeDesiredStateStore - Kubernetes API を desired-state store として使う
//!
//! # 実装詳細
//! - get: `Api::get_opt`（404 は NotFound）
//! - update_status: status subresource への merge patch。
//!   patch に `metadata.resourceVersion` を含めるので、API server 側で
//!   楽観ロックが効く（不一致は 409 → Conflict）

use async_trait::async_trait;
use helmsman_core::domain::{
    DesiredState, GroupVersionKind, ObservedStatus, ReleaseKey, ResourceVersion,
};
use helmsman_core::ports::{DesiredStateStore, StoreError};
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use tracing::debug;

use crate::crd::{self, K8sAssistant, K8sAssistantStatus};

pub struct KubeDesiredStateStore {
    client: Client,
}

impl KubeDesiredStateStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<K8sAssistant> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait]
impl DesiredStateStore for KubeDesiredStateStore {
    fn kind(&self) -> GroupVersionKind {
        crd::kind()
    }

    async fn get(&self, key: &ReleaseKey) -> Result<DesiredState, StoreError> {
        let object = self
            .api(&key.namespace)
            .get_opt(&key.name)
            .await
            .map_err(|err| map_error(key, None, err))?
            .ok_or_else(|| StoreError::NotFound(key.clone()))?;
        desired_from_resource(key, &object)
    }

    async fn update_status(
        &self,
        key: &ReleaseKey,
        expected: &ResourceVersion,
        status: &ObservedStatus,
    ) -> Result<ResourceVersion, StoreError> {
        let patch = status_patch(expected, status);
        debug!(%key, %expected, "patching status");
        let updated = self
            .api(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|err| map_error(key, Some(expected), err))?;

        updated
            .resource_version()
            .map(ResourceVersion::new)
            .ok_or_else(|| StoreError::Malformed {
                key: key.clone(),
                reason: "status update returned no resourceVersion".to_string(),
            })
    }
}

/// Convert a fetched object into the domain view.
pub fn desired_from_resource(
    key: &ReleaseKey,
    object: &K8sAssistant,
) -> Result<DesiredState, StoreError> {
    let resource_version =
        object
            .resource_version()
            .map(ResourceVersion::new)
            .ok_or_else(|| StoreError::Malformed {
                key: key.clone(),
                reason: "object has no resourceVersion".to_string(),
            })?;

    Ok(DesiredState {
        key: key.clone(),
        spec: (&object.spec).into(),
        generation: object.metadata.generation.unwrap_or_default(),
        resource_version,
        status: object
            .status
            .as_ref()
            .map(ObservedStatus::from)
            .unwrap_or_default(),
    })
}

/// Merge patch body for the status subresource.
pub fn status_patch(expected: &ResourceVersion, status: &ObservedStatus) -> serde_json::Value {
    json!({
        "metadata": { "resourceVersion": expected.as_str() },
        "status": K8sAssistantStatus::from(status),
    })
}

/// 404 → NotFound, 409 → Conflict（status 書き込み時のみ）, それ以外 → Unavailable
pub fn map_error(
    key: &ReleaseKey,
    expected: Option<&ResourceVersion>,
    err: kube::Error,
) -> StoreError {
    match (&err, expected) {
        (kube::Error::Api(resp), _) if resp.code == 404 => StoreError::NotFound(key.clone()),
        (kube::Error::Api(resp), Some(expected)) if resp.code == 409 => StoreError::Conflict {
            key: key.clone(),
            expected: expected.clone(),
        },
        _ => StoreError::Unavailable(err.to_string()),
    }
}
