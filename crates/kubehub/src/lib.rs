//! logop kubehub: kube client bootstrap and the status-subresource patch transport.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use kube::{
    api::{Api, Patch, PatchParams},
    core::{ApiResource, DynamicObject, GroupVersionKind},
    Client,
};
use logop_apply::{status_patch, PatchError, PatchTransport};
use logop_core::{ResourceKey, GROUP, VERSION};
use metrics::counter;
use serde_json::Value as Json;
use tracing::{debug, info};

/// Client for the current kubeconfig context or in-cluster service account.
pub async fn get_kube_client() -> Result<Client> {
    let client = Client::try_default().await.context("building kube client from default config")?;
    info!(default_ns = %client.default_namespace(), "kube client ready");
    Ok(client)
}

/// API resource for one of the logging kinds.
pub fn api_resource(kind: &str) -> ApiResource {
    ApiResource::from_gvk(&GroupVersionKind::gvk(GROUP, VERSION, kind))
}

/// Sends status merge patches through the `status` subresource.
#[derive(Clone)]
pub struct KubeStatusPatcher {
    client: Client,
    params: PatchParams,
}

impl KubeStatusPatcher {
    pub fn new(client: Client, field_manager: &str) -> Self {
        let params = PatchParams { field_manager: Some(field_manager.to_string()), ..Default::default() };
        Self { client, params }
    }

    fn api_for(&self, key: &ResourceKey) -> Api<DynamicObject> {
        let ar = api_resource(key.kind);
        match key.namespace.as_deref() {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &ar),
            None => Api::all_with(self.client.clone(), &ar),
        }
    }
}

#[async_trait]
impl PatchTransport for KubeStatusPatcher {
    async fn apply_status_patch(&self, key: &ResourceKey, before: &Json, after: &Json) -> Result<(), PatchError> {
        let Some(patch) = status_patch(before, after) else {
            debug!(key = %key, "empty status patch; nothing to send");
            return Ok(());
        };
        let api = self.api_for(key);
        match api.patch_status(&key.name, &self.params, &Patch::Merge(&patch)).await {
            Ok(_) => {
                counter!("kube_status_patch_ok").increment(1);
                Ok(())
            }
            Err(e) => {
                counter!("kube_status_patch_err").increment(1);
                Err(PatchError::Transport(format!("{}: {}", key, e)))
            }
        }
    }
}
