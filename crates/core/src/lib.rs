//! logop core types: logging resources, resource identity and capability traversal.

#![forbid(unsafe_code)]

use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};

pub mod bundle;
pub mod fluentd;
pub mod logging;
pub mod secret;
pub mod syslogng;
pub mod traverse;

/// API group of every resource reconciled here.
pub const GROUP: &str = "logging.banzaicloud.io";
/// API version of every resource reconciled here.
pub const VERSION: &str = "v1beta1";

/// Static type information attached to a spec type.
pub trait ResourceSpec {
    const KIND: &'static str;
}

/// Generic Kubernetes-shaped object: metadata + spec + status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(bound(
    serialize = "S: Serialize, T: Serialize",
    deserialize = "S: serde::de::DeserializeOwned + Default, T: serde::de::DeserializeOwned + Default"
))]
pub struct Object<S, T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: S,
    #[serde(default)]
    pub status: T,
}

impl<S: ResourceSpec, T: Default> Object<S, T> {
    pub fn new(name: &str, namespace: Option<&str>, spec: S) -> Self {
        Self {
            api_version: Some(format!("{}/{}", GROUP, VERSION)),
            kind: Some(S::KIND.to_string()),
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: namespace.map(|s| s.to_string()),
                ..Default::default()
            },
            spec,
            status: T::default(),
        }
    }
}

impl<S: ResourceSpec, T> Object<S, T> {
    pub fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }

    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            kind: S::KIND,
            namespace: self.metadata.namespace.clone(),
            name: self.name().to_string(),
        }
    }
}

/// Status shared by outputs and flows of both backends.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<String>,
    #[serde(default)]
    pub problems_count: usize,
}

impl ResourceStatus {
    /// Drop everything computed by a previous pass.
    pub fn reset(&mut self) {
        self.active = Some(false);
        self.problems.clear();
        self.problems_count = 0;
    }

    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(false)
    }
}

pub type OutputStatus = ResourceStatus;
pub type FlowStatus = ResourceStatus;

/// Identity of a reconciled object: kind plus (optional) namespace and name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ResourceKey {
    pub kind: &'static str,
    pub namespace: Option<String>,
    pub name: String,
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// Anything whose status can be captured and later diffed.
pub trait Tracked {
    fn key(&self) -> ResourceKey;
    fn snapshot(&self) -> serde_json::Result<serde_json::Value>;
}

impl<S, T> Tracked for Object<S, T>
where
    S: ResourceSpec + Serialize,
    T: Serialize,
{
    fn key(&self) -> ResourceKey {
        Object::key(self)
    }

    fn snapshot(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}

pub mod prelude {
    pub use super::bundle::ResourceBundle;
    pub use super::logging::{Logging, NodeAgent, NodeAgentConfig};
    pub use super::secret::Secret;
    pub use super::traverse::{FlowRefs, Inspect, Targets};
    pub use super::{Object, OutputStatus, FlowStatus, ResourceKey, ResourceSpec, ResourceStatus, Tracked};
}
