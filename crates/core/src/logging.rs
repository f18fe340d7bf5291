//! The parent `Logging` resource and node agents.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use serde::{Deserialize, Serialize};

use crate::{Object, ResourceSpec};

pub type Logging = Object<LoggingSpec, LoggingStatus>;
pub type NodeAgent = Object<NodeAgentSpec, NodeAgentStatus>;
pub type LoggingRoute = Object<LoggingRouteSpec, serde_json::Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingSpec {
    /// Groups the outputs and flows belonging to this logging.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logging_ref: String,
    #[serde(default)]
    pub control_namespace: String,
    /// ClusterOutput receiving records that failed elsewhere; always active.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_output_ref: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watch_namespaces: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_namespace_selector: Option<LabelSelector>,
    /// Inline fluentd aggregator config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluentd: Option<serde_json::Value>,
    /// Embedded fluent-bit agent config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fluentbit: Option<serde_json::Value>,
    #[serde(default, rename = "syslogNG", skip_serializing_if = "Option::is_none")]
    pub syslog_ng: Option<serde_json::Value>,
    /// Deprecated inline node agents.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_agents: Vec<InlineNodeAgent>,
}

impl ResourceSpec for LoggingSpec {
    const KIND: &'static str = "Logging";
}

impl Object<LoggingSpec, LoggingStatus> {
    /// No explicit namespace list and no selector: every namespace is watched.
    pub fn watch_all_namespaces(&self) -> bool {
        self.spec.watch_namespaces.is_empty() && self.spec.watch_namespace_selector.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<String>,
    #[serde(default)]
    pub problems_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watch_namespaces: Vec<String>,
    /// Config checksum -> dry-run check result.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config_check_results: BTreeMap<String, bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAgentConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_agent_fluentbit: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAgentSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub logging_ref: String,
    #[serde(flatten)]
    pub config: NodeAgentConfig,
}

impl ResourceSpec for NodeAgentSpec {
    const KIND: &'static str = "NodeAgent";
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeAgentStatus {}

/// Node agent declared inside `Logging.spec.nodeAgents`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineNodeAgent {
    pub name: String,
    #[serde(flatten)]
    pub config: NodeAgentConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingRouteSpec {
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<LabelSelector>,
}

impl ResourceSpec for LoggingRouteSpec {
    const KIND: &'static str = "LoggingRoute";
}
