//! The resource bundle: one consistent in-memory snapshot per reconciliation.

use serde::{Deserialize, Serialize};

use crate::fluentd::FluentdResources;
use crate::logging::{Logging, LoggingRoute, NodeAgent};
use crate::syslogng::SyslogNGResources;
use crate::Tracked;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceBundle {
    /// The logging under reconciliation.
    pub logging: Logging,
    /// Every logging of the cluster, used for duplicate `loggingRef` detection.
    #[serde(default)]
    pub all_loggings: Vec<Logging>,
    #[serde(default)]
    pub fluentd: FluentdResources,
    #[serde(default, rename = "syslogNG")]
    pub syslog_ng: SyslogNGResources,
    #[serde(default)]
    pub node_agents: Vec<NodeAgent>,
    #[serde(default)]
    pub logging_routes: Vec<LoggingRoute>,
    /// Namespaces resolved from the watch list and selector.
    #[serde(default)]
    pub watch_namespaces: Vec<String>,
}

impl ResourceBundle {
    /// Every object whose status the reconciler may patch, in pass order.
    pub fn tracked(&self) -> Vec<&dyn Tracked> {
        let mut out: Vec<&dyn Tracked> = Vec::new();
        out.extend(self.fluentd.cluster_outputs.iter().map(|o| o as &dyn Tracked));
        out.extend(self.fluentd.outputs.iter().map(|o| o as &dyn Tracked));
        out.extend(self.syslog_ng.cluster_outputs.iter().map(|o| o as &dyn Tracked));
        out.extend(self.syslog_ng.outputs.iter().map(|o| o as &dyn Tracked));
        out.extend(self.fluentd.cluster_flows.iter().map(|f| f as &dyn Tracked));
        out.extend(self.fluentd.flows.iter().map(|f| f as &dyn Tracked));
        if let Some(cfg) = &self.fluentd.configuration {
            out.push(cfg);
        }
        out.extend(self.syslog_ng.cluster_flows.iter().map(|f| f as &dyn Tracked));
        out.extend(self.syslog_ng.flows.iter().map(|f| f as &dyn Tracked));
        out.push(&self.logging);
        out
    }

    pub fn has_logging_routes(&self) -> bool {
        !self.logging_routes.is_empty()
    }
}
