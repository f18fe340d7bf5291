//! Logging-level status aggregation.

use std::collections::BTreeMap;

use logop_core::logging::{Logging, LoggingStatus, NodeAgent, NodeAgentConfig};
use tracing::warn;

/// Label carried by config-check secrets and pods.
pub const CONFIGCHECK_HASH_LABEL: &str = "logging.banzaicloud.io/configcheck-hash";

pub const SELECTOR_MATCHED_NOTHING: &str = "Defined watchNamespaceSelector did not match any namespaces";

pub const ROUTES_WITH_EMBEDDED_FLUENTBIT: &str =
    "Logging routes are not supported for embedded fluentbit configs, please use a separate FluentbitAgent resource!";

/// Everything besides the logging itself that feeds its status.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateInput<'a> {
    pub all_loggings: &'a [Logging],
    pub watch_namespaces: &'a [String],
    pub node_agents: &'a [NodeAgent],
    pub has_logging_routes: bool,
    /// Name of the standalone FluentdConfig, when one exists.
    pub fluentd_config: Option<&'a str>,
}

/// Recompute `logging.status` from scratch and return the effective node agents
/// (standalone definitions win over inline ones).
///
/// May clear `logging.spec.fluentd` when a standalone FluentdConfig supersedes it.
pub fn aggregate_logging_status(logging: &mut Logging, input: &AggregateInput<'_>) -> BTreeMap<String, NodeAgentConfig> {
    logging.status.problems.clear();
    logging.status.watch_namespaces.clear();

    if !logging.watch_all_namespaces() {
        logging.status.watch_namespaces = input.watch_namespaces.to_vec();
    }
    if logging.spec.watch_namespace_selector.is_some() && logging.status.watch_namespaces.is_empty() {
        logging.status.problems.push(SELECTOR_MATCHED_NOTHING.to_string());
    }

    let same_ref: Vec<&str> = input
        .all_loggings
        .iter()
        .filter(|l| l.name() != logging.name())
        .filter(|l| l.spec.logging_ref == logging.spec.logging_ref)
        .map(|l| l.name())
        .collect();
    if !same_ref.is_empty() {
        let problem = format!(
            "Deprecated behaviour! Other logging resources exist with the same loggingRef: {}. This is going to be an error with the next major release.",
            same_ref.join(",")
        );
        warn!(logging = %logging.name(), "{}", problem);
        logging.status.problems.push(problem);
    }

    let control_ns = logging.spec.control_namespace.as_str();
    let failed: Vec<String> = logging
        .status
        .config_check_results
        .iter()
        .filter(|(_, ok)| !**ok)
        .map(|(hash, _)| config_check_problem(hash, control_ns))
        .collect();
    logging.status.problems.extend(failed);

    let agents = merge_node_agents(logging, input.node_agents);

    if logging.spec.fluentbit.is_some() && input.has_logging_routes {
        logging.status.problems.push(ROUTES_WITH_EMBEDDED_FLUENTBIT.to_string());
    }

    if let Some(name) = input.fluentd_config {
        if logging.spec.fluentd.take().is_some() {
            logging.status.problems.push(format!(
                "Fluentd configuration reference set (name={}), but inline fluentd configuration found is set as well, clearing inline",
                name
            ));
        }
    }

    normalize_problems(&mut logging.status);
    agents
}

fn config_check_problem(hash: &str, control_ns: &str) -> String {
    format!(
        "Configuration with checksum {hash} has failed. \
         Config secrets: `kubectl get secret -n {ns} -l {label}={hash}`. \
         Configcheck pod log: `kubectl logs -n {ns} -l {label}={hash} --tail -1`",
        hash = hash,
        ns = control_ns,
        label = CONFIGCHECK_HASH_LABEL,
    )
}

fn merge_node_agents(logging: &mut Logging, standalone: &[NodeAgent]) -> BTreeMap<String, NodeAgentConfig> {
    let mut agents: BTreeMap<String, NodeAgentConfig> =
        standalone.iter().map(|a| (a.name().to_string(), a.spec.config.clone())).collect();
    for inline in &logging.spec.node_agents {
        if agents.contains_key(&inline.name) {
            logging.status.problems.push(format!(
                "NodeAgent resource overrides inline nodeAgent definition ({}) in Logging resource",
                inline.name
            ));
        } else {
            agents.insert(inline.name.clone(), inline.config.clone());
            logging.status.problems.push(format!(
                "inline nodeAgent definition ({}) in Logging resource is deprecated, use standalone NodeAgent CRD instead!",
                inline.name
            ));
        }
    }
    agents
}

/// Sort problems and refresh the count, so unchanged input yields identical status.
pub fn normalize_problems(status: &mut LoggingStatus) {
    status.problems.sort();
    status.problems_count = status.problems.len();
}
