//! logop reconcile: one validation pass over a resource bundle followed by the
//! minimal set of status patches.
//!
//! Every object is registered for patching before any pass touches it; outputs
//! are validated before flows resolve against them, and the logging status is
//! aggregated last.

#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::time::Instant;

use logop_apply::{apply_plan, ApplyConfig, ApplyReport, PatchPlanner, PatchTransport, Plan, PlanError, ReconcileIncomplete};
use logop_core::bundle::ResourceBundle;
use logop_core::logging::NodeAgentConfig;
use logop_core::traverse::{FlowRefs, Targets};
use logop_core::{FlowStatus, Object, OutputStatus, ResourceSpec};
use logop_validate::{aggregate_logging_status, refresh_output_status, resolve_flow_refs, AggregateInput, OutputIndex, SecretResolver};
use metrics::histogram;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Incomplete(#[from] ReconcileIncomplete),
}

/// Result of the in-memory passes: what to write, plus the effective node agents.
#[derive(Debug, Default)]
pub struct Validated {
    pub plan: Plan,
    pub node_agents: BTreeMap<String, NodeAgentConfig>,
}

#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub report: ApplyReport,
    pub node_agents: BTreeMap<String, NodeAgentConfig>,
}

impl ReconcileOutcome {
    /// Err when any status patch failed; retrying the whole reconciliation is safe.
    pub fn into_result(self) -> Result<Self, ReconcileError> {
        let ReconcileOutcome { report, node_agents } = self;
        let report = report.into_result()?;
        Ok(ReconcileOutcome { report, node_agents })
    }
}

/// Run every validation pass over `bundle`, mutating statuses in place, and
/// plan the patches needed to persist them. Performs no I/O.
pub fn validate_bundle(bundle: &mut ResourceBundle, secrets: &dyn SecretResolver) -> Result<Validated, PlanError> {
    let mut planner = PatchPlanner::new();
    for obj in bundle.tracked() {
        planner.register(obj)?;
    }

    let ResourceBundle { logging, all_loggings, fluentd, syslog_ng, node_agents, logging_routes, watch_namespaces } =
        &mut *bundle;
    let error_output_ref = logging.spec.error_output_ref.clone();

    refresh_outputs(&mut fluentd.cluster_outputs, secrets, Some(error_output_ref.as_str()));
    refresh_outputs(&mut fluentd.outputs, secrets, None);
    refresh_outputs(&mut syslog_ng.cluster_outputs, secrets, Some(error_output_ref.as_str()));
    refresh_outputs(&mut syslog_ng.outputs, secrets, None);

    let index = OutputIndex::build(&fluentd.cluster_outputs, &fluentd.outputs);
    resolve_flows(&mut fluentd.cluster_flows, &index, &mut fluentd.cluster_outputs, &mut fluentd.outputs);
    resolve_flows(&mut fluentd.flows, &index, &mut fluentd.cluster_outputs, &mut fluentd.outputs);

    let index = OutputIndex::build(&syslog_ng.cluster_outputs, &syslog_ng.outputs);
    resolve_flows(&mut syslog_ng.cluster_flows, &index, &mut syslog_ng.cluster_outputs, &mut syslog_ng.outputs);
    resolve_flows(&mut syslog_ng.flows, &index, &mut syslog_ng.cluster_outputs, &mut syslog_ng.outputs);

    let input = AggregateInput {
        all_loggings,
        watch_namespaces,
        node_agents,
        has_logging_routes: !logging_routes.is_empty(),
        fluentd_config: fluentd.configuration.as_ref().map(|c| c.name()),
    };
    let node_agents = aggregate_logging_status(logging, &input);
    debug!(logging = %logging.name(), problems = logging.status.problems_count, "logging status aggregated");

    let plan = planner.plan(bundle.tracked())?;
    Ok(Validated { plan, node_agents })
}

fn refresh_outputs<S>(outputs: &mut [Object<S, OutputStatus>], secrets: &dyn SecretResolver, error_output_ref: Option<&str>)
where
    S: Targets + ResourceSpec,
{
    for output in outputs.iter_mut() {
        refresh_output_status(output, secrets, error_output_ref);
    }
}

fn resolve_flows<F, C, S>(
    flows: &mut [Object<F, FlowStatus>],
    index: &OutputIndex,
    cluster_outputs: &mut [Object<C, OutputStatus>],
    outputs: &mut [Object<S, OutputStatus>],
) where
    F: FlowRefs + ResourceSpec,
{
    for flow in flows.iter_mut() {
        resolve_flow_refs(flow, index, cluster_outputs, outputs);
    }
}

/// Reconciles bundles against one secret resolver and one patch transport.
pub struct Reconciler<'a> {
    secrets: &'a dyn SecretResolver,
    transport: &'a dyn PatchTransport,
    config: ApplyConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(secrets: &'a dyn SecretResolver, transport: &'a dyn PatchTransport) -> Self {
        Self { secrets, transport, config: ApplyConfig::default() }
    }

    pub fn with_config(mut self, config: ApplyConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate `bundle` and persist every status that changed.
    ///
    /// Patch failures do not abort the batch; they are reported in the outcome
    /// (see [`ReconcileOutcome::into_result`]).
    pub async fn reconcile(
        &self,
        bundle: &mut ResourceBundle,
        cancel: &CancellationToken,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let t0 = Instant::now();
        let logging = bundle.logging.name().to_string();
        let Validated { plan, node_agents } = validate_bundle(bundle, self.secrets)?;
        info!(logging = %logging, dirty = plan.requests.len(), unchanged = plan.unchanged.len(), "validation pass complete");

        let report = apply_plan(plan, self.transport, cancel, &self.config).await;
        histogram!("reconcile_latency_ms").record(t0.elapsed().as_secs_f64() * 1000.0);
        Ok(ReconcileOutcome { report, node_agents })
    }
}
