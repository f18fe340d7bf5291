#![forbid(unsafe_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use logop_apply::{ApplyConfig, DryRunTransport, PatchError, PatchTransport};
use logop_core::bundle::ResourceBundle;
use logop_core::fluentd::{
    ClusterFlow, ClusterFlowSpec, ClusterOutput, ClusterOutputSpec, FileOutput, Flow, FlowSpec, FluentdConfig,
    FluentdConfigSpec, HttpOutput, Output, OutputSpec,
};
use logop_core::logging::{Logging, LoggingSpec};
use logop_core::secret::Secret;
use logop_core::syslogng::{SyslogNGClusterOutput, SyslogNGClusterOutputSpec, SyslogNGFlow, SyslogNGFlowSpec, SyslogNGOutputSpec, SyslogOutput};
use logop_core::{Object, ResourceKey};
use logop_reconcile::{validate_bundle, Reconciler};
use logop_validate::SnapshotSecrets;
use serde_json::Value as Json;
use tokio_util::sync::CancellationToken;

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn file_spec() -> OutputSpec {
    OutputSpec { file: Some(FileOutput { path: "/var/log/out".into(), append: None }), ..Default::default() }
}

fn logging(name: &str, logging_ref: &str) -> Logging {
    Object::new(
        name,
        None,
        LoggingSpec { logging_ref: logging_ref.into(), control_namespace: "logging".into(), ..Default::default() },
    )
}

fn scenario_bundle() -> ResourceBundle {
    let mut b = ResourceBundle { logging: logging("main", ""), ..Default::default() };
    b.all_loggings = vec![b.logging.clone()];
    b.fluentd.cluster_outputs = vec![Object::new("g1", Some("logging"), ClusterOutputSpec { output: file_spec(), ..Default::default() })];
    b.fluentd.outputs = vec![Object::new("l1", Some("other"), file_spec())];
    b.fluentd.flows = vec![Object::new(
        "f1",
        Some("ns1"),
        FlowSpec { global_output_refs: strings(&["g1"]), local_output_refs: strings(&["l1"]), ..Default::default() },
    )];
    b
}

#[tokio::test]
async fn flow_with_resolved_global_and_dangling_local_ref() {
    let mut b = scenario_bundle();
    let secrets = SnapshotSecrets::default();
    let transport = DryRunTransport::new();
    let outcome = Reconciler::new(&secrets, &transport)
        .reconcile(&mut b, &CancellationToken::new())
        .await
        .unwrap()
        .into_result()
        .unwrap();

    let f1: &Flow = &b.fluentd.flows[0];
    assert_eq!(f1.status.active, Some(true));
    assert_eq!(f1.status.problems, vec!["dangling local output reference: l1"]);
    assert_eq!(f1.status.problems_count, 1);
    assert_eq!(b.fluentd.cluster_outputs[0].status.active, Some(true));
    assert_eq!(b.fluentd.outputs[0].status.active, Some(false));

    // the logging had nothing to report, so only its status stayed put
    assert_eq!(outcome.report.applied.len(), 3);
    assert_eq!(outcome.report.skipped, vec![b.logging.key()]);
    assert_eq!(transport.sent().len(), 3);
}

#[tokio::test]
async fn second_pass_over_unchanged_input_writes_nothing() {
    let mut b = scenario_bundle();
    b.syslog_ng.cluster_outputs = vec![Object::new(
        "sg",
        Some("logging"),
        SyslogNGClusterOutputSpec {
            output: SyslogNGOutputSpec { syslog: Some(SyslogOutput::default()), ..Default::default() },
            ..Default::default()
        },
    )];
    b.syslog_ng.flows = vec![Object::new(
        "sf",
        Some("ns1"),
        SyslogNGFlowSpec { global_output_refs: strings(&["sg", "nope"]), ..Default::default() },
    )];
    b.logging.status.config_check_results.insert("deadbeef".into(), false);

    let secrets = SnapshotSecrets::default();
    let transport = DryRunTransport::new();
    let reconciler = Reconciler::new(&secrets, &transport);
    let first = reconciler.reconcile(&mut b, &CancellationToken::new()).await.unwrap();
    assert!(!first.report.applied.is_empty());
    let after_first = b.clone();
    assert_eq!(transport.take().len(), first.report.applied.len());

    let second = reconciler.reconcile(&mut b, &CancellationToken::new()).await.unwrap();
    assert!(second.report.applied.is_empty());
    assert!(second.report.failures.is_empty());
    assert_eq!(second.report.skipped.len(), first.report.applied.len() + first.report.skipped.len());
    assert!(transport.sent().is_empty());
    assert_eq!(b, after_first);
}

#[test]
fn registering_without_mutation_plans_no_patch() {
    let mut b = scenario_bundle();
    let secrets = SnapshotSecrets::default();
    validate_bundle(&mut b, &secrets).unwrap();
    // statuses are now current; a fresh pass must find nothing to write
    let validated = validate_bundle(&mut b, &secrets).unwrap();
    assert!(validated.plan.is_noop());
    assert_eq!(validated.plan.unchanged.len(), b.tracked().len());
}

#[test]
fn shared_logging_ref_is_reported_on_each_logging() {
    let a = logging("a", "shared");
    let other = logging("b", "shared");
    let all = vec![a.clone(), other.clone()];
    let secrets = SnapshotSecrets::default();

    for (me, them) in [(a, "b"), (other, "a")] {
        let mut b = ResourceBundle { logging: me, all_loggings: all.clone(), ..Default::default() };
        validate_bundle(&mut b, &secrets).unwrap();
        assert_eq!(b.logging.status.problems_count, 1);
        assert!(
            b.logging.status.problems[0].contains(&format!("same loggingRef: {}.", them)),
            "{:?}",
            b.logging.status.problems
        );
    }
}

#[test]
fn every_resolved_reference_activates_both_ends() {
    let mut b = scenario_bundle();
    b.fluentd.outputs.push(Object::new("l1", Some("ns1"), file_spec()));
    b.fluentd.cluster_flows = vec![Object::new(
        "cf",
        Some("logging"),
        ClusterFlowSpec { global_output_refs: strings(&["g1"]), ..Default::default() },
    )];
    let secrets = SnapshotSecrets::default();
    validate_bundle(&mut b, &secrets).unwrap();

    let f1: &Flow = &b.fluentd.flows[0];
    assert!(f1.status.problems.is_empty());
    assert!(f1.status.is_active());
    let cf: &ClusterFlow = &b.fluentd.cluster_flows[0];
    assert!(cf.status.is_active());
    let g1: &ClusterOutput = &b.fluentd.cluster_outputs[0];
    assert!(g1.status.is_active());
    let l1_ns1: &Output = &b.fluentd.outputs[1];
    assert!(l1_ns1.status.is_active());
    assert!(!b.fluentd.outputs[0].status.is_active());
}

#[test]
fn outputs_report_cardinality_and_secret_problems() {
    let mut b = scenario_bundle();
    b.fluentd.outputs = vec![
        Object::new("none", Some("ns1"), OutputSpec::default()),
        Object::new(
            "two",
            Some("ns1"),
            OutputSpec {
                file: Some(FileOutput::default()),
                http: Some(HttpOutput { endpoint: "http://x".into(), ..Default::default() }),
                ..Default::default()
            },
        ),
        Object::new(
            "secret",
            Some("ns1"),
            OutputSpec {
                http: Some(HttpOutput {
                    auth: Some(logop_core::fluentd::HttpAuth { username: Some(Secret::from_secret_key("creds", "user")), password: None }),
                    ..Default::default()
                }),
                ..Default::default()
            },
        ),
    ];
    let secrets = SnapshotSecrets::default();
    validate_bundle(&mut b, &secrets).unwrap();
    let problems: Vec<&[String]> = b.fluentd.outputs.iter().map(|o| o.status.problems.as_slice()).collect();
    assert_eq!(problems[0], ["no output target configured".to_string()]);
    assert_eq!(problems[1], ["multiple output targets configured: [http, file]".to_string()]);
    assert_eq!(problems[2], ["failed to get kubernetes secret ns1:creds".to_string()]);
}

#[test]
fn error_output_is_active_without_any_flow() {
    let mut b = scenario_bundle();
    b.fluentd.flows.clear();
    b.logging.spec.error_output_ref = "g1".into();
    b.syslog_ng.cluster_outputs = vec![SyslogNGClusterOutput::new("other", Some("logging"), Default::default())];
    validate_bundle(&mut b, &SnapshotSecrets::default()).unwrap();
    assert_eq!(b.fluentd.cluster_outputs[0].status.active, Some(true));
    assert_eq!(b.syslog_ng.cluster_outputs[0].status.active, Some(false));
}

#[test]
fn fluentd_config_reference_supersedes_inline_config() {
    let mut b = scenario_bundle();
    b.logging.spec.fluentd = Some(serde_json::json!({ "replicas": 1 }));
    let cfg: FluentdConfig = Object::new("fd", Some("logging"), FluentdConfigSpec(serde_json::json!({})));
    b.fluentd.configuration = Some(cfg);
    let validated = validate_bundle(&mut b, &SnapshotSecrets::default()).unwrap();
    assert!(b.logging.spec.fluentd.is_none());
    assert_eq!(b.logging.status.problems_count, 1);
    // the config resource itself was registered but not changed
    let fd_key = b.fluentd.configuration.as_ref().unwrap().key();
    assert!(validated.plan.unchanged.contains(&fd_key));
}

#[test]
fn logging_problems_are_identical_across_runs() {
    let build = || {
        let mut b = scenario_bundle();
        b.all_loggings = vec![logging("main", ""), logging("z", ""), logging("y", "")];
        b.logging.status.config_check_results.insert("b".into(), false);
        b.logging.status.config_check_results.insert("a".into(), false);
        b
    };
    let secrets = SnapshotSecrets::default();
    let mut one = build();
    let mut two = build();
    validate_bundle(&mut one, &secrets).unwrap();
    validate_bundle(&mut two, &secrets).unwrap();
    assert_eq!(
        serde_json::to_string(&one.logging.status).unwrap(),
        serde_json::to_string(&two.logging.status).unwrap()
    );
    assert_eq!(one.logging.status.problems_count, 3);
}

struct FlakyTransport {
    fail: &'static str,
    calls: AtomicUsize,
}

#[async_trait]
impl PatchTransport for FlakyTransport {
    async fn apply_status_patch(&self, key: &ResourceKey, _before: &Json, _after: &Json) -> Result<(), PatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if key.name == self.fail {
            return Err(PatchError::Transport("the object has been modified".into()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn failing_patch_is_attributed_and_others_still_apply() {
    let mut b = scenario_bundle();
    b.syslog_ng.flows = vec![SyslogNGFlow::new("sf", Some("ns1"), SyslogNGFlowSpec::default())];
    let transport = FlakyTransport { fail: "g1", calls: AtomicUsize::new(0) };
    let secrets = SnapshotSecrets::default();
    let outcome = Reconciler::new(&secrets, &transport)
        .with_config(ApplyConfig { concurrency: 1, ..Default::default() })
        .reconcile(&mut b, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(transport.calls.load(Ordering::SeqCst), 4);
    assert_eq!(outcome.report.applied.len(), 3);
    let err = outcome.into_result().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("ClusterOutput/logging/g1"), "{}", msg);
    assert!(msg.contains("1 status patch(es) failed"), "{}", msg);
}

#[tokio::test]
async fn cancelled_reconciliation_surfaces_cancellation() {
    let mut b = scenario_bundle();
    let cancel = CancellationToken::new();
    cancel.cancel();
    let transport = DryRunTransport::new();
    let outcome = Reconciler::new(&SnapshotSecrets::default(), &transport)
        .reconcile(&mut b, &cancel)
        .await
        .unwrap();
    assert!(transport.sent().is_empty());
    assert!(outcome.report.failures.iter().all(|(_, e)| *e == PatchError::Cancelled));
    match outcome.into_result() {
        Err(logop_reconcile::ReconcileError::Incomplete(e)) => assert!(e.is_cancelled()),
        other => panic!("expected cancellation, got {:?}", other.map(|o| o.report)),
    }
}
