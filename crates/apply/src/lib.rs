//! logop apply: before-snapshot arena, status diffs and batch patch application.

#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use futures::StreamExt;
use logop_core::ResourceKey;
use metrics::{counter, histogram};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod diff;
pub mod plan;
pub mod transport;

pub use diff::{merge_diff, status_patch};
pub use plan::{PatchPlanner, PatchRequest, Plan, PlanError};
pub use transport::{DryRunTransport, PatchError, PatchTransport};

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|s| s.parse::<T>().ok()).unwrap_or(default)
}

/// Knobs for the application phase.
#[derive(Debug, Clone)]
pub struct ApplyConfig {
    /// Patches in flight at once; 1 means sequential.
    pub concurrency: usize,
    /// Per-patch deadline.
    pub timeout: Duration,
}

impl Default for ApplyConfig {
    fn default() -> Self {
        Self { concurrency: 4, timeout: Duration::from_millis(10_000) }
    }
}

impl ApplyConfig {
    /// Read `LOGOP_PATCH_CONCURRENCY` and `LOGOP_PATCH_TIMEOUT_MS`, falling back to defaults.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            concurrency: env_or("LOGOP_PATCH_CONCURRENCY", d.concurrency).max(1),
            timeout: Duration::from_millis(env_or("LOGOP_PATCH_TIMEOUT_MS", d.timeout.as_millis() as u64)),
        }
    }
}

/// Per-object results of one application phase.
#[derive(Debug, Default)]
pub struct ApplyReport {
    pub applied: Vec<ResourceKey>,
    pub skipped: Vec<ResourceKey>,
    pub failures: Vec<(ResourceKey, PatchError)>,
}

impl ApplyReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Ok when every dirty object was persisted.
    pub fn into_result(self) -> Result<Self, ReconcileIncomplete> {
        if self.failures.is_empty() {
            Ok(self)
        } else {
            Err(ReconcileIncomplete { failures: self.failures })
        }
    }
}

/// Some status patches failed; whatever else succeeded is durable.
#[derive(Debug, Error)]
#[error("{}", describe_failures(.failures))]
pub struct ReconcileIncomplete {
    pub failures: Vec<(ResourceKey, PatchError)>,
}

impl ReconcileIncomplete {
    pub fn is_cancelled(&self) -> bool {
        self.failures.iter().any(|(_, e)| matches!(e, PatchError::Cancelled))
    }
}

fn describe_failures(failures: &[(ResourceKey, PatchError)]) -> String {
    let mut out = format!("reconciliation incomplete: {} status patch(es) failed", failures.len());
    for (key, err) in failures {
        out.push_str(&format!("; {}: {}", key, err));
    }
    out
}

/// Submit every dirty request, collecting failures instead of stopping at the first.
///
/// Cancellation aborts outstanding submissions, which then report
/// [`PatchError::Cancelled`].
pub async fn apply_plan(
    plan: Plan,
    transport: &dyn PatchTransport,
    cancel: &CancellationToken,
    cfg: &ApplyConfig,
) -> ApplyReport {
    let t0 = Instant::now();
    let mut report = ApplyReport { skipped: plan.unchanged, ..Default::default() };
    counter!("status_patch_skipped_total").increment(report.skipped.len() as u64);
    for key in &report.skipped {
        debug!(key = %key, "status unchanged; skipping patch");
    }

    let results: Vec<(ResourceKey, Result<(), PatchError>)> = futures::stream::iter(plan.requests)
        .map(|req| submit(req, transport, cancel, cfg.timeout))
        .buffer_unordered(cfg.concurrency.max(1))
        .collect()
        .await;

    for (key, res) in results {
        match res {
            Ok(()) => report.applied.push(key),
            Err(e) => {
                warn!(key = %key, error = %e, "status patch failed");
                report.failures.push((key, e));
            }
        }
    }
    report.applied.sort();
    report.failures.sort_by(|a, b| a.0.cmp(&b.0));

    counter!("status_patch_applied_total").increment(report.applied.len() as u64);
    counter!("status_patch_failed_total").increment(report.failures.len() as u64);
    histogram!("status_patch_batch_ms").record(t0.elapsed().as_secs_f64() * 1000.0);
    info!(
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        failed = report.failures.len(),
        "status patches submitted"
    );
    report
}

async fn submit(
    req: PatchRequest,
    transport: &dyn PatchTransport,
    cancel: &CancellationToken,
    timeout: Duration,
) -> (ResourceKey, Result<(), PatchError>) {
    if cancel.is_cancelled() {
        return (req.key, Err(PatchError::Cancelled));
    }
    // each submission works on its own copy of the desired value
    let after = req.after.clone();
    let res = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PatchError::Cancelled),
        r = tokio::time::timeout(timeout, transport.apply_status_patch(&req.key, &req.before, &after)) => match r {
            Ok(r) => r,
            Err(_) => Err(PatchError::Timeout(timeout)),
        },
    };
    (req.key, res)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use logop_core::fluentd::{Output, OutputSpec};
    use logop_core::{Object, Tracked};
    use serde_json::Value as Json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dirty_plan(names: &[&str]) -> Plan {
        let mut planner = PatchPlanner::new();
        let mut objs: Vec<Output> = names.iter().map(|n| Object::new(n, Some("ns"), OutputSpec::default())).collect();
        for o in &objs {
            planner.register(o).unwrap();
        }
        for o in objs.iter_mut() {
            o.status.active = Some(true);
        }
        planner.plan(objs.iter().map(|o| o as &dyn Tracked)).unwrap()
    }

    struct FailOn(&'static str, AtomicUsize);

    #[async_trait]
    impl PatchTransport for FailOn {
        async fn apply_status_patch(&self, key: &ResourceKey, _b: &Json, _a: &Json) -> Result<(), PatchError> {
            self.1.fetch_add(1, Ordering::SeqCst);
            if key.name == self.0 {
                Err(PatchError::Transport("conflict".into()))
            } else {
                Ok(())
            }
        }
    }

    struct Hang;

    #[async_trait]
    impl PatchTransport for Hang {
        async fn apply_status_patch(&self, _k: &ResourceKey, _b: &Json, _a: &Json) -> Result<(), PatchError> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_the_batch() {
        let t = FailOn("b", AtomicUsize::new(0));
        let cfg = ApplyConfig { concurrency: 1, ..Default::default() };
        let report = apply_plan(dirty_plan(&["a", "b", "c"]), &t, &CancellationToken::new(), &cfg).await;
        assert_eq!(t.1.load(Ordering::SeqCst), 3);
        let applied: Vec<_> = report.applied.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(applied, vec!["a", "c"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0.name, "b");
        let err = report.into_result().unwrap_err();
        assert!(err.to_string().contains("Output/ns/b: status patch failed: conflict"), "{}", err);
        assert!(!err.is_cancelled());
    }

    #[test]
    fn incomplete_error_lists_every_failing_key() {
        let key = |n: &str| ResourceKey { kind: "Flow", namespace: Some("ns".into()), name: n.into() };
        let err = ReconcileIncomplete {
            failures: vec![(key("a"), PatchError::Cancelled), (key("b"), PatchError::Transport("gone".into()))],
        };
        assert!(err.is_cancelled());
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(err);
        assert_eq!(
            boxed.to_string(),
            "reconciliation incomplete: 2 status patch(es) failed; Flow/ns/a: status patch cancelled; Flow/ns/b: status patch failed: gone"
        );
        assert!(boxed.source().is_none());
    }

    #[tokio::test]
    async fn unchanged_objects_never_reach_the_transport() {
        let t = DryRunTransport::new();
        let o: Output = Object::new("a", Some("ns"), OutputSpec::default());
        let mut planner = PatchPlanner::new();
        planner.register(&o).unwrap();
        let plan = planner.plan([&o as &dyn Tracked]).unwrap();
        let report = apply_plan(plan, &t, &CancellationToken::new(), &ApplyConfig::default()).await;
        assert!(t.sent().is_empty());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn cancellation_aborts_outstanding_patches() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });
        let cfg = ApplyConfig { concurrency: 2, timeout: Duration::from_secs(30) };
        let report = apply_plan(dirty_plan(&["a", "b", "c"]), &Hang, &cancel, &cfg).await;
        assert!(report.applied.is_empty());
        assert_eq!(report.failures.len(), 3);
        assert!(report.failures.iter().all(|(_, e)| *e == PatchError::Cancelled));
        assert!(report.into_result().unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn slow_transport_times_out() {
        let cfg = ApplyConfig { concurrency: 4, timeout: Duration::from_millis(10) };
        let report = apply_plan(dirty_plan(&["a"]), &Hang, &CancellationToken::new(), &cfg).await;
        assert_eq!(report.failures, vec![(report.failures[0].0.clone(), PatchError::Timeout(Duration::from_millis(10)))]);
    }

    #[tokio::test]
    async fn dry_run_records_status_patches() {
        let t = DryRunTransport::new();
        let report = apply_plan(dirty_plan(&["a"]), &t, &CancellationToken::new(), &ApplyConfig::default()).await;
        assert_eq!(report.applied.len(), 1);
        let sent = t.take();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, serde_json::json!({ "status": { "active": true } }));
        assert!(t.sent().is_empty());
    }
}
