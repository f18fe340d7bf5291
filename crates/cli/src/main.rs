use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use k8s_openapi::api::core::v1::Secret as KubeSecret;
use logop_apply::{ApplyConfig, ApplyReport, DryRunTransport, PatchTransport};
use logop_core::bundle::ResourceBundle;
use logop_core::logging::NodeAgentConfig;
use logop_core::ResourceKey;
use logop_reconcile::Reconciler;
use logop_validate::SnapshotSecrets;
use serde::Serialize;
use serde_json::Value as Json;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "logopctl", version, about = "Validate logging resources and persist their statuses")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Args, Debug)]
struct BundleArgs {
    /// YAML resource bundle: the logging under reconciliation plus its outputs and flows
    #[arg(long = "bundle")]
    bundle: PathBuf,
    /// YAML list of kubernetes Secrets that secret references resolve against
    #[arg(long = "secrets")]
    secrets: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every validation pass offline and print the planned status patches
    Validate {
        #[command(flatten)]
        args: BundleArgs,
    },
    /// Validate, then send the status patches to the cluster
    Apply {
        #[command(flatten)]
        args: BundleArgs,
        /// Field manager recorded on status patches
        #[arg(long = "field-manager", env = "LOGOP_FIELD_MANAGER", default_value = "logop")]
        field_manager: String,
    },
}

fn init_tracing() {
    let env = std::env::var("LOGOP_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("LOGOP_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid LOGOP_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_bundle(path: &Path) -> Result<ResourceBundle> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading bundle {}", path.display()))?;
    serde_yaml::from_str(&raw).with_context(|| format!("parsing bundle {}", path.display()))
}

fn load_secrets(path: Option<&Path>) -> Result<SnapshotSecrets> {
    let Some(path) = path else { return Ok(SnapshotSecrets::default()) };
    let raw = std::fs::read_to_string(path).with_context(|| format!("reading secrets {}", path.display()))?;
    let list: Vec<KubeSecret> = serde_yaml::from_str(&raw).with_context(|| format!("parsing secrets {}", path.display()))?;
    Ok(SnapshotSecrets::new(list))
}

/// Cancel `token` on Ctrl-C; outstanding patches then report as cancelled.
fn cancel_on_ctrl_c(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received; cancelling outstanding patches");
            token.cancel();
        }
    });
}

#[derive(Serialize)]
struct Problems {
    key: ResourceKey,
    problems: Vec<String>,
}

#[derive(Serialize)]
struct Summary<'a> {
    problems: Vec<Problems>,
    patches: Vec<(ResourceKey, Json)>,
    applied: &'a [ResourceKey],
    skipped: &'a [ResourceKey],
    failures: Vec<(ResourceKey, String)>,
    node_agents: &'a BTreeMap<String, NodeAgentConfig>,
}

fn collect_problems(bundle: &ResourceBundle) -> Result<Vec<Problems>> {
    let mut out = Vec::new();
    for obj in bundle.tracked() {
        let snap = obj.snapshot()?;
        let problems: Vec<String> = snap
            .get("status")
            .and_then(|s| s.get("problems"))
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        if !problems.is_empty() {
            out.push(Problems { key: obj.key(), problems });
        }
    }
    Ok(out)
}

fn print_summary(output: Output, summary: &Summary<'_>) -> Result<()> {
    match output {
        Output::Json => println!("{}", serde_json::to_string_pretty(summary)?),
        Output::Human => {
            for p in &summary.problems {
                println!("{}", p.key);
                for msg in &p.problems {
                    println!("  - {}", msg);
                }
            }
            for (key, patch) in &summary.patches {
                println!("patch {} {}", key, serde_json::to_string(patch)?);
            }
            for (key, err) in &summary.failures {
                println!("failed {}: {}", key, err);
            }
            for name in summary.node_agents.keys() {
                println!("node agent {}", name);
            }
            println!(
                "{} problem resource(s), {} applied, {} unchanged, {} failed",
                summary.problems.len(),
                summary.applied.len(),
                summary.skipped.len(),
                summary.failures.len()
            );
        }
    }
    Ok(())
}

async fn run(
    output: Output,
    args: &BundleArgs,
    transport: &dyn PatchTransport,
    recorded: Option<&DryRunTransport>,
) -> Result<ApplyReport> {
    let mut bundle = load_bundle(&args.bundle)?;
    let secrets = load_secrets(args.secrets.as_deref())?;
    info!(logging = %bundle.logging.name(), secrets = secrets.len(), "bundle loaded");

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(&cancel);
    let outcome = Reconciler::new(&secrets, transport)
        .with_config(ApplyConfig::from_env())
        .reconcile(&mut bundle, &cancel)
        .await?;

    let summary = Summary {
        problems: collect_problems(&bundle)?,
        patches: recorded.map(DryRunTransport::take).unwrap_or_default(),
        applied: &outcome.report.applied,
        skipped: &outcome.report.skipped,
        failures: outcome.report.failures.iter().map(|(k, e)| (k.clone(), e.to_string())).collect(),
        node_agents: &outcome.node_agents,
    };
    print_summary(output, &summary)?;
    Ok(outcome.report)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    let report = match &cli.command {
        Commands::Validate { args } => {
            let transport = DryRunTransport::new();
            run(cli.output, args, &transport, Some(&transport)).await?
        }
        Commands::Apply { args, field_manager } => {
            let client = logop_kubehub::get_kube_client().await?;
            let transport = logop_kubehub::KubeStatusPatcher::new(client, field_manager);
            run(cli.output, args, &transport, None).await?
        }
    };

    if !report.is_complete() {
        warn!(failed = report.failures.len(), "reconciliation incomplete; rerun to retry");
    }
    report.into_result()?;
    Ok(())
}
