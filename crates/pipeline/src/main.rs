//! PaperPulse pipeline binary
//!
//! Cron-driven entry point. Wall-clock scheduling lives outside; this
//! binary runs one job, the whole chain, maintenance, or a status
//! lookup, then exits:
//!
//!   pipeline run <kind> [--limit N]
//!   pipeline run-all [--limit N]
//!   pipeline compact [--keep-days N]
//!   pipeline status [kind]

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use paperpulse_common::config::AppConfig;
use paperpulse_common::db::models::{JobKind, JobRun, JobStatus};
use paperpulse_common::metrics::{register_metrics, METRICS_PREFIX, RUN_BUCKETS, SOURCE_BUCKETS};
use paperpulse_common::store::create_store;
use paperpulse_common::VERSION;
use paperpulse_pipeline::{build_orchestrator, Orchestrator, RunParams, TriggerOutcome};
use paperpulse_sources::create_connectors;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }

    info!("Starting PaperPulse pipeline v{}", VERSION);

    // Expose Prometheus metrics while the process lives
    if config.observability.metrics_port != 0 {
        PrometheusBuilder::new()
            .with_http_listener(([0, 0, 0, 0], config.observability.metrics_port))
            .set_buckets_for_metric(
                Matcher::Full(format!(
                    "{}_source_request_duration_seconds",
                    METRICS_PREFIX
                )),
                SOURCE_BUCKETS,
            )?
            .set_buckets_for_metric(
                Matcher::Full(format!("{}_job_run_duration_seconds", METRICS_PREFIX)),
                RUN_BUCKETS,
            )?
            .install()?;
        register_metrics();
    }

    // Storage and upstream connectors
    let store = create_store(&config).await?;
    store.ping().await?;
    let connectors = create_connectors(&config.sources)?;

    let orchestrator = Arc::new(build_orchestrator(&config, Arc::clone(&store), connectors));

    // SIGINT/SIGTERM stop in-flight runs between items; their runs
    // finish as partial instead of leaving a stale running row
    let cancel = orchestrator.cancel_flag();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::warn!("shutdown signal received, stopping after in-flight items");
        cancel.store(true, Ordering::Relaxed);
    });

    let args: Vec<String> = std::env::args().skip(1).collect();
    let exit_code = match args.first().map(String::as_str) {
        Some("run") => cmd_run(&orchestrator, &args[1..]).await?,
        Some("run-all") => cmd_run_all(&orchestrator, &args[1..]).await?,
        Some("compact") => cmd_compact(&store, &config, &args[1..]).await?,
        Some("status") => cmd_status(&store, args.get(1).map(String::as_str)).await?,
        _ => {
            eprintln!(
                "usage: pipeline run <kind> [--limit N] | run-all [--limit N] | compact [--keep-days N] | status [kind]"
            );
            eprintln!(
                "kinds: {}",
                JobKind::ALL.map(|k| k.as_str()).join(", ")
            );
            2
        }
    };

    std::process::exit(exit_code);
}

async fn cmd_run(
    orchestrator: &Orchestrator,
    args: &[String],
) -> Result<i32, Box<dyn std::error::Error>> {
    let Some(kind) = args.first().and_then(|s| JobKind::parse(s)) else {
        eprintln!("unknown job kind, expected one of: {}", JobKind::ALL.map(|k| k.as_str()).join(", "));
        return Ok(2);
    };
    let params = RunParams {
        limit: flag_value(args, "--limit")?,
    };

    match orchestrator.run_now(kind, params).await? {
        TriggerOutcome::Completed(run) => {
            print_run(&run);
            Ok(i32::from(run.job_status() == JobStatus::Failed))
        }
        TriggerOutcome::AlreadyRunning => {
            println!("{} is already running, nothing started", kind);
            Ok(0)
        }
        TriggerOutcome::Started(_) => unreachable!("run_now never detaches"),
    }
}

async fn cmd_run_all(
    orchestrator: &Orchestrator,
    args: &[String],
) -> Result<i32, Box<dyn std::error::Error>> {
    let params = RunParams {
        limit: flag_value(args, "--limit")?,
    };

    let runs = orchestrator.run_pipeline(params).await?;
    for run in &runs {
        print_run(run);
    }
    let failed = runs.iter().any(|r| r.job_status() == JobStatus::Failed);
    Ok(i32::from(failed))
}

async fn cmd_compact(
    store: &Arc<dyn paperpulse_common::Store>,
    config: &AppConfig,
    args: &[String],
) -> Result<i32, Box<dyn std::error::Error>> {
    let keep_days: u32 =
        flag_value(args, "--keep-days")?.unwrap_or(config.jobs.compact_keep_days);
    let cutoff = chrono::Utc::now().date_naive() - chrono::Duration::days(keep_days as i64);

    let removed = store.compact_samples(cutoff).await?;
    println!("compacted samples older than {}: {} rows removed", cutoff, removed);
    Ok(0)
}

async fn cmd_status(
    store: &Arc<dyn paperpulse_common::Store>,
    kind: Option<&str>,
) -> Result<i32, Box<dyn std::error::Error>> {
    let kinds: Vec<JobKind> = match kind {
        Some(s) => match JobKind::parse(s) {
            Some(kind) => vec![kind],
            None => {
                eprintln!("unknown job kind: {}", s);
                return Ok(2);
            }
        },
        None => JobKind::ALL.to_vec(),
    };

    for kind in kinds {
        match store.latest_run(kind).await? {
            Some(run) => print_run(&run),
            None => println!("{:<20} never run", kind.as_str()),
        }
    }
    Ok(0)
}

fn print_run(run: &JobRun) {
    println!(
        "{:<20} {:<10} processed={} failed={} started={}",
        run.kind,
        run.status,
        run.items_processed,
        run.items_failed,
        run.started_at.format("%Y-%m-%dT%H:%M:%S%z"),
    );
    for sample in run.error_samples() {
        println!("    {}", sample);
    }
}

/// Parse `--flag N` out of trailing arguments
fn flag_value<T: std::str::FromStr>(
    args: &[String],
    flag: &str,
) -> Result<Option<T>, Box<dyn std::error::Error>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match args.iter().position(|a| a == flag) {
        Some(i) => match args.get(i + 1) {
            Some(raw) => Ok(Some(raw.parse()?)),
            None => Err(format!("{} requires a value", flag).into()),
        },
        None => Ok(None),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
