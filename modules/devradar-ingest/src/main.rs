use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use devradar_common::{Config, DevRadarError, SourceFilters};
use devradar_ingest::adapters::build_adapter;
use devradar_ingest::dedup::SeenIndex;
use devradar_ingest::retry::RetryPolicy;
use devradar_ingest::run::Pipeline;
use devradar_ingest::sources;
use devradar_store::{SeenIndexClient, StoreClient};

/// Scheduler-invoked ingest runner: one run per selected source, sources in
/// parallel, items within a source strictly in page order.
#[derive(Parser)]
#[command(name = "devradar-ingest")]
struct Args {
    /// Source id to ingest (repeatable). See `sources::all_sources` for ids.
    #[arg(long = "source")]
    sources: Vec<String>,

    /// Ingest every registered source.
    #[arg(long)]
    all: bool,

    /// Lookback window in hours. Defaults to WINDOW_HOURS.
    #[arg(long)]
    window_hours: Option<i64>,

    /// Source filter override as key=value (repeatable), e.g.
    /// --filter subreddit=rust --filter page_size=50
    #[arg(long = "filter", value_parser = parse_key_val)]
    filters: Vec<(String, String)>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("invalid filter '{s}', expected key=value"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("devradar=info".parse()?))
        .init();

    info!("DevRadar ingest starting...");

    let args = Args::parse();
    let config = Config::from_env();
    config.log_redacted();

    // Resolve the sources this invocation covers
    let descriptors = if args.all {
        sources::all_sources()
    } else {
        let mut selected = Vec::new();
        for id in &args.sources {
            match sources::source_descriptor(id) {
                Some(d) => selected.push(d),
                None => {
                    return Err(DevRadarError::Config(format!("unknown source '{id}'")).into())
                }
            }
        }
        selected
    };
    if descriptors.is_empty() {
        anyhow::bail!("no sources selected; pass --source <id> or --all");
    }

    let window_hours = args.window_hours.unwrap_or(config.window_hours);
    let window_start = Utc::now() - Duration::hours(window_hours);
    let overrides = SourceFilters::from_pairs(args.filters);

    let store = Arc::new(StoreClient::new(
        &config.store_base_url,
        config.store_token.as_deref(),
    ));
    let seen = config
        .seen_index_url
        .as_ref()
        .map(|url| Arc::new(SeenIndexClient::new(url, config.store_token.as_deref())));

    // One independent sequential pipeline per source; sources run concurrently.
    let mut handles = Vec::new();
    for descriptor in descriptors {
        let config = config.clone();
        let store = store.clone();
        let seen = seen.clone();
        let overrides = overrides.clone();

        handles.push(tokio::spawn(async move {
            let adapter = build_adapter(&descriptor, &config)?;
            let pipeline = Pipeline {
                descriptor: &descriptor,
                adapter: adapter.as_ref(),
                sink: store.as_ref(),
                seen_index: seen.as_deref().map(|c| c as &dyn SeenIndex),
                retry: RetryPolicy::default(),
            };
            anyhow::Ok(pipeline.run(window_start, &overrides).await)
        }));
    }

    let mut any_failed = false;
    for handle in futures::future::join_all(handles).await {
        match handle {
            Ok(Ok(report)) => {
                println!("{report}");
                if report.is_failed() {
                    any_failed = true;
                }
            }
            Ok(Err(e)) => {
                error!(error = %e, "Pipeline could not start");
                any_failed = true;
            }
            Err(e) => {
                error!(error = %e, "Pipeline task panicked");
                any_failed = true;
            }
        }
    }

    // A failed run must be visible to the scheduler for manual re-trigger.
    if any_failed {
        std::process::exit(1);
    }
    Ok(())
}
