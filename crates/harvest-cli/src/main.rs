mod report;

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use harvest_client::ReqwestFetcher;
use harvest_core::throttle::{ThrottleConfig, ThrottledFetcher};
use harvest_core::{
    ArtifactNaming, ContentPolicy, Engine, EngineConfig, Fetcher, IdRange, RetryPolicy,
    RunSummary, TargetTemplate, TracingProgressReporter, TracingWorkerReporter,
};

use crate::report::CsvReport;

#[derive(Parser)]
#[command(
    name = "harvest",
    version,
    about = "Bulk downloader for documents addressed by sequential IDs"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download every identifier of a range with a fixed pool of workers
    Fetch(FetchArgs),
}

#[derive(Args, Debug)]
struct FetchArgs {
    /// URL template; `{id}` is replaced by each identifier
    #[arg(short, long, env = "HARVEST_URL_TEMPLATE")]
    url_template: String,

    /// First identifier (inclusive)
    #[arg(long, default_value_t = 0)]
    start: u64,

    /// Last identifier (inclusive)
    #[arg(long, default_value_t = 10_000)]
    end: u64,

    /// Number of concurrent workers
    #[arg(short, long, env = "HARVEST_WORKERS", default_value_t = 10)]
    workers: usize,

    /// Maximum fetch attempts per identifier
    #[arg(long, default_value_t = 3)]
    attempts: u32,

    /// Fixed delay between attempts, in milliseconds
    #[arg(long, default_value_t = 2_000)]
    retry_delay_ms: u64,

    /// Per-request timeout, in seconds
    #[arg(long, env = "HARVEST_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// Directory receiving downloaded artifacts
    #[arg(short, long, env = "HARVEST_OUTPUT_DIR", default_value = "./downloads")]
    output_dir: PathBuf,

    /// Artifact file name prefix (`<prefix>_<id>.<extension>`)
    #[arg(long, default_value = "doc")]
    prefix: String,

    /// Artifact file extension
    #[arg(long, default_value = "pdf")]
    extension: String,

    /// Content types accepted without warning (repeatable)
    #[arg(long = "accept-content-type", default_values_t = [
        String::from("application/pdf"),
        String::from("application/octet-stream"),
    ])]
    accept_content_types: Vec<String>,

    /// Content types treated as error pages (repeatable)
    #[arg(long = "reject-content-type", default_values_t = [String::from("text/html")])]
    reject_content_types: Vec<String>,

    /// Minimum delay between requests to the same host, in milliseconds (0 disables)
    #[arg(long, default_value_t = 0)]
    request_delay_ms: u64,

    /// Capacity of the job and result queues
    #[arg(long, default_value_t = 100)]
    queue_capacity: usize,

    /// Log a progress line every N processed identifiers
    #[arg(long, default_value_t = 100)]
    progress_every: u64,

    /// Write one CSV row per identifier to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

impl FetchArgs {
    fn engine_config(&self) -> Result<EngineConfig> {
        let target = TargetTemplate::new(&self.url_template).context("Invalid --url-template")?;

        Ok(EngineConfig::new(target)
            .with_range(IdRange::new(self.start, self.end))
            .with_workers(self.workers)
            .with_queue_capacity(self.queue_capacity)
            .with_retry(RetryPolicy::new(
                self.attempts,
                Duration::from_millis(self.retry_delay_ms),
            ))
            .with_output_dir(self.output_dir.clone())
            .with_naming(ArtifactNaming::new(&self.prefix, &self.extension))
            .with_progress_interval(self.progress_every))
    }

    fn content_policy(&self) -> ContentPolicy {
        ContentPolicy::new(&self.accept_content_types, &self.reject_content_types)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Setup tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("harvest=info".parse()?)
                .add_directive("harvest_core=info".parse()?)
                .add_directive("harvest_client=info".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch(args) => cmd_fetch(args).await?,
    }

    Ok(())
}

async fn cmd_fetch(args: FetchArgs) -> Result<()> {
    let config = args.engine_config()?;
    if config.range.is_empty() {
        tracing::warn!(
            start = args.start,
            end = args.end,
            "Empty identifier range, nothing to download"
        );
    }

    let fetcher = ReqwestFetcher::with_timeout(Duration::from_secs(args.timeout_secs))
        .context("Failed to create HTTP client")?
        .with_content_policy(args.content_policy());

    let mut report = args.report.as_deref().map(CsvReport::create).transpose()?;

    let summary = if args.request_delay_ms > 0 {
        let throttle = ThrottleConfig::new(Duration::from_millis(args.request_delay_ms));
        run_engine(ThrottledFetcher::new(fetcher, throttle), config, report.as_mut()).await?
    } else {
        run_engine(fetcher, config, report.as_mut()).await?
    };

    if let Some(report) = report {
        report.finish()?;
    }

    // Summary to stdout, logs to stderr
    println!("{}", summary.to_json_pretty()?);

    Ok(())
}

async fn run_engine<F: Fetcher>(
    fetcher: F,
    config: EngineConfig,
    report: Option<&mut CsvReport<File>>,
) -> Result<RunSummary> {
    let engine = Engine::new(fetcher, config).context("Invalid configuration")?;
    let workers = Arc::new(TracingWorkerReporter);

    let summary = match report {
        Some(report) => {
            engine
                .run_with(workers, (TracingProgressReporter, report))
                .await?
        }
        None => engine.run_with(workers, TracingProgressReporter).await?,
    };

    Ok(summary)
}
