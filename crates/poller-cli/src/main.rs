mod console;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use poller_core::adapters::HttpClient;
use poller_core::config::{ApiKeys, OutputFormat, PollerConfig, parse_interval_override};
use poller_core::logging::{self, LogSettings};
use poller_core::registry::SourceRegistry;
use poller_core::scheduling::PollScheduler;
use poller_core::sink::create_sink;

/// Polls news, weather and NASA APIs on a fixed cadence and appends new
/// records to a JSON or CSV file.
#[derive(Parser, Debug)]
#[command(name = "api-poller", version, about)]
struct Cli {
    /// Maximum number of sources allowed in their poll cycle at once.
    max_concurrency: usize,

    /// Default number of seconds between polls of each source.
    interval_secs: u64,

    /// Output format: json or csv.
    format: String,

    /// Sources to poll (news, weather, nasa).
    #[arg(required = true)]
    sources: Vec<String>,

    /// Output file. Defaults to output.<format> in the working directory.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Per-source interval override, e.g. --interval nasa=300.
    #[arg(long = "interval", value_name = "NAME=SECS")]
    intervals: Vec<String>,

    /// HTTP request timeout in seconds.
    #[arg(long, env = "POLLER_HTTP_TIMEOUT", default_value_t = 10)]
    http_timeout: u64,

    /// Seconds to wait for in-flight polls during shutdown.
    #[arg(long, env = "POLLER_SHUTDOWN_TIMEOUT", default_value_t = 5)]
    shutdown_timeout: u64,

    /// Log file path.
    #[arg(long, default_value = logging::DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log to stderr only.
    #[arg(long)]
    no_log_file: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return if error.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let log_settings = LogSettings {
        file: (!cli.no_log_file).then(|| cli.log_file.clone()),
        ..LogSettings::default()
    };
    let _log_guard = match logging::init(&log_settings) {
        Ok(guard) => guard,
        Err(error) => {
            eprintln!("error: {}", error.message);
            return ExitCode::FAILURE;
        }
    };

    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded environment file"),
        Err(error) if error.not_found() => {}
        Err(error) => tracing::warn!(error = %error, "failed to load .env file"),
    }

    match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            tracing::error!(error = %format!("{error:#}"), "api-poller failed to start");
            eprintln!("error: {error:#}");
            eprintln!("run 'api-poller --help' for usage");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = build_config(&cli)?;
    tracing::info!(%config, "starting api poller");

    let keys = ApiKeys::from_env();
    let registry = SourceRegistry::new(keys, HttpClient::new(config.http_timeout));
    let sink = create_sink(config.output_format, &config.output_path)
        .with_context(|| format!("failed to open {}", config.output_path.display()))?;

    let scheduler = Arc::new(PollScheduler::new(
        config.scheduler_settings(),
        config.scheduled_sources(),
        Arc::new(registry),
        sink,
    )?);
    scheduler.start()?;

    let exit = console::run(Arc::clone(&scheduler), config.shutdown_grace).await;
    tracing::info!(reason = exit.as_str(), "api poller stopped");
    Ok(exit.exit_code())
}

fn build_config(cli: &Cli) -> anyhow::Result<PollerConfig> {
    let format: OutputFormat = cli.format.parse()?;
    let mut config = PollerConfig::new(
        cli.max_concurrency,
        Duration::from_secs(cli.interval_secs),
        format,
        cli.sources.iter().cloned(),
    )
    .http_timeout(Duration::from_secs(cli.http_timeout))
    .shutdown_grace(Duration::from_secs(cli.shutdown_timeout));

    if let Some(output) = &cli.output {
        config = config.output_path(output);
    }
    for raw in &cli.intervals {
        let (source, interval) = parse_interval_override(raw)?;
        config = config.source_interval(source, interval);
    }

    config.validate()?;
    Ok(config)
}
