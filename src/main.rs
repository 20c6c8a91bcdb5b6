//! Main entry point for the research-data-downloader CLI

use chrono::Local;
use clap::Parser;
use research_data_downloader::cli::error::EXIT_CONFIG;
use research_data_downloader::cli::{Cli, CliError, Commands, VideosArgs};
use research_data_downloader::metrics;
use research_data_downloader::shutdown::{ShutdownCoordinator, SharedShutdown};
use research_data_downloader::EntityKind;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize tracing: stdout (JSON when `LOG_FORMAT=json`) plus an optional
/// JSON log file for the run
fn init_tracing(log_file: Option<&Path>) -> Option<WorkerGuard> {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("research_data_downloader=info"));

    let (appender, file_error) = match log_file.map(open_log_file) {
        Some(Ok(appender)) => (Some(appender), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let (file_layer, guard) = match appender {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_format.then(|| fmt::layer().json()))
        .with((!json_format).then(fmt::layer))
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        warn!("JSON log file disabled: {}", e);
    }

    guard
}

/// Create the log directory and open `path` as a non-rotating appender
fn open_log_file(path: &Path) -> Result<RollingFileAppender, String> {
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)
        .map_err(|e| format!("cannot create {}: {}", directory.display(), e))?;

    let file_name = path.file_name().unwrap_or(path.as_os_str()).to_string_lossy();
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.as_ref())
        .build(directory)
        .map_err(|e| format!("cannot open {}: {}", path.display(), e))
}

/// Ctrl+C handler and optional metrics exporter
fn start_services(cli: &Cli) -> SharedShutdown {
    if let Some(addr) = cli.metrics_addr {
        if let Err(e) = metrics::init_metrics(addr) {
            warn!("Metrics disabled: {}", e);
        }
    }

    let shutdown = ShutdownCoordinator::shared();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received - finishing current step and stopping...");
                shutdown.request_shutdown();
            }
        }
    });
    shutdown
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // A bad videos config halts the process before any network activity
    let videos_config = match &cli.command {
        Commands::Videos(args) => match args.load_config() {
            Ok(config) => Some(config),
            Err(e) => {
                let _guard = init_tracing(None);
                error!("Configuration error: {}", e);
                std::process::exit(EXIT_CONFIG);
            }
        },
        _ => None,
    };

    let log_file = videos_config
        .as_ref()
        .map(|config| VideosArgs::log_path(config, Local::now().naive_local()));
    let guard = init_tracing(log_file.as_deref());
    if let (Some(path), Some(_)) = (&log_file, &guard) {
        info!("Writing JSON log to {}", path.display());
    }

    let shutdown = start_services(&cli);

    let result: Result<(), CliError> = match &cli.command {
        Commands::Videos(args) => match &videos_config {
            Some(config) => args.execute(&cli, config, shutdown).await.map(drop),
            None => args.load_config().map(drop),
        },
        Commands::Users(args) => args
            .execute(EntityKind::User, &cli, shutdown)
            .await
            .map(drop),
        Commands::Comments(args) => args
            .execute(EntityKind::Comment, &cli, shutdown)
            .await
            .map(drop),
        Commands::Media(args) => args.execute(shutdown).await.map(drop),
    };

    if let Err(e) = result {
        let code = e.exit_code();
        error!("Command failed: {:#}", anyhow::Error::from(e));
        drop(guard);
        std::process::exit(code);
    }
}
