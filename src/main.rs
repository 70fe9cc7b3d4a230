use std::path::PathBuf;

use anyhow::{Context, Result};

use handlerlog::config::{self, LoggingConfig};
use handlerlog::{trace_log, Logger};

const APP_NAME: &str = "handlerlog";

#[tokio::main]
async fn main() -> Result<()> {
    // Diagnostics about the logger itself go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "handlerlog=info".into()),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| config::default_config_path(APP_NAME));
    let mut config = LoggingConfig::load(&config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    if config.app_name == "Default" {
        config.app_name = APP_NAME.to_string();
    }

    // Sweeps immediately, then every rotation_check_interval_minutes
    let logger = Logger::init(config).context("Failed to start logging")?;
    trace_log!(
        logger,
        "Retention sweeps every {} minutes in {}",
        logger.config().rotation_check_interval_minutes,
        logger.base_logs_folder().display()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    trace_log!(logger, "Shutting down");
    logger.close_logs();
    Ok(())
}
