use anyhow::Result;
use clap::Parser;
use voicemorph::{cli, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file before anything else (silently ignore if missing)
    dotenvy::dotenv().ok();

    let cli_args = cli::Cli::parse();
    let config = cli::load_config(cli_args.config.as_deref())?;

    let log_config = logging::LogConfig::new()
        .with_debug_mode(cli_args.debug)
        .with_level(config.logging.level.clone())
        .with_file(config.logging.file.clone());

    let _guard = logging::init_logging(log_config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    // Keep a week of rolled logs
    if cli_args.debug
        && let Ok(removed) = logging::cleanup_old_logs(7)
        && removed > 0
    {
        tracing::info!("🧹 Cleaned up {} old log file(s)", removed);
    }

    cli::run(cli_args, config).await
}
