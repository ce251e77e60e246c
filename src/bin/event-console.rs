use anyhow::Result;
use clap::Parser;
use event_console::server;
use event_console::server::server::AppState;
use event_console::utils::config_loader;
use event_console::utils::constants::DEFAULT_CONFIG_PATH;
use event_console::utils::logging;
use event_console::utils::logging::LogLevel;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Read args, load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level)?;

    // -------------------------------
    // 2. Token cache, issuer, dispatcher
    //
    // the cache lives exactly as long as the process
    // -------------------------------

    let state = AppState::build(&service_config).await?;

    // -------------------------------
    // 3. Serve console API until Ctrl-C
    // -------------------------------

    info!("Service starting...");
    server::server::start(&service_config.settings, state, shutdown_signal()).await?;
    info!("Service stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("cannot listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
