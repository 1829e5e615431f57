//! Item store server entry point.
//!
//! # Responsibility
//! - Resolve configuration from flags and environment.
//! - Initialize logging before anything else logs.
//! - Serve the item API until Ctrl-C.

mod config;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use config::{Args, ServerConfig};
use itemstore_http::{build_router, AppState};
use log::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::from_args(Args::parse())?;
    itemstore_core::init_logging(&config.log_level, config.log_dir.as_deref())
        .map_err(|err| anyhow!(err))
        .context("failed to initialize logging")?;

    info!(
        "event=server_start module=cli status=ok version={} address={}",
        itemstore_core::core_version(),
        config.address
    );

    let mut state = AppState::in_memory();
    if let Some(timeout) = config.request_timeout {
        state = state.with_request_timeout(timeout);
    }
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.address)
        .await
        .with_context(|| format!("failed to bind {}", config.address))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("event=server_stop module=cli status=ok");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!("event=shutdown_signal module=cli status=error error={err}");
        std::future::pending::<()>().await;
    }
}
