//! Command-line and environment configuration for the item store server.
//!
//! # Invariants
//! - Every flag has an environment fallback; flags win over the environment.
//! - `ServerConfig` only exists for a parseable listen address.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug, Clone)]
#[command(name = "itemstore")]
#[command(about = "Schemaless item store over HTTP")]
pub struct Args {
    /// Address the HTTP API listens on
    #[arg(long, env = "API_ADDRESS", default_value = "0.0.0.0:8080")]
    pub address: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value_t = itemstore_core::default_log_level().to_string())]
    pub log_level: String,

    /// Write rotating log files here instead of stderr
    #[arg(long, env = "LOG_DIR")]
    pub log_dir: Option<String>,

    /// Abandon store calls that start this many milliseconds after the request
    #[arg(long, env = "REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: Option<u64>,
}

/// Validated server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub address: SocketAddr,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl ServerConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        let address = args
            .address
            .trim()
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid listen address `{}`", args.address))?;

        let request_timeout = match args.request_timeout_ms {
            Some(0) => bail!("request timeout must be greater than zero"),
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        };

        let log_dir = args
            .log_dir
            .map(|dir| dir.trim().to_string())
            .filter(|dir| !dir.is_empty());

        Ok(Self {
            address,
            log_level: args.log_level.trim().to_string(),
            log_dir,
            request_timeout,
        })
    }
}
