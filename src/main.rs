//! Math MCP Server Entry Point
//!
//! Exposes two tools, `calculate` and `derivative`, over the Model Context
//! Protocol on STDIO. Requests arrive as newline-delimited JSON-RPC on stdin,
//! responses go to stdout, and logs go to stderr.
//!
//! Environment Variables:
//! - SERVER_NAME: Name of the server (default: "math-mcp-server")
//! - SERVER_VERSION: Version string (default: the crate version)
//! - RUST_LOG: Log filter (default: "info")

mod core;
mod math;
mod tools;

use std::process::ExitCode;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::core::server::{self, AppState};
use crate::core::utils::ServerConfig;
use crate::math::Engine;

fn init_logging() {
    // stdout is reserved for the JSON-RPC stream
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_logging();

    let config = ServerConfig::from_env();
    let state = AppState::new(&config, Arc::new(Engine));

    match server::run_server_stdio(state).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("STDIO server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
