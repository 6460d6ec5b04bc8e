//! Solana Actions HTTP server.
//!
//! # Usage
//!
//! ```bash
//! # Run with default config (config.toml in current directory)
//! cargo run -p fartnode-actions --release
//!
//! # Run with a custom config path and port
//! fartnode-actions --config /path/to/config.toml --port 8080
//!
//! # Configure logging level
//! RUST_LOG=debug fartnode-actions
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to TOML configuration file (default: `config.toml`)
//! - `HOST` - Override bind address (default: `0.0.0.0`)
//! - `PORT` - Override port (default: `4022`)
//! - `RUST_LOG` - Log level filter (default: `info`)
//! - `SOLANA_RPC_URL`, `SOLANA_RPC_FALLBACKS` and the other engine
//!   variables read by [`SolanaCoreConfig::from_env`]
//!
//! A `.env` file in the working directory is loaded first when present.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::http::Method;
use clap::Parser;
use fartnode::SolanaCoreConfig;
use fartnode_actions::util::SigDown;
use fartnode_actions::{ActionsConfig, ActionsState, actions_router};
use fartnode_svm::SolanaCore;
use tower_http::cors::{self, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(version, about = "Solana Actions server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long, env = "CONFIG", default_value = "config.toml")]
    config: String,
    /// Bind address, overriding the file and `HOST`.
    #[arg(long)]
    host: Option<IpAddr>,
    /// Port, overriding the file and `PORT`.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Ok(path) = dotenv {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    if let Err(e) = run(Args::parse()).await {
        tracing::error!("Actions server failed: {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ActionsConfig::load_from(&args.config)?;
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    let core_config = SolanaCoreConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        endpoints = ?core_config.endpoints.candidates(None),
        devnet = %config.devnet_rpc_url,
        jito = core_config.jito_enabled,
        "Loaded configuration"
    );
    if config.public_origin.is_none() {
        tracing::warn!("public_origin not set - Blink URLs will use the request Host header");
    }

    let addr = SocketAddr::new(config.host, config.port);
    let state = Arc::new(ActionsState::new(SolanaCore::new(core_config), config));

    let app = actions_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(cors::Any),
        );

    let sig_down = SigDown::try_new()?;
    let token = sig_down.cancellation_token();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Actions server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .await?;
    sig_down.recv().await;

    tracing::info!("Actions server shut down gracefully");
    Ok(())
}
