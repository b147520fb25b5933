//! # Watchgraph Server
//!
//! The main binary for the watch graph.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for store operations
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               apps/watchgraph (THE BINARY)           │
//! │                                                      │
//! │   ┌─────────────┐            ┌─────────────┐         │
//! │   │   CLI       │            │   HTTP API  │         │
//! │   │  (clap)     │            │   (axum)    │         │
//! │   └──────┬──────┘            └──────┬──────┘         │
//! │          │                          │                │
//! │          └────────────┬─────────────┘                │
//! │                       ▼                              │
//! │             ┌──────────────────┐                     │
//! │             │ watchgraph-core  │                     │
//! │             │   (THE LOGIC)    │                     │
//! │             └──────────────────┘                     │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! WATCHGRAPH_ID_SEED=change-me watchgraph server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! watchgraph init
//! watchgraph status --json
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing — WATCHGRAPH_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("WATCHGRAPH_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "watchgraph=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = watchgraph::cli::Cli::parse();

    // Execute command
    if let Err(e) = watchgraph::cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
