//! # Watchgraph CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show store entity counts
//! - `init` - Initialize the database file

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::AppError;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Watchgraph - personal watch graph server.
///
/// Movies and shows as nodes in a directed graph whose edges encode
/// watch-before dependencies.
#[derive(Parser, Debug)]
#[command(name = "watchgraph")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the graph database
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Show store entity counts
    Status,

    /// Initialize a new database
    Init,
}

// =============================================================================
// EXECUTION
// =============================================================================

/// Execute the parsed CLI command.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let config = crate::config::AppConfig::load(cli.database.as_deref(), cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Status) {
        Commands::Server { host, port } => commands::server(&config, &host, port).await,
        Commands::Status => commands::status(&config, cli.json),
        Commands::Init => commands::init(&config),
    }
}
