//! # CLI Command Implementations

use watchgraph_core::{GraphStore, IdCodecs};

use crate::api::{AppState, run_server};
use crate::config::AppConfig;
use crate::error::AppError;

/// Start the HTTP server. The codec family is derived from the configured
/// seed once, before the listener comes up.
pub async fn server(config: &AppConfig, host: &str, port: u16) -> Result<(), AppError> {
    let seed = config.require_id_seed()?;
    let ids = IdCodecs::from_seed(seed);
    let store = GraphStore::open(&config.database)?;
    tracing::info!(database = %config.database.display(), "store opened");

    let addr = format!("{host}:{port}");
    run_server(&addr, AppState::new(store, ids)).await
}

/// Print entity counts for the configured database.
pub fn status(config: &AppConfig, json: bool) -> Result<(), AppError> {
    let store = GraphStore::open(&config.database)?;
    let counts = store.counts()?;

    if json {
        let payload = serde_json::to_string_pretty(&counts)
            .map_err(|e| AppError::Io(e.to_string()))?;
        println!("{payload}");
    } else {
        println!("Database: {}", config.database.display());
        println!("  graphs: {}", counts.graphs);
        println!("  nodes:  {}", counts.nodes);
        println!("  edges:  {}", counts.edges);
        println!("  images: {}", counts.images);
    }
    Ok(())
}

/// Create (or open) the database file.
pub fn init(config: &AppConfig) -> Result<(), AppError> {
    let _ = GraphStore::open(&config.database)?;
    println!("Initialized database at {}", config.database.display());
    Ok(())
}
