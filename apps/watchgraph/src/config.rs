//! # Application Configuration
//!
//! Resolution order for every setting: CLI flag, then environment variable,
//! then the optional TOML config file, then the built-in default.
//!
//! The identifier seed is the one required setting: the opaque-id codecs
//! derive from it, so it must stay stable for the lifetime of a database.
//! It is read from `WATCHGRAPH_ID_SEED` or the `[ids] seed` key and never
//! logged.
//!
//! ```toml
//! # watchgraph.toml
//! [ids]
//! seed = "pick-a-long-random-string"
//!
//! [database]
//! path = "watchgraph.redb"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable carrying the identifier seed.
pub const ID_SEED_ENV: &str = "WATCHGRAPH_ID_SEED";

/// Environment variable overriding the database path.
pub const DATABASE_ENV: &str = "WATCHGRAPH_DB";

const DEFAULT_DATABASE: &str = "watchgraph.redb";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("failed to parse config file {path}: {message}")]
    Invalid { path: String, message: String },

    #[error("ids seed must be set ({ID_SEED_ENV} or [ids] seed in the config file)")]
    MissingSeed,
}

// =============================================================================
// CONFIG FILE SHAPE
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    ids: IdsSection,
    #[serde(default)]
    database: DatabaseSection,
}

#[derive(Debug, Default, Deserialize)]
struct IdsSection {
    seed: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabaseSection {
    path: Option<PathBuf>,
}

// =============================================================================
// RESOLVED CONFIGURATION
// =============================================================================

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: PathBuf,
    id_seed: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from the CLI-level inputs.
    pub fn load(
        database_flag: Option<&Path>,
        config_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let file = match config_path {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };

        let database = database_flag
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(DATABASE_ENV).map(PathBuf::from))
            .or(file.database.path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));

        let id_seed = std::env::var(ID_SEED_ENV)
            .ok()
            .filter(|seed| !seed.is_empty())
            .or(file.ids.seed.filter(|seed| !seed.is_empty()));

        Ok(Self { database, id_seed })
    }

    /// The identifier seed. Only the server needs it; offline commands can
    /// run without one.
    pub fn require_id_seed(&self) -> Result<&str, ConfigError> {
        self.id_seed.as_deref().ok_or(ConfigError::MissingSeed)
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
        path: display.clone(),
        message: e.to_string(),
    })?;
    toml::from_str(&raw).map_err(|e| ConfigError::Invalid { path: display, message: e.to_string() })
}

// =============================================================================
// TESTS
// =============================================================================
