//! Top-level application error, covering startup and CLI failures.
//! HTTP response mapping lives in [`crate::api`].

use thiserror::Error;
use watchgraph_core::WatchGraphError;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Core(#[from] WatchGraphError),

    #[error("i/o error: {0}")]
    Io(String),
}
