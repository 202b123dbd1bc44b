//! Startup and runtime errors.
//!
//! Request handling never fails at this level: every per-request problem is
//! turned into an HTTP status by the file server.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop the server from starting or keep it from running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Layered configuration could not be read or deserialized.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// `server.host`/`server.port` do not form a socket address.
    #[error("invalid listen address {0}")]
    Address(String),

    /// The served directory is missing or not a directory.
    #[error("cannot serve {}: {source}", path.display())]
    Root {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Log files could not be opened.
    #[error("logger initialization failed: {0}")]
    Logger(std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
