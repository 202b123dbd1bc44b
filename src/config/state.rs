// Application state module
// Everything a request handler needs, shared read-only across connections

use std::path::PathBuf;
use std::sync::Arc;

use super::types::Config;
use crate::error::ServerError;
use crate::finalizer::ResponseFinalizer;
use crate::logger::LogFormat;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Canonical form of `files.root`; resolved paths must stay under it
    pub root: PathBuf,
    /// Header hook run on every response before hyper encodes it
    pub finalizer: Arc<dyn ResponseFinalizer>,
    pub access_log_format: LogFormat,
}

impl AppState {
    /// Create `AppState`, failing early when the served directory is unusable
    pub fn new(config: Config, finalizer: Arc<dyn ResponseFinalizer>) -> Result<Self, ServerError> {
        let root = config
            .files
            .root
            .canonicalize()
            .map_err(|source| ServerError::Root {
                path: config.files.root.clone(),
                source,
            })?;
        if !root.is_dir() {
            return Err(ServerError::Root {
                path: config.files.root.clone(),
                source: std::io::Error::other("not a directory"),
            });
        }

        let access_log_format = LogFormat::from(config.logging.access_log_format.as_str());

        Ok(Self {
            config,
            root,
            finalizer,
            access_log_format,
        })
    }
}
