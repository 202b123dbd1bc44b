// Configuration module entry point
// Loads layered configuration and holds the per-process shared state

mod state;
mod types;

use std::net::SocketAddr;

use crate::error::ServerError;

// Re-export public types
pub use state::AppState;
pub use types::{
    Config, FilesConfig, HttpConfig, LoggingConfig, Overrides, PerformanceConfig, ServerConfig,
};

/// Config file looked up when `--config` is not given (any format the config crate reads)
pub const DEFAULT_CONFIG_NAME: &str = "coi-server";

/// Environment prefix, e.g. `COI_SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "COI";

impl Config {
    /// Load configuration: defaults, then the config file (optional), then
    /// `COI_*` environment variables, then command-line overrides.
    pub fn load_from(
        config_path: Option<&str>,
        overrides: &Overrides,
    ) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port)?
            .set_default("files.root", defaults.files.root.to_string_lossy().into_owned())?
            .set_default("files.index_files", defaults.files.index_files)?
            .set_default("files.directory_listing", defaults.files.directory_listing)?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.access_log", defaults.logging.access_log)?
            .set_default("logging.access_log_format", defaults.logging.access_log_format)?
            .set_default("performance.keep_alive_timeout", defaults.performance.keep_alive_timeout)?
            .set_default("performance.read_timeout", defaults.performance.read_timeout)?
            .set_default("http.server_name", defaults.http.server_name)?
            .set_default("http.max_body_size", defaults.http.max_body_size)?
            .add_source(
                config::File::with_name(config_path.unwrap_or(DEFAULT_CONFIG_NAME))
                    .required(config_path.is_some()),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Some(ref host) = overrides.host {
            builder = builder.set_override("server.host", host.as_str())?;
        }
        if let Some(port) = overrides.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(ref root) = overrides.root {
            builder = builder.set_override("files.root", root.to_string_lossy().into_owned())?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, ServerError> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        addr.parse()
            .map_err(|e| ServerError::Address(format!("{addr}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.files.index_files, vec!["index.html", "index.htm"]);
        assert!(cfg.files.directory_listing);
        assert_eq!(
            cfg.get_socket_addr().unwrap(),
            "127.0.0.1:8000".parse().unwrap()
        );
    }

    #[test]
    fn test_load_file_and_overrides() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[server]\nport = 9100\n\n[files]\ndirectory_listing = false\n\n[logging]\naccess_log_format = \"json\""
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let overrides = Overrides {
            host: Some("0.0.0.0".to_string()),
            port: None,
            root: Some("/srv/www".into()),
        };
        let cfg = Config::load_from(Some(&path), &overrides).unwrap();

        assert_eq!(cfg.server.port, 9100);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.files.root, std::path::PathBuf::from("/srv/www"));
        assert!(!cfg.files.directory_listing);
        assert_eq!(cfg.logging.access_log_format, "json");
        assert_eq!(cfg.performance.keep_alive_timeout, 5);
    }

    #[test]
    fn test_cli_port_wins() {
        let overrides = Overrides {
            port: Some(8123),
            ..Overrides::default()
        };
        let cfg = Config::load_from(None, &overrides).unwrap();
        assert_eq!(cfg.server.port, 8123);
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let result = Config::load_from(Some("/nonexistent/coi-server.toml"), &Overrides::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_address() {
        let mut cfg = Config::default();
        cfg.server.host = "not an ip".to_string();
        assert!(matches!(cfg.get_socket_addr(), Err(ServerError::Address(_))));
    }
}
