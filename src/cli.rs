//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Overrides;

/// Serve a directory over HTTP with Cross-Origin-Opener-Policy and
/// Cross-Origin-Embedder-Policy set, so pages can use SharedArrayBuffer.
#[derive(Debug, Parser)]
#[command(name = "coi-server", version, about, long_about = None)]
pub struct Cli {
    /// Port to listen on [default: 8000]
    pub port: Option<u16>,

    /// Address to bind [default: 127.0.0.1]
    #[arg(short, long, value_name = "ADDRESS")]
    pub bind: Option<String>,

    /// Directory to serve [default: current directory]
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Configuration file (TOML, YAML or JSON); `coi-server.*` is used when present
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<String>,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            host: self.bind.clone(),
            port: self.port,
            root: self.directory.clone(),
        }
    }
}
