//! Static file server for cross-origin isolated pages.
//!
//! Every response, whatever its status, carries
//!
//! ```text
//! Cross-Origin-Opener-Policy: same-origin
//! Cross-Origin-Embedder-Policy: require-corp
//! ```
//!
//! which browsers require before exposing `SharedArrayBuffer` and other
//! high-resolution primitives. The file server itself ([`handler`]) knows
//! nothing about these headers; they are added by a [`finalizer`] hook applied
//! to each response just before hyper writes the header section.

pub mod cli;
pub mod config;
pub mod error;
pub mod finalizer;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use crate::config::{AppState, Config};
pub use error::ServerError;
pub use finalizer::{CrossOriginIsolation, PassThrough, ResponseFinalizer};
pub use server::Server;
