//! Request handler module
//!
//! The static file server: request dispatch, path translation, file and
//! directory responses.

pub mod listing;
pub mod path;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
