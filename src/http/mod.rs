//! HTTP protocol layer module
//!
//! Provides HTTP protocol-related base functionality, decoupled from how paths
//! are resolved on disk.

pub mod cache;
pub mod mime;
pub mod range;
pub mod response;
pub mod stream;

// Re-export commonly used types
pub use range::parse_range_header;
pub use response::{
    build_304_response, build_416_response, build_501_response, build_error_response,
    build_file_response, build_html_response, build_partial_response, build_redirect_response,
    empty_body, full_body, Body, FileHeaders,
};
pub use stream::file_body;
