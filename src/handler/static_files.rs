//! Static file serving module
//!
//! Resolves request paths under the served root and produces file, listing,
//! redirect, conditional, range and error responses.

use crate::config::FilesConfig;
use crate::handler::listing;
use crate::handler::path::{percent_decode, translate_path};
use crate::handler::router::RequestContext;
use crate::http::{self, cache, mime, range::RangeParseResult, Body, FileHeaders};
use crate::logger;
use hyper::{Response, StatusCode};
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncSeekExt;

/// Map a filesystem error onto the status the client sees
pub fn status_for_io_error(err: &io::Error) -> StatusCode {
    match err.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory => StatusCode::NOT_FOUND,
        io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Serve the request path from the root directory
pub async fn serve(ctx: &RequestContext<'_>, root: &Path, files: &FilesConfig) -> Response<Body> {
    let Some(file_path) = translate_path(root, ctx.path) else {
        logger::log_warning(&format!("Undecodable request path: {}", ctx.path));
        return http::build_error_response(StatusCode::BAD_REQUEST);
    };

    let resolved = match resolve_under_root(root, &file_path).await {
        Ok(p) => p,
        Err(status) => return http::build_error_response(status),
    };

    let metadata = match fs::metadata(&resolved).await {
        Ok(m) => m,
        Err(e) => return io_error_response(&resolved, &e),
    };

    if metadata.is_dir() {
        return serve_directory(ctx, &resolved, files).await;
    }

    // A file addressed like a directory does not exist
    if ctx.path.ends_with('/') {
        return http::build_error_response(StatusCode::NOT_FOUND);
    }

    serve_file(ctx, &resolved, &metadata).await
}

/// Canonicalize and require the result to stay inside the (canonical) root
async fn resolve_under_root(root: &Path, file_path: &Path) -> Result<PathBuf, StatusCode> {
    let canonical = match fs::canonicalize(file_path).await {
        Ok(p) => p,
        // File not found is common (404), no need to log at warning level
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StatusCode::NOT_FOUND),
        Err(e) => return Err(status_for_io_error(&e)),
    };

    if canonical.starts_with(root) {
        Ok(canonical)
    } else {
        logger::log_warning(&format!(
            "Path escapes served directory: {} -> {}",
            file_path.display(),
            canonical.display()
        ));
        Err(StatusCode::NOT_FOUND)
    }
}

/// Directory request: redirect, index file, listing or 404
async fn serve_directory(
    ctx: &RequestContext<'_>,
    dir: &Path,
    files: &FilesConfig,
) -> Response<Body> {
    if !ctx.path.ends_with('/') {
        let location = match ctx.query {
            Some(q) => format!("{}/?{q}", ctx.path),
            None => format!("{}/", ctx.path),
        };
        return http::build_redirect_response(&location);
    }

    for index_file in &files.index_files {
        let index_path = dir.join(index_file);
        if let Ok(metadata) = fs::metadata(&index_path).await {
            if metadata.is_file() {
                return serve_file(ctx, &index_path, &metadata).await;
            }
        }
    }

    if !files.directory_listing {
        return http::build_error_response(StatusCode::NOT_FOUND);
    }

    match listing::read_entries(dir).await {
        Ok(entries) => {
            let display_path = percent_decode(ctx.path).unwrap_or_else(|| ctx.path.to_string());
            let html = listing::render_listing(&display_path, &entries);
            http::build_html_response(html, ctx.is_head)
        }
        Err(e) => io_error_response(dir, &e),
    }
}

/// Serve a regular file with validators, conditional and range support
async fn serve_file(
    ctx: &RequestContext<'_>,
    path: &Path,
    metadata: &std::fs::Metadata,
) -> Response<Body> {
    let total_size = metadata.len();
    let modified = metadata.modified().ok();
    let etag = cache::generate_etag(total_size, modified);
    let last_modified = modified.map(cache::format_http_date);
    let meta = FileHeaders {
        content_type: mime::content_type_for(path),
        etag: &etag,
        last_modified: last_modified.as_deref(),
    };

    // If-None-Match takes precedence over If-Modified-Since
    let not_modified = if ctx.if_none_match.is_some() {
        cache::check_etag_match(ctx.if_none_match, &etag)
    } else {
        cache::not_modified_since(ctx.if_modified_since, modified)
    };
    if not_modified {
        return http::build_304_response(&etag, last_modified.as_deref());
    }

    match http::parse_range_header(ctx.range, total_size) {
        RangeParseResult::Valid(range) => {
            match file_body(path, range.start, range.content_length(), ctx.is_head).await {
                Ok(body) => http::build_partial_response(body, &meta, range, total_size),
                Err(e) => io_error_response(path, &e),
            }
        }
        RangeParseResult::NotSatisfiable => http::build_416_response(total_size),
        RangeParseResult::None => match file_body(path, 0, total_size, ctx.is_head).await {
            Ok(body) => http::build_file_response(body, total_size, &meta),
            Err(e) => io_error_response(path, &e),
        },
    }
}

/// Open `path` and stream `len` bytes from `start`; HEAD gets an empty body
async fn file_body(path: &Path, start: u64, len: u64, is_head: bool) -> io::Result<Body> {
    if is_head {
        return Ok(http::empty_body());
    }
    let mut file = fs::File::open(path).await?;
    if start > 0 {
        file.seek(SeekFrom::Start(start)).await?;
    }
    Ok(http::file_body(file, len))
}

fn io_error_response(path: &Path, err: &io::Error) -> Response<Body> {
    let status = status_for_io_error(err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        logger::log_error(&format!("Failed to read '{}': {err}", path.display()));
    } else {
        logger::log_debug(&format!("'{}': {err}", path.display()));
    }
    http::build_error_response(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[test]
    fn test_status_for_io_error() {
        let not_found = io::Error::from(io::ErrorKind::NotFound);
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        let other = io::Error::other("disk on fire");
        assert_eq!(status_for_io_error(&not_found), StatusCode::NOT_FOUND);
        assert_eq!(status_for_io_error(&denied), StatusCode::FORBIDDEN);
        assert_eq!(status_for_io_error(&other), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_file_body_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("digits.txt");
        std::fs::write(&path, b"0123456789").unwrap();

        let body = file_body(&path, 3, 4, false).await.unwrap();
        let data = body.collect().await.unwrap().to_bytes();
        assert_eq!(&data[..], b"3456");

        let head = file_body(&path, 0, 10, true).await.unwrap();
        assert!(head.collect().await.unwrap().to_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_file_body_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = file_body(&dir.path().join("gone.bin"), 0, 1, false)
            .await
            .err()
            .unwrap();
        assert_eq!(status_for_io_error(&err), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_resolve_rejects_symlink_escape() {
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), b"s").unwrap();
        let root = tempfile::tempdir().unwrap();
        let root_canonical = root.path().canonicalize().unwrap();

        #[cfg(unix)]
        {
            std::os::unix::fs::symlink(outside.path(), root.path().join("escape")).unwrap();
            let result =
                resolve_under_root(&root_canonical, &root_canonical.join("escape/secret.txt"))
                    .await;
            assert_eq!(result, Err(StatusCode::NOT_FOUND));
        }

        let missing = resolve_under_root(&root_canonical, &root_canonical.join("nope")).await;
        assert_eq!(missing, Err(StatusCode::NOT_FOUND));
    }
}
