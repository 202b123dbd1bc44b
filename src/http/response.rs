//! HTTP response building module
//!
//! Builders for every status the file server produces. None of them know about
//! cross-origin isolation; that is layered on afterwards by the finalizer.

use std::io;

use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{
    ACCEPT_RANGES, ALLOW, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, ETAG, LAST_MODIFIED,
    LOCATION,
};
use hyper::{Response, StatusCode};

use super::range::ByteRange;

/// Response body: in-memory for generated pages, streamed for files
pub type Body = UnsyncBoxBody<Bytes, io::Error>;

/// Body holding `data` in memory
pub fn full_body(data: impl Into<Bytes>) -> Body {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn empty_body() -> Body {
    full_body(Bytes::new())
}

/// Validators and type of a served file
#[derive(Debug, Clone)]
pub struct FileHeaders<'a> {
    pub content_type: &'a str,
    pub etag: &'a str,
    pub last_modified: Option<&'a str>,
}

/// Build a plain-text error response, e.g. `404 Not Found`
pub fn build_error_response(status: StatusCode) -> Response<Body> {
    let text = format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Error")
    );

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(CONTENT_LENGTH, text.len())
        .body(full_body(text))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            empty_response(status)
        })
}

/// Build 501 Not Implemented response for unsupported methods
pub fn build_501_response() -> Response<Body> {
    let mut response = build_error_response(StatusCode::NOT_IMPLEMENTED);
    response
        .headers_mut()
        .insert(ALLOW, hyper::header::HeaderValue::from_static("GET, HEAD"));
    response
}

/// Build 301 redirect response (directory without trailing slash)
pub fn build_redirect_response(location: &str) -> Response<Body> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header(LOCATION, location)
        .header(CONTENT_LENGTH, 0)
        .body(empty_body())
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str, last_modified: Option<&str>) -> Response<Body> {
    let mut builder = Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header(ETAG, etag);
    if let Some(date) = last_modified {
        builder = builder.header(LAST_MODIFIED, date);
    }

    builder.body(empty_body()).unwrap_or_else(|e| {
        log_build_error("304", &e);
        empty_response(StatusCode::NOT_MODIFIED)
    })
}

/// Build 416 Range Not Satisfiable response
pub fn build_416_response(file_size: u64) -> Response<Body> {
    let mut response = build_error_response(StatusCode::RANGE_NOT_SATISFIABLE);
    if let Ok(value) = format!("bytes */{file_size}").parse() {
        response.headers_mut().insert(CONTENT_RANGE, value);
    }
    response
}

/// Build generated HTML response (directory listings)
pub fn build_html_response(content: String, is_head: bool) -> Response<Body> {
    let content_length = content.len();
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from(content)
    };

    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "text/html; charset=utf-8")
        .header(CONTENT_LENGTH, content_length)
        .body(full_body(body))
        .unwrap_or_else(|e| {
            log_build_error("HTML", &e);
            build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
        })
}

/// Build 200 response for a whole file
///
/// `body` is empty for HEAD; `content_length` is always the file size.
pub fn build_file_response(
    body: Body,
    content_length: u64,
    meta: &FileHeaders<'_>,
) -> Response<Body> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, meta.content_type)
        .header(CONTENT_LENGTH, content_length)
        .header(ACCEPT_RANGES, "bytes")
        .header(ETAG, meta.etag);
    if let Some(date) = meta.last_modified {
        builder = builder.header(LAST_MODIFIED, date);
    }

    builder.body(body).unwrap_or_else(|e| {
        log_build_error("200", &e);
        build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
    })
}

/// Build 206 Partial Content response; `body` carries only the requested slice
pub fn build_partial_response(
    body: Body,
    meta: &FileHeaders<'_>,
    range: ByteRange,
    total_size: u64,
) -> Response<Body> {
    let mut builder = Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(CONTENT_TYPE, meta.content_type)
        .header(CONTENT_LENGTH, range.content_length())
        .header(CONTENT_RANGE, range.content_range(total_size))
        .header(ACCEPT_RANGES, "bytes")
        .header(ETAG, meta.etag);
    if let Some(date) = meta.last_modified {
        builder = builder.header(LAST_MODIFIED, date);
    }

    builder.body(body).unwrap_or_else(|e| {
        log_build_error("206", &e);
        build_error_response(StatusCode::INTERNAL_SERVER_ERROR)
    })
}

fn empty_response(status: StatusCode) -> Response<Body> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = status;
    response
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_text(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_error_response_text() {
        let response = build_error_response(StatusCode::NOT_FOUND);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_LENGTH], "13");
        assert_eq!(body_text(response).await, "404 Not Found");
    }

    #[test]
    fn test_501_lists_allowed_methods() {
        let response = build_501_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(response.headers()[ALLOW], "GET, HEAD");
    }

    #[test]
    fn test_416_content_range() {
        let response = build_416_response(1234);
        assert_eq!(response.headers()[CONTENT_RANGE], "bytes */1234");
    }

    #[tokio::test]
    async fn test_file_response_keeps_length_for_empty_body() {
        let meta = FileHeaders {
            content_type: "text/plain; charset=utf-8",
            etag: "\"1-5\"",
            last_modified: Some("Sun, 06 Nov 1994 08:49:37 GMT"),
        };
        let response = build_file_response(empty_body(), 5, &meta);
        assert_eq!(response.headers()[CONTENT_LENGTH], "5");
        assert_eq!(response.headers()[LAST_MODIFIED], "Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(body_text(response).await, "");
    }

    #[test]
    fn test_partial_headers() {
        let meta = FileHeaders {
            content_type: "video/mp4",
            etag: "\"1-64\"",
            last_modified: None,
        };
        let range = ByteRange { start: 10, end: 19 };
        let response = build_partial_response(full_body(vec![0u8; 10]), &meta, range, 100);
        assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
        assert_eq!(response.headers()[CONTENT_RANGE], "bytes 10-19/100");
        assert_eq!(response.headers()[CONTENT_LENGTH], "10");
        assert!(!response.headers().contains_key(LAST_MODIFIED));
    }
}
