//! Response finalizer module
//!
//! Hook applied to every response right before it is handed back to hyper for
//! encoding. hyper terminates the header section only when it serializes the
//! `Response`, so anything appended to the `HeaderMap` here is written before
//! the blank line that separates headers from the body.

use hyper::header::{HeaderMap, HeaderName, HeaderValue};
use hyper::Response;

/// `Cross-Origin-Opener-Policy` header name
pub const CROSS_ORIGIN_OPENER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-opener-policy");

/// `Cross-Origin-Embedder-Policy` header name
pub const CROSS_ORIGIN_EMBEDDER_POLICY: HeaderName =
    HeaderName::from_static("cross-origin-embedder-policy");

/// Value that isolates the browsing context from cross-origin openers
pub const SAME_ORIGIN: &str = "same-origin";

/// Value that requires cross-origin subresources to opt in
pub const REQUIRE_CORP: &str = "require-corp";

/// Per-response header hook
///
/// Implementations may only add headers. They run once per response,
/// regardless of status code, and must not touch the status or the body.
pub trait ResponseFinalizer: Send + Sync {
    fn finalize_headers(&self, headers: &mut HeaderMap);
}

/// Marks responses as cross-origin isolated (COOP `same-origin` + COEP `require-corp`)
#[derive(Debug, Clone, Copy, Default)]
pub struct CrossOriginIsolation;

impl ResponseFinalizer for CrossOriginIsolation {
    fn finalize_headers(&self, headers: &mut HeaderMap) {
        // Access-Control-Allow-Origin stays disabled
        headers.append(
            CROSS_ORIGIN_OPENER_POLICY,
            HeaderValue::from_static(SAME_ORIGIN),
        );
        headers.append(
            CROSS_ORIGIN_EMBEDDER_POLICY,
            HeaderValue::from_static(REQUIRE_CORP),
        );
    }
}

/// Leaves responses exactly as the file server built them
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl ResponseFinalizer for PassThrough {
    fn finalize_headers(&self, _headers: &mut HeaderMap) {}
}

/// Run the finalizer against a complete response
pub fn finalize<B, F>(mut response: Response<B>, finalizer: &F) -> Response<B>
where
    F: ResponseFinalizer + ?Sized,
{
    finalizer.finalize_headers(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
    use hyper::StatusCode;

    fn base_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html; charset=utf-8"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("42"));
        headers
    }

    #[test]
    fn test_injects_both_headers() {
        let mut headers = HeaderMap::new();
        CrossOriginIsolation.finalize_headers(&mut headers);

        assert_eq!(headers.len(), 2);
        assert_eq!(headers[&CROSS_ORIGIN_OPENER_POLICY], "same-origin");
        assert_eq!(headers[&CROSS_ORIGIN_EMBEDDER_POLICY], "require-corp");
    }

    #[test]
    fn test_existing_headers_untouched() {
        let mut headers = base_headers();
        CrossOriginIsolation.finalize_headers(&mut headers);

        assert_eq!(headers[CONTENT_TYPE], "text/html; charset=utf-8");
        assert_eq!(headers[CONTENT_LENGTH], "42");
        assert_eq!(headers.len(), 4);
    }

    #[test]
    fn test_differs_from_pass_through_by_two_headers() {
        let mut isolated = base_headers();
        let mut plain = base_headers();
        CrossOriginIsolation.finalize_headers(&mut isolated);
        PassThrough.finalize_headers(&mut plain);

        for (name, value) in &plain {
            assert_eq!(isolated.get(name), Some(value));
        }
        let extra: Vec<_> = isolated
            .keys()
            .filter(|name| !plain.contains_key(*name))
            .collect();
        assert_eq!(
            extra,
            vec![&CROSS_ORIGIN_OPENER_POLICY, &CROSS_ORIGIN_EMBEDDER_POLICY]
        );
    }

    #[test]
    fn test_no_cors_header() {
        let mut headers = HeaderMap::new();
        CrossOriginIsolation.finalize_headers(&mut headers);
        assert!(!headers.contains_key("access-control-allow-origin"));
    }

    #[test]
    fn test_finalize_keeps_status_and_body() {
        let response = Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body("404 Not Found")
            .unwrap();

        let response = finalize(response, &CrossOriginIsolation);

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(*response.body(), "404 Not Found");
        assert_eq!(response.headers()[&CROSS_ORIGIN_OPENER_POLICY], "same-origin");
    }

    #[test]
    fn test_repeated_calls_yield_same_values() {
        for _ in 0..3 {
            let mut headers = HeaderMap::new();
            CrossOriginIsolation.finalize_headers(&mut headers);
            assert_eq!(headers[&CROSS_ORIGIN_OPENER_POLICY], SAME_ORIGIN);
            assert_eq!(headers[&CROSS_ORIGIN_EMBEDDER_POLICY], REQUIRE_CORP);
        }
    }
}
