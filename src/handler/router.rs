//! Request dispatch module
//!
//! Entry point for HTTP request processing: method validation, body size
//! check, static file serving, then the response finalizer.

use crate::config::AppState;
use crate::finalizer;
use crate::handler::static_files;
use crate::http::{self, Body};
use crate::logger;
use hyper::header::{HeaderName, HeaderValue, IF_MODIFIED_SINCE, IF_NONE_MATCH, RANGE, SERVER};
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;

/// Request context encapsulating information needed for request processing
#[derive(Debug, Clone, Copy)]
pub struct RequestContext<'a> {
    /// Raw (still percent-encoded) URI path
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
    pub if_modified_since: Option<&'a str>,
    pub range: Option<&'a str>,
}

impl<'a> RequestContext<'a> {
    pub fn from_request<B>(req: &'a Request<B>) -> Self {
        let header = |name: HeaderName| req.headers().get(name).and_then(|v| v.to_str().ok());
        Self {
            path: req.uri().path(),
            query: req.uri().query(),
            is_head: req.method() == Method::HEAD,
            if_none_match: header(IF_NONE_MATCH),
            if_modified_since: header(IF_MODIFIED_SINCE),
            range: header(RANGE),
        }
    }
}

/// Main entry point for HTTP request handling
///
/// The request body is never read, so any body type works. Every response,
/// error responses included, passes through the state's finalizer before it
/// is returned to hyper.
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Body>, Infallible> {
    let response = build_response(&req, &state).await;
    Ok(finalizer::finalize(response, state.finalizer.as_ref()))
}

/// Produce the file server's own response, without the finalizer's headers
pub async fn build_response<B>(req: &Request<B>, state: &AppState) -> Response<Body> {
    let mut response = if let Some(resp) = check_http_method(req.method()) {
        resp
    } else if let Some(resp) = check_body_size(req, state.config.http.max_body_size) {
        resp
    } else {
        let ctx = RequestContext::from_request(req);
        static_files::serve(&ctx, &state.root, &state.config.files).await
    };

    if let Ok(server) = HeaderValue::from_str(&state.config.http.server_name) {
        response.headers_mut().insert(SERVER, server);
    }
    response
}

/// Only GET and HEAD are served; anything else is 501
fn check_http_method(method: &Method) -> Option<Response<Body>> {
    match *method {
        Method::GET | Method::HEAD => None,
        _ => {
            logger::log_debug(&format!("Unsupported method: {method}"));
            Some(http::build_501_response())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Body>> {
    let content_length = req.headers().get(hyper::header::CONTENT_LENGTH)?;
    let Ok(size_str) = content_length.to_str() else {
        logger::log_warning("Content-Length header contains non-ASCII characters");
        return Some(http::build_error_response(StatusCode::BAD_REQUEST));
    };

    match size_str.trim().parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_warning(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_error_response(StatusCode::PAYLOAD_TOO_LARGE))
        }
        Ok(_) => None,
        Err(_) => Some(http::build_error_response(StatusCode::BAD_REQUEST)),
    }
}
