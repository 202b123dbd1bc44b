// Connection handling module
// Accepts TCP connections and serves HTTP/1.1 on them

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use hyper::body::Body as _;
use hyper::header::CONTENT_LENGTH;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::sync::Notify;

use crate::config::AppState;
use crate::handler;
use crate::http::Body;
use crate::logger::{self, AccessLogEntry};

/// Accept and process a connection, enforcing the connection limit.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
/// * `conn_counter` - Active connection counter
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: &Arc<AppState>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = state.config.performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    logger::log_connection_accepted(&peer_addr);

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(state),
        Arc::clone(conn_counter),
    );
}

/// Serve a single connection in a spawned task.
///
/// This function:
/// 1. Wraps the TCP stream in `TokioIo`
/// 2. Writes title-case header names and bounds request heads by `read_timeout`
/// 3. Serves every request through the file handler and its finalizer
/// 4. Writes an access log line per request when enabled
/// 5. Ends kept-alive connections that see no new request for `keep_alive_timeout`
/// 6. Decrements the connection counter when done
///
/// No timer covers response bodies: a slow client downloading a large file
/// keeps its connection until the last byte is written.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);

        let performance = &state.config.performance;
        let keep_alive = performance.keep_alive_timeout > 0;
        let idle_timeout = Duration::from_secs(performance.keep_alive_timeout);

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(
                (performance.read_timeout > 0).then(|| Duration::from_secs(performance.read_timeout)),
            )
            .title_case_headers(true)
            .keep_alive(keep_alive);

        let activity = Arc::new(Notify::new());
        let service_state = Arc::clone(&state);
        let service_activity = Arc::clone(&activity);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req: Request<hyper::body::Incoming>| {
                let state = Arc::clone(&service_state);
                service_activity.notify_one();
                async move {
                    // The body is never read; drop it so the future stays Send
                    let (parts, _body) = req.into_parts();
                    let req = Request::from_parts(parts, ());

                    let started = Instant::now();
                    let entry = state
                        .config
                        .logging
                        .access_log
                        .then(|| AccessLogEntry::from_request(peer_addr, &req));

                    let response = handler::handle_request(req, Arc::clone(&state)).await;

                    if let (Some(mut entry), Ok(resp)) = (entry, &response) {
                        entry.status = resp.status().as_u16();
                        entry.body_bytes = body_bytes(resp);
                        entry.request_time_us =
                            u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
                        logger::log_access(&entry, &state.access_log_format);
                    }
                    response
                }
            }),
        );
        tokio::pin!(conn);

        let idle = tokio::time::sleep(idle_timeout);
        tokio::pin!(idle);
        let mut closing = !keep_alive;

        loop {
            tokio::select! {
                result = conn.as_mut() => {
                    if let Err(err) = result {
                        logger::log_connection_error(&err);
                    }
                    break;
                }

                () = activity.notified() => {
                    idle.as_mut().reset(tokio::time::Instant::now() + idle_timeout);
                }

                // Lets an in-flight response finish, then closes
                () = &mut idle, if !closing => {
                    closing = true;
                    logger::log_debug(&format!(
                        "Connection from {peer_addr} idle for {} seconds, closing",
                        idle_timeout.as_secs()
                    ));
                    conn.as_mut().graceful_shutdown();
                }
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Body size for the access log: exact for in-memory bodies, else Content-Length
fn body_bytes(resp: &Response<Body>) -> u64 {
    resp.body().size_hint().exact().unwrap_or_else(|| {
        resp.headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    })
}
