// Server module entry point
// Binds the listener and runs the accept loop until shutdown

pub mod connection;
pub mod listener;
pub mod signal;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::{AppState, Config};
use crate::error::ServerError;
use crate::finalizer::CrossOriginIsolation;
use crate::logger;

pub use listener::create_listener;

/// A bound file server, ready to accept connections
pub struct Server {
    listener: TcpListener,
    state: Arc<AppState>,
}

impl Server {
    /// Bind `server.host:server.port`; must be called inside a tokio runtime
    pub fn bind(state: Arc<AppState>) -> Result<Self, ServerError> {
        let addr = state.config.get_socket_addr()?;
        let listener = create_listener(addr)?;
        Ok(Self { listener, state })
    }

    /// Actual bound address (resolves port `0`)
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves
    ///
    /// Connections already being served finish in their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let active_connections = Arc::new(AtomicUsize::new(0));
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, peer_addr)) => {
                            connection::accept_connection(
                                stream,
                                peer_addr,
                                &self.state,
                                &active_connections,
                            );
                        }
                        Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                    }
                }

                () = &mut shutdown => {
                    logger::log_server_stop();
                    return Ok(());
                }
            }
        }
    }
}

/// Serve `config.files.root` with cross-origin isolation headers until SIGINT/SIGTERM
pub async fn run(config: Config) -> Result<(), ServerError> {
    let state = Arc::new(AppState::new(config, Arc::new(CrossOriginIsolation))?);
    let server = Server::bind(Arc::clone(&state))?;

    logger::log_server_start(&server.local_addr()?, &state.config, &state.root);

    server.run_until(signal::shutdown_signal()).await
}
