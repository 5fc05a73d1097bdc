//! HTTP server for the webhook and operator endpoints
//!
//! Each accepted connection is served on its own task. Processing cycles
//! triggered by concurrent requests queue on the cycle lock.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::app::AppState;
use crate::routes::handle_request;

/// HTTP front end of the relay
pub struct RelayServer {
    state: Arc<AppState>,
    addr: SocketAddr,
}

impl RelayServer {
    /// Creates a server bound to `endpoint`, e.g. `"0.0.0.0:8080"`
    pub fn new(state: Arc<AppState>, endpoint: &str) -> anyhow::Result<Self> {
        let addr: SocketAddr = endpoint
            .parse()
            .with_context(|| format!("Invalid bind address '{endpoint}'"))?;
        Ok(Self { state, addr })
    }

    /// Accepts connections until `shutdown` is cancelled
    ///
    /// Connections already being served are left to finish on their own tasks.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "Relay server listening");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, peer) = result?;
                    let io = TokioIo::new(stream);
                    let state = Arc::clone(&self.state);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| handle_request(req, Arc::clone(&state)));

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            error!(peer = %peer, error = %e, "HTTP connection error");
                        }
                    });
                }
                _ = shutdown.cancelled() => {
                    info!("Relay server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
