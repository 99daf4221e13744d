//! One bound HTTP listener with per-connection limits
//!
//! Connections are served by hyper directly (rather than `axum::serve`)
//! so the header read timeout and header size cap can be set. On
//! shutdown the listener stops accepting, closes its socket, and waits
//! for in-flight connections to finish before returning.

use super::shutdown::ShutdownSignal;
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// Header read and request handling timeout
pub const SERVER_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound for the request head (request line plus headers)
///
/// Enforced exactly by the router, which answers 431. The connection read
/// buffer is sized above it so heads near the limit reach the router.
pub const MAX_HEADER_BYTES: usize = 1 << 16;

/// hyper read buffer cap, a backstop for heads far over the limit
const READ_BUFFER_BYTES: usize = MAX_HEADER_BYTES * 2;

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read local address of {addr}: {source}")]
    LocalAddr {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// A bound listener ready to serve a router
pub struct HttpListener {
    listen: String,
    listener: TcpListener,
    local_addr: SocketAddr,
    app: Router,
}

impl HttpListener {
    /// Bind `addr` (`host:port`, resolved by the OS)
    pub async fn bind(addr: &str, app: Router) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::LocalAddr {
                addr: addr.to_string(),
                source,
            })?;

        // Log after successful bind - server is actually listening
        info!(listen = %addr, local_addr = %local_addr, "Listen at");

        Ok(Self {
            listen: addr.to_string(),
            listener,
            local_addr,
            app,
        })
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until shutdown, then drain
    ///
    /// Accept errors are logged and retried; only shutdown ends the loop.
    pub async fn serve(self, mut shutdown: ShutdownSignal) {
        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(SERVER_TIMEOUT)
            .max_buf_size(READ_BUFFER_BYTES);

        let graceful = GracefulShutdown::new();

        loop {
            let (stream, peer) = tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        error!(listen = %self.listen, error = %e, "accepting connection");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                },
            };

            let service = TowerToHyperService::new(self.app.clone());
            let conn = graceful.watch(builder.serve_connection(TokioIo::new(stream), service));
            let listen = self.listen.clone();
            tokio::spawn(async move {
                // Covers client resets and response write failures
                if let Err(e) = conn.await {
                    debug!(listen = %listen, peer = %peer, error = %e, "connection error");
                }
            });
        }

        info!(listen = %self.listen, "got done, closing");
        drop(self.listener);
        graceful.shutdown().await;
        info!(listen = %self.listen, "graceful shutdown");
    }
}
