//! Metrics endpoint
//!
//! A deliberately tiny HTTP responder for scrapes on a trusted network.
//! Single-shot HTTP/1.0-style exchanges: one `recv`, one response,
//! `Connection: close`, no keep-alive. Connections are handled serially
//! on the server task.
//!
//! # Endpoints
//!
//! - `GET /metrics` - Prometheus text-format exposition
//! - `GET /health` - JSON counters
//! - anything else - 404 `Not Found`
//!
//! The reader is best-effort: whatever the first read returns is matched
//! against the request-line prefixes, and an absent or truncated line
//! falls through to 404.

use std::net::SocketAddr;
use std::sync::Arc;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use crate::format::{render_health, render_prometheus};
use crate::stats::{QueueDepth, Stats};

/// Listen backlog for the metrics socket
const LISTEN_BACKLOG: i32 = 64;

/// Maximum bytes read from a scrape request
const MAX_REQUEST_BYTES: usize = 1024;

/// Metrics server configuration
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_ip: String,

    /// Listen port
    pub port: u16,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            bind_ip: "127.0.0.1".into(),
            port: 9100,
        }
    }
}

impl MetricsServerConfig {
    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.bind_ip, self.port)
    }
}

/// Metrics server errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsServerError {
    /// Failed to bind the listen socket
    #[error("failed to bind metrics endpoint to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Single-threaded HTTP responder for `/metrics` and `/health`
pub struct MetricsServer {
    config: MetricsServerConfig,
    stats: Arc<Stats>,
    queue: Arc<dyn QueueDepth>,
}

impl MetricsServer {
    /// Create a new metrics server
    pub fn new(config: MetricsServerConfig, stats: Arc<Stats>, queue: Arc<dyn QueueDepth>) -> Self {
        Self {
            config,
            stats,
            queue,
        }
    }

    /// Bind the listener and serve until cancelled
    ///
    /// Bind failure is fatal and surfaces to the caller; per-connection
    /// I/O errors are transient and skipped.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), MetricsServerError> {
        let listener = self.bind_listener()?;

        tracing::info!(
            address = %self.config.bind_address(),
            "metrics endpoint listening"
        );

        self.run_on(listener, cancel).await;
        Ok(())
    }

    /// Serve on an already-bound listener until cancelled
    pub async fn run_on(self, listener: TcpListener, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _peer)) => self.handle_connection(stream).await,
                        Err(e) => {
                            tracing::debug!(error = %e, "metrics accept error");
                        }
                    }
                }
            }
        }

        // Listener drops here, closing the socket.
        tracing::info!("metrics endpoint stopped");
    }

    /// Create the listen socket with SO_REUSEADDR and a backlog of 64
    fn bind_listener(&self) -> Result<TcpListener, MetricsServerError> {
        let address = self.config.bind_address();
        let bind_err = |source| MetricsServerError::Bind {
            address: address.clone(),
            source,
        };

        let addr: SocketAddr = address.parse().map_err(|_| MetricsServerError::Bind {
            address: address.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid socket address"),
        })?;

        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket =
            Socket::new(domain, Type::STREAM, Some(Protocol::TCP)).map_err(bind_err)?;
        socket.set_reuse_address(true).map_err(bind_err)?;
        socket.bind(&addr.into()).map_err(bind_err)?;
        socket.listen(LISTEN_BACKLOG).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;

        let std_listener: std::net::TcpListener = socket.into();
        TcpListener::from_std(std_listener).map_err(bind_err)
    }

    /// Answer a single scrape and close the connection
    async fn handle_connection(&self, mut stream: TcpStream) {
        let mut buf = [0u8; MAX_REQUEST_BYTES];
        let n = match stream.read(&mut buf).await {
            Ok(n) => n,
            // Short or failed reads are the client's problem; just hang up.
            Err(_) => return,
        };

        let line = first_line(&buf[..n]);
        let queue_depth = self.queue.depth();
        let stats = self.stats.snapshot();

        let (status, content_type, body) = if line.starts_with(b"GET /metrics") {
            (
                "200 OK",
                "text/plain; version=0.0.4",
                render_prometheus(&stats, queue_depth),
            )
        } else if line.starts_with(b"GET /health") {
            (
                "200 OK",
                "application/json",
                render_health(&stats, queue_depth),
            )
        } else {
            ("404 Not Found", "text/plain", "Not Found\n".to_string())
        };

        let response = format!(
            "HTTP/1.1 {status}\r\n\
             Content-Type: {content_type}\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\
             \r\n\
             {body}",
            body.len()
        );

        // Partial sends to a slow scraper are not worth retrying.
        let _ = stream.write_all(response.as_bytes()).await;
        let _ = stream.shutdown().await;
    }
}

/// Extract the first line of the request buffer
fn first_line(buf: &[u8]) -> &[u8] {
    let end = buf
        .iter()
        .position(|&b| b == b'\n' || b == b'\r')
        .unwrap_or(buf.len());
    &buf[..end]
}

#[cfg(test)]
#[path = "server_test.rs"]
mod server_test;
