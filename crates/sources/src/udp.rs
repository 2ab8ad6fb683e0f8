//! UDP log source
//!
//! Receives one log line per datagram and pushes it onto the pipeline
//! queue. UDP is the ingress contract: delivery is unacknowledged, and
//! when the queue is full the datagram is dropped and counted rather
//! than ever blocking the socket loop.
//!
//! # Design
//!
//! - A single socket bound to `0.0.0.0:<port>`
//! - A fixed read buffer; payloads beyond [`MAX_LINE_SIZE`] bytes are
//!   truncated by the read
//! - Each accepted payload is copied into an owned `Bytes` before the
//!   push, since the read buffer is reused
//! - `received` is incremented before the push attempt, `dropped` after
//!   a failed one, so a scrape may transiently observe
//!   `received > written + dropped + queue_depth`

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use logcollector_metrics::Stats;
use logcollector_pipeline::LogQueue;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

/// Read buffer size per datagram
pub const RECV_BUFFER_SIZE: usize = 2048;

/// Longest accepted log line; one less than the buffer
pub const MAX_LINE_SIZE: usize = RECV_BUFFER_SIZE - 1;

/// Default kernel receive buffer request (256KB, best-effort)
const DEFAULT_SOCKET_BUFFER_SIZE: usize = 256 * 1024;

/// UDP receiver configuration
#[derive(Debug, Clone)]
pub struct UdpReceiverConfig {
    /// Bind address
    pub address: String,

    /// Listen port
    pub port: u16,

    /// Requested SO_RCVBUF size (best-effort)
    pub socket_buffer_size: usize,
}

impl Default for UdpReceiverConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 9000,
            socket_buffer_size: DEFAULT_SOCKET_BUFFER_SIZE,
        }
    }
}

impl UdpReceiverConfig {
    /// Create config with a custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// UDP receiver errors
#[derive(Debug, thiserror::Error)]
pub enum UdpReceiverError {
    /// Failed to bind to the configured address
    #[error("failed to bind UDP source to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Datagram-per-line UDP receiver
pub struct UdpReceiver {
    config: UdpReceiverConfig,
    queue: Arc<LogQueue>,
    stats: Arc<Stats>,
}

impl UdpReceiver {
    /// Create a new receiver feeding `queue`
    pub fn new(config: UdpReceiverConfig, queue: Arc<LogQueue>, stats: Arc<Stats>) -> Self {
        Self {
            config,
            queue,
            stats,
        }
    }

    /// Bind the socket and receive until cancelled
    ///
    /// Bind failure is fatal; receive errors are transient and skipped.
    /// The socket closes when this returns.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), UdpReceiverError> {
        let socket = self.bind_socket()?;

        tracing::info!(
            address = %self.config.bind_address(),
            max_line = MAX_LINE_SIZE,
            "UDP source listening"
        );

        self.run_on(socket, cancel).await;
        Ok(())
    }

    /// Receive on an already-bound socket until cancelled
    pub async fn run_on(self, socket: UdpSocket, cancel: CancellationToken) {
        let mut buf = [0u8; RECV_BUFFER_SIZE];

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                recv = socket.recv_from(&mut buf[..MAX_LINE_SIZE]) => {
                    match recv {
                        Ok((len, _peer)) => self.ingest(&buf[..len]),
                        Err(e) => {
                            // Equivalent of EINTR/EAGAIN on the blocking
                            // path: stay in the loop.
                            tracing::debug!(error = %e, "UDP recv error");
                        }
                    }
                }
            }
        }

        // Socket drops here, releasing the port.
        tracing::info!("UDP source stopped");
    }

    /// Account and enqueue one datagram payload
    fn ingest(&self, payload: &[u8]) {
        if payload.is_empty() {
            return;
        }

        self.stats.record_received();

        // The read buffer is reused; the queue owns a copy.
        if !self.queue.try_push(Bytes::copy_from_slice(payload)) {
            self.stats.record_dropped();
        }
    }

    /// Create the UDP socket with a sized receive buffer
    fn bind_socket(&self) -> Result<UdpSocket, UdpReceiverError> {
        let address = self.config.bind_address();
        let bind_err = |source| UdpReceiverError::Bind {
            address: address.clone(),
            source,
        };

        let addr: SocketAddr = address.parse().map_err(|_| UdpReceiverError::Bind {
            address: address.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid socket address"),
        })?;

        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)).map_err(bind_err)?;

        // Larger kernel buffer absorbs bursts while the queue is contended.
        if let Err(e) = socket.set_recv_buffer_size(self.config.socket_buffer_size) {
            tracing::warn!(
                error = %e,
                requested_size = self.config.socket_buffer_size,
                "failed to set UDP SO_RCVBUF"
            );
        }

        socket.bind(&addr.into()).map_err(bind_err)?;
        socket.set_nonblocking(true).map_err(bind_err)?;

        let std_socket: std::net::UdpSocket = socket.into();
        UdpSocket::from_std(std_socket).map_err(bind_err)
    }
}

#[cfg(test)]
#[path = "udp_test.rs"]
mod udp_test;
