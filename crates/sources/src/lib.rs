//! Collector sources
//!
//! Network sources that receive raw log lines and hand them to the
//! pipeline queue.
//!
//! # Available Sources
//!
//! - **UDP** - one datagram per log line, lossy at the edge
//!
//! # Design Principles
//!
//! - **Drain fast**: the receiver's only job is to get datagrams out of
//!   the kernel buffer; it never blocks on the queue
//! - **Owned payloads**: each datagram is copied out of the reused read
//!   buffer into its own allocation before entering the queue
//! - **Counted loss**: a full queue drops the incoming datagram and
//!   increments a counter; nothing else is recorded

pub mod udp;

pub use udp::{UdpReceiver, UdpReceiverConfig, UdpReceiverError};
