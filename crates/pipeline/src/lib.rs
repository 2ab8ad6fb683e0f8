//! Collector pipeline
//!
//! The handoff machinery between the UDP receiver and the disk sink.
//!
//! # Architecture
//!
//! ```text
//! [Receiver]                     [Queue]                    [Writer]
//!   recv_from ──try_push──→  LogQueue (bounded) ──pop_batch_for──→ RotatingFileSink
//!                                │                                       │
//!                            drop + count                         batched writes,
//!                            when full                            timed flushes
//! ```
//!
//! # Key Design
//!
//! - **Lossy at the edge**: `try_push` never blocks; a full queue means a
//!   counted drop at the receiver, not backpressure into the kernel
//! - **Batched timed pop**: the writer drains up to `batch` items per lock
//!   acquisition and never sleeps longer than the flush interval
//! - **Drain on close**: once the queue closes, the writer exits only
//!   after the queue is empty, so every accepted line reaches disk

mod error;
mod queue;
mod writer;

pub use error::WriterError;
pub use queue::LogQueue;
pub use writer::{LogWriter, LogWriterConfig, WriterHandle};
