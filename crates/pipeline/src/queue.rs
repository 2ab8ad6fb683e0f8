//! Bounded log-line queue
//!
//! Fixed-capacity FIFO handoff between the receiver and the writer.
//! Producers never block: `try_push` reports full/closed as `false`.
//! The consumer pops in batches, bounded by an optional timeout, and is
//! woken once per successful push.
//!
//! Built on a mutex-guarded `VecDeque` plus `tokio::sync::Notify`. The
//! `Notified` future is enabled *before* the state check under the lock,
//! so a push or close racing with a waiter going to sleep can never be
//! missed.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use logcollector_metrics::QueueDepth;
use tokio::sync::Notify;
use tokio::time::Instant;

/// Thread-safe bounded FIFO of log lines
pub struct LogQueue {
    inner: Mutex<Inner>,
    notify: Notify,
    capacity: usize,
}

struct Inner {
    items: VecDeque<Bytes>,
    closed: bool,
}

impl LogQueue {
    /// Create a queue holding at most `capacity` items
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::with_capacity(capacity.min(1024)),
                closed: false,
            }),
            notify: Notify::new(),
            capacity,
        }
    }

    /// Non-blocking push
    ///
    /// Returns `false` when the queue is closed or full; the caller
    /// accounts the drop. One waiter is woken per successful push.
    pub fn try_push(&self, line: Bytes) -> bool {
        {
            let mut inner = self.lock();
            if inner.closed || inner.items.len() >= self.capacity {
                return false;
            }
            inner.items.push_back(line);
        }
        self.notify.notify_one();
        true
    }

    /// Pop up to `max` items, waiting until something is available or the
    /// queue closes
    ///
    /// Returns empty only when the queue is closed and drained.
    pub async fn pop_batch(&self, max: usize) -> Vec<Bytes> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed || !inner.items.is_empty() {
                    return drain(&mut inner, max);
                }
            }

            notified.await;
        }
    }

    /// Pop up to `max` items, waiting at most `timeout`
    ///
    /// On timeout, returns whatever is present - possibly nothing. An
    /// empty result is a legal, non-exceptional outcome.
    pub async fn pop_batch_for(&self, max: usize, timeout: Duration) -> Vec<Bytes> {
        let deadline = Instant::now() + timeout;

        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if inner.closed || !inner.items.is_empty() {
                    return drain(&mut inner, max);
                }
            }

            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return drain(&mut self.lock(), max);
            }
        }
    }

    /// Close the queue
    ///
    /// Sticky; pushes fail from here on, and every waiter wakes. Idempotent.
    pub fn close(&self) {
        self.lock().closed = true;
        self.notify.notify_waiters();
    }

    /// Whether `close()` has been called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Current number of buffered items
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether the queue is currently empty
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Maximum number of buffered items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Nothing awaits or panics while holding the lock; the state in a
        // poisoned guard is still consistent.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl QueueDepth for LogQueue {
    fn depth(&self) -> usize {
        self.len()
    }
}

/// Take up to `max` front items in FIFO order
fn drain(inner: &mut Inner, max: usize) -> Vec<Bytes> {
    let n = inner.items.len().min(max);
    inner.items.drain(..n).collect()
}

#[cfg(test)]
#[path = "queue_test.rs"]
mod queue_test;
