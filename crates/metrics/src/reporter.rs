//! Periodic stats report
//!
//! Logs the pipeline counters and per-second rates on a fixed interval,
//! one structured line per tick. Purely observational; the endpoint in
//! [`crate::server`] is the machine-readable surface.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::stats::{QueueDepth, Stats, StatsSnapshot};

/// Periodic reporter task
pub struct StatsReporter {
    stats: Arc<Stats>,
    queue: Arc<dyn QueueDepth>,
    interval: Duration,
}

impl StatsReporter {
    /// Create a reporter ticking at `interval`
    pub fn new(stats: Arc<Stats>, queue: Arc<dyn QueueDepth>, interval: Duration) -> Self {
        Self {
            stats,
            queue,
            interval,
        }
    }

    /// Log one line per interval until cancelled
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; consume it so the first
        // report covers a full interval.
        ticker.tick().await;

        let mut last = self.stats.snapshot();
        let mut last_tick = Instant::now();

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                _ = ticker.tick() => {}
            }

            let now = Instant::now();
            let dt = now.duration_since(last_tick).as_secs_f64();
            last_tick = now;

            let current = self.stats.snapshot();
            let (recv_rate, wr_rate, drop_rate) = rates(&last, &current, dt);

            tracing::info!(
                received = current.received,
                written = current.written,
                dropped = current.dropped,
                queue_depth = self.queue.depth(),
                recv_per_s = recv_rate,
                wr_per_s = wr_rate,
                drop_per_s = drop_rate,
                "pipeline stats"
            );

            last = current;
        }
    }
}

/// Per-second deltas between two snapshots
fn rates(last: &StatsSnapshot, current: &StatsSnapshot, dt: f64) -> (f64, f64, f64) {
    if dt <= 0.0 {
        return (0.0, 0.0, 0.0);
    }
    (
        (current.received - last.received) as f64 / dt,
        (current.written - last.written) as f64 / dt,
        (current.dropped - last.dropped) as f64 / dt,
    )
}
