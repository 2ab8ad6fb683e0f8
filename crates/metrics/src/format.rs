//! Exposition formats for the metrics endpoint
//!
//! Prometheus text format (version 0.0.4) for `/metrics` and a small
//! JSON document for `/health`. Values are rendered as literal decimal
//! integers; nothing here allocates beyond the output string.

use std::fmt::Write;

use crate::stats::StatsSnapshot;

/// Render the Prometheus text-format exposition
///
/// Four series, each preceded by `# HELP` and `# TYPE` lines. The
/// queue-depth gauge is last.
pub fn render_prometheus(stats: &StatsSnapshot, queue_depth: usize) -> String {
    let mut body = String::with_capacity(512);

    let _ = writeln!(
        body,
        "# HELP logcollector_received_total Total UDP packets received\n\
         # TYPE logcollector_received_total counter\n\
         logcollector_received_total {}",
        stats.received
    );
    let _ = writeln!(
        body,
        "# HELP logcollector_written_total Total log lines written\n\
         # TYPE logcollector_written_total counter\n\
         logcollector_written_total {}",
        stats.written
    );
    let _ = writeln!(
        body,
        "# HELP logcollector_dropped_total Total UDP packets dropped due to full queue\n\
         # TYPE logcollector_dropped_total counter\n\
         logcollector_dropped_total {}",
        stats.dropped
    );
    let _ = writeln!(
        body,
        "# HELP logcollector_queue_depth Current queue depth\n\
         # TYPE logcollector_queue_depth gauge\n\
         logcollector_queue_depth {}",
        queue_depth
    );

    body
}

/// Render the `/health` JSON body
pub fn render_health(stats: &StatsSnapshot, queue_depth: usize) -> String {
    format!(
        "{{\"status\":\"ok\",\"received\":{},\"written\":{},\"dropped\":{},\"queue_depth\":{}}}",
        stats.received, stats.written, stats.dropped, queue_depth
    )
}
