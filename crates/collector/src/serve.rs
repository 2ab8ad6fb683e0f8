//! Pipeline wiring and lifecycle
//!
//! Builds the queue, writer, metrics endpoint, and UDP receiver from the
//! loaded configuration and runs them until a termination signal or a
//! fatal component failure.
//!
//! # Shutdown order
//!
//! The sequence is load-bearing and always runs in full:
//!
//! 1. stop is requested (signal, or an error path triggering it)
//! 2. the receiver's select returns and its socket closes
//! 3. the queue is closed
//! 4. the writer is joined - it drains every queued line first
//! 5. the metrics endpoint and reporter are joined
//!
//! Closing the queue before the receiver exits would drop late
//! datagrams as "closed" pushes; joining the writer before closing the
//! queue would wait forever.

use std::pin::pin;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use logcollector_config::Config;
use logcollector_metrics::{MetricsServer, MetricsServerConfig, Stats, StatsReporter};
use logcollector_pipeline::{LogQueue, LogWriter, LogWriterConfig};
use logcollector_sinks::RotatingFileConfig;
use logcollector_sources::{UdpReceiver, UdpReceiverConfig};

use crate::shutdown::Shutdown;

/// Run the collector until SIGINT/SIGTERM
pub async fn run(config: Config) -> anyhow::Result<()> {
    let shutdown = Shutdown::install().context("failed to install signal handlers")?;
    run_with_shutdown(config, shutdown).await
}

/// Run the collector against an externally controlled shutdown signal
pub async fn run_with_shutdown(config: Config, shutdown: Shutdown) -> anyhow::Result<()> {
    let stats = Arc::new(Stats::new());
    let queue = Arc::new(LogQueue::new(config.queue));

    // Writer first: it owns the sink, and everything downstream of the
    // queue depends on it being alive.
    let writer = LogWriter::new(
        Arc::clone(&queue),
        Arc::clone(&stats),
        LogWriterConfig {
            sink: RotatingFileConfig {
                path: config.out.clone(),
                max_bytes: config.rotate_max_bytes(),
                max_files: config.rotate_files,
            },
            batch_size: config.batch,
            flush_interval: config.flush_interval(),
        },
    );
    let mut writer_handle = writer.start();

    let metrics = MetricsServer::new(
        MetricsServerConfig {
            bind_ip: config.bind_ip.clone(),
            port: config.metrics_port,
        },
        Arc::clone(&stats),
        Arc::clone(&queue) as _,
    );
    let mut metrics_task = tokio::spawn(metrics.run(shutdown.token()));

    let reporter_task = config.report_interval().map(|interval| {
        let reporter = StatsReporter::new(Arc::clone(&stats), Arc::clone(&queue) as _, interval);
        tokio::spawn(reporter.run(shutdown.token()))
    });

    let receiver = UdpReceiver::new(
        UdpReceiverConfig {
            port: config.udp_port,
            ..Default::default()
        },
        Arc::clone(&queue),
        Arc::clone(&stats),
    );

    // The receiver runs in the foreground; a dead writer or metrics
    // endpoint ends the run early instead of silently losing data.
    let mut receiver_fut = pin!(receiver.run(shutdown.token()));

    let mut failure: Option<anyhow::Error> = None;
    let mut receiver_done = false;
    let mut writer_done = false;
    let mut metrics_done = false;

    tokio::select! {
        res = &mut receiver_fut => {
            receiver_done = true;
            if let Err(e) = res {
                failure = Some(e.into());
            } else if shutdown.stop_requested() {
                tracing::info!("stop requested, draining queued lines");
            }
        }
        res = writer_handle.wait() => {
            writer_done = true;
            failure = Some(match res {
                Ok(()) => anyhow!("writer exited while the queue was open"),
                Err(e) => e.into(),
            });
        }
        res = &mut metrics_task => {
            metrics_done = true;
            failure = Some(match res {
                Ok(Ok(())) => anyhow!("metrics endpoint exited unexpectedly"),
                Ok(Err(e)) => e.into(),
                Err(e) => e.into(),
            });
        }
    }

    // Tear down in the mandatory order whatever got us here.
    shutdown.trigger();

    if !receiver_done {
        if let Err(e) = receiver_fut.await {
            failure.get_or_insert(e.into());
        }
    }

    queue.close();

    if !writer_done {
        if let Err(e) = writer_handle.wait().await {
            failure.get_or_insert(e.into());
        }
    }

    if !metrics_done {
        match metrics_task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                failure.get_or_insert(e.into());
            }
            Err(e) => {
                failure.get_or_insert(e.into());
            }
        }
    }

    if let Some(task) = reporter_task {
        let _ = task.await;
    }

    if let Some(error) = failure {
        return Err(error);
    }

    let totals = stats.snapshot();
    tracing::info!(
        received = totals.received,
        written = totals.written,
        dropped = totals.dropped,
        "collector stopped"
    );

    Ok(())
}
