//! Tests for the UDP log source

use std::sync::Arc;
use std::time::Duration;

use logcollector_metrics::Stats;
use logcollector_pipeline::LogQueue;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;

use crate::udp::{UdpReceiver, UdpReceiverConfig, MAX_LINE_SIZE, RECV_BUFFER_SIZE};

struct Harness {
    target: String,
    queue: Arc<LogQueue>,
    stats: Arc<Stats>,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

/// Start a receiver on an OS-assigned port and return the send target
async fn start_receiver(queue_capacity: usize) -> Harness {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let target = socket.local_addr().unwrap().to_string();

    let queue = Arc::new(LogQueue::new(queue_capacity));
    let stats = Arc::new(Stats::new());
    let receiver = UdpReceiver::new(
        UdpReceiverConfig::default(),
        Arc::clone(&queue),
        Arc::clone(&stats),
    );

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let task = tokio::spawn(receiver.run_on(socket, token));

    Harness {
        target,
        queue,
        stats,
        cancel,
        task,
    }
}

async fn send(target: &str, payload: &[u8]) {
    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.send_to(payload, target).await.unwrap();
}

/// Wait until `cond` holds or a couple of seconds pass
async fn wait_for(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

#[test]
fn test_config_defaults() {
    let config = UdpReceiverConfig::default();
    assert_eq!(config.address, "0.0.0.0");
    assert_eq!(config.port, 9000);
    assert_eq!(config.bind_address(), "0.0.0.0:9000");
}

#[test]
fn test_config_with_port() {
    let config = UdpReceiverConfig::with_port(1514);
    assert_eq!(config.port, 1514);
    assert_eq!(config.bind_address(), "0.0.0.0:1514");
}

#[test]
fn test_buffer_constants() {
    assert_eq!(RECV_BUFFER_SIZE, 2048);
    assert_eq!(MAX_LINE_SIZE, 2047);
}

#[tokio::test]
async fn test_datagram_reaches_queue() {
    let h = start_receiver(16).await;

    send(&h.target, b"hello collector").await;
    wait_for(|| h.queue.len() == 1).await;

    let batch = h.queue.pop_batch(8).await;
    assert_eq!(batch.len(), 1);
    assert_eq!(&batch[0][..], b"hello collector");
    assert_eq!(h.stats.snapshot().received, 1);
    assert_eq!(h.stats.snapshot().dropped, 0);

    h.cancel.cancel();
    let _ = h.task.await;
}

#[tokio::test]
async fn test_datagrams_keep_arrival_order() {
    let h = start_receiver(16).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for i in 0..5 {
        client
            .send_to(format!("msg-{i}").as_bytes(), &h.target)
            .await
            .unwrap();
    }

    wait_for(|| h.queue.len() == 5).await;
    let batch = h.queue.pop_batch(8).await;
    let got: Vec<_> = batch.iter().map(|b| String::from_utf8_lossy(b).into_owned()).collect();
    assert_eq!(got, ["msg-0", "msg-1", "msg-2", "msg-3", "msg-4"]);

    h.cancel.cancel();
    let _ = h.task.await;
}

#[tokio::test]
async fn test_empty_datagram_is_ignored() {
    let h = start_receiver(16).await;

    send(&h.target, b"").await;
    send(&h.target, b"real").await;
    wait_for(|| h.queue.len() == 1).await;

    // The empty datagram left no trace at all.
    assert_eq!(h.stats.snapshot().received, 1);
    assert_eq!(h.queue.len(), 1);

    h.cancel.cancel();
    let _ = h.task.await;
}

#[tokio::test]
async fn test_oversized_datagram_is_truncated() {
    let h = start_receiver(16).await;

    let oversized = vec![b'x'; RECV_BUFFER_SIZE];
    send(&h.target, &oversized).await;
    wait_for(|| h.queue.len() == 1).await;

    let batch = h.queue.pop_batch(8).await;
    assert_eq!(batch[0].len(), MAX_LINE_SIZE);

    h.cancel.cancel();
    let _ = h.task.await;
}

#[tokio::test]
async fn test_full_queue_drops_and_counts() {
    let h = start_receiver(2).await;

    let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for i in 0..6 {
        client
            .send_to(format!("n={i}").as_bytes(), &h.target)
            .await
            .unwrap();
    }

    wait_for(|| h.stats.snapshot().received == 6).await;
    let s = h.stats.snapshot();
    assert_eq!(s.received, 6);
    assert_eq!(s.dropped, 4, "capacity 2 keeps the first two only");

    // The survivors are a prefix of the sent sequence.
    let batch = h.queue.pop_batch(8).await;
    assert_eq!(&batch[0][..], b"n=0");
    assert_eq!(&batch[1][..], b"n=1");

    h.cancel.cancel();
    let _ = h.task.await;
}

#[tokio::test]
async fn test_non_utf8_payload_passes_through() {
    let h = start_receiver(16).await;

    send(&h.target, &[0xde, 0xad, 0xbe, 0xef]).await;
    wait_for(|| h.queue.len() == 1).await;

    let batch = h.queue.pop_batch(8).await;
    assert_eq!(&batch[0][..], &[0xde, 0xad, 0xbe, 0xef]);

    h.cancel.cancel();
    let _ = h.task.await;
}

#[tokio::test]
async fn test_stops_on_cancellation() {
    let h = start_receiver(16).await;

    h.cancel.cancel();
    tokio::time::timeout(Duration::from_secs(1), h.task)
        .await
        .expect("receiver did not stop promptly")
        .unwrap();
}

#[tokio::test]
async fn test_bind_error_on_occupied_port() {
    let occupied = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let port = occupied.local_addr().unwrap().port();

    let receiver = UdpReceiver::new(
        UdpReceiverConfig {
            address: "127.0.0.1".into(),
            port,
            ..Default::default()
        },
        Arc::new(LogQueue::new(4)),
        Arc::new(Stats::new()),
    );

    let err = receiver
        .run(CancellationToken::new())
        .await
        .expect_err("bind should fail on an occupied port");
    assert!(err.to_string().contains(&port.to_string()));
}
