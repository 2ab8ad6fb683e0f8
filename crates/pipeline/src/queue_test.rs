//! Tests for the bounded log-line queue

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use crate::queue::LogQueue;

fn line(s: &str) -> Bytes {
    Bytes::copy_from_slice(s.as_bytes())
}

#[test]
fn test_new_queue_is_empty_and_open() {
    let queue = LogQueue::new(4);
    assert_eq!(queue.len(), 0);
    assert!(queue.is_empty());
    assert!(!queue.is_closed());
    assert_eq!(queue.capacity(), 4);
}

#[test]
fn test_push_until_full() {
    let queue = LogQueue::new(2);
    assert!(queue.try_push(line("a")));
    assert!(queue.try_push(line("b")));
    assert!(!queue.try_push(line("c")), "push on a full queue must fail");
    assert_eq!(queue.len(), 2);
}

#[test]
fn test_push_on_closed_queue_fails() {
    let queue = LogQueue::new(4);
    queue.close();
    assert!(!queue.try_push(line("a")));
    assert_eq!(queue.len(), 0);
}

#[test]
fn test_close_is_sticky_and_idempotent() {
    let queue = LogQueue::new(4);
    queue.close();
    queue.close();
    assert!(queue.is_closed());
    assert!(!queue.try_push(line("a")));
}

#[tokio::test]
async fn test_pop_batch_fifo_order() {
    let queue = LogQueue::new(8);
    for s in ["first", "second", "third"] {
        assert!(queue.try_push(line(s)));
    }

    let batch = queue.pop_batch(8).await;
    assert_eq!(batch, vec![line("first"), line("second"), line("third")]);
    assert!(queue.is_empty());
}

#[tokio::test]
async fn test_pop_batch_respects_max() {
    let queue = LogQueue::new(8);
    for i in 0..5 {
        assert!(queue.try_push(line(&i.to_string())));
    }

    let batch = queue.pop_batch(2).await;
    assert_eq!(batch, vec![line("0"), line("1")]);
    assert_eq!(queue.len(), 3);

    let batch = queue.pop_batch(8).await;
    assert_eq!(batch.len(), 3);
    assert_eq!(batch[0], line("2"));
}

#[tokio::test]
async fn test_pop_batch_on_closed_empty_returns_empty() {
    let queue = LogQueue::new(4);
    queue.close();
    assert!(queue.pop_batch(8).await.is_empty());
}

#[tokio::test]
async fn test_pop_batch_drains_items_pushed_before_close() {
    let queue = LogQueue::new(4);
    assert!(queue.try_push(line("kept")));
    queue.close();

    assert_eq!(queue.pop_batch(8).await, vec![line("kept")]);
    assert!(queue.pop_batch(8).await.is_empty());
}

#[tokio::test]
async fn test_pop_batch_for_times_out_empty() {
    let queue = LogQueue::new(4);
    let batch = queue.pop_batch_for(8, Duration::from_millis(20)).await;
    assert!(batch.is_empty());
    assert!(!queue.is_closed(), "timeout is not an error or a close");
}

#[tokio::test]
async fn test_pop_batch_for_returns_available_items() {
    let queue = LogQueue::new(4);
    assert!(queue.try_push(line("x")));

    let batch = queue.pop_batch_for(8, Duration::from_secs(5)).await;
    assert_eq!(batch, vec![line("x")]);
}

#[tokio::test]
async fn test_push_wakes_blocked_pop() {
    let queue = Arc::new(LogQueue::new(4));

    let consumer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.pop_batch(8).await })
    };

    // Let the consumer reach its wait before pushing.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(queue.try_push(line("wake")));

    let batch = tokio::time::timeout(Duration::from_secs(1), consumer)
        .await
        .expect("pop did not wake on push")
        .unwrap();
    assert_eq!(batch, vec![line("wake")]);
}

#[tokio::test]
async fn test_close_wakes_all_waiters() {
    let queue = Arc::new(LogQueue::new(4));

    let waiters: Vec<_> = (0..3)
        .map(|_| {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.pop_batch(8).await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(20)).await;
    queue.close();

    for waiter in waiters {
        let batch = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter did not wake on close")
            .unwrap();
        assert!(batch.is_empty());
    }
}

#[tokio::test]
async fn test_capacity_one_queue() {
    let queue = LogQueue::new(1);

    assert!(queue.try_push(line("a")));
    assert!(!queue.try_push(line("b")), "second push before pop drops");

    assert_eq!(queue.pop_batch(8).await, vec![line("a")]);
    assert!(queue.try_push(line("c")));
    assert_eq!(queue.pop_batch(8).await, vec![line("c")]);
}

#[tokio::test]
async fn test_concurrent_producer_consumer_preserves_fifo() {
    const TOTAL: usize = 500;
    let queue = Arc::new(LogQueue::new(32));

    let consumer = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move {
            let mut seen = Vec::with_capacity(TOTAL);
            loop {
                let batch = queue.pop_batch_for(16, Duration::from_millis(10)).await;
                seen.extend(batch);
                if queue.is_closed() && queue.is_empty() {
                    break;
                }
            }
            seen
        })
    };

    let queue_producer = Arc::clone(&queue);
    let producer = tokio::spawn(async move {
        let mut accepted = Vec::new();
        for i in 0..TOTAL {
            let item = line(&format!("msg-{i:04}"));
            // Retry until the consumer makes room; a real producer would
            // drop here, but the test wants every index delivered.
            loop {
                if queue_producer.try_push(item.clone()) {
                    accepted.push(item);
                    break;
                }
                tokio::task::yield_now().await;
            }
        }
        accepted
    });

    let accepted = producer.await.unwrap();
    queue.close();
    let seen = tokio::time::timeout(Duration::from_secs(5), consumer)
        .await
        .expect("consumer did not drain")
        .unwrap();

    assert_eq!(seen, accepted, "consumed order must match produced order");
}
