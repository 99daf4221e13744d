//! Tests for the completion barrier

use super::barrier::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_wait_on_empty_barrier_returns_immediately() {
    let barrier = CompletionBarrier::new();

    let result = tokio::time::timeout(Duration::from_millis(100), barrier.wait()).await;

    assert!(result.is_ok(), "empty barrier should not block");
    assert_eq!(barrier.active(), 0);
}

#[test]
fn test_guards_track_active_count() {
    let barrier = CompletionBarrier::new();

    let first = barrier.enter("prober");
    let second = barrier.enter("listener");
    assert_eq!(barrier.active(), 2);
    assert_eq!(first.component(), "prober");

    drop(first);
    assert_eq!(barrier.active(), 1);

    drop(second);
    assert_eq!(barrier.active(), 0);
}

/// A waiter stays blocked until the last of N guards is dropped, then
/// returns exactly once
#[tokio::test]
async fn test_waiter_unblocks_after_last_exit() {
    // ARRANGE: N components registered, exits interleaved out of order
    let barrier = CompletionBarrier::new();
    let mut guards: Vec<_> = (0..5).map(|i| barrier.enter(format!("c{}", i))).collect();

    let returns = Arc::new(AtomicUsize::new(0));
    let waiter = {
        let barrier = barrier.clone();
        let returns = returns.clone();
        tokio::spawn(async move {
            barrier.wait().await;
            returns.fetch_add(1, Ordering::SeqCst);
        })
    };

    // ACT: release all but one, in a shuffled order
    for index in [3, 0, 2, 1] {
        drop(guards.remove(index.min(guards.len() - 1)));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(
            returns.load(Ordering::SeqCst),
            0,
            "waiter must block while a component is still running"
        );
    }
    assert_eq!(barrier.active(), 1);

    drop(guards.pop());

    // ASSERT
    tokio::time::timeout(Duration::from_secs(1), waiter)
        .await
        .expect("waiter should unblock after last exit")
        .expect("waiter task should not panic");
    assert_eq!(returns.load(Ordering::SeqCst), 1);
    assert_eq!(barrier.active(), 0);
}

/// Guards moved into tasks are released even if the task fails
#[tokio::test]
async fn test_guard_released_on_task_error() {
    let barrier = CompletionBarrier::new();
    let guard = barrier.enter("failing");

    let handle = tokio::spawn(async move {
        let _guard = guard;
        Err::<(), std::io::Error>(std::io::Error::other("bind failed"))
    });
    let result = handle.await.expect("task should not panic");

    assert!(result.is_err());
    tokio::time::timeout(Duration::from_secs(1), barrier.wait())
        .await
        .expect("failed component must still release its slot");
}

#[tokio::test]
async fn test_concurrent_enters_and_exits() {
    let barrier = CompletionBarrier::new();

    let mut handles = Vec::new();
    for i in 0..32 {
        let guard = barrier.enter(format!("task-{}", i));
        handles.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis((i % 7) as u64)).await;
            drop(guard);
        }));
    }

    tokio::time::timeout(Duration::from_secs(2), barrier.wait())
        .await
        .expect("all tasks should exit");
    for handle in handles {
        handle.await.expect("task should not panic");
    }
    assert_eq!(barrier.active(), 0);
}
