//! Pool lifecycle: shutdown under load and reconfiguration mid-burst.

use std::sync::Arc;
use std::time::Duration;

use gongchi::{MetricsSnapshot, PoolConfig, PoolError, TaskOptions, WorkerPool};
use parking_lot::Mutex;

/// Shutdown mid-burst: every task terminates as completed or
/// shutdown-rejected, and the tallies add up.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shutdown_under_load_conserves_tasks() {
    let pool: WorkerPool<usize> = WorkerPool::with_config(PoolConfig {
        concurrency: 2,
        prioritize_small_tasks: true,
        metrics_interval: None,
    });

    let handles: Vec<_> = (0..50)
        .map(|i| {
            pool.submit(
                format!("load-{i}"),
                async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    Ok(i)
                },
                TaskOptions::new(),
            )
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(10)).await;
    pool.shutdown();

    let mut completed = 0u64;
    let mut rejected = 0u64;
    for handle in handles {
        match handle.await {
            Ok(_) => completed += 1,
            Err(PoolError::Shutdown) => rejected += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(completed + rejected, 50);
    assert!(completed >= 1, "the running tasks should finish naturally");

    let snapshot = pool.metrics();
    assert_eq!(snapshot.completed_count, completed);
    assert_eq!(snapshot.failed_count, 0);
}

/// Concurrency can be raised and lowered mid-burst without losing tasks.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reconfiguration_mid_burst() {
    let pool: WorkerPool<usize> = WorkerPool::with_config(PoolConfig {
        concurrency: 1,
        prioritize_small_tasks: true,
        metrics_interval: None,
    });

    let handles: Vec<_> = (0..30)
        .map(|i| {
            pool.submit(
                format!("re-{i}"),
                async move {
                    tokio::time::sleep(Duration::from_millis(2)).await;
                    Ok(i)
                },
                TaskOptions::new(),
            )
        })
        .collect();

    pool.set_concurrency(6);
    tokio::time::sleep(Duration::from_millis(5)).await;
    pool.set_concurrency(2);

    for handle in handles {
        handle.await.unwrap();
    }
    assert_eq!(pool.metrics().completed_count, 30);
}

/// The monitor observer sees load fall back to zero once a burst drains.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn observer_watches_a_burst_drain() {
    gongchi::util::logger::init();

    let snapshots: Arc<Mutex<Vec<MetricsSnapshot>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = snapshots.clone();

    let pool: WorkerPool<usize> = WorkerPool::with_observer(
        PoolConfig {
            concurrency: 2,
            prioritize_small_tasks: true,
            metrics_interval: Some(Duration::from_millis(15)),
        },
        Some(Arc::new(move |snapshot| {
            sink.lock().push(snapshot.clone());
        })),
    );

    let handles: Vec<_> = (0..20)
        .map(|i| {
            pool.submit(
                format!("mon-{i}"),
                async move {
                    tokio::time::sleep(Duration::from_millis(3)).await;
                    Ok(i)
                },
                TaskOptions::new(),
            )
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(40)).await;

    let snapshots = snapshots.lock();
    assert!(!snapshots.is_empty());
    let last = snapshots.last().unwrap();
    assert_eq!(last.completed_count, 20);
    assert_eq!(last.queue_length, 0);
    assert_eq!(last.current_load, 0.0);

    pool.shutdown();
}
