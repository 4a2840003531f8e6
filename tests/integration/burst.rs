//! Burst workloads: conservation and bound invariants under load.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gongchi::{PoolConfig, TaskOptions, WorkerPool};

fn config(concurrency: usize) -> PoolConfig {
    PoolConfig {
        concurrency,
        prioritize_small_tasks: true,
        metrics_interval: None,
    }
}

/// Every submitted task reaches exactly one terminal state; none is lost.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn burst_conserves_every_task() {
    let pool: WorkerPool<usize> = WorkerPool::with_config(config(4));

    let handles: Vec<_> = (0..100)
        .map(|i| {
            pool.submit(
                format!("burst-{i}"),
                async move {
                    if i % 10 == 3 {
                        Err(anyhow::anyhow!("synthetic failure {i}"))
                    } else {
                        Ok(i)
                    }
                },
                TaskOptions::new()
                    .priority((i % 7) as i64)
                    .estimated_size((i % 13) as u64),
            )
        })
        .collect();

    let mut completed = 0u64;
    let mut failed = 0u64;
    for handle in handles {
        match handle.await {
            Ok(_) => completed += 1,
            Err(err) => {
                assert!(err.is_task_error());
                failed += 1;
            }
        }
    }

    assert_eq!(completed + failed, 100);

    let snapshot = pool.metrics();
    assert_eq!(snapshot.completed_count, completed);
    assert_eq!(snapshot.failed_count, failed);
    assert_eq!(snapshot.queue_length, 0);
    assert_eq!(snapshot.running_count, 0);
}

/// The slot bound holds on a real multi-threaded runtime.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn burst_respects_slot_bound() {
    let pool: WorkerPool<()> = WorkerPool::with_config(config(3));
    let in_flight = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..40)
        .map(|i| {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            pool.submit(
                format!("bound-{i}"),
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(3)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                },
                TaskOptions::new().priority((i % 3) as i64),
            )
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    assert!(peak.load(Ordering::SeqCst) <= 3);
}

/// Boxed payloads let heterogeneous tasks share one pool.
#[tokio::test]
async fn boxed_payloads_share_a_pool() {
    let pool: WorkerPool<Box<dyn std::any::Any + Send>> = WorkerPool::with_config(config(2));

    let text = pool.submit(
        "text",
        async { Ok(Box::new("hello".to_string()) as Box<dyn std::any::Any + Send>) },
        TaskOptions::new(),
    );
    let number = pool.submit(
        "number",
        async { Ok(Box::new(99u64) as Box<dyn std::any::Any + Send>) },
        TaskOptions::new(),
    );

    let text = text.await.unwrap();
    assert_eq!(text.downcast_ref::<String>().unwrap(), "hello");
    let number = number.await.unwrap();
    assert_eq!(*number.downcast_ref::<u64>().unwrap(), 99);
}
