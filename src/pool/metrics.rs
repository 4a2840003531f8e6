//! Performance metrics for the worker pool.
//!
//! Counters are plain atomics so completion continuations never contend
//! with snapshot readers; load and queue depth are recomputed on read from
//! the pool's own state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::Serialize;

/// Running counters, updated on task completion or failure.
#[derive(Debug)]
pub(crate) struct PoolMetrics {
    /// Total tasks completed successfully.
    completed: AtomicU64,
    /// Total tasks failed.
    failed: AtomicU64,
    /// Summed run duration of completed tasks, in microseconds.
    total_run_us: AtomicU64,
    /// Pool creation, for uptime arithmetic.
    created_at: Instant,
    /// Pool creation as epoch milliseconds, for reporting.
    created_at_epoch_ms: u64,
}

impl PoolMetrics {
    /// Create zeroed metrics stamped with the pool's creation time.
    pub(crate) fn new() -> Self {
        let created_at_epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|epoch| epoch.as_millis() as u64)
            .unwrap_or(0);

        Self {
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            total_run_us: AtomicU64::new(0),
            created_at: Instant::now(),
            created_at_epoch_ms,
        }
    }

    /// Record a completed task and its run duration.
    #[inline]
    pub(crate) fn record_completed(
        &self,
        duration: Duration,
    ) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.total_run_us
            .fetch_add(duration.as_micros() as u64, Ordering::SeqCst);
    }

    /// Record a failed task. Failures are excluded from the duration mean.
    #[inline]
    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    /// Build a snapshot from the counters plus current pool state.
    pub(crate) fn snapshot(
        &self,
        queue_length: usize,
        running_count: usize,
        concurrency: usize,
    ) -> MetricsSnapshot {
        let completed = self.completed.load(Ordering::SeqCst);
        let failed = self.failed.load(Ordering::SeqCst);
        let total_run_us = self.total_run_us.load(Ordering::SeqCst);

        let average_task_duration_ms = if completed == 0 {
            0.0
        } else {
            total_run_us as f64 / completed as f64 / 1_000.0
        };

        MetricsSnapshot {
            completed_count: completed,
            failed_count: failed,
            average_task_duration_ms,
            // Lowering concurrency below the running count would push the
            // ratio past 1.0; load stays in [0, 1].
            current_load: (running_count as f64 / concurrency as f64).min(1.0),
            queue_length,
            running_count,
            started_at_epoch_ms: self.created_at_epoch_ms,
        }
    }

    /// Time elapsed since pool creation.
    #[inline]
    pub(crate) fn uptime(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Point-in-time view of the pool's performance.
///
/// Snapshots are plain data: reading one has no side effects, and two reads
/// with no intervening task events compare equal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    /// Tasks completed successfully (monotonic).
    pub completed_count: u64,
    /// Tasks failed (monotonic).
    pub failed_count: u64,
    /// Running mean over completed tasks only, in milliseconds.
    pub average_task_duration_ms: f64,
    /// `running / concurrency`, in `[0, 1]`.
    pub current_load: f64,
    /// Pending tasks at snapshot time.
    pub queue_length: usize,
    /// Running tasks at snapshot time.
    pub running_count: usize,
    /// Pool creation time as epoch milliseconds, for uptime reporting.
    pub started_at_epoch_ms: u64,
}
