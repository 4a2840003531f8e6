//! Concurrency-bounded priority worker pool.
//!
//! This module provides the [`WorkerPool`], which accepts opaque
//! asynchronous operations, bounds how many run simultaneously, orders
//! pending work by priority and estimated size, and tracks performance
//! metrics. Dispatch is edge-triggered: a pass runs on submission, on task
//! completion, and on concurrency changes, never on a polling timer.

pub mod metrics;
pub mod task;

mod queue;

#[cfg(test)]
mod tests;

pub use metrics::MetricsSnapshot;
pub use task::{TaskHandle, TaskId, TaskOptions, TaskState};

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::errors::PoolError;
use metrics::PoolMetrics;
use queue::PendingQueue;
use task::TaskRecord;

/// Observer hook invoked with a fresh snapshot on every monitor tick.
pub type MetricsObserver = Arc<dyn Fn(&MetricsSnapshot) + Send + Sync>;

/// Pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum simultaneously running tasks. Clamped to at least 1.
    pub concurrency: usize,
    /// Break equal-priority ties by estimated size, smallest first.
    pub prioritize_small_tasks: bool,
    /// If set, a monitor task periodically logs a metrics snapshot and
    /// invokes the observer hook. Disabled by default.
    pub metrics_interval: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let num_cpus = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        Self {
            concurrency: num_cpus.saturating_sub(1).max(1),
            prioritize_small_tasks: true,
            metrics_interval: None,
        }
    }
}

/// Mutable pool state, the serialized region.
///
/// Every mutation of the queue, the id sets, and the concurrency ceiling
/// happens behind this one mutex, so dispatch passes never interleave.
struct PoolState<T> {
    /// Pending records in dispatch order.
    queue: PendingQueue<T>,
    /// Ids of pending records, for duplicate detection.
    pending_ids: HashSet<TaskId>,
    /// Ids of currently running tasks; `len()` is the occupied slot count.
    running: HashSet<TaskId>,
    /// Slot ceiling; mutable at any time via `set_concurrency`.
    concurrency: usize,
    /// Set once by `shutdown`; never cleared.
    shutdown: bool,
    /// Periodic metrics monitor, if configured.
    monitor: Option<JoinHandle<()>>,
}

/// Shared pool internals.
struct PoolInner<T> {
    /// Serialized bookkeeping state.
    state: Mutex<PoolState<T>>,
    /// Running counters and timing statistics.
    metrics: PoolMetrics,
    /// Runtime handle captured at construction; operations are spawned on
    /// it so `submit` works from any thread.
    runtime: Handle,
    /// Optional observer for monitor ticks.
    observer: Option<MetricsObserver>,
}

/// A concurrency-bounded priority task pool.
///
/// The pool is explicitly constructed and owned by the caller; cloning is
/// cheap and clones share the same pool. `T` is the result type every task
/// in this pool produces (box the payload if heterogeneous tasks must share
/// one pool).
///
/// Task ids must be unique among in-flight tasks; a collision is reported
/// through the returned handle as [`PoolError::DuplicateId`].
pub struct WorkerPool<T> {
    inner: Arc<PoolInner<T>>,
}

impl<T> Clone for WorkerPool<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> std::fmt::Debug for WorkerPool<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("WorkerPool")
            .field("concurrency", &state.concurrency)
            .field("queue_length", &state.queue.len())
            .field("running", &state.running.len())
            .field("shutdown", &state.shutdown)
            .finish()
    }
}

impl<T: Send + 'static> Default for WorkerPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Create a pool with the default configuration
    /// (concurrency = available parallelism − 1, floor 1).
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[inline]
    pub fn new() -> Self {
        Self::with_config(PoolConfig::default())
    }

    /// Create a pool with a custom configuration.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    #[inline]
    pub fn with_config(config: PoolConfig) -> Self {
        Self::with_observer(config, None)
    }

    /// Create a pool with a custom configuration and a metrics observer.
    ///
    /// The observer only fires when `metrics_interval` is set.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn with_observer(
        config: PoolConfig,
        observer: Option<MetricsObserver>,
    ) -> Self {
        let concurrency = config.concurrency.max(1);

        let inner = Arc::new(PoolInner {
            state: Mutex::new(PoolState {
                queue: PendingQueue::new(config.prioritize_small_tasks),
                pending_ids: HashSet::new(),
                running: HashSet::new(),
                concurrency,
                shutdown: false,
                monitor: None,
            }),
            metrics: PoolMetrics::new(),
            runtime: Handle::current(),
            observer,
        });

        info!(concurrency, "worker pool initialized");

        if let Some(interval) = config.metrics_interval {
            let monitor = PoolInner::spawn_monitor(&inner, interval);
            inner.state.lock().monitor = Some(monitor);
        }

        Self { inner }
    }

    /// Submit a task and get a handle to its eventual result.
    ///
    /// Never blocks: the record is queued and a dispatch pass runs before
    /// this returns. The handle resolves with the operation's result,
    /// rejects with the operation's error, or rejects with
    /// [`PoolError::Shutdown`] if the pool shuts down while the task is
    /// still pending.
    ///
    /// Usage errors (duplicate id, submit after shutdown) come back as an
    /// already-rejected handle, never silently dropped.
    pub fn submit<F>(
        &self,
        id: impl Into<TaskId>,
        operation: F,
        options: TaskOptions,
    ) -> TaskHandle<T>
    where
        F: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        let id = id.into();
        let mut state = self.inner.state.lock();

        if state.shutdown {
            return TaskHandle::rejected(id, PoolError::Shutdown);
        }
        if state.pending_ids.contains(&id) || state.running.contains(&id) {
            return TaskHandle::rejected(id.clone(), PoolError::DuplicateId(id));
        }

        let (tx, rx) = oneshot::channel();
        let handle = TaskHandle::new(id.clone(), rx);
        let record = TaskRecord::new(id.clone(), Box::pin(operation), options, tx);

        debug!(id = %id, "task queued");
        state.pending_ids.insert(id);
        state.queue.insert(record);

        PoolInner::dispatch(&self.inner, &mut state);
        handle
    }

    /// Shut down the pool.
    ///
    /// Every pending task is rejected with [`PoolError::Shutdown`] and the
    /// queue is cleared. Running tasks are not cancelled: they finish
    /// naturally, still update metrics, and still deliver their results.
    /// Subsequent `submit` calls reject immediately without queuing.
    pub fn shutdown(&self) {
        let drained = {
            let mut state = self.inner.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            if let Some(monitor) = state.monitor.take() {
                monitor.abort();
            }
            state.pending_ids.clear();
            state.queue.drain()
        };

        let cancelled = drained.len();
        for mut record in drained {
            record.reject(PoolError::Shutdown);
        }

        info!(cancelled, "worker pool shut down");
    }

    /// Adjust the concurrency ceiling. Clamped to at least 1.
    ///
    /// Raising it may start queued tasks immediately; lowering it only
    /// restricts future dispatches and never preempts running tasks.
    pub fn set_concurrency(
        &self,
        concurrency: usize,
    ) {
        let concurrency = concurrency.max(1);
        let mut state = self.inner.state.lock();
        state.concurrency = concurrency;
        info!(concurrency, "concurrency adjusted");

        PoolInner::dispatch(&self.inner, &mut state);
    }

    /// Get a consistent metrics snapshot reflecting state at call time.
    pub fn metrics(&self) -> MetricsSnapshot {
        let state = self.inner.state.lock();
        self.inner
            .metrics
            .snapshot(state.queue.len(), state.running.len(), state.concurrency)
    }

    /// Time elapsed since the pool was created.
    #[inline]
    pub fn uptime(&self) -> Duration {
        self.inner.metrics.uptime()
    }

    /// Get the current concurrency ceiling.
    #[inline]
    pub fn concurrency(&self) -> usize {
        self.inner.state.lock().concurrency
    }

    /// Get the number of pending tasks.
    #[inline]
    pub fn queue_len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Get the number of currently running tasks.
    #[inline]
    pub fn running_count(&self) -> usize {
        self.inner.state.lock().running.len()
    }

    /// Check whether the pool has been shut down.
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.inner.state.lock().shutdown
    }
}

impl<T: Send + 'static> PoolInner<T> {
    /// Fill free slots from the queue head.
    ///
    /// Runs with the state lock held; no await happens inside. Each
    /// dispatched operation is spawned as its own runtime task, and a
    /// continuation hands control back to the serialized region to report
    /// completion.
    fn dispatch(
        inner: &Arc<Self>,
        state: &mut PoolState<T>,
    ) {
        while state.running.len() < state.concurrency && !state.queue.is_empty() {
            let Some(mut record) = state.queue.pop() else {
                break;
            };
            state.pending_ids.remove(record.id());

            let Some(operation) = record.take_operation() else {
                continue;
            };
            state.running.insert(record.id().clone());
            let waited = record.submitted_at().elapsed();
            record.mark_running();
            debug!(id = %record.id(), waited_ms = waited.as_millis() as u64, "task dispatched");

            // Spawning the operation separately isolates its panics: a
            // panicked operation surfaces as a JoinError, not a lost slot.
            let operation = inner.runtime.spawn(operation);
            let pool = Arc::clone(inner);
            inner.runtime.spawn(async move {
                let result = match operation.await {
                    Ok(outcome) => outcome,
                    Err(join_error) => Err(anyhow!(
                        "operation for task '{}' aborted: {join_error}",
                        record.id()
                    )),
                };
                PoolInner::finish(&pool, record, result);
            });
        }
    }

    /// Completion continuation: free the slot, update metrics, resolve the
    /// submitter's handle, re-run dispatch.
    fn finish(
        inner: &Arc<Self>,
        mut record: TaskRecord<T>,
        result: anyhow::Result<T>,
    ) {
        let mut state = inner.state.lock();
        state.running.remove(record.id());

        let succeeded = result.is_ok();
        record.finish(result.map_err(PoolError::Task));

        if succeeded {
            let duration = record.run_duration().unwrap_or_default();
            inner.metrics.record_completed(duration);
            debug!(id = %record.id(), duration_ms = duration.as_millis() as u64, "task completed");
        } else {
            inner.metrics.record_failed();
            debug!(id = %record.id(), "task failed");
        }

        PoolInner::dispatch(inner, &mut state);
    }

    /// Spawn the periodic metrics monitor.
    ///
    /// Holds only a weak reference so an abandoned pool is still dropped;
    /// the monitor exits on the first tick after that.
    fn spawn_monitor(
        inner: &Arc<Self>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let weak = Arc::downgrade(inner);
        inner.runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick of a tokio interval fires immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(pool) = weak.upgrade() else {
                    break;
                };

                let snapshot = {
                    let state = pool.state.lock();
                    pool.metrics
                        .snapshot(state.queue.len(), state.running.len(), state.concurrency)
                };

                info!(
                    load_pct = (snapshot.current_load * 100.0).round() as u64,
                    queue = snapshot.queue_length,
                    completed = snapshot.completed_count,
                    failed = snapshot.failed_count,
                    avg_task_ms = snapshot.average_task_duration_ms.round() as u64,
                    uptime_s = pool.metrics.uptime().as_secs(),
                    "pool metrics"
                );

                if let Some(observer) = &pool.observer {
                    observer(&snapshot);
                }
            }
        })
    }
}
