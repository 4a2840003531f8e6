//! Task definitions for the worker pool.
//!
//! This module defines the task record the pool tracks from submission to
//! terminal state, plus the caller-facing handle its result is delivered
//! through.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use tokio::sync::oneshot;

use crate::errors::PoolError;

/// Boxed asynchronous operation producing the task's result.
pub type TaskFuture<T> = Pin<Box<dyn Future<Output = anyhow::Result<T>> + Send>>;

/// Unique task identifier, supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    /// Get the id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for TaskId {
    fn from(val: String) -> Self {
        Self(val)
    }
}

impl From<&str> for TaskId {
    fn from(val: &str) -> Self {
        Self(val.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Task state.
///
/// A task is pending XOR running XOR terminal; the pool never holds a task
/// in two states at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Task is queued, waiting for a free slot.
    Pending,
    /// Task is currently executing.
    Running,
    /// Task has completed successfully.
    Completed,
    /// Task has failed.
    Failed,
    /// Task was cancelled by shutdown before it started.
    Cancelled,
}

/// Submission options for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOptions {
    priority: i64,
    estimated_size: Option<u64>,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskOptions {
    /// Create options with default priority (1) and no size hint.
    #[inline]
    pub fn new() -> Self {
        Self {
            priority: 1,
            estimated_size: None,
        }
    }

    /// Set the priority. Higher values dispatch first.
    #[inline]
    pub fn priority(
        mut self,
        priority: i64,
    ) -> Self {
        self.priority = priority;
        self
    }

    /// Set the estimated size. Smaller sizes dispatch first on priority
    /// ties when the pool prioritizes small tasks.
    #[inline]
    pub fn estimated_size(
        mut self,
        size: u64,
    ) -> Self {
        self.estimated_size = Some(size);
        self
    }
}

/// A task tracked by the pool from submission to terminal state.
///
/// The record owns its completion handle, so resolving the caller's future
/// needs no separate resolver bookkeeping keyed by id.
pub(crate) struct TaskRecord<T> {
    /// Caller-supplied unique id.
    id: TaskId,
    /// Current lifecycle state.
    state: TaskState,
    /// Priority; higher dispatches first.
    priority: i64,
    /// Optional size hint for the tie-break.
    estimated_size: Option<u64>,
    /// The opaque operation; taken exactly once at dispatch.
    operation: Option<TaskFuture<T>>,
    /// Completion handle back to the submitter.
    reply: Option<oneshot::Sender<Result<T, PoolError>>>,
    /// Lifecycle timestamps.
    submitted_at: Instant,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl<T> std::fmt::Debug for TaskRecord<T> {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("TaskRecord")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("priority", &self.priority)
            .field("estimated_size", &self.estimated_size)
            .finish()
    }
}

impl<T> TaskRecord<T> {
    /// Create a new pending record.
    pub(crate) fn new(
        id: TaskId,
        operation: TaskFuture<T>,
        options: TaskOptions,
        reply: oneshot::Sender<Result<T, PoolError>>,
    ) -> Self {
        Self {
            id,
            state: TaskState::Pending,
            priority: options.priority,
            estimated_size: options.estimated_size,
            operation: Some(operation),
            reply: Some(reply),
            submitted_at: Instant::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Get the task id.
    #[inline]
    pub(crate) fn id(&self) -> &TaskId {
        &self.id
    }

    /// Get the current state.
    #[cfg(test)]
    pub(crate) fn state(&self) -> TaskState {
        self.state
    }

    /// Get the priority.
    #[inline]
    pub(crate) fn priority(&self) -> i64 {
        self.priority
    }

    /// Get the size hint.
    #[inline]
    pub(crate) fn estimated_size(&self) -> Option<u64> {
        self.estimated_size
    }

    /// Get the submission timestamp.
    #[inline]
    pub(crate) fn submitted_at(&self) -> Instant {
        self.submitted_at
    }

    /// Get the dispatch timestamp, if the task has started.
    #[cfg(test)]
    pub(crate) fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Mark the record running and stamp `started_at`.
    #[inline]
    pub(crate) fn mark_running(&mut self) {
        self.state = TaskState::Running;
        self.started_at = Some(Instant::now());
    }

    /// Take the operation out of the record. Returns `None` if already taken.
    #[inline]
    pub(crate) fn take_operation(&mut self) -> Option<TaskFuture<T>> {
        self.operation.take()
    }

    /// Wall-clock duration from dispatch to `finished_at`.
    #[inline]
    pub(crate) fn run_duration(&self) -> Option<std::time::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// Resolve the submitter's handle with the operation's result.
    ///
    /// The send result is ignored: a submitter that dropped its handle
    /// simply never observes the outcome.
    pub(crate) fn finish(
        &mut self,
        result: Result<T, PoolError>,
    ) {
        self.state = match result {
            Ok(_) => TaskState::Completed,
            Err(_) => TaskState::Failed,
        };
        self.finished_at = Some(Instant::now());
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(result);
        }
    }

    /// Reject a still-pending record (shutdown path).
    pub(crate) fn reject(
        &mut self,
        error: PoolError,
    ) {
        self.state = TaskState::Cancelled;
        self.finished_at = Some(Instant::now());
        if let Some(reply) = self.reply.take() {
            let _ = reply.send(Err(error));
        }
    }
}

/// Caller-facing future for a submitted task.
///
/// Resolves with the operation's result, rejects with the operation's error,
/// or rejects with [`PoolError::Shutdown`] if the pool shut down while the
/// task was still pending.
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    rx: oneshot::Receiver<Result<T, PoolError>>,
}

impl<T> TaskHandle<T> {
    /// Create a handle from its receiving half.
    pub(crate) fn new(
        id: TaskId,
        rx: oneshot::Receiver<Result<T, PoolError>>,
    ) -> Self {
        Self { id, rx }
    }

    /// Create a handle that is already rejected (usage errors).
    pub(crate) fn rejected(
        id: TaskId,
        error: PoolError,
    ) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(Err(error));
        Self { id, rx }
    }

    /// Get the id this handle belongs to.
    #[inline]
    pub fn id(&self) -> &TaskId {
        &self.id
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, PoolError>;

    fn poll(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Self::Output> {
        // The sender is only dropped without a send if the pool itself is
        // dropped; report that as a shutdown.
        Pin::new(&mut self.rx).poll(cx).map(|res| match res {
            Ok(outcome) => outcome,
            Err(_) => Err(PoolError::Shutdown),
        })
    }
}
