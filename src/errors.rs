//! Pool errors

use thiserror::Error;

use crate::pool::TaskId;

/// Pool result
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors delivered through a task handle.
///
/// A task's own failure is wrapped in [`PoolError::Task`] and reported only
/// to its submitter; it never aborts the pool or other tasks.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The submitted id collides with a pending or running task.
    #[error("Duplicate task id: {0}")]
    DuplicateId(TaskId),

    /// The pool was shut down before the task started.
    ///
    /// Also returned by `submit` on an already shut-down pool.
    #[error("Worker pool shutdown")]
    Shutdown,

    /// The operation itself failed; its error is propagated verbatim.
    #[error(transparent)]
    Task(#[from] anyhow::Error),
}

impl PoolError {
    /// Check whether this is the distinguished shutdown error.
    #[inline]
    pub fn is_shutdown(&self) -> bool {
        matches!(self, PoolError::Shutdown)
    }

    /// Check whether this error came from the operation itself.
    #[inline]
    pub fn is_task_error(&self) -> bool {
        matches!(self, PoolError::Task(_))
    }
}
