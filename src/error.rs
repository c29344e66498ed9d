//! Error types for chunkwise
//!
//! `PoolError` is what every public operation returns. Failures raised by
//! user functions on worker threads are captured as `TaskFailure`s: the first
//! one received becomes the primary failure and the rest are attached to it
//! as suppressed failures, so none are lost.

use std::fmt;
use thiserror::Error;

/// Top-level error type for pool and reduction operations
#[derive(Error, Debug)]
pub enum PoolError {
    /// Rejected pool or reducer configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// One or more tasks failed
    #[error(transparent)]
    Task(#[from] TaskFailure),

    /// The waiting caller was interrupted
    #[error("Operation interrupted")]
    Interrupted,

    /// The pool is shutting down or already terminated
    #[error("Worker pool is shut down")]
    ShutDown,

    /// Extremum requested over an empty sequence
    #[error("No such element")]
    NoSuchElement,

    /// Combining partial results failed
    #[error("Merge failed")]
    Merge(#[source] anyhow::Error),

    /// The OS refused to spawn a worker thread
    #[error("Failed to spawn worker thread")]
    Spawn(#[from] std::io::Error),
}

impl PoolError {
    /// The task failure behind this error, if any
    pub fn task_failure(&self) -> Option<&TaskFailure> {
        match self {
            PoolError::Task(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, PoolError::Interrupted)
    }
}

/// What went wrong inside a single task
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task panicked: {0}")]
    Panicked(String),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl TaskError {
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskError::Panicked(message)
    }
}

/// A failed task, with any later failures of the same call attached
///
/// Displays only the task index; the task's own error is its `source()`.
#[derive(Debug)]
pub struct TaskFailure {
    index: usize,
    error: TaskError,
    suppressed: Vec<TaskFailure>,
}

impl TaskFailure {
    pub(crate) fn new(index: usize, error: TaskError) -> Self {
        Self {
            index,
            error,
            suppressed: Vec::new(),
        }
    }

    /// Position of the failed input in the mapped sequence
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn error(&self) -> &TaskError {
        &self.error
    }

    /// Failures received after this one during the same call
    pub fn suppressed(&self) -> &[TaskFailure] {
        &self.suppressed
    }

    pub(crate) fn add_suppressed(&mut self, other: TaskFailure) {
        self.suppressed.push(other);
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Task {} failed", self.index)?;
        if !self.suppressed.is_empty() {
            write!(f, " ({} more suppressed)", self.suppressed.len())?;
        }
        Ok(())
    }
}

impl std::error::Error for TaskFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub type Result<T> = std::result::Result<T, PoolError>;
