// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while tasks run and while a tree runner drives them.
//!
//! A single [`TaskError`] describes why one `Task::run` call failed. The runner
//! records every failure keyed by node id and reports them together as a
//! [`MultiTaskError`] once admission has stopped and all in-flight work has
//! drained. User-initiated stops are reported as [`ExecutionError::Cancelled`]
//! and are never mixed up with failures.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Failure of a single task.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TaskError {
    /// The external process could not be started.
    #[error("failed to start '{command}': {reason}")]
    Spawn { command: String, reason: String },

    /// The external process exited unsuccessfully.
    ///
    /// `output` holds the tail of what the process wrote, so the failure can be
    /// shown together with its context.
    #[error("process exited with status {code}")]
    ExitStatus { code: i32, output: String },

    /// The external process was terminated by a signal.
    #[error("process terminated by signal")]
    Signalled { output: String },

    /// An in-process task reported a failure.
    #[error("{0}")]
    Failed(String),

    /// I/O failure while driving the task.
    #[error("I/O error: {0}")]
    Io(String),

    /// The task observed its cancel signal and stopped.
    #[error("task was cancelled")]
    Cancelled,
}

impl TaskError {
    /// Captured output attached to the failure, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            TaskError::ExitStatus { output, .. } | TaskError::Signalled { output } => {
                Some(output.as_str())
            }
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }
}

impl From<std::io::Error> for TaskError {
    fn from(err: std::io::Error) -> Self {
        TaskError::Io(err.to_string())
    }
}

/// Aggregate of every task failure recorded during one run, keyed by node id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiTaskError {
    errors: BTreeMap<String, TaskError>,
}

impl MultiTaskError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node_id: impl Into<String>, error: TaskError) {
        self.errors.insert(node_id.into(), error);
    }

    /// Merge another aggregate into this one. Trees of one run have distinct
    /// root names, so their node ids do not collide.
    pub fn merge(&mut self, other: MultiTaskError) {
        self.errors.extend(other.errors);
    }

    pub fn get(&self, node_id: &str) -> Option<&TaskError> {
        self.errors.get(node_id)
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &String> {
        self.errors.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TaskError)> {
        self.errors.iter()
    }
}

impl fmt::Display for MultiTaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.errors.len() {
            0 => write!(f, "no tasks failed"),
            1 => {
                let (id, err) = self.errors.iter().next().ok_or(fmt::Error)?;
                write!(f, "task '{}' failed: {}", id, err)
            }
            n => {
                write!(f, "{} tasks failed:", n)?;
                for (id, err) in &self.errors {
                    write!(f, "\n  {}: {}", id, err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for MultiTaskError {}

/// Terminal outcome of a runner that did not complete successfully.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    /// One or more tasks failed.
    #[error(transparent)]
    Failed(MultiTaskError),

    /// The run was stopped by the user.
    #[error("run was canceled")]
    Cancelled,

    /// `run` was invoked on a runner that already started.
    #[error("runner has already been started")]
    AlreadyStarted,

    /// The concurrency provider was closed while tasks were waiting for a ticket.
    #[error("concurrency provider is closed")]
    ProviderClosed,

    #[error("internal error: {message}")]
    InternalError { message: String },
}

impl ExecutionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ExecutionError::Cancelled)
    }

    /// The aggregated task failures, if this error carries any.
    pub fn task_errors(&self) -> Option<&MultiTaskError> {
        match self {
            ExecutionError::Failed(errors) => Some(errors),
            _ => None,
        }
    }
}
