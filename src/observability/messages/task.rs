// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for per-node task execution.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A node's main task is about to run.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use hooktree::observability::messages::task::TaskStarted;
///
/// let msg = TaskStarted {
///     node_id: "build/lint",
///     long_running: false,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct TaskStarted<'a> {
    pub node_id: &'a str,
    pub long_running: bool,
}

impl Display for TaskStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.long_running {
            write!(f, "Task '{}' started (long-running)", self.node_id)
        } else {
            write!(f, "Task '{}' started", self.node_id)
        }
    }
}

impl StructuredLog for TaskStarted<'_> {
    fn log(&self) {
        tracing::info!(
            node_id = self.node_id,
            long_running = self.long_running,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "task",
            span_name = name,
            node_id = self.node_id,
            long_running = self.long_running,
        )
    }
}

/// A node's main task returned successfully.
pub struct TaskCompleted<'a> {
    pub node_id: &'a str,
    pub duration: std::time::Duration,
}

impl Display for TaskCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Task '{}' completed in {:?}", self.node_id, self.duration)
    }
}

impl StructuredLog for TaskCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            node_id = self.node_id,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "task_completed",
            span_name = name,
            node_id = self.node_id,
            duration = ?self.duration,
        )
    }
}

/// A node's main task failed.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct TaskFailed<'a> {
    pub node_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for TaskFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Task '{}' failed: {}", self.node_id, self.error)
    }
}

impl StructuredLog for TaskFailed<'_> {
    fn log(&self) {
        tracing::error!(
            node_id = self.node_id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "task_failed",
            span_name = name,
            node_id = self.node_id,
            error = %self.error,
        )
    }
}

pub struct TaskCanceled<'a> {
    pub node_id: &'a str,
    /// Whether the task had started before the cancel arrived.
    pub was_running: bool,
}

impl Display for TaskCanceled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.was_running {
            write!(f, "Task '{}' canceled while running", self.node_id)
        } else {
            write!(f, "Task '{}' canceled before it started", self.node_id)
        }
    }
}

impl StructuredLog for TaskCanceled<'_> {
    fn log(&self) {
        tracing::warn!(
            node_id = self.node_id,
            was_running = self.was_running,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "task_canceled",
            span_name = name,
            node_id = self.node_id,
            was_running = self.was_running,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TaskError;

    #[test]
    fn test_task_failed_display_includes_error() {
        let error = TaskError::Failed("boom".into());
        let msg = TaskFailed {
            node_id: "build/lint",
            error: &error,
        };
        assert!(msg.to_string().starts_with("Task 'build/lint' failed: "));
        assert!(msg.to_string().contains("boom"));
    }

    #[test]
    fn test_task_canceled_display() {
        let before = TaskCanceled {
            node_id: "serve",
            was_running: false,
        };
        assert_eq!(before.to_string(), "Task 'serve' canceled before it started");
    }
}
