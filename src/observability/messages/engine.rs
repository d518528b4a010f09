// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for runner lifecycle and scheduling events.
//!
//! This module contains message types for logging events related to:
//! * Run lifecycle (start, completion, failure, cancellation)
//! * Admission queue shutdown
//! * Ticket waits against the shared concurrency provider

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A runner started driving a tree.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use hooktree::observability::messages::engine::RunStarted;
///
/// let msg = RunStarted {
///     tree: "build",
///     task_count: 5,
///     max_concurrency: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunStarted<'a> {
    pub tree: &'a str,
    pub task_count: usize,
    pub max_concurrency: usize,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting run of '{}': {} tasks, max_concurrency={}",
            self.tree, self.task_count, self.max_concurrency
        )
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            tree = self.tree,
            task_count = self.task_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run",
            span_name = name,
            tree = self.tree,
            task_count = self.task_count,
            max_concurrency = self.max_concurrency,
        )
    }
}

/// Every node of the tree finished successfully.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use hooktree::observability::messages::engine::RunCompleted;
/// use std::time::Duration;
///
/// let msg = RunCompleted {
///     tree: "build",
///     task_count: 5,
///     duration: Duration::from_millis(250),
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunCompleted<'a> {
    pub tree: &'a str,
    pub task_count: usize,
    pub duration: std::time::Duration,
}

impl Display for RunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run of '{}' completed: {} tasks in {:?}",
            self.tree, self.task_count, self.duration
        )
    }
}

impl StructuredLog for RunCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            tree = self.tree,
            task_count = self.task_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_completed",
            span_name = name,
            tree = self.tree,
            task_count = self.task_count,
            duration = ?self.duration,
        )
    }
}

/// The run ended with one or more task failures.
///
/// # Log Level
/// `error!` - Failure requiring attention
///
/// # Example
/// ```
/// use hooktree::observability::messages::engine::RunFailed;
///
/// let error = std::io::Error::new(std::io::ErrorKind::Other, "task 'build/lint' failed");
/// let msg = RunFailed {
///     tree: "build",
///     failed_count: 1,
///     error: &error,
/// };
///
/// tracing::error!("{}", msg);
/// ```
pub struct RunFailed<'a> {
    pub tree: &'a str,
    pub failed_count: usize,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run of '{}' failed ({} failed tasks): {}",
            self.tree, self.failed_count, self.error
        )
    }
}

impl StructuredLog for RunFailed<'_> {
    fn log(&self) {
        tracing::error!(
            tree = self.tree,
            failed_count = self.failed_count,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "run_failed",
            span_name = name,
            tree = self.tree,
            failed_count = self.failed_count,
            error = %self.error,
        )
    }
}

/// The run was canceled before it finished.
///
/// # Log Level
/// `warn!` - User-requested stop
pub struct RunCanceled<'a> {
    pub tree: &'a str,
    /// Nodes that never reached a terminal status on their own.
    pub unfinished: usize,
}

impl Display for RunCanceled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run of '{}' canceled with {} unfinished tasks",
            self.tree, self.unfinished
        )
    }
}

impl StructuredLog for RunCanceled<'_> {
    fn log(&self) {
        tracing::warn!(
            tree = self.tree,
            unfinished = self.unfinished,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "run_canceled",
            span_name = name,
            tree = self.tree,
            unfinished = self.unfinished,
        )
    }
}

/// No further nodes will be admitted.
///
/// # Log Level
/// `debug!` - Scheduling detail
pub struct AdmissionClosed<'a> {
    pub tree: &'a str,
    pub reason: &'a str,
}

impl Display for AdmissionClosed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Admission closed for '{}': {}", self.tree, self.reason)
    }
}

impl StructuredLog for AdmissionClosed<'_> {
    fn log(&self) {
        tracing::debug!(tree = self.tree, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "admission_closed",
            span_name = name,
            tree = self.tree,
            reason = self.reason,
        )
    }
}

/// A worker is waiting for a ticket.
///
/// # Log Level
/// `trace!` - Fires for every admitted node
pub struct TicketWait<'a> {
    pub node_id: &'a str,
    pub available: usize,
}

impl Display for TicketWait<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Node '{}' waiting for a ticket ({} available)",
            self.node_id, self.available
        )
    }
}

impl StructuredLog for TicketWait<'_> {
    fn log(&self) {
        tracing::trace!(node_id = self.node_id, available = self.available, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "ticket_wait",
            span_name = name,
            node_id = self.node_id,
            available = self.available,
        )
    }
}

/// Several trees are about to run against one provider.
pub struct MultiRunStarted {
    pub tree_count: usize,
    pub max_concurrency: usize,
}

impl Display for MultiRunStarted {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting {} trees with max_concurrency={}",
            self.tree_count, self.max_concurrency
        )
    }
}

impl StructuredLog for MultiRunStarted {
    fn log(&self) {
        tracing::info!(
            tree_count = self.tree_count,
            max_concurrency = self.max_concurrency,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "multi_run",
            span_name = name,
            tree_count = self.tree_count,
            max_concurrency = self.max_concurrency,
        )
    }
}
