// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! # Organization
//!
//! * `engine` - runner lifecycle, admission and ticket events
//! * `task` - per-node execution events
//! * `resolve` - target resolution events
//!
//! # Usage Pattern
//!
//! ```rust
//! use hooktree::observability::messages::engine::RunStarted;
//! use hooktree::observability::messages::StructuredLog;
//!
//! let msg = RunStarted {
//!     tree: "build",
//!     task_count: 5,
//!     max_concurrency: 4,
//! };
//!
//! let span = msg.span("run");
//! let _guard = span.enter();
//! msg.log();
//! ```

use tracing::Span;

pub mod engine;
pub mod resolve;
pub mod task;

/// A message that knows its own level and fields.
pub trait StructuredLog {
    /// Emit the message as an event at its level.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
