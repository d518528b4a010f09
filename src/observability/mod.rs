// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Diagnostic output goes through `tracing`. Message types are small structs
//! with a `Display` impl and a [`messages::StructuredLog`] impl, so call sites
//! never carry format strings of their own and every event emits the same
//! fields wherever it is logged.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - runner lifecycle, admission and ticket events
//! * `messages::task` - per-node execution events
//! * `messages::resolve` - target resolution and placeholder pruning
//!
//! # Usage
//!
//! ```rust
//! use hooktree::observability::messages::task::TaskFailed;
//! use hooktree::observability::messages::StructuredLog;
//!
//! let error = std::io::Error::new(std::io::ErrorKind::Other, "exit status 1");
//! let msg = TaskFailed {
//!     node_id: "build/lint",
//!     error: &error,
//! };
//!
//! msg.log();
//! ```
//!
//! Subscribers are installed by the binary only; the library never touches
//! global logging state.

pub mod messages;
