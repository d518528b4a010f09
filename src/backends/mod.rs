// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Task backends.
//!
//! Every backend implements the [`Task`](crate::traits::Task) trait, so the
//! scheduler never needs to know what a node actually does.
//!
//! # Available Backends
//!
//! - [`ProcessTask`]: an external process, killed on cancel, with its raw
//!   output streamed through a [`MultiWriter`]
//! - [`FunctionTask`]: an in-process async closure
//! - [`NoopTask`]: placeholder for absent hooks and command-less grouping nodes
//!
//! ## Stub Backend (Test-Only)
//! - **StubTask**: succeeds, optionally after a delay
//! - **FailingTask**: always fails
//! - **BlockingTask**: runs until cancelled
//!
//! # Examples
//!
//! ```rust
//! use hooktree::backends::{CaptureBuffer, ProcessTask};
//! use hooktree::traits::Task;
//!
//! let task = ProcessTask::shell("fmt", "cargo fmt --check");
//! let capture = CaptureBuffer::new();
//! task.output().unwrap().add_sink(capture.clone());
//! ```

pub mod function;
pub mod noop;
pub mod output;
pub mod process;
#[cfg(test)]
pub mod stub;

pub use function::FunctionTask;
pub use noop::NoopTask;
pub use output::{CaptureBuffer, MultiWriter, NotifyingBuffer, PrefixWriter};
pub use process::ProcessTask;
