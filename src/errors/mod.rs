// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod execution;
mod resolve;

pub use config::ConfigError;
pub use execution::{ExecutionError, MultiTaskError, TaskError};
pub use resolve::{ReferenceKind, ResolveError};
