// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;   // task backends
pub mod config;     // project files + resolution
pub mod engine;     // tree runners
pub mod errors;     // error handling
pub mod observability;
pub mod traits;     // task abstraction
pub mod tree;       // task and status trees
