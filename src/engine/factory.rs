// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::config::ExecutorOptions;
use crate::engine::concurrency::ConcurrencyProvider;
use crate::engine::events::StatusSender;
use crate::engine::multi::MultiTreeRunner;
use crate::tree::TaskTree;

/// Factory for creating runners from executor options
pub struct RunnerFactory;

impl RunnerFactory {
    /// Ticket pool sized per `max_concurrency`, or the CPU count when unset
    pub fn provider(options: &ExecutorOptions) -> ConcurrencyProvider {
        ConcurrencyProvider::with_max(options.max_concurrency)
    }

    /// One runner per tree, all drawing from a single provider
    pub fn from_trees(
        options: &ExecutorOptions,
        trees: Vec<TaskTree>,
        events: Option<StatusSender>,
    ) -> MultiTreeRunner {
        MultiTreeRunner::with_trees(Self::provider(options), events, trees)
    }
}
