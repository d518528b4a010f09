// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::TaskError;
use crate::traits::Task;

/// Placeholder for an absent hook or a grouping node without a command.
#[derive(Debug, Clone)]
pub struct NoopTask {
    name: String,
}

impl NoopTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Task for NoopTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _cancel: CancellationToken) -> Result<(), TaskError> {
        Ok(())
    }

    fn is_noop(&self) -> bool {
        true
    }
}
