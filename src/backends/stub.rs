// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::errors::TaskError;
use crate::traits::Task;

/// A task that succeeds, optionally after a delay. Counts how often it ran.
pub struct StubTask {
    pub name: String,
    delay: Duration,
    runs: Arc<AtomicUsize>,
}

impl StubTask {
    pub fn new(name: &str) -> Self {
        Self::with_delay(name, Duration::ZERO)
    }

    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            delay,
            runs: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared run counter, readable after the task has been moved into a tree.
    pub fn runs(&self) -> Arc<AtomicUsize> {
        self.runs.clone()
    }
}

#[async_trait]
impl Task for StubTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, cancel: CancellationToken) -> Result<(), TaskError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.delay.is_zero() {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => Ok(()),
            _ = cancel.cancelled() => Err(TaskError::Cancelled),
        }
    }
}

/// A task that always fails, optionally after a delay.
pub struct FailingTask {
    pub name: String,
    delay: Duration,
}

impl FailingTask {
    pub fn new(name: &str) -> Self {
        Self::with_delay(name, Duration::ZERO)
    }

    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self {
            name: name.to_string(),
            delay,
        }
    }
}

#[async_trait]
impl Task for FailingTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _cancel: CancellationToken) -> Result<(), TaskError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Err(TaskError::Failed(format!("{} failed", self.name)))
    }
}

/// A long-running task that only returns once cancelled.
pub struct BlockingTask {
    pub name: String,
    started: Arc<AtomicUsize>,
}

impl BlockingTask {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            started: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn started(&self) -> Arc<AtomicUsize> {
        self.started.clone()
    }
}

#[async_trait]
impl Task for BlockingTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, cancel: CancellationToken) -> Result<(), TaskError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        cancel.cancelled().await;
        Err(TaskError::Cancelled)
    }
}
