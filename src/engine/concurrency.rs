// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Bounded ticket pool shared by every runner of one process.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::consts::DEFAULT_CONCURRENCY_FALLBACK;
use crate::errors::ExecutionError;

/// Permission to run one main task. The slot returns to the pool on drop.
#[derive(Debug)]
pub struct Ticket {
    _permit: OwnedSemaphorePermit,
}

/// A pool of `N` interchangeable tickets.
///
/// Clones share the same pool, so handing a clone to several runners bounds
/// the total number of main tasks running across all of them.
#[derive(Debug, Clone)]
pub struct ConcurrencyProvider {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl ConcurrencyProvider {
    /// Create a pool with `max_concurrency` tickets (at least one).
    pub fn new(max_concurrency: usize) -> Self {
        let capacity = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Pool sized from an optional configured maximum.
    pub fn with_max(max_concurrency: Option<usize>) -> Self {
        match max_concurrency {
            Some(max) => Self::new(max),
            None => Self::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tickets not currently handed out.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a free ticket. Waiters are served roughly in arrival order.
    pub async fn acquire(&self) -> Result<Ticket, ExecutionError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ExecutionError::ProviderClosed)?;
        Ok(Ticket { _permit: permit })
    }

    /// Return a ticket to the pool. Dropping the ticket does the same.
    pub fn release(&self, ticket: Ticket) {
        drop(ticket);
    }

    /// Refuse all pending and future acquisitions. Tickets already handed out
    /// stay valid until dropped.
    pub fn close(&self) {
        self.semaphore.close();
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }
}

impl Default for ConcurrencyProvider {
    /// Pool sized to the number of logical CPUs.
    fn default() -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(DEFAULT_CONCURRENCY_FALLBACK);
        Self::new(concurrency)
    }
}
