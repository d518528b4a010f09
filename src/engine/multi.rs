// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Several trees, one ticket pool.
//!
//! A compound target resolves to one tree per member. [`MultiTreeRunner`]
//! gives each tree its own [`TreeRunner`], hands them all the same
//! [`ConcurrencyProvider`] and status channel, runs them side by side and
//! folds their outcomes into one.
//!
//! Trees can only be added before the run starts. A failing tree does not
//! stop its siblings: each runner only closes its own admission.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::task::JoinSet;

use crate::engine::concurrency::ConcurrencyProvider;
use crate::engine::events::StatusSender;
use crate::engine::runner::TreeRunner;
use crate::errors::{ExecutionError, MultiTaskError};
use crate::observability::messages::engine::MultiRunStarted;
use crate::observability::messages::StructuredLog;
use crate::tree::TaskTree;

pub struct MultiTreeRunner {
    provider: ConcurrencyProvider,
    events: Option<StatusSender>,
    runners: Mutex<Vec<Arc<TreeRunner>>>,
    started: AtomicBool,
}

impl MultiTreeRunner {
    pub fn new(provider: ConcurrencyProvider) -> Self {
        Self {
            provider,
            events: None,
            runners: Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
        }
    }

    /// Every runner added afterwards publishes its transitions on `events`.
    pub fn with_events(mut self, events: StatusSender) -> Self {
        self.events = Some(events);
        self
    }

    /// A runner for each of `trees`, ready to run.
    pub fn with_trees(
        provider: ConcurrencyProvider,
        events: Option<StatusSender>,
        trees: Vec<TaskTree>,
    ) -> Self {
        let runners = trees
            .into_iter()
            .map(|tree| Arc::new(runner_for(tree, &provider, events.as_ref())))
            .collect();
        Self {
            provider,
            events,
            runners: Mutex::new(runners),
            started: AtomicBool::new(false),
        }
    }

    pub fn provider(&self) -> &ConcurrencyProvider {
        &self.provider
    }

    fn lock_runners(&self) -> Result<std::sync::MutexGuard<'_, Vec<Arc<TreeRunner>>>, ExecutionError> {
        self.runners.lock().map_err(|_| ExecutionError::InternalError {
            message: "runner list lock poisoned".to_string(),
        })
    }

    /// Add a tree. Fails with [`ExecutionError::AlreadyStarted`] once `run` was called.
    pub fn add_tree(&self, tree: TaskTree) -> Result<Arc<TreeRunner>, ExecutionError> {
        let mut runners = self.lock_runners()?;
        // checked under the lock so `run` never misses a tree
        if self.started.load(Ordering::SeqCst) {
            return Err(ExecutionError::AlreadyStarted);
        }
        let runner = Arc::new(runner_for(tree, &self.provider, self.events.as_ref()));
        runners.push(Arc::clone(&runner));
        Ok(runner)
    }

    pub fn runners(&self) -> Vec<Arc<TreeRunner>> {
        self.lock_runners().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.runners().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run every tree to completion.
    ///
    /// Task failures from all trees are merged into one
    /// [`ExecutionError::Failed`]. Without failures, any canceled tree makes
    /// the whole run [`ExecutionError::Cancelled`].
    pub async fn run(&self) -> Result<(), ExecutionError> {
        let runners = {
            let runners = self.lock_runners()?;
            if self.started.swap(true, Ordering::SeqCst) {
                return Err(ExecutionError::AlreadyStarted);
            }
            runners.clone()
        };

        MultiRunStarted {
            tree_count: runners.len(),
            max_concurrency: self.provider.capacity(),
        }
        .log();

        let mut set = JoinSet::new();
        for runner in runners {
            set.spawn(async move { runner.run().await });
        }

        let mut errors = MultiTaskError::new();
        let mut fatal = None;
        let mut cancelled = false;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok(())) => {}
                Ok(Err(ExecutionError::Failed(failed))) => errors.merge(failed),
                Ok(Err(ExecutionError::Cancelled)) => cancelled = true,
                Ok(Err(other)) => {
                    fatal.get_or_insert(other);
                }
                Err(e) => {
                    fatal.get_or_insert(ExecutionError::InternalError {
                        message: format!("tree runner exited abnormally: {}", e),
                    });
                }
            }
        }

        if !errors.is_empty() {
            Err(ExecutionError::Failed(errors))
        } else if let Some(fatal) = fatal {
            Err(fatal)
        } else if cancelled {
            Err(ExecutionError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Cancel every tree and wait until all of them have wound down.
    pub async fn cancel(&self) {
        let mut set = JoinSet::new();
        for runner in self.runners() {
            set.spawn(async move { runner.cancel().await });
        }
        while set.join_next().await.is_some() {}
    }
}

fn runner_for(tree: TaskTree, provider: &ConcurrencyProvider, events: Option<&StatusSender>) -> TreeRunner {
    let tree = Arc::new(tree);
    match events {
        Some(events) => TreeRunner::with_events(tree, provider.clone(), events.clone()),
        None => TreeRunner::new(tree, provider.clone()),
    }
}
