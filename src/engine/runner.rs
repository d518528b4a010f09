// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Tree runner: drives one task tree to completion.
//!
//! The tree's own shape is the dependency graph. Nothing runs until it is
//! admitted through a bounded queue, and a node is only admitted once the
//! nodes it waits on are finished:
//!
//! 1. The dependency-free leaves (the starting nodes of the root) are queued first.
//! 2. The dispatcher spawns one worker per queued node. A worker takes a ticket
//!    from the shared [`ConcurrencyProvider`], runs the node's main task and
//!    gives the ticket back.
//! 3. On success the worker decides what comes next:
//!    * a node with `post` children queues the starting nodes of each post subtree;
//!    * otherwise its subtree is finished, and the walk goes upward: a `pre`
//!      child whose `pre` siblings are all done queues its parent, a `post`
//!      child whose `post` siblings are all done finishes its parent's subtree
//!      and the walk continues from the parent;
//!    * once the root's rollup is terminal the queue is closed.
//!
//! ## Failure and cancellation
//!
//! The first task error closes admission. Workers that were already spawned
//! run to completion; nothing new starts. All errors are collected into one
//! [`MultiTaskError`] keyed by node id.
//!
//! [`TreeRunner::cancel`] closes admission, fires the cancel token of every
//! in-flight node and waits for the run to wind down. A task that ignores its
//! token keeps the call waiting.
//!
//! Nodes that never reached a terminal status by the end of the run are marked
//! `Canceled`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::engine::concurrency::ConcurrencyProvider;
use crate::engine::events::{StatusEvent, StatusSender};
use crate::errors::{ExecutionError, MultiTaskError};
use crate::observability::messages::engine::{
    AdmissionClosed, RunCanceled, RunCompleted, RunFailed, RunStarted, TicketWait,
};
use crate::observability::messages::task::{TaskCanceled, TaskCompleted, TaskFailed, TaskStarted};
use crate::observability::messages::StructuredLog;
use crate::tree::{NodeIndex, Phase, StatusTree, TaskStatus, TaskTree};

/// Lifecycle of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerPhase {
    Idle,
    Running,
    Completed,
    Canceled,
    Errored,
}

impl RunnerPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunnerPhase::Completed | RunnerPhase::Canceled | RunnerPhase::Errored
        )
    }
}

/// Everything workers mutate, behind one lock.
struct RunnerState {
    status: StatusTree,
    in_flight: HashMap<NodeIndex, CancellationToken>,
    errors: MultiTaskError,
    fatal: Option<ExecutionError>,
    cancelled: bool,
    phase: RunnerPhase,
}

/// State shared between the dispatcher and its workers.
struct Shared {
    tree: Arc<TaskTree>,
    provider: ConcurrencyProvider,
    events: Option<StatusSender>,
    state: RwLock<RunnerState>,
    queue: mpsc::Sender<NodeIndex>,
    admission_closed: CancellationToken,
}

/// Runs one [`TaskTree`] against a shared [`ConcurrencyProvider`].
///
/// `run` and `cancel` both take `&self`; share the runner through an `Arc`
/// to cancel it from another task.
pub struct TreeRunner {
    shared: Arc<Shared>,
    receiver: Mutex<Option<mpsc::Receiver<NodeIndex>>>,
    started: AtomicBool,
    finished: CancellationToken,
}

impl TreeRunner {
    pub fn new(tree: Arc<TaskTree>, provider: ConcurrencyProvider) -> Self {
        Self::build(tree, provider, None)
    }

    /// Like [`new`](Self::new), publishing every status transition on `events`.
    pub fn with_events(
        tree: Arc<TaskTree>,
        provider: ConcurrencyProvider,
        events: StatusSender,
    ) -> Self {
        Self::build(tree, provider, Some(events))
    }

    fn build(
        tree: Arc<TaskTree>,
        provider: ConcurrencyProvider,
        events: Option<StatusSender>,
    ) -> Self {
        // every node is queued at most once, so the queue never fills up
        let (queue, receiver) = mpsc::channel(tree.len());
        let state = RunnerState {
            status: StatusTree::build(&tree),
            in_flight: HashMap::new(),
            errors: MultiTaskError::new(),
            fatal: None,
            cancelled: false,
            phase: RunnerPhase::Idle,
        };

        Self {
            shared: Arc::new(Shared {
                tree,
                provider,
                events,
                state: RwLock::new(state),
                queue,
                admission_closed: CancellationToken::new(),
            }),
            receiver: Mutex::new(Some(receiver)),
            started: AtomicBool::new(false),
            finished: CancellationToken::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.shared.tree.name()
    }

    pub fn tree(&self) -> &Arc<TaskTree> {
        &self.shared.tree
    }

    pub async fn phase(&self) -> RunnerPhase {
        self.shared.state.read().await.phase
    }

    /// Copy of the current status tree.
    pub async fn status(&self) -> StatusTree {
        self.shared.state.read().await.status.clone()
    }

    /// Drive the tree to completion.
    ///
    /// Returns `Ok(())` when every node finished, [`ExecutionError::Failed`]
    /// when any task failed and [`ExecutionError::Cancelled`] when the run was
    /// stopped through [`cancel`](Self::cancel).
    pub async fn run(&self) -> Result<(), ExecutionError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ExecutionError::AlreadyStarted);
        }
        let receiver = self
            .receiver
            .lock()
            .map_err(|_| ExecutionError::InternalError {
                message: "admission queue lock poisoned".to_string(),
            })?
            .take()
            .ok_or(ExecutionError::AlreadyStarted)?;

        let start_msg = RunStarted {
            tree: self.name(),
            task_count: self.shared.tree.len(),
            max_concurrency: self.shared.provider.capacity(),
        };
        let span = start_msg.span("tree_run");
        start_msg.log();

        let started = Instant::now();
        let outcome = self
            .drive(receiver)
            .instrument(span)
            .await;
        self.finished.cancel();

        match &outcome {
            Ok(()) => RunCompleted {
                tree: self.name(),
                task_count: self.shared.tree.len(),
                duration: started.elapsed(),
            }
            .log(),
            Err(ExecutionError::Cancelled) => {}
            Err(e) => RunFailed {
                tree: self.name(),
                failed_count: e.task_errors().map_or(0, MultiTaskError::len),
                error: e,
            }
            .log(),
        }
        outcome
    }

    async fn drive(&self, mut receiver: mpsc::Receiver<NodeIndex>) -> Result<(), ExecutionError> {
        let shared = &self.shared;

        {
            let mut state = shared.state.write().await;
            state.phase = RunnerPhase::Running;
            if !state.cancelled {
                for idx in shared.tree.starting_nodes(shared.tree.root()) {
                    shared.enqueue(&mut state, idx);
                }
            }
        }

        let mut workers = JoinSet::new();
        loop {
            while let Ok(idx) = receiver.try_recv() {
                self.dispatch(&mut workers, idx);
            }
            // only workers enqueue, so an idle set and an empty queue mean we are done
            if workers.is_empty() {
                break;
            }
            tokio::select! {
                joined = workers.join_next() => {
                    if let Some(Err(e)) = joined {
                        self.worker_lost(e).await;
                    }
                }
                Some(idx) = receiver.recv() => self.dispatch(&mut workers, idx),
            }
        }
        receiver.close();

        self.finish().await
    }

    fn dispatch(&self, workers: &mut JoinSet<()>, idx: NodeIndex) {
        if self.shared.admission_closed.is_cancelled() {
            return;
        }
        let shared = Arc::clone(&self.shared);
        workers.spawn(async move { shared.work(idx).await });
    }

    async fn worker_lost(&self, error: tokio::task::JoinError) {
        let mut state = self.shared.state.write().await;
        state.fatal.get_or_insert(ExecutionError::InternalError {
            message: format!("worker for '{}' exited abnormally: {}", self.name(), error),
        });
        self.shared.close_admission("worker lost");
    }

    /// Settle leftover nodes and compute the outcome.
    async fn finish(&self) -> Result<(), ExecutionError> {
        let shared = &self.shared;
        let mut state = shared.state.write().await;

        let unfinished = state.status.unfinished();
        for &idx in &unfinished {
            if state.status.set_status(idx, TaskStatus::Canceled) {
                shared.emit(&state, idx);
            }
        }

        let outcome = if !state.errors.is_empty() {
            Err(ExecutionError::Failed(state.errors.clone()))
        } else if let Some(fatal) = state.fatal.clone() {
            Err(fatal)
        } else if state.cancelled || state.status.root_status() != TaskStatus::Done {
            Err(ExecutionError::Cancelled)
        } else {
            Ok(())
        };

        state.phase = match &outcome {
            Ok(()) => RunnerPhase::Completed,
            Err(ExecutionError::Cancelled) => RunnerPhase::Canceled,
            Err(_) => RunnerPhase::Errored,
        };
        if state.phase == RunnerPhase::Canceled {
            RunCanceled {
                tree: self.name(),
                unfinished: unfinished.len(),
            }
            .log();
        }
        outcome
    }

    /// Stop the run.
    ///
    /// Closes admission, signals every in-flight task and returns once the
    /// run has wound down. Calling it on a runner that never started makes a
    /// later `run` return [`ExecutionError::Cancelled`] without running anything.
    pub async fn cancel(&self) {
        {
            let mut state = self.shared.state.write().await;
            state.cancelled = true;
            for token in state.in_flight.values() {
                token.cancel();
            }
        }
        self.shared.close_admission("canceled");

        if self.started.load(Ordering::SeqCst) {
            self.finished.cancelled().await;
        }
    }
}

impl Shared {
    /// Queue `idx` unless it was already queued or admission is closed.
    fn enqueue(&self, state: &mut RunnerState, idx: NodeIndex) {
        if self.admission_closed.is_cancelled() || state.status.status(idx) != TaskStatus::Pending {
            return;
        }
        state.status.set_status(idx, TaskStatus::Scheduled);
        self.emit(state, idx);
        if self.queue.try_send(idx).is_err() {
            tracing::debug!(node = idx.index(), "admission queue rejected node");
        }
    }

    fn close_admission(&self, reason: &str) {
        if !self.admission_closed.is_cancelled() {
            AdmissionClosed {
                tree: self.tree.name(),
                reason,
            }
            .log();
            self.admission_closed.cancel();
        }
    }

    fn emit(&self, state: &RunnerState, idx: NodeIndex) {
        let Some(events) = &self.events else {
            return;
        };
        let status = &state.status;
        let event = StatusEvent {
            tree: self.tree.name().to_string(),
            node: status.snapshot(idx),
            ancestors: status
                .ancestors(idx)
                .into_iter()
                .map(|a| status.snapshot(a))
                .collect(),
            error: status.node(idx).error.as_ref().map(ToString::to_string),
        };
        // a dropped receiver only means nobody is watching
        let _ = events.send(event);
    }

    fn mark_canceled(&self, state: &mut RunnerState, idx: NodeIndex, node_id: &str, was_running: bool) {
        state.in_flight.remove(&idx);
        if state.status.set_status(idx, TaskStatus::Canceled) {
            self.emit(state, idx);
        }
        TaskCanceled { node_id, was_running }.log();
    }

    /// One admitted node: ticket, main task, bookkeeping.
    async fn work(&self, idx: NodeIndex) {
        let node = self.tree.node(idx);
        let node_id = self.tree.node_id(idx);
        let token = CancellationToken::new();

        {
            let mut state = self.state.write().await;
            if state.cancelled {
                self.mark_canceled(&mut state, idx, node_id.as_str(), false);
                return;
            }
            state.in_flight.insert(idx, token.clone());
        }

        TicketWait {
            node_id: node_id.as_str(),
            available: self.provider.available(),
        }
        .log();
        let ticket = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            ticket = self.provider.acquire() => Some(ticket),
        };
        let ticket = match ticket {
            None => {
                let mut state = self.state.write().await;
                self.mark_canceled(&mut state, idx, node_id.as_str(), false);
                return;
            }
            Some(Err(e)) => {
                let mut state = self.state.write().await;
                state.fatal.get_or_insert(e);
                self.mark_canceled(&mut state, idx, node_id.as_str(), false);
                self.close_admission("concurrency provider closed");
                return;
            }
            Some(Ok(ticket)) => ticket,
        };

        {
            let mut state = self.state.write().await;
            if state.cancelled || token.is_cancelled() {
                self.mark_canceled(&mut state, idx, node_id.as_str(), false);
                return;
            }
            state.status.set_status(idx, TaskStatus::Running);
            self.emit(&state, idx);
        }

        let start_msg = TaskStarted {
            node_id: node_id.as_str(),
            long_running: node.is_long_running,
        };
        let span = start_msg.span("task_execution");
        start_msg.log();

        let started = Instant::now();
        let result = node.main.run(token.clone()).instrument(span).await;
        self.provider.release(ticket);

        let mut state = self.state.write().await;
        state.in_flight.remove(&idx);
        match result {
            // finished after its cancel fired: the run is stopping, nothing follows it
            Ok(()) if token.is_cancelled() => {
                self.mark_canceled(&mut state, idx, node_id.as_str(), true);
            }
            Ok(()) => {
                state.status.set_status(idx, TaskStatus::Done);
                self.emit(&state, idx);
                TaskCompleted {
                    node_id: node_id.as_str(),
                    duration: started.elapsed(),
                }
                .log();
                self.schedule_next(&mut state, idx);
            }
            Err(e) if e.is_cancelled() || token.is_cancelled() => {
                self.mark_canceled(&mut state, idx, node_id.as_str(), true);
            }
            Err(e) => {
                TaskFailed {
                    node_id: node_id.as_str(),
                    error: &e,
                }
                .log();
                state.status.set_error(idx, e.clone());
                state.errors.insert(node_id, e);
                self.emit(&state, idx);
                self.close_admission("task failed");
            }
        }
    }

    /// Decide what becomes runnable now that `idx` finished its main task.
    fn schedule_next(&self, state: &mut RunnerState, idx: NodeIndex) {
        if state.status.is_finished() {
            self.close_admission("tree finished");
            return;
        }

        let node = self.tree.node(idx);
        if !node.post.is_empty() {
            for &post in &node.post {
                for start in self.tree.starting_nodes(post) {
                    self.enqueue(state, start);
                }
            }
            return;
        }

        // the subtree under `current` is complete
        let mut current = idx;
        while let Some(parent) = self.tree.parent(current) {
            match self.tree.phase_of(current) {
                Some(Phase::Pre) => {
                    if state.status.children_done(parent, Phase::Pre) {
                        self.enqueue(state, parent);
                    }
                    return;
                }
                Some(Phase::Post) => {
                    if !state.status.children_done(parent, Phase::Post) {
                        return;
                    }
                    current = parent;
                }
                None => return,
            }
        }
        self.close_admission("tree finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::{BlockingTask, FailingTask, StubTask};
    use crate::engine::events::status_channel;
    use crate::traits::SharedTask;
    use std::time::Duration;

    fn stub(name: &str) -> SharedTask {
        Arc::new(StubTask::new(name))
    }

    fn runner(tree: TaskTree, max: usize) -> TreeRunner {
        TreeRunner::new(Arc::new(tree), ConcurrencyProvider::new(max))
    }

    #[tokio::test]
    async fn test_single_node_completes() {
        let task = StubTask::new("only");
        let runs = task.runs();
        let runner = runner(TaskTree::with_task("only", task), 1);

        runner.run().await.unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(runner.phase().await, RunnerPhase::Completed);
        assert_eq!(runner.status().await.root_status(), TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_run_twice_is_rejected() {
        let runner = runner(TaskTree::new("only", stub("only")), 1);
        runner.run().await.unwrap();
        assert_eq!(runner.run().await, Err(ExecutionError::AlreadyStarted));
    }

    #[tokio::test]
    async fn test_pre_main_post_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let record = |name: &'static str| -> SharedTask {
            let order = Arc::clone(&order);
            Arc::new(crate::backends::FunctionTask::new(name, move |_| {
                let order = Arc::clone(&order);
                async move {
                    order.lock().unwrap().push(name);
                    Ok(())
                }
            }))
        };

        let mut tree = TaskTree::new("build", record("compile"));
        let root = tree.root();
        tree.add_pre(root, "format", record("format"));
        tree.add_post(root, "notify", record("notify"));

        runner(tree, 4).run().await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["format", "compile", "notify"]);
    }

    #[tokio::test]
    async fn test_failure_is_keyed_by_node_id() {
        let mut tree = TaskTree::new("build", stub("compile"));
        let root = tree.root();
        tree.add_pre(root, "lint", Arc::new(FailingTask::new("lint")));

        let err = runner(tree, 2).run().await.unwrap_err();

        let errors = err.task_errors().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors.get("build/lint").is_some());
    }

    #[tokio::test]
    async fn test_events_carry_ancestor_chain() {
        let (tx, mut rx) = status_channel();
        let mut tree = TaskTree::new("build", stub("compile"));
        let root = tree.root();
        tree.add_pre(root, "format", stub("format"));

        TreeRunner::with_events(Arc::new(tree), ConcurrencyProvider::new(1), tx)
            .run()
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        let format_done = events
            .iter()
            .find(|e| e.node.id.as_str() == "build/format" && e.node.status == TaskStatus::Done)
            .unwrap();
        assert_eq!(format_done.ancestors.len(), 1);
        assert_eq!(format_done.ancestors[0].aggregated_status, TaskStatus::Running);

        let last = events.last().unwrap();
        assert_eq!(last.node.id.as_str(), "build");
        assert_eq!(last.node.aggregated_status, TaskStatus::Done);
    }

    #[tokio::test]
    async fn test_cancel_before_run() {
        let task = StubTask::new("only");
        let runs = task.runs();
        let runner = runner(TaskTree::with_task("only", task), 1);

        runner.cancel().await;

        assert_eq!(runner.run().await, Err(ExecutionError::Cancelled));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(runner.status().await.status(NodeIndex::from_index(0)), TaskStatus::Canceled);
    }

    #[tokio::test]
    async fn test_task_finishing_after_cancel_is_canceled() {
        let started = Arc::new(tokio::sync::Notify::new());
        let task: SharedTask = {
            let started = Arc::clone(&started);
            Arc::new(crate::backends::FunctionTask::new("stubborn", move |cancel| {
                let started = Arc::clone(&started);
                async move {
                    started.notify_one();
                    cancel.cancelled().await;
                    Ok(())
                }
            }))
        };
        let mut tree = TaskTree::new("build", task);
        let root = tree.root();
        let post = StubTask::new("notify");
        let post_runs = post.runs();
        tree.add_post(root, "notify", Arc::new(post));
        let runner = Arc::new(runner(tree, 1));

        let handle = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move { runner.run().await })
        };
        started.notified().await;
        runner.cancel().await;

        assert_eq!(handle.await.unwrap(), Err(ExecutionError::Cancelled));
        assert_eq!(post_runs.load(Ordering::SeqCst), 0);
        let status = runner.status().await;
        assert_eq!(status.status(root), TaskStatus::Canceled);
        assert_eq!(status.root_status(), TaskStatus::Canceled);
    }

    #[tokio::test]
    async fn test_cancel_stops_blocking_task() {
        let blocking = BlockingTask::new("serve");
        let started = blocking.started();
        let runner = Arc::new(runner(TaskTree::with_task("serve", blocking), 1));

        let handle = {
            let runner = Arc::clone(&runner);
            tokio::spawn(async move { runner.run().await })
        };
        while started.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        runner.cancel().await;

        assert_eq!(handle.await.unwrap(), Err(ExecutionError::Cancelled));
        assert_eq!(runner.phase().await, RunnerPhase::Canceled);
    }
}
