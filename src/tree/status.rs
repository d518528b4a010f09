// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Status tree mirroring a [`TaskTree`] node for node.
//!
//! Every node carries its own `status` (the progress of its main task) and an
//! `aggregated_status` summarising the whole subtree. Each status write
//! recomputes the written node's rollup and then every ancestor's.
//!
//! # Aggregation
//!
//! Evaluated in this order, the first matching rule wins:
//!
//! 1. no children: the node's own status
//! 2. any child `Error` (or the node's own main failed): `Error`
//! 3. any child `Canceled` (or the node's own main was canceled): `Canceled`
//! 4. all children `Done`: `Running`, meaning the node's own main is now
//!    eligible; it only becomes `Done` once that main has itself finished
//! 5. any child `Running` (or the node's own main is running): `Running`
//! 6. any child `Scheduled`: `Scheduled`
//! 7. otherwise unchanged

use serde::Serialize;
use std::fmt;

use super::node::{NodeId, NodeIndex, Phase, TaskTree};
use crate::errors::TaskError;

/// Progress of a single main task. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Scheduled,
    Running,
    Done,
    Error,
    Canceled,
}

impl TaskStatus {
    fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::Scheduled => 1,
            TaskStatus::Running => 2,
            TaskStatus::Done | TaskStatus::Error | TaskStatus::Canceled => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        self.rank() == 3
    }

    /// Whether moving from `self` to `next` goes forward.
    pub fn can_advance_to(self, next: TaskStatus) -> bool {
        next.rank() > self.rank()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Scheduled => "scheduled",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Error => "error",
            TaskStatus::Canceled => "canceled",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct TreeStatusNode {
    pub name: String,
    pub id: NodeId,
    pub status: TaskStatus,
    pub aggregated_status: TaskStatus,
    pub pre_nodes: Vec<NodeIndex>,
    pub post_nodes: Vec<NodeIndex>,
    pub parent: Option<NodeIndex>,
    pub error: Option<TaskError>,
}

impl TreeStatusNode {
    fn children(&self) -> impl Iterator<Item = &NodeIndex> {
        self.pre_nodes.iter().chain(self.post_nodes.iter())
    }
}

/// Point-in-time copy of one node's statuses, as carried by status events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusSnapshot {
    pub id: NodeId,
    pub name: String,
    pub status: TaskStatus,
    pub aggregated_status: TaskStatus,
}

/// Arena of status nodes using the same indices as the source [`TaskTree`].
#[derive(Debug, Clone)]
pub struct StatusTree {
    nodes: Vec<TreeStatusNode>,
}

impl StatusTree {
    /// Build an isomorphic status tree with every node `Pending`.
    pub fn build(tree: &TaskTree) -> Self {
        let nodes = tree
            .indices()
            .map(|idx| {
                let node = tree.node(idx);
                TreeStatusNode {
                    name: node.name.clone(),
                    id: tree.node_id(idx),
                    status: TaskStatus::Pending,
                    aggregated_status: TaskStatus::Pending,
                    pre_nodes: node.pre.clone(),
                    post_nodes: node.post.clone(),
                    parent: node.parent,
                    error: None,
                }
            })
            .collect();
        Self { nodes }
    }

    pub fn root(&self) -> NodeIndex {
        // index 0 is the root in both arenas
        NodeIndex::from_index(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, idx: NodeIndex) -> &TreeStatusNode {
        &self.nodes[idx.index()]
    }

    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex::from_index)
    }

    pub fn status(&self, idx: NodeIndex) -> TaskStatus {
        self.node(idx).status
    }

    pub fn aggregated(&self, idx: NodeIndex) -> TaskStatus {
        self.node(idx).aggregated_status
    }

    /// Status of the whole tree.
    pub fn root_status(&self) -> TaskStatus {
        self.aggregated(self.root())
    }

    pub fn is_finished(&self) -> bool {
        self.root_status().is_terminal()
    }

    pub fn phase_of(&self, idx: NodeIndex) -> Option<Phase> {
        let parent = self.node(self.node(idx).parent?);
        if parent.pre_nodes.contains(&idx) {
            Some(Phase::Pre)
        } else if parent.post_nodes.contains(&idx) {
            Some(Phase::Post)
        } else {
            None
        }
    }

    pub fn is_pre(&self, idx: NodeIndex) -> bool {
        self.phase_of(idx) == Some(Phase::Pre)
    }

    pub fn is_post(&self, idx: NodeIndex) -> bool {
        self.phase_of(idx) == Some(Phase::Post)
    }

    /// Whether every `phase` child of `idx` has a fully finished subtree.
    pub fn children_done(&self, idx: NodeIndex, phase: Phase) -> bool {
        let node = self.node(idx);
        let children = match phase {
            Phase::Pre => &node.pre_nodes,
            Phase::Post => &node.post_nodes,
        };
        children
            .iter()
            .all(|&child| self.aggregated(child) == TaskStatus::Done)
    }

    /// Move `idx` forward to `status` and refresh the rollups above it.
    ///
    /// Returns `false` and leaves the tree untouched when the move would go
    /// backwards or sideways.
    pub fn set_status(&mut self, idx: NodeIndex, status: TaskStatus) -> bool {
        let current = self.status(idx);
        if !current.can_advance_to(status) {
            return false;
        }
        self.nodes[idx.index()].status = status;
        self.update(idx);
        true
    }

    /// Mark `idx` as failed with `error`.
    pub fn set_error(&mut self, idx: NodeIndex, error: TaskError) -> bool {
        if !self.set_status(idx, TaskStatus::Error) {
            return false;
        }
        self.nodes[idx.index()].error = Some(error);
        true
    }

    /// Recompute the rollup for `idx` and every ancestor.
    pub fn update(&mut self, idx: NodeIndex) {
        let mut current = Some(idx);
        while let Some(node) = current {
            let aggregated = self.aggregate(node);
            self.nodes[node.index()].aggregated_status = aggregated;
            current = self.node(node).parent;
        }
    }

    fn aggregate(&self, idx: NodeIndex) -> TaskStatus {
        let node = self.node(idx);
        let own = node.status;
        let children: Vec<TaskStatus> = node.children().map(|&c| self.aggregated(c)).collect();

        if children.is_empty() {
            return own;
        }
        let any = |wanted: TaskStatus| children.iter().any(|&s| s == wanted);

        if own == TaskStatus::Error || any(TaskStatus::Error) {
            TaskStatus::Error
        } else if own == TaskStatus::Canceled || any(TaskStatus::Canceled) {
            TaskStatus::Canceled
        } else if children.iter().all(|&s| s == TaskStatus::Done) {
            if own == TaskStatus::Done {
                TaskStatus::Done
            } else {
                TaskStatus::Running
            }
        } else if matches!(own, TaskStatus::Running | TaskStatus::Done) || any(TaskStatus::Running) {
            // own main started or finished with hooks still outstanding
            TaskStatus::Running
        } else if any(TaskStatus::Scheduled) {
            TaskStatus::Scheduled
        } else {
            node.aggregated_status
        }
    }

    /// Ancestors of `idx`, nearest first.
    pub fn ancestors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut chain = Vec::new();
        let mut current = self.node(idx).parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.node(parent).parent;
        }
        chain
    }

    pub fn snapshot(&self, idx: NodeIndex) -> StatusSnapshot {
        let node = self.node(idx);
        StatusSnapshot {
            id: node.id.clone(),
            name: node.name.clone(),
            status: node.status,
            aggregated_status: node.aggregated_status,
        }
    }

    /// Nodes whose own status is not terminal yet.
    pub fn unfinished(&self) -> Vec<NodeIndex> {
        self.indices()
            .filter(|&idx| !self.status(idx).is_terminal())
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<NodeIndex> {
        self.indices().find(|&idx| self.node(idx).id.as_str() == id)
    }
}
