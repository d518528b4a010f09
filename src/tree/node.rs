// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::config::consts::NODE_ID_SEPARATOR;
use crate::traits::{SharedTask, Task};

/// Position of a node inside its tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Path of names from the tree root down to a node, e.g. `build/lint/fmt`.
///
/// Correlates a task node with its status node and keys recorded errors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<NodeId> for String {
    fn from(id: NodeId) -> Self {
        id.0
    }
}

/// Which side of its parent's main task a child belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pre,
    Post,
}

/// One node: a main task with the subtrees that run before and after it.
pub struct TaskTreeNode {
    pub name: String,
    pub main: SharedTask,
    pub pre: Vec<NodeIndex>,
    pub post: Vec<NodeIndex>,
    pub is_long_running: bool,
    pub parent: Option<NodeIndex>,
}

impl TaskTreeNode {
    pub fn is_leaf(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }

    pub fn children(&self, phase: Phase) -> &[NodeIndex] {
        match phase {
            Phase::Pre => &self.pre,
            Phase::Post => &self.post,
        }
    }
}

impl fmt::Debug for TaskTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskTreeNode")
            .field("name", &self.name)
            .field("main", &self.main.name())
            .field("pre", &self.pre)
            .field("post", &self.post)
            .field("is_long_running", &self.is_long_running)
            .field("parent", &self.parent)
            .finish()
    }
}

/// Recursive pre/main/post composition of tasks, stored as an arena.
///
/// The root always sits at index 0. Indices handed out by one tree are only
/// meaningful for that tree; passing a foreign index panics.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use hooktree::backends::NoopTask;
/// use hooktree::tree::TaskTree;
///
/// let mut tree = TaskTree::new("build", Arc::new(NoopTask::new("compile")));
/// let root = tree.root();
/// let fmt = tree.add_pre(root, "format", Arc::new(NoopTask::new("format")));
/// tree.add_post(root, "notify", Arc::new(NoopTask::new("notify")));
///
/// assert_eq!(tree.node_id(fmt).as_str(), "build/format");
/// assert_eq!(tree.starting_nodes(root), vec![fmt]);
/// ```
#[derive(Debug)]
pub struct TaskTree {
    nodes: Vec<TaskTreeNode>,
}

impl TaskTree {
    pub fn new(name: impl Into<String>, main: SharedTask) -> Self {
        Self {
            nodes: vec![TaskTreeNode {
                name: name.into(),
                main,
                pre: Vec::new(),
                post: Vec::new(),
                is_long_running: false,
                parent: None,
            }],
        }
    }

    /// Convenience constructor taking any concrete task.
    pub fn with_task<T: Task + 'static>(name: impl Into<String>, main: T) -> Self {
        Self::new(name, Arc::new(main))
    }

    pub fn root(&self) -> NodeIndex {
        NodeIndex(0)
    }

    /// Name of the root node.
    pub fn name(&self) -> &str {
        &self.nodes[0].name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn node(&self, idx: NodeIndex) -> &TaskTreeNode {
        &self.nodes[idx.0]
    }

    pub fn get(&self, idx: NodeIndex) -> Option<&TaskTreeNode> {
        self.nodes.get(idx.0)
    }

    pub fn indices(&self) -> impl Iterator<Item = NodeIndex> {
        (0..self.nodes.len()).map(NodeIndex)
    }

    pub fn add_child(
        &mut self,
        parent: NodeIndex,
        phase: Phase,
        name: impl Into<String>,
        main: SharedTask,
    ) -> NodeIndex {
        let idx = NodeIndex(self.nodes.len());
        self.nodes.push(TaskTreeNode {
            name: name.into(),
            main,
            pre: Vec::new(),
            post: Vec::new(),
            is_long_running: false,
            parent: Some(parent),
        });
        let parent_node = &mut self.nodes[parent.0];
        match phase {
            Phase::Pre => parent_node.pre.push(idx),
            Phase::Post => parent_node.post.push(idx),
        }
        idx
    }

    pub fn add_pre(&mut self, parent: NodeIndex, name: impl Into<String>, main: SharedTask) -> NodeIndex {
        self.add_child(parent, Phase::Pre, name, main)
    }

    pub fn add_post(&mut self, parent: NodeIndex, name: impl Into<String>, main: SharedTask) -> NodeIndex {
        self.add_child(parent, Phase::Post, name, main)
    }

    pub fn set_long_running(&mut self, idx: NodeIndex, long_running: bool) {
        self.nodes[idx.0].is_long_running = long_running;
    }

    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.nodes[idx.0].parent
    }

    /// Which of its parent's child lists holds `idx`. `None` for the root.
    pub fn phase_of(&self, idx: NodeIndex) -> Option<Phase> {
        let parent = self.node(self.parent(idx)?);
        if parent.pre.contains(&idx) {
            Some(Phase::Pre)
        } else if parent.post.contains(&idx) {
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

    pub fn node_id(&self, idx: NodeIndex) -> NodeId {
        let mut names = vec![self.nodes[idx.0].name.as_str()];
        let mut current = self.nodes[idx.0].parent;
        while let Some(parent) = current {
            names.push(self.nodes[parent.0].name.as_str());
            current = self.nodes[parent.0].parent;
        }
        names.reverse();
        NodeId(names.join(NODE_ID_SEPARATOR))
    }

    /// Depth-first walk: all of `pre` (recursively, in order), then the node,
    /// then all of `post`. Used for one-time setup such as wiring output sinks.
    pub fn iterate<F>(&self, mut visitor: F)
    where
        F: FnMut(NodeIndex, &TaskTreeNode),
    {
        self.iterate_from(self.root(), &mut visitor);
    }

    fn iterate_from<F>(&self, idx: NodeIndex, visitor: &mut F)
    where
        F: FnMut(NodeIndex, &TaskTreeNode),
    {
        let node = self.node(idx);
        for &child in &node.pre {
            self.iterate_from(child, visitor);
        }
        visitor(idx, node);
        for &child in &node.post {
            self.iterate_from(child, visitor);
        }
    }

    /// Exact-name depth-first search, the node itself first, then `pre`, then `post`.
    /// Diagnostics only; scheduling never looks nodes up by name.
    pub fn find_node(&self, name: &str) -> Option<NodeIndex> {
        self.find_from(self.root(), name)
    }

    fn find_from(&self, idx: NodeIndex, name: &str) -> Option<NodeIndex> {
        let node = self.node(idx);
        if node.name == name {
            return Some(idx);
        }
        node.pre
            .iter()
            .chain(node.post.iter())
            .find_map(|&child| self.find_from(child, name))
    }

    /// Dependency-free nodes to start from: a node without `pre` starts
    /// itself, otherwise the starting nodes of each of its `pre` subtrees.
    pub fn starting_nodes(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let node = self.node(idx);
        if node.pre.is_empty() {
            return vec![idx];
        }
        node.pre
            .iter()
            .flat_map(|&child| self.starting_nodes(child))
            .collect()
    }

    /// A placeholder with nothing underneath it but other placeholders.
    fn is_empty_placeholder(&self, idx: NodeIndex) -> bool {
        let node = self.node(idx);
        node.main.is_noop()
            && node
                .pre
                .iter()
                .chain(node.post.iter())
                .all(|&child| self.is_empty_placeholder(child))
    }

    /// Copy of the tree without empty placeholder subtrees. The root is always kept.
    pub fn prune_noops(&self) -> TaskTree {
        let root = self.node(self.root());
        let mut pruned = TaskTree::new(root.name.clone(), root.main.clone());
        pruned.set_long_running(pruned.root(), root.is_long_running);
        self.copy_children(self.root(), &mut pruned, NodeIndex(0));
        pruned
    }

    fn copy_children(&self, src: NodeIndex, dst_tree: &mut TaskTree, dst: NodeIndex) {
        for phase in [Phase::Pre, Phase::Post] {
            for &child in self.node(src).children(phase) {
                if self.is_empty_placeholder(child) {
                    continue;
                }
                let node = self.node(child);
                let copied = dst_tree.add_child(dst, phase, node.name.clone(), node.main.clone());
                dst_tree.set_long_running(copied, node.is_long_running);
                self.copy_children(child, dst_tree, copied);
            }
        }
    }

    /// Whether any node in the tree is long-running (a server or watcher).
    pub fn has_long_running(&self) -> bool {
        self.nodes.iter().any(|n| n.is_long_running)
    }
}
