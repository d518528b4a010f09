// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stage view of a task tree, used for graph display.
//!
//! Flattening turns the recursive pre/main/post shape into an ordered list of
//! stages: everything a node's main task needs comes in earlier stages, the
//! main task gets a stage of its own, and the post work follows. Sibling
//! subtrees are merged stage by stage so independent work shares a stage.
//!
//! ```text
//!   build (pre: [lint (pre: [fmt])], post: [notify])
//!
//!   stage 0: fmt
//!   stage 1: lint
//!   stage 2: build
//!   stage 3: notify
//! ```
//!
//! The scheduler does not use this view; it walks the tree itself.

use super::node::{NodeIndex, TaskTree};

/// Nodes that may run side by side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stage(pub Vec<NodeIndex>);

impl Stage {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NodeIndex> {
        self.0.iter()
    }
}

/// Ordered stages of a flattened tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stages(pub Vec<Stage>);

impl Stages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.0.iter()
    }

    /// Total number of tasks across all stages.
    pub fn task_count(&self) -> usize {
        self.0.iter().map(Stage::len).sum()
    }

    /// Merge stage lists that all lead into the same main task.
    ///
    /// Stages are aligned on the side touching the main task: the last stage
    /// of `self` merges with the last stage of `other`, and so on. Extra stages
    /// of the longer list, the ones farthest from the main task, are kept unchanged.
    pub fn merge_pre_aligned(self, other: Stages) -> Stages {
        let mut a = self.0;
        let mut b = other.0;
        a.reverse();
        b.reverse();
        let mut merged = Stages(a).merge_post_aligned(Stages(b));
        merged.0.reverse();
        merged
    }

    /// Merge stage lists that all follow the same main task.
    ///
    /// Stages with the same index are concatenated; extra trailing stages of the
    /// longer list are appended unchanged.
    pub fn merge_post_aligned(self, other: Stages) -> Stages {
        let mut merged = self.0;
        for (i, stage) in other.0.into_iter().enumerate() {
            match merged.get_mut(i) {
                Some(existing) => existing.0.extend(stage.0),
                None => merged.push(stage),
            }
        }
        Stages(merged)
    }

    /// Node names per stage, for display.
    pub fn names(&self, tree: &TaskTree) -> Vec<Vec<String>> {
        self.0
            .iter()
            .map(|stage| stage.iter().map(|&idx| tree.node(idx).name.clone()).collect())
            .collect()
    }
}

impl TaskTree {
    /// Flatten the whole tree into stages. Placeholder tasks are dropped and
    /// stages left empty by that are removed.
    pub fn flatten(&self) -> Stages {
        let stages = self.flatten_from(self.root());
        Stages(
            stages
                .0
                .into_iter()
                .map(|stage| {
                    Stage(
                        stage
                            .0
                            .into_iter()
                            .filter(|&idx| !self.node(idx).main.is_noop())
                            .collect(),
                    )
                })
                .filter(|stage| !stage.is_empty())
                .collect(),
        )
    }

    fn flatten_from(&self, idx: NodeIndex) -> Stages {
        let node = self.node(idx);

        let pre = node
            .pre
            .iter()
            .map(|&child| self.flatten_from(child))
            .fold(Stages::new(), Stages::merge_pre_aligned);
        let post = node
            .post
            .iter()
            .map(|&child| self.flatten_from(child))
            .fold(Stages::new(), Stages::merge_post_aligned);

        let mut stages = pre.0;
        stages.push(Stage(vec![idx]));
        stages.extend(post.0);
        Stages(stages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::stub::StubTask;
    use crate::backends::NoopTask;
    use crate::traits::SharedTask;
    use std::sync::Arc;

    fn stub(name: &str) -> SharedTask {
        Arc::new(StubTask::new(name))
    }

    #[test]
    fn test_independent_pre_leaves_share_a_stage() {
        let mut tree = TaskTree::new("root", stub("root"));
        let root = tree.root();
        tree.add_pre(root, "a", stub("a"));
        tree.add_pre(root, "b", stub("b"));
        tree.add_post(root, "c", stub("c"));

        let stages = tree.flatten();

        assert_eq!(
            stages.names(&tree),
            vec![vec!["a", "b"], vec!["root"], vec!["c"]]
        );
    }

    #[test]
    fn test_two_level_tree_with_pre_post_pairs_has_seven_stages() {
        let mut tree = TaskTree::new("root", stub("root"));
        let root = tree.root();
        let before = tree.add_pre(root, "before", stub("before"));
        tree.add_pre(before, "before-pre", stub("before-pre"));
        tree.add_post(before, "before-post", stub("before-post"));
        let after = tree.add_post(root, "after", stub("after"));
        tree.add_pre(after, "after-pre", stub("after-pre"));
        tree.add_post(after, "after-post", stub("after-post"));

        let stages = tree.flatten();

        assert_eq!(stages.len(), 7);
        assert_eq!(stages.task_count(), 7);
        assert_eq!(stages.names(&tree)[3], vec!["root"]);
    }

    #[test]
    fn test_pre_merge_aligns_on_main() {
        let mut tree = TaskTree::new("root", stub("root"));
        let root = tree.root();
        let deep = tree.add_pre(root, "deep", stub("deep"));
        tree.add_pre(deep, "deeper", stub("deeper"));
        tree.add_pre(root, "shallow", stub("shallow"));

        let stages = tree.flatten();

        assert_eq!(
            stages.names(&tree),
            vec![vec!["deeper"], vec!["deep", "shallow"], vec!["root"]]
        );
    }

    #[test]
    fn test_post_merge_appends_trailing_stages() {
        let a = Stages(vec![Stage(vec![]), Stage(vec![])]);
        let b = Stages(vec![Stage(vec![]), Stage(vec![]), Stage(vec![])]);
        assert_eq!(a.merge_post_aligned(b).len(), 3);
    }

    #[test]
    fn test_placeholders_are_dropped() {
        let mut tree = TaskTree::new("root", stub("root"));
        let root = tree.root();
        tree.add_pre(root, "absent", Arc::new(NoopTask::new("absent")));
        tree.add_post(root, "notify", stub("notify"));

        let stages = tree.flatten();

        assert_eq!(stages.names(&tree), vec![vec!["root"], vec!["notify"]]);
    }
}
