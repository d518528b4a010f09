// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Task trees and their mirrored status trees.
//!
//! A [`TaskTree`] composes work recursively: every node runs its `pre`
//! subtrees, then its own main task, then its `post` subtrees. Nodes live in
//! an arena and refer to each other by [`NodeIndex`], so parent links do not
//! form reference cycles. A [`StatusTree`] is built from a task tree with the
//! same indices and carries per-node progress plus a bottom-up rollup.

mod flatten;
mod node;
mod status;

pub use flatten::{Stage, Stages};
pub use node::{NodeId, NodeIndex, Phase, TaskTree, TaskTreeNode};
pub use status::{StatusSnapshot, StatusTree, TaskStatus, TreeStatusNode};
