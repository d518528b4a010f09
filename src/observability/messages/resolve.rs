// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A target was turned into one or more trees.
///
/// # Example
/// ```
/// use hooktree::observability::messages::resolve::TargetResolved;
///
/// let msg = TargetResolved {
///     target: "dev",
///     tree_count: 2,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct TargetResolved<'a> {
    pub target: &'a str,
    pub tree_count: usize,
}

impl Display for TargetResolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Resolved '{}' into {} trees", self.target, self.tree_count)
    }
}

impl StructuredLog for TargetResolved<'_> {
    fn log(&self) {
        tracing::info!(target_name = self.target, tree_count = self.tree_count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "resolve",
            span_name = name,
            target_name = self.target,
            tree_count = self.tree_count,
        )
    }
}

/// A hook or compound member was skipped because the caller excluded it.
pub struct ReferenceExcluded<'a> {
    pub name: &'a str,
    pub referenced_by: &'a str,
}

impl Display for ReferenceExcluded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Skipping excluded '{}' referenced by '{}'",
            self.name, self.referenced_by
        )
    }
}

impl StructuredLog for ReferenceExcluded<'_> {
    fn log(&self) {
        tracing::info!(reference = self.name, referenced_by = self.referenced_by, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "reference_excluded",
            span_name = name,
            reference = self.name,
            referenced_by = self.referenced_by,
        )
    }
}

pub struct PlaceholdersPruned<'a> {
    pub tree: &'a str,
    pub removed: usize,
}

impl Display for PlaceholdersPruned<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Pruned {} placeholder nodes from '{}'",
            self.removed, self.tree
        )
    }
}

impl StructuredLog for PlaceholdersPruned<'_> {
    fn log(&self) {
        tracing::debug!(tree = self.tree, removed = self.removed, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "placeholders_pruned",
            span_name = name,
            tree = self.tree,
            removed = self.removed,
        )
    }
}
