// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Serialize;
use tokio::sync::mpsc;

use crate::tree::StatusSnapshot;

/// One status transition, carrying everything a presentation layer needs to
/// redraw the changed node and every ancestor whose rollup may have moved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEvent {
    /// Name of the tree the node belongs to.
    pub tree: String,
    pub node: StatusSnapshot,
    /// Ancestors of `node`, nearest first.
    pub ancestors: Vec<StatusSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub type StatusSender = mpsc::UnboundedSender<StatusEvent>;
pub type StatusReceiver = mpsc::UnboundedReceiver<StatusEvent>;

/// Create the channel runners publish status transitions on.
pub fn status_channel() -> (StatusSender, StatusReceiver) {
    mpsc::unbounded_channel()
}
