// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Joins node names into a node id, root first.
pub const NODE_ID_SEPARATOR: &str = "/";
/// Shell used for profile commands.
pub const DEFAULT_SHELL: &str = "sh";
/// Trailing bytes of output kept on a failed process error.
pub const ERROR_OUTPUT_TAIL_BYTES: usize = 4096;
/// Ticket count used when the CPU count cannot be read.
pub const DEFAULT_CONCURRENCY_FALLBACK: usize = 4;
/// How long a finished process's pipes may stay open before its output is detached.
pub const OUTPUT_DRAIN_GRACE: std::time::Duration = std::time::Duration::from_secs(1);
