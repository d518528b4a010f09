use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::backends::output::MultiWriter;
use crate::errors::TaskError;

/// A named, cancellable unit of work.
///
/// The scheduler treats every task the same way: it calls [`Task::run`] once per
/// run and waits for it. What the task actually does (spawn a process, call a
/// closure, nothing at all) stays behind this trait.
///
/// Implementations must:
/// - return promptly once `cancel` fires, terminating anything they spawned,
/// - release their resources on both the success and the cancel path,
/// - return `Err` only for abnormal termination.
///
/// A single instance is never run by two callers at the same time.
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, cancel: CancellationToken) -> Result<(), TaskError>;

    /// Output fan-out for tasks that produce raw bytes. Sinks are registered
    /// before `run` is called.
    fn output(&self) -> Option<&MultiWriter> {
        None
    }

    /// Placeholder tasks stand in for absent hooks and are pruned or hidden.
    fn is_noop(&self) -> bool {
        false
    }
}

pub type SharedTask = Arc<dyn Task>;
