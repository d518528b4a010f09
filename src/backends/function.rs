// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::errors::TaskError;
use crate::traits::Task;

pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

type TaskFn = dyn Fn(CancellationToken) -> TaskFuture + Send + Sync;

/// In-process task wrapping an async closure.
///
/// The closure receives the cancel token and is expected to honour it.
#[derive(Clone)]
pub struct FunctionTask {
    name: String,
    func: Arc<TaskFn>,
}

impl FunctionTask {
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(move |cancel| Box::pin(func(cancel)) as TaskFuture),
        }
    }
}

impl std::fmt::Debug for FunctionTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionTask").field("name", &self.name).finish()
    }
}

#[async_trait]
impl Task for FunctionTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, cancel: CancellationToken) -> Result<(), TaskError> {
        (self.func)(cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_function_task_runs_closure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let task = FunctionTask::new("count", move |_cancel| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        task.run(CancellationToken::new()).await.unwrap();
        task.run(CancellationToken::new()).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(task.name(), "count");
    }

    #[tokio::test]
    async fn test_function_task_sees_cancel_token() {
        let task = FunctionTask::new("wait", |cancel: CancellationToken| async move {
            cancel.cancelled().await;
            Err(TaskError::Cancelled)
        });

        let token = CancellationToken::new();
        token.cancel();
        assert_eq!(task.run(token).await, Err(TaskError::Cancelled));
    }
}
