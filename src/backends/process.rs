// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! External-process tasks.
//!
//! A [`ProcessTask`] spawns a command with `tokio::process`, streams its stdout
//! and stderr into the task's [`MultiWriter`] as bytes arrive, and races the
//! child's exit against the cancel token. On cancel the child is killed and
//! reaped before `run` returns.
//!
//! After the child exits its output is drained, still racing the cancel token.
//! Pipes held open by background grandchildren are detached after
//! [`OUTPUT_DRAIN_GRACE`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::{AbortHandle, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::backends::output::{CaptureBuffer, MultiWriter};
use crate::config::consts::{DEFAULT_SHELL, ERROR_OUTPUT_TAIL_BYTES, OUTPUT_DRAIN_GRACE};
use crate::errors::TaskError;
use crate::traits::Task;

/// A task backed by an operating-system process.
#[derive(Debug)]
pub struct ProcessTask {
    name: String,
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
    env: HashMap<String, String>,
    output: MultiWriter,
    capture: CaptureBuffer,
}

impl ProcessTask {
    pub fn new(name: impl Into<String>, program: impl Into<String>, args: Vec<String>) -> Self {
        let output = MultiWriter::new();
        let capture = CaptureBuffer::new();
        output.add_sink(capture.clone());

        Self {
            name: name.into(),
            program: program.into(),
            args,
            working_dir: None,
            env: HashMap::new(),
            output,
            capture,
        }
    }

    /// Run `command` through the system shell.
    pub fn shell(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self::new(name, DEFAULT_SHELL, vec!["-c".to_string(), command.into()])
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_envs(mut self, env: HashMap<String, String>) -> Self {
        self.env.extend(env);
        self
    }

    /// Everything the process has written so far.
    pub fn captured_output(&self) -> String {
        self.capture.contents_lossy()
    }

    fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn build_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .envs(&self.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        command
    }
}

/// Copy a child stream into the fan-out writer until EOF.
fn pump<R>(mut reader: R, output: MultiWriter) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = [0u8; 8192];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if let Err(e) = output.write_chunk(&buf[..n]) {
                        debug!(error = %e, "dropping task output");
                    }
                }
            }
        }
    })
}

#[async_trait]
impl Task for ProcessTask {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, cancel: CancellationToken) -> Result<(), TaskError> {
        if cancel.is_cancelled() {
            return Err(TaskError::Cancelled);
        }

        let mut child = self.build_command().spawn().map_err(|e| TaskError::Spawn {
            command: self.command_line(),
            reason: e.to_string(),
        })?;
        debug!(task = %self.name, pid = ?child.id(), "spawned process");

        let mut pumps: Vec<JoinHandle<()>> = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            pumps.push(pump(stdout, self.output.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            pumps.push(pump(stderr, self.output.clone()));
        }
        let pump_aborts: Vec<AbortHandle> = pumps.iter().map(JoinHandle::abort_handle).collect();
        let abort_pumps = || pump_aborts.iter().for_each(AbortHandle::abort);

        let status = tokio::select! {
            status = child.wait() => status,
            _ = cancel.cancelled() => {
                debug!(task = %self.name, "killing process on cancel");
                // kill() also waits for the child, so nothing is left behind
                if let Err(e) = child.kill().await {
                    debug!(task = %self.name, error = %e, "kill failed");
                }
                // grandchildren may still hold the pipes open
                abort_pumps();
                return Err(TaskError::Cancelled);
            }
        };

        // background grandchildren can keep the pipes open after the child exits
        let drained = async move {
            for handle in pumps {
                let _ = handle.await;
            }
        };
        tokio::select! {
            _ = drained => {}
            _ = cancel.cancelled() => {
                abort_pumps();
                return Err(TaskError::Cancelled);
            }
            _ = tokio::time::sleep(OUTPUT_DRAIN_GRACE) => {
                debug!(task = %self.name, "output still open after exit, detaching");
                abort_pumps();
            }
        }

        let status = status?;
        if status.success() {
            return Ok(());
        }

        let output = self.capture.tail(ERROR_OUTPUT_TAIL_BYTES);
        match status.code() {
            Some(code) => Err(TaskError::ExitStatus { code, output }),
            None => Err(TaskError::Signalled { output }),
        }
    }

    fn output(&self) -> Option<&MultiWriter> {
        Some(&self.output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    #[tokio::test]
    async fn test_successful_process_streams_output() {
        let task = ProcessTask::shell("echo", "echo hello");
        let sink = CaptureBuffer::new();
        task.output().unwrap().add_sink(sink.clone());

        task.run(CancellationToken::new()).await.unwrap();

        assert_eq!(sink.contents_lossy(), "hello\n");
        assert_eq!(task.captured_output(), "hello\n");
    }

    #[tokio::test]
    async fn test_failing_process_reports_exit_code_and_output() {
        let task = ProcessTask::shell("fail", "echo broken >&2; exit 3");

        let err = task.run(CancellationToken::new()).await.unwrap_err();

        match err {
            TaskError::ExitStatus { code, output } => {
                assert_eq!(code, 3);
                assert!(output.contains("broken"));
            }
            other => panic!("expected ExitStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let task = ProcessTask::new("missing", "/definitely/not/a/program", vec![]);
        let err = task.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, TaskError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_cancel_kills_process_promptly() {
        let task = ProcessTask::shell("sleepy", "sleep 30");
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let err = task.run(cancel).await.unwrap_err();

        assert_eq!(err, TaskError::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_cancel_after_exit_does_not_wait_for_background_output() {
        let task = ProcessTask::shell("bg", "sleep 5 & echo started");
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result = task.run(cancel).await;

        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(task.captured_output().starts_with("started"));
        // the drain grace is longer than the cancel delay
        assert_eq!(result, Err(TaskError::Cancelled));
    }

    #[tokio::test]
    async fn test_background_output_holder_does_not_block_completion() {
        let task = ProcessTask::shell("bg", "sleep 5 & echo started");

        let started = Instant::now();
        task.run(CancellationToken::new()).await.unwrap();

        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(task.captured_output(), "started\n");
    }

    #[tokio::test]
    async fn test_env_and_working_dir_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let task = ProcessTask::shell("env", "echo $GREETING; pwd")
            .with_env("GREETING", "hi")
            .with_working_dir(dir.path());

        task.run(CancellationToken::new()).await.unwrap();

        let out = task.captured_output();
        assert!(out.starts_with("hi\n"));
        let dir_name = dir.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(out.contains(&dir_name));
    }
}
