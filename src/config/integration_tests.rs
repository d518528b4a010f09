// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

#[cfg(all(test, unix))]
mod integration_tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use crate::config::{load_and_validate_config, ProfileKind, RuntimeBuilder};
    use crate::engine::StatusReceiver;
    use crate::errors::{ConfigError, ExecutionError, ReferenceKind, ResolveError};
    use crate::tree::TaskStatus;

    const PROJECT: &str = r#"
executor_options:
  max_concurrency: 2
fragments:
  fmt:
    command: "echo fmt >> order.log"
    workdir: work
  notify:
    command: "echo notify >> order.log"
    workdir: work
  broken:
    command: "echo broken >&2; exit 3"
profiles:
  build:
    kind: build
    command: "echo build >> order.log"
    workdir: work
    pre: [fmt]
    post: [notify]
compounds:
  all:
    members: [build, broken]
"#;

    /// Write `content` as a project file in a fresh directory with a `work/` subdirectory.
    fn project(name: &str, content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("work")).unwrap();
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn order(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join("work").join("order.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn statuses(rx: &mut StatusReceiver, id: &str) -> Vec<TaskStatus> {
        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if event.node.id.as_str() == id {
                seen.push(event.node.status);
            }
        }
        seen
    }

    /// A profile runs its hooks around its own command, inside the project-relative workdir
    #[tokio::test]
    async fn test_profile_runs_hooks_in_order() {
        let (dir, path) = project("hooktree.yaml", PROJECT);

        let (runner, mut rx) = RuntimeBuilder::from_file(&path, "build", &[]).unwrap();
        assert_eq!(runner.provider().capacity(), 2);
        runner.run().await.unwrap();

        assert_eq!(order(dir.path()), vec!["fmt", "build", "notify"]);
        assert_eq!(
            statuses(&mut rx, "build/notify"),
            vec![TaskStatus::Scheduled, TaskStatus::Running, TaskStatus::Done]
        );
    }

    /// One failing member of a compound does not stop the others
    #[tokio::test]
    async fn test_compound_reports_failing_member() {
        let (dir, path) = project("hooktree.yml", PROJECT);

        let (runner, _rx) = RuntimeBuilder::from_file(&path, "all", &[]).unwrap();
        assert_eq!(runner.len(), 2);
        let err = runner.run().await.unwrap_err();

        let errors = err.task_errors().unwrap();
        assert_eq!(errors.node_ids().collect::<Vec<_>>(), vec!["broken"]);
        let failure = errors.get("broken").unwrap();
        assert!(failure.to_string().contains('3'));
        assert!(failure.output().unwrap_or_default().contains("broken"));
        assert_eq!(order(dir.path()), vec!["fmt", "build", "notify"]);
    }

    #[tokio::test]
    async fn test_repeated_compound_member_runs_once() {
        let (_dir, path) = project(
            "hooktree.yaml",
            "fragments:\n  bad: { command: 'exit 1' }\ncompounds:\n  dev: { members: [bad, bad] }\n",
        );

        let (runner, _rx) = RuntimeBuilder::from_file(&path, "dev", &[]).unwrap();
        assert_eq!(runner.len(), 1);
        let err = runner.run().await.unwrap_err();
        assert_eq!(err.task_errors().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_excluded_hooks_do_not_run() {
        let (dir, path) = project("hooktree.yaml", PROJECT);

        let excluded = vec!["fmt".to_string(), "notify".to_string()];
        let (runner, _rx) = RuntimeBuilder::from_file(&path, "build", &excluded).unwrap();
        runner.run().await.unwrap();

        assert_eq!(order(dir.path()), vec!["build"]);
    }

    #[test]
    fn test_unknown_target_is_a_resolve_error() {
        let (_dir, path) = project("hooktree.yaml", PROJECT);

        let err = RuntimeBuilder::from_file(&path, "deploy", &[]).err().unwrap();
        assert!(matches!(
            err,
            ConfigError::Resolve(ResolveError::NotFound {
                kind: ReferenceKind::Target,
                ..
            })
        ));
    }

    #[test]
    fn test_broken_project_is_rejected_before_resolving() {
        let (_dir, path) = project(
            "hooktree.yaml",
            "profiles:\n  build: { command: 'true', pre: [lint] }\n  lint: { command: 'true', pre: [build] }\n",
        );

        let err = RuntimeBuilder::from_file(&path, "build", &[]).err().unwrap();
        assert!(matches!(err, ConfigError::Invalid(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("build -> lint -> build"));
    }

    #[tokio::test]
    async fn test_toml_project_runs() {
        let (dir, path) = project(
            "hooktree.toml",
            r#"
[fragments.fmt]
command = "echo fmt >> order.log"
workdir = "work"

[profiles.serve]
kind = "run"
command = "echo serve >> order.log"
workdir = "work"
pre = ["fmt"]
"#,
        );

        let cfg = load_and_validate_config(&path).unwrap();
        assert_eq!(cfg.profiles["serve"].kind, ProfileKind::Run);

        let (runner, _rx) = RuntimeBuilder::from_file(&path, "serve", &[]).unwrap();
        assert!(runner.runners()[0].tree().has_long_running());
        runner.run().await.unwrap();
        assert_eq!(order(dir.path()), vec!["fmt", "serve"]);
    }

    #[tokio::test]
    async fn test_cancel_kills_running_process() {
        let (_dir, path) = project(
            "hooktree.yaml",
            "profiles:\n  serve: { kind: watch, command: 'sleep 30' }\n",
        );

        let (runner, _rx) = RuntimeBuilder::from_file(&path, "serve", &[]).unwrap();
        let runner = std::sync::Arc::new(runner);
        let handle = {
            let runner = std::sync::Arc::clone(&runner);
            tokio::spawn(async move { runner.run().await })
        };
        let tree = runner.runners()[0].clone();
        while tree.status().await.root_status() != TaskStatus::Running {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let started = std::time::Instant::now();
        runner.cancel().await;

        assert_eq!(handle.await.unwrap(), Err(ExecutionError::Cancelled));
        assert!(started.elapsed() < std::time::Duration::from_secs(10));
    }
}
