// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Turns a target name into task trees.
//!
//! A profile or fragment becomes one tree: its command is the root's main
//! task and its hooks become `pre`/`post` subtrees, resolved recursively.
//! A compound becomes one tree per member. Names are looked up as profile,
//! then fragment, then compound.
//!
//! Resolution either produces every tree or fails; there are no partial runs.
//! Excluded hooks are kept as placeholders while building and pruned before
//! the trees are handed out.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::backends::{NoopTask, ProcessTask};
use crate::config::{Definition, ProjectConfig};
use crate::errors::{ReferenceKind, ResolveError};
use crate::observability::messages::resolve::{PlaceholdersPruned, ReferenceExcluded, TargetResolved};
use crate::observability::messages::StructuredLog;
use crate::traits::SharedTask;
use crate::tree::{NodeIndex, Phase, TaskTree};

pub struct Resolver<'a> {
    config: &'a ProjectConfig,
    base_dir: Option<PathBuf>,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a ProjectConfig) -> Self {
        Self {
            config,
            base_dir: None,
        }
    }

    /// Resolve relative `workdir`s against `dir`, usually the project file's directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Build the trees for `target`, skipping anything named in `excluded`.
    pub fn resolve(&self, target: &str, excluded: &[String]) -> Result<Vec<TaskTree>, ResolveError> {
        let excluded: HashSet<&str> = excluded.iter().map(String::as_str).collect();
        if excluded.contains(target) {
            return Err(ResolveError::TargetExcluded {
                name: target.to_string(),
            });
        }

        let definition = self
            .config
            .lookup(target)
            .ok_or_else(|| ResolveError::NotFound {
                kind: ReferenceKind::Target,
                name: target.to_string(),
            })?;

        let trees = match definition {
            Definition::Compound(compound) => {
                let mut trees = Vec::with_capacity(compound.members.len());
                let mut seen = HashSet::new();
                for member in &compound.members {
                    // a repeated member would produce a second tree with the same node ids
                    if !seen.insert(member.as_str()) {
                        continue;
                    }
                    if excluded.contains(member.as_str()) {
                        ReferenceExcluded {
                            name: member,
                            referenced_by: target,
                        }
                        .log();
                        continue;
                    }
                    let definition = self.runnable(member, ReferenceKind::Member)?;
                    trees.push(self.build_tree(member, definition, &excluded)?);
                }
                trees
            }
            definition => vec![self.build_tree(target, definition, &excluded)?],
        };

        TargetResolved {
            target,
            tree_count: trees.len(),
        }
        .log();
        Ok(trees)
    }

    /// Look up a profile or fragment; compounds do not qualify.
    fn runnable(&self, name: &str, kind: ReferenceKind) -> Result<Definition<'a>, ResolveError> {
        match self.config.lookup(name) {
            Some(def) if !def.is_compound() => Ok(def),
            _ => Err(ResolveError::NotFound {
                kind,
                name: name.to_string(),
            }),
        }
    }

    fn build_tree(
        &self,
        name: &str,
        definition: Definition<'a>,
        excluded: &HashSet<&str>,
    ) -> Result<TaskTree, ResolveError> {
        let mut tree = TaskTree::new(name, self.task_for(name, definition));
        let root = tree.root();
        tree.set_long_running(root, is_long_running(definition));

        let mut chain = vec![name.to_string()];
        self.attach_hooks(&mut tree, root, definition, &mut chain, excluded)?;

        let before = tree.len();
        let pruned = tree.prune_noops();
        if pruned.len() < before {
            PlaceholdersPruned {
                tree: name,
                removed: before - pruned.len(),
            }
            .log();
        }
        Ok(pruned)
    }

    fn attach_hooks(
        &self,
        tree: &mut TaskTree,
        parent: NodeIndex,
        definition: Definition<'a>,
        chain: &mut Vec<String>,
        excluded: &HashSet<&str>,
    ) -> Result<(), ResolveError> {
        let (pre, post) = definition.hooks();
        for (phase, hooks) in [(Phase::Pre, pre), (Phase::Post, post)] {
            let mut seen = HashSet::new();
            for hook in hooks {
                // the same hook twice in one list runs once
                if !seen.insert(hook.as_str()) {
                    continue;
                }

                if excluded.contains(hook.as_str()) {
                    ReferenceExcluded {
                        name: hook,
                        referenced_by: &chain[chain.len() - 1],
                    }
                    .log();
                    let placeholder: SharedTask = Arc::new(NoopTask::new(hook.as_str()));
                    tree.add_child(parent, phase, hook.as_str(), placeholder);
                    continue;
                }

                if chain.iter().any(|c| c == hook) {
                    let mut cycle = chain.clone();
                    cycle.push(hook.clone());
                    return Err(ResolveError::CircularDependency { chain: cycle });
                }

                let hook_definition = self.runnable(hook, ReferenceKind::Hook)?;
                let child = tree.add_child(parent, phase, hook.as_str(), self.task_for(hook, hook_definition));
                tree.set_long_running(child, is_long_running(hook_definition));

                chain.push(hook.clone());
                self.attach_hooks(tree, child, hook_definition, chain, excluded)?;
                chain.pop();
            }
        }
        Ok(())
    }

    fn task_for(&self, name: &str, definition: Definition<'_>) -> SharedTask {
        let (command, workdir, env) = match definition {
            Definition::Profile(p) => (&p.command, &p.workdir, &p.env),
            Definition::Fragment(f) => (&f.command, &f.workdir, &f.env),
            Definition::Compound(_) => return Arc::new(NoopTask::new(name)),
        };

        let Some(command) = command else {
            return Arc::new(NoopTask::new(name));
        };

        let mut task = ProcessTask::shell(name, command.as_str())
            .with_envs(env.iter().map(|(k, v)| (k.clone(), v.clone())).collect::<HashMap<_, _>>());
        if let Some(dir) = workdir {
            task = task.with_working_dir(self.working_dir(dir));
        }
        Arc::new(task)
    }

    fn working_dir(&self, dir: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if dir.is_relative() => base.join(dir),
            _ => dir.to_path_buf(),
        }
    }
}

fn is_long_running(definition: Definition<'_>) -> bool {
    matches!(definition, Definition::Profile(p) if p.kind.is_long_running())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &str = r#"
fragments:
  fmt: { command: cargo fmt }
  lint: { command: cargo clippy, pre: [fmt] }
  notify: { command: "echo done" }
  checks: { pre: [lint] }
profiles:
  build: { kind: build, command: cargo build, pre: [lint], post: [notify] }
  serve: { kind: run, command: cargo run, pre: [build] }
compounds:
  dev: { members: [build, serve] }
"#;

    fn config() -> ProjectConfig {
        ProjectConfig::from_yaml_str(PROJECT).unwrap()
    }

    fn names(tree: &TaskTree) -> Vec<String> {
        let mut names = Vec::new();
        tree.iterate(|idx, _| names.push(tree.node_id(idx).to_string()));
        names
    }

    #[test]
    fn test_profile_resolves_to_nested_tree() {
        let cfg = config();
        let trees = Resolver::new(&cfg).resolve("build", &[]).unwrap();

        assert_eq!(trees.len(), 1);
        assert_eq!(
            names(&trees[0]),
            vec!["build/lint/fmt", "build/lint", "build", "build/notify"]
        );
    }

    #[test]
    fn test_compound_resolves_to_one_tree_per_member() {
        let cfg = config();
        let trees = Resolver::new(&cfg).resolve("dev", &[]).unwrap();

        assert_eq!(trees.iter().map(TaskTree::name).collect::<Vec<_>>(), vec!["build", "serve"]);
        assert!(trees[1].has_long_running());
        assert!(!trees[0].has_long_running());
    }

    #[test]
    fn test_excluded_member_is_skipped() {
        let cfg = config();
        let trees = Resolver::new(&cfg)
            .resolve("dev", &["serve".to_string()])
            .unwrap();
        assert_eq!(trees.len(), 1);
    }

    #[test]
    fn test_repeated_member_resolves_once() {
        let cfg = ProjectConfig::from_yaml_str(
            "fragments:\n  bad: { command: exit 1 }\ncompounds:\n  dev: { members: [bad, bad] }\n",
        )
        .unwrap();
        let trees = Resolver::new(&cfg).resolve("dev", &[]).unwrap();
        assert_eq!(trees.iter().map(TaskTree::name).collect::<Vec<_>>(), vec!["bad"]);
    }

    #[test]
    fn test_excluded_target_is_an_error() {
        let cfg = config();
        let err = Resolver::new(&cfg)
            .resolve("build", &["build".to_string()])
            .unwrap_err();
        assert_eq!(err, ResolveError::TargetExcluded { name: "build".into() });
    }

    #[test]
    fn test_excluded_hook_is_pruned() {
        let cfg = config();
        let trees = Resolver::new(&cfg)
            .resolve("build", &["lint".to_string()])
            .unwrap();
        assert_eq!(names(&trees[0]), vec!["build", "build/notify"]);
    }

    #[test]
    fn test_command_less_fragment_keeps_its_hooks() {
        let cfg = config();
        let trees = Resolver::new(&cfg).resolve("checks", &[]).unwrap();
        let tree = &trees[0];

        assert!(tree.node(tree.root()).main.is_noop());
        assert_eq!(names(tree), vec!["checks/lint/fmt", "checks/lint", "checks"]);
    }

    #[test]
    fn test_unknown_target() {
        let cfg = config();
        let err = Resolver::new(&cfg).resolve("deploy", &[]).unwrap_err();
        assert_eq!(err.to_string(), "target 'deploy' not found");
    }

    #[test]
    fn test_unknown_hook() {
        let cfg = ProjectConfig::from_yaml_str("profiles:\n  a: { command: x, post: [gone] }\n").unwrap();
        let err = Resolver::new(&cfg).resolve("a", &[]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::NotFound {
                kind: ReferenceKind::Hook,
                name: "gone".into()
            }
        );
    }

    #[test]
    fn test_cycle_carries_reference_chain() {
        let cfg = ProjectConfig::from_yaml_str(
            "fragments:\n  a: { command: x, pre: [b] }\n  b: { command: x, pre: [a] }\n",
        )
        .unwrap();
        let err = Resolver::new(&cfg).resolve("a", &[]).unwrap_err();
        assert_eq!(
            err,
            ResolveError::CircularDependency {
                chain: vec!["a".into(), "b".into(), "a".into()]
            }
        );
    }

    #[test]
    fn test_relative_workdir_joins_base_dir() {
        let cfg = config();
        let resolver = Resolver::new(&cfg).with_base_dir("/projects/app");
        assert_eq!(resolver.working_dir(Path::new("web")), PathBuf::from("/projects/app/web"));
        assert_eq!(resolver.working_dir(Path::new("/abs")), PathBuf::from("/abs"));
    }
}
