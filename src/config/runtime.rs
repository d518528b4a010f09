// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::Path;

use crate::config::{load_and_validate_config, ProjectConfig, Resolver};
use crate::engine::{status_channel, MultiTreeRunner, RunnerFactory, StatusReceiver};
use crate::errors::{ConfigError, ResolveError};

/// Runtime builder - resolves a target and wires up its runners.
///
/// The `RuntimeBuilder` turns a project and a target name into a
/// [`MultiTreeRunner`] with one tree per resolved profile or fragment, all
/// sharing one ticket pool sized from `executor_options`, plus the receiving
/// end of their status stream.
///
/// # Examples
///
/// ```
/// use hooktree::config::{ProjectConfig, RuntimeBuilder};
///
/// let config = ProjectConfig::from_yaml_str(
///     "profiles:\n  build: { command: 'true' }\n",
/// ).unwrap();
///
/// let (runner, _events) = RuntimeBuilder::from_config(&config, "build", &[]).unwrap();
///
/// assert_eq!(runner.len(), 1);
/// ```
pub struct RuntimeBuilder;

impl RuntimeBuilder {
    /// Resolve `target` in `cfg`, leaving out anything named in `excluded`.
    ///
    /// Relative working directories are taken as they are; use
    /// [`from_file`](Self::from_file) to resolve them against the project file.
    pub fn from_config(
        cfg: &ProjectConfig,
        target: &str,
        excluded: &[String],
    ) -> Result<(MultiTreeRunner, StatusReceiver), ResolveError> {
        Self::build(Resolver::new(cfg), cfg, target, excluded)
    }

    /// Load and validate a project file, then resolve `target` in it.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        target: &str,
        excluded: &[String],
    ) -> Result<(MultiTreeRunner, StatusReceiver), ConfigError> {
        let path = path.as_ref();
        let cfg = load_and_validate_config(path)?;

        let mut resolver = Resolver::new(&cfg);
        if let Some(dir) = path.parent() {
            resolver = resolver.with_base_dir(dir);
        }
        Ok(Self::build(resolver, &cfg, target, excluded)?)
    }

    fn build(
        resolver: Resolver<'_>,
        cfg: &ProjectConfig,
        target: &str,
        excluded: &[String],
    ) -> Result<(MultiTreeRunner, StatusReceiver), ResolveError> {
        let trees = resolver.resolve(target, excluded)?;
        let (tx, rx) = status_channel();
        let runner = RunnerFactory::from_trees(&cfg.executor_options, trees, Some(tx));
        Ok((runner, rx))
    }
}
