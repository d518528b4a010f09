// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;

/// A project file: the named units of work a developer can run.
///
/// # Fields
/// * `executor_options` - Scheduler options (optional)
/// * `fragments` - Ad-hoc commands, usable as targets and as hooks
/// * `profiles` - Build/run/watch commands with their hooks
/// * `compounds` - Named groups of profiles and fragments launched together
///
/// # Example
/// ```yaml
/// executor_options:
///   max_concurrency: 4
/// fragments:
///   fmt:  { command: "cargo fmt" }
///   lint: { command: "cargo clippy", pre: [fmt] }
/// profiles:
///   build: { kind: build, command: "cargo build", pre: [lint], post: [notify] }
///   serve: { kind: run, command: "cargo run" }
/// compounds:
///   dev: { members: [build, serve] }
/// ```
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub executor_options: ExecutorOptions,
    #[serde(default)]
    pub fragments: BTreeMap<String, FragmentConfig>,
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileConfig>,
    #[serde(default)]
    pub compounds: BTreeMap<String, CompoundConfig>,
}

/// Scheduler options.
///
/// # Fields
/// * `max_concurrency` - Maximum number of main tasks running at once (optional,
///   defaults to the number of logical CPUs)
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ExecutorOptions {
    pub max_concurrency: Option<usize>,
}

/// An ad-hoc command. Without `command` it only groups its hooks.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct FragmentConfig {
    pub command: Option<String>,
    pub workdir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub pre: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
}

/// What a profile is for.
///
/// # Variants
/// * `Build` - Runs to completion
/// * `Run` - Starts a long-running program such as a server
/// * `Watch` - Starts a long-running watcher
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileKind {
    #[default]
    Build,
    Run,
    Watch,
}

impl ProfileKind {
    pub fn is_long_running(self) -> bool {
        matches!(self, ProfileKind::Run | ProfileKind::Watch)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ProfileConfig {
    #[serde(default)]
    pub kind: ProfileKind,
    pub command: Option<String>,
    pub workdir: Option<PathBuf>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub pre: Vec<String>,
    #[serde(default)]
    pub post: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct CompoundConfig {
    #[serde(default)]
    pub members: Vec<String>,
}

/// What a name refers to, looked up in the order profile, fragment, compound.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Definition<'a> {
    Profile(&'a ProfileConfig),
    Fragment(&'a FragmentConfig),
    Compound(&'a CompoundConfig),
}

impl<'a> Definition<'a> {
    /// Hook references `(pre, post)`. Compounds have none.
    pub fn hooks(&self) -> (&'a [String], &'a [String]) {
        match *self {
            Definition::Profile(p) => (p.pre.as_slice(), p.post.as_slice()),
            Definition::Fragment(f) => (f.pre.as_slice(), f.post.as_slice()),
            Definition::Compound(_) => (&[], &[]),
        }
    }

    /// Profiles and fragments can be hooks and compound members; compounds cannot.
    pub fn is_compound(&self) -> bool {
        matches!(self, Definition::Compound(_))
    }
}

impl ProjectConfig {
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn lookup(&self, name: &str) -> Option<Definition<'_>> {
        if let Some(profile) = self.profiles.get(name) {
            return Some(Definition::Profile(profile));
        }
        if let Some(fragment) = self.fragments.get(name) {
            return Some(Definition::Fragment(fragment));
        }
        self.compounds.get(name).map(Definition::Compound)
    }

    /// Whether `name` is defined in any section.
    pub fn contains(&self, name: &str) -> bool {
        self.profiles.contains_key(name)
            || self.fragments.contains_key(name)
            || self.compounds.contains_key(name)
    }

    /// Every runnable name, sorted.
    pub fn target_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .profiles
            .keys()
            .chain(self.fragments.keys())
            .chain(self.compounds.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

/// Load a project file. The format follows the extension: `.yaml`/`.yml` or `.toml`.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ProjectConfig, ConfigError> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match extension.as_str() {
        "yaml" | "yml" => ProjectConfig::from_yaml_str(&fs::read_to_string(path)?),
        "toml" => ProjectConfig::from_toml_str(&fs::read_to_string(path)?),
        _ => Err(ConfigError::UnsupportedFormat(extension)),
    }
}

/// Load a project file and check every reference in it.
///
/// Unknown hooks or compound members and circular hook chains are all
/// reported together in [`ConfigError::Invalid`].
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<ProjectConfig, ConfigError> {
    let cfg = load_config(path)?;
    crate::config::validate_project(&cfg).map_err(ConfigError::Invalid)?;
    Ok(cfg)
}
