// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod loader;
mod resolver;
mod runtime;
mod validation;

#[cfg(test)]
mod integration_tests;
pub mod consts;

pub use loader::{
    load_and_validate_config, load_config, CompoundConfig, Definition, ExecutorOptions,
    FragmentConfig, ProfileConfig, ProfileKind, ProjectConfig,
};
pub use resolver::Resolver;
pub use runtime::RuntimeBuilder;
pub use validation::validate_project;
