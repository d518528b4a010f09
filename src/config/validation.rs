// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Project file validation.
//!
//! Checks that every name a project file refers to can be resolved and that
//! following hooks never leads back to where it started. Validation looks at
//! the whole file, not just one target, so a broken definition is reported
//! even if nobody runs it today.
//!
//! # Validation Pipeline
//!
//! 1. **Hook references**: every `pre`/`post` entry names a profile or fragment
//! 2. **Compound members**: every member names a profile or fragment
//! 3. **Cycle detection**: DFS over the hook graph, reporting the cycle path
//!
//! Cycle detection only runs once the references are sound, since it walks them.
//! Problems are accumulated so one pass shows everything that needs fixing.
//!
//! # Example
//! ```rust
//! use hooktree::config::{validate_project, ProjectConfig};
//! use hooktree::errors::ResolveError;
//!
//! let cfg = ProjectConfig::from_yaml_str(
//!     "fragments:\n  a: { command: 'true', pre: [b] }\n  b: { command: 'true', pre: [a] }\n",
//! ).unwrap();
//!
//! match validate_project(&cfg) {
//!     Ok(()) => println!("project is valid"),
//!     Err(errors) => {
//!         for error in errors {
//!             if let ResolveError::CircularDependency { chain } = &error {
//!                 eprintln!("cycle: {}", chain.join(" -> "));
//!             }
//!         }
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashSet};

use crate::config::ProjectConfig;
use crate::errors::{ReferenceKind, ResolveError};

/// Validate every reference in the project.
///
/// # Returns
///
/// * `Ok(())` - every target can be resolved
/// * `Err(Vec<ResolveError>)` - all problems found
pub fn validate_project(config: &ProjectConfig) -> Result<(), Vec<ResolveError>> {
    let mut errors = Vec::new();

    if let Err(reference_errors) = validate_hook_references(config) {
        errors.extend(reference_errors);
    }

    if let Err(member_errors) = validate_compound_members(config) {
        errors.extend(member_errors);
    }

    if errors.is_empty() {
        if let Err(cycle_errors) = validate_acyclic_hooks(config) {
            errors.extend(cycle_errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Whether `name` can stand in as a hook or compound member.
fn is_runnable(config: &ProjectConfig, name: &str) -> bool {
    config.lookup(name).is_some_and(|def| !def.is_compound())
}

fn validate_hook_references(config: &ProjectConfig) -> Result<(), Vec<ResolveError>> {
    let hook_lists = config
        .profiles
        .values()
        .flat_map(|p| p.pre.iter().chain(p.post.iter()))
        .chain(
            config
                .fragments
                .values()
                .flat_map(|f| f.pre.iter().chain(f.post.iter())),
        );

    let mut reported = HashSet::new();
    let mut errors = Vec::new();
    for hook in hook_lists {
        if !is_runnable(config, hook) && reported.insert(hook) {
            errors.push(ResolveError::NotFound {
                kind: ReferenceKind::Hook,
                name: hook.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_compound_members(config: &ProjectConfig) -> Result<(), Vec<ResolveError>> {
    let mut errors = Vec::new();

    for compound in config.compounds.values() {
        for member in &compound.members {
            if !is_runnable(config, member) {
                errors.push(ResolveError::NotFound {
                    kind: ReferenceKind::Member,
                    name: member.clone(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// DFS with a recursion stack over the hook graph.
///
/// A hook pointing at a node that is still on the stack closes a cycle; the
/// path from that node to the current one plus the back edge is reported.
/// The search keeps going afterwards so independent cycles all show up.
fn validate_acyclic_hooks(config: &ProjectConfig) -> Result<(), Vec<ResolveError>> {
    // each name resolves once, profile before fragment
    let mut graph: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for name in config.target_names() {
        if let Some(def) = config.lookup(name).filter(|d| !d.is_compound()) {
            let (pre, post) = def.hooks();
            graph.insert(name, pre.iter().chain(post.iter()).map(String::as_str).collect());
        }
    }

    let mut visited = HashSet::new();
    let mut rec_stack = HashSet::new();
    let mut path = Vec::new();
    let mut errors = Vec::new();

    for &name in graph.keys() {
        if !visited.contains(name) {
            dfs_cycle_detection(
                name,
                &graph,
                &mut visited,
                &mut rec_stack,
                &mut path,
                &mut errors,
            );
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn dfs_cycle_detection<'a>(
    node: &'a str,
    graph: &BTreeMap<&'a str, Vec<&'a str>>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
    errors: &mut Vec<ResolveError>,
) {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    for &neighbor in graph.get(node).into_iter().flatten() {
        if rec_stack.contains(neighbor) {
            let start = path.iter().position(|&n| n == neighbor).unwrap_or(0);
            let mut chain: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
            chain.push(neighbor.to_string());
            errors.push(ResolveError::CircularDependency { chain });
        } else if !visited.contains(neighbor) {
            dfs_cycle_detection(neighbor, graph, visited, rec_stack, path, errors);
        }
    }

    rec_stack.remove(node);
    path.pop();
}
