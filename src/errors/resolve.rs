// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use thiserror::Error;

/// Kind of name a reference was expected to point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// Any of profile, fragment or compound.
    Target,
    /// A pre/post hook; profiles and fragments are eligible.
    Hook,
    /// A member of a compound; profiles and fragments are eligible.
    Member,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceKind::Target => write!(f, "target"),
            ReferenceKind::Hook => write!(f, "hook"),
            ReferenceKind::Member => write!(f, "compound member"),
        }
    }
}

/// Errors produced while turning named references into task trees.
///
/// These are always raised before any task runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// A reference names nothing in the project.
    #[error("{kind} '{name}' not found")]
    NotFound { kind: ReferenceKind, name: String },

    /// Following references leads back onto the current chain.
    #[error("circular dependency detected: {}", .chain.join(" -> "))]
    CircularDependency { chain: Vec<String> },

    /// The caller asked to run something it also excluded.
    #[error("target '{name}' is excluded")]
    TargetExcluded { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circular_dependency_shows_chain() {
        let err = ResolveError::CircularDependency {
            chain: vec!["build".into(), "lint".into(), "build".into()],
        };
        assert_eq!(
            err.to_string(),
            "circular dependency detected: build -> lint -> build"
        );
    }

    #[test]
    fn test_not_found_names_kind() {
        let err = ResolveError::NotFound {
            kind: ReferenceKind::Hook,
            name: "fmt".into(),
        };
        assert_eq!(err.to_string(), "hook 'fmt' not found");
    }
}
