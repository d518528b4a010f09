// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;

use thiserror::Error;

use super::ResolveError;

/// Errors raised while loading a project file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read project file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid YAML project file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid TOML project file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported project file extension '{0}' (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    /// The file parsed but its references are broken. Every problem is reported.
    #[error("{}", ValidationReport(.0))]
    Invalid(Vec<ResolveError>),

    /// The file is sound but the requested target cannot be built from it.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

struct ValidationReport<'a>(&'a [ResolveError]);

impl fmt::Display for ValidationReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project validation failed:")?;
        for error in self.0 {
            write!(f, "\n{}", error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ReferenceKind;

    #[test]
    fn test_invalid_lists_every_problem() {
        let err = ConfigError::Invalid(vec![
            ResolveError::NotFound {
                kind: ReferenceKind::Hook,
                name: "fmt".into(),
            },
            ResolveError::CircularDependency {
                chain: vec!["a".into(), "a".into()],
            },
        ]);
        let rendered = err.to_string();
        assert!(rendered.contains("hook 'fmt' not found"));
        assert!(rendered.contains("a -> a"));
    }
}
