// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while loading rule files and staging the dependency graph.
//!
//! Every variant here aborts a build before any rule function runs.

use std::path::PathBuf;
use thiserror::Error;

use crate::target::TargetIdentity;

/// Errors that can occur while resolving a target into a staged DAG.
#[derive(Debug, Error)]
pub enum StagingError {
    /// A dependency cycle was found. `path` lists the identities in traversal
    /// order and ends with the identity that closed the cycle.
    #[error("Build target cycle: {}", format_cycle(.path))]
    Cycle { path: Vec<TargetIdentity> },

    /// The rule file for a target, or the rule inside it, does not exist.
    #[error("{}", describe_missing(.target, .used_in.as_ref(), .reason))]
    TargetMissing {
        target: TargetIdentity,
        used_in: Option<TargetIdentity>,
        reason: String,
    },

    /// A dependency string is neither `:name` nor `//path:name`.
    #[error("[{reference}] invalid: {reason}")]
    InvalidTargetReference { reference: String, reason: String },

    /// A rule file exists but could not be parsed.
    #[error("failed to parse rule file {}: {source}", .path.display())]
    RuleFileParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Two rules in the same rule file share a local name.
    #[error("target {target} is defined more than once in {}", .path.display())]
    DuplicateTarget { target: TargetIdentity, path: PathBuf },

    /// A rule file could not be read.
    #[error("failed to read rule file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StagingError {
    /// Path of the cycle, if this is a cycle error.
    pub fn cycle_path(&self) -> Option<&[TargetIdentity]> {
        match self {
            StagingError::Cycle { path } => Some(path),
            _ => None,
        }
    }

    pub(crate) fn invalid_reference(reference: &str, reason: impl Into<String>) -> Self {
        StagingError::InvalidTargetReference {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}

fn format_cycle(path: &[TargetIdentity]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" => ")
}

fn describe_missing(target: &TargetIdentity, used_in: Option<&TargetIdentity>, reason: &str) -> String {
    match used_in {
        Some(user) => format!("Target \"{}\", used in \"{}\", is missing: {}", target, user, reason),
        None => format!("Target \"{}\" is missing: {}", target, reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> TargetIdentity {
        TargetIdentity::parse(s).unwrap()
    }

    #[test]
    fn test_cycle_message_lists_path_in_order() {
        let err = StagingError::Cycle {
            path: vec![id("//a:x"), id("//b:y"), id("//a:x")],
        };
        assert_eq!(err.to_string(), "Build target cycle: //a:x => //b:y => //a:x");
        assert_eq!(err.cycle_path().unwrap().len(), 3);
    }

    #[test]
    fn test_missing_message_names_user_when_known() {
        let err = StagingError::TargetMissing {
            target: id("//lib:util"),
            used_in: Some(id("//app:main")),
            reason: "no rule named `util`".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("//lib:util"));
        assert!(msg.contains("used in \"//app:main\""));
        assert!(err.cycle_path().is_none());
    }
}
