// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while a worker executes a staged node.
//!
//! These never abort staging; a worker converts any of them into a `FATAL`
//! response and the scheduler aborts the in-progress build.

use std::path::PathBuf;
use thiserror::Error;

use crate::target::TargetIdentity;

/// Errors that can occur while executing a single node.
#[derive(Debug, Error)]
pub enum ExecutionError {
    /// The rule function returned an error. `message` carries the full
    /// error chain of the original failure.
    #[error("\"{rule}\" raised an error while building target \"{target}\":\n{message}")]
    RuleExecution {
        target: TargetIdentity,
        rule: String,
        message: String,
    },

    /// The rule function panicked.
    #[error("\"{rule}\" panicked while building target \"{target}\": {message}")]
    RulePanicked {
        target: TargetIdentity,
        rule: String,
        message: String,
    },

    /// The rule named by a definition is not in the rule registry.
    #[error("No such build rule type \"{rule}\" (required by \"{target}\")")]
    RuleCompilation { target: TargetIdentity, rule: String },

    /// The sandbox could not be torn down; the whole invocation must be rerun.
    #[error("The filesystem is out of sync, please try rerunning: {reason}")]
    SandboxSync { reason: String },

    /// A file listed in `srcs`/`data` is absent on disk.
    #[error("[{}] used in [{target}] not found on disk", .file.display())]
    SourceNotFound { file: PathBuf, target: TargetIdentity },

    /// A binary rule returned without an exporter.
    #[error("{rule} must return a binary exporter (target \"{target}\")")]
    MissingBinaryExport { target: TargetIdentity, rule: String },

    /// The binary exporter itself failed.
    #[error("exporting binary for \"{target}\" failed: {message}")]
    BinaryExport { target: TargetIdentity, message: String },

    /// A manifest could not be read or written.
    #[error("manifest {} for \"{target}\": {source}", .path.display())]
    ManifestIo {
        target: TargetIdentity,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A manifest on disk is not valid JSON for the manifest shape.
    #[error("manifest {} for \"{target}\" is corrupt: {source}", .path.display())]
    ManifestFormat {
        target: TargetIdentity,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Copying a generated file into the package output failed.
    #[error("failed to collect output {} for \"{target}\": {source}", .path.display())]
    OutputIo {
        target: TargetIdentity,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExecutionError {
    /// The target this error is about, when there is one.
    pub fn target(&self) -> Option<&TargetIdentity> {
        match self {
            ExecutionError::RuleExecution { target, .. }
            | ExecutionError::RulePanicked { target, .. }
            | ExecutionError::RuleCompilation { target, .. }
            | ExecutionError::SourceNotFound { target, .. }
            | ExecutionError::MissingBinaryExport { target, .. }
            | ExecutionError::BinaryExport { target, .. }
            | ExecutionError::ManifestIo { target, .. }
            | ExecutionError::ManifestFormat { target, .. }
            | ExecutionError::OutputIo { target, .. } => Some(target),
            ExecutionError::SandboxSync { .. } => None,
        }
    }
}
