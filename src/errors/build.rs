// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

use crate::errors::{ConfigError, StagingError};
use crate::target::TargetIdentity;

/// Top-level error of a build invocation.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The graph could not be staged; nothing was executed.
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// A worker reported a fatal response and the build was aborted.
    #[error("FAILED{}: {message}", .target.as_ref().map(|t| format!(" {}", t)).unwrap_or_default())]
    Fatal {
        target: Option<TargetIdentity>,
        message: String,
    },

    /// Every worker exited while work was still outstanding.
    #[error("all workers exited before the build completed")]
    WorkersLost,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BuildError {
    /// Target named by a fatal response, if any.
    pub fn failed_target(&self) -> Option<&TargetIdentity> {
        match self {
            BuildError::Fatal { target, .. } => target.as_ref(),
            _ => None,
        }
    }
}
