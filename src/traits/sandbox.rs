// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};

use crate::errors::ExecutionError;
use crate::target::TargetIdentity;

/// One file made visible inside a sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxInput {
    /// Where the bytes live on disk.
    pub source: PathBuf,
    /// Workspace-relative location inside the sandbox.
    pub relative: PathBuf,
}

impl SandboxInput {
    pub fn new(source: impl Into<PathBuf>, relative: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            relative: relative.into(),
        }
    }
}

/// Isolated working tree for a single node execution.
pub trait Sandbox: Send {
    /// Lay out `inputs` and return the sandbox root.
    fn mount(&mut self, inputs: &[SandboxInput]) -> Result<PathBuf, ExecutionError>;

    /// Tear the sandbox down. Failure here means the host filesystem can no
    /// longer be trusted and maps to `SandboxSync`.
    fn unmount(&mut self) -> Result<(), ExecutionError>;
}

/// Creates one sandbox per node execution.
pub trait SandboxFactory: Send + Sync {
    fn create(&self, target: &TargetIdentity, workspace_root: &Path) -> Box<dyn Sandbox>;
}
