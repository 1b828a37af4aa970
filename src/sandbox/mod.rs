// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Default sandbox: a scratch directory holding copies of the inputs.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::errors::ExecutionError;
use crate::target::TargetIdentity;
use crate::traits::{Sandbox, SandboxFactory, SandboxInput};

/// Copies every input into a fresh temporary directory, laid out by its
/// workspace-relative path. The package directory of the target is created
/// even when it has no inputs so rules always have a working directory.
pub struct CopySandbox {
    package: PathBuf,
    dir: Option<TempDir>,
}

impl CopySandbox {
    pub fn new(target: &TargetIdentity) -> Self {
        Self {
            package: PathBuf::from(target.directory()),
            dir: None,
        }
    }
}

impl Sandbox for CopySandbox {
    fn mount(&mut self, inputs: &[SandboxInput]) -> Result<PathBuf, ExecutionError> {
        let sync_err = |e: std::io::Error| ExecutionError::SandboxSync {
            reason: e.to_string(),
        };

        let dir = tempfile::Builder::new()
            .prefix("buildwood-")
            .tempdir()
            .map_err(sync_err)?;
        fs::create_dir_all(dir.path().join(&self.package)).map_err(sync_err)?;

        for input in inputs {
            let destination = dir.path().join(&input.relative);
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(sync_err)?;
            }
            fs::copy(&input.source, &destination).map_err(|e| ExecutionError::SandboxSync {
                reason: format!("copying {}: {}", input.source.display(), e),
            })?;
        }

        let root = dir.path().to_path_buf();
        self.dir = Some(dir);
        Ok(root)
    }

    fn unmount(&mut self) -> Result<(), ExecutionError> {
        match self.dir.take() {
            Some(dir) => dir.close().map_err(|e| ExecutionError::SandboxSync {
                reason: e.to_string(),
            }),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CopySandboxFactory;

impl SandboxFactory for CopySandboxFactory {
    fn create(&self, target: &TargetIdentity, _workspace_root: &Path) -> Box<dyn Sandbox> {
        Box::new(CopySandbox::new(target))
    }
}
