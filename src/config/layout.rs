// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::{Path, PathBuf};

use crate::config::consts::{BINARIES_DIR, MANIFESTS_DIR, PACKAGES_DIR};
use crate::target::TargetIdentity;

/// Where build products live under the workspace.
///
/// ```text
/// <root>/<output_dir>/MANIFESTS/<dir>/<name>.json
/// <root>/<output_dir>/PACKAGES/<dir>/<generated file>
/// <root>/<output_dir>/BINARIES/<dir>/<binary>
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
    output: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, output_dir: &str) -> Self {
        let root = root.into();
        let output = root.join(output_dir);
        Self { root, output }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output
    }

    pub fn manifests_dir(&self) -> PathBuf {
        self.output.join(MANIFESTS_DIR)
    }

    /// Root of the packages tree; generated files keep their
    /// workspace-relative path below it.
    pub fn packages_dir(&self) -> PathBuf {
        self.output.join(PACKAGES_DIR)
    }

    pub fn binaries_dir(&self, target: &TargetIdentity) -> PathBuf {
        self.output.join(BINARIES_DIR).join(target.directory())
    }
}
