// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Persisted per-target build records.
//!
//! One JSON file per target under `<output>/MANIFESTS/<dir>/<name>.json`.
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so a reader never observes a half-written manifest.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::errors::ExecutionError;
use crate::observability::messages::incremental::ManifestWritten;
use crate::observability::messages::StructuredLog;
use crate::target::TargetIdentity;

/// What a target consumed and produced the last time it was built.
///
/// File paths are workspace-relative with `/` separators. Generated files
/// are recorded at their logical location (`pkg/out.txt`); the bytes live
/// under the packages output directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Seconds since the epoch, captured when execution started.
    pub build_timestamp: u64,
    pub depends_on_files: BTreeSet<String>,
    pub depends_on_targets: BTreeSet<TargetIdentity>,
    pub generated_files: BTreeSet<String>,
    #[serde(default)]
    pub rule: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Tagged data published for dependents.
    #[serde(default)]
    pub propagated: BTreeMap<String, serde_json::Value>,
}

impl BuildManifest {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Reads and writes manifests below one directory.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    dir: PathBuf,
}

impl ManifestStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, target: &TargetIdentity) -> PathBuf {
        let mut path = self.dir.clone();
        if !target.directory().is_empty() {
            path.push(target.directory());
        }
        path.push(format!("{}.json", target.name()));
        path
    }

    /// Manifest for `target`, or `None` if it was never built.
    pub fn load(&self, target: &TargetIdentity) -> Result<Option<BuildManifest>, ExecutionError> {
        let path = self.path_for(target);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ExecutionError::ManifestIo {
                    target: target.clone(),
                    path,
                    source,
                })
            }
        };
        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| ExecutionError::ManifestFormat {
                target: target.clone(),
                path,
                source,
            })
    }

    /// Durably replace the manifest for `target`.
    pub fn save(&self, target: &TargetIdentity, manifest: &BuildManifest) -> Result<PathBuf, ExecutionError> {
        let path = self.path_for(target);
        let io_err = |source| ExecutionError::ManifestIo {
            target: target.clone(),
            path: path.clone(),
            source,
        };

        let parent = path.parent().unwrap_or(&self.dir);
        fs::create_dir_all(parent).map_err(io_err)?;

        let json = serde_json::to_vec_pretty(manifest).map_err(|source| ExecutionError::ManifestFormat {
            target: target.clone(),
            path: path.clone(),
            source,
        })?;

        let mut staging = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
        staging.write_all(&json).map_err(io_err)?;
        staging.as_file().sync_all().map_err(io_err)?;
        staging.persist(&path).map_err(|e| io_err(e.error))?;

        ManifestWritten {
            target,
            path: &path,
        }
        .log();
        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn id(s: &str) -> TargetIdentity {
        TargetIdentity::parse(s).unwrap()
    }

    #[test]
    fn test_missing_manifest_is_none() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path());
        assert!(store.load(&id("//a:b")).unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path());
        let target = id("//lib/text:upper");

        let manifest = BuildManifest {
            build_timestamp: 42,
            depends_on_files: BTreeSet::from(["lib/text/BUILD.yaml".to_string()]),
            depends_on_targets: BTreeSet::from([id("//lib:base")]),
            generated_files: BTreeSet::from(["lib/text/upper.txt".to_string()]),
            rule: "genrule".to_string(),
            tags: vec!["text".to_string()],
            propagated: BTreeMap::from([("flags".to_string(), serde_json::json!(["-O2"]))]),
        };

        let path = store.save(&target, &manifest).unwrap();
        assert_eq!(path, dir.path().join("lib/text/upper.json"));
        assert_eq!(store.load(&target).unwrap(), Some(manifest));

        // No temporary files left next to the manifest.
        let entries: Vec<_> = fs::read_dir(dir.path().join("lib/text")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_corrupt_manifest_is_a_format_error() {
        let dir = TempDir::new().unwrap();
        let store = ManifestStore::new(dir.path());
        fs::write(dir.path().join("x.json"), "{ not json").unwrap();
        assert!(matches!(
            store.load(&id("//:x")),
            Err(ExecutionError::ManifestFormat { .. })
        ));
    }

    #[test]
    fn test_wire_format_field_names() {
        let manifest = BuildManifest {
            build_timestamp: 7,
            depends_on_targets: BTreeSet::from([id("//:dep")]),
            ..Default::default()
        };
        let value = serde_json::to_value(&manifest).unwrap();
        assert_eq!(value["build_timestamp"], 7);
        assert_eq!(value["depends_on_targets"][0], "//:dep");
        assert!(value.get("depends_on_files").is_some());
        assert!(value.get("generated_files").is_some());
    }
}
