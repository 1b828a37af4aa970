// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::{anyhow, bail, Context};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use tokio::process::Command;

use crate::graph::GraphDelta;
use crate::incremental::BuildManifest;
use crate::target::{RuleDefinition, RuleEntry, TargetIdentity};

/// Binary produced by a binary rule, exported to the binaries directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryExport {
    /// Path relative to the target's package directory in the sandbox.
    pub path: PathBuf,
    pub name: Option<String>,
}

impl BinaryExport {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            name: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// File name under the binaries directory.
    pub fn export_name(&self, target: &TargetIdentity) -> String {
        self.name.clone().unwrap_or_else(|| target.name().to_string())
    }
}

/// Everything a rule may read or change while it runs.
///
/// Paths handed to rules are package-relative; the context records them as
/// workspace-relative paths in the manifest.
pub struct ExecutionContext {
    target: TargetIdentity,
    rule_file: PathBuf,
    workdir: PathBuf,
    dependencies: BTreeMap<TargetIdentity, Arc<BuildManifest>>,
    previous_build: Option<u64>,
    attempt: u32,
    tracked_files: BTreeSet<String>,
    generated_files: BTreeSet<String>,
    propagated: BTreeMap<String, serde_json::Value>,
    delta: GraphDelta,
}

/// What a finished execution recorded.
pub(crate) struct ExecutionRecord {
    pub tracked_files: BTreeSet<String>,
    pub generated_files: BTreeSet<String>,
    pub propagated: BTreeMap<String, serde_json::Value>,
    pub delta: GraphDelta,
}

impl ExecutionContext {
    pub(crate) fn new(
        definition: &RuleDefinition,
        workdir: PathBuf,
        dependencies: BTreeMap<TargetIdentity, Arc<BuildManifest>>,
        previous_build: Option<u64>,
        attempt: u32,
    ) -> Self {
        Self {
            target: definition.identity.clone(),
            rule_file: definition.rule_file.clone(),
            workdir,
            dependencies,
            previous_build,
            attempt,
            tracked_files: BTreeSet::new(),
            generated_files: BTreeSet::new(),
            propagated: BTreeMap::new(),
            delta: GraphDelta::default(),
        }
    }

    pub fn target(&self) -> &TargetIdentity {
        &self.target
    }

    /// 0 on the first execution, incremented for each rerun.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Timestamp of the last successful build, if there was one.
    pub fn previous_build_timestamp(&self) -> Option<u64> {
        self.previous_build
    }

    /// Root of the sandbox; mirrors the workspace layout.
    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// The target's package directory inside the sandbox.
    pub fn package_dir(&self) -> PathBuf {
        self.workdir.join(self.target.directory())
    }

    /// Workspace-relative form of a package-relative path.
    pub fn logical_path(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches("./");
        if self.target.directory().is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.target.directory(), relative)
        }
    }

    /// Record a package-relative file as an input of this target.
    pub fn track_input_file(&mut self, relative: &str) -> anyhow::Result<()> {
        let logical = self.logical_path(relative);
        if !self.workdir.join(&logical).is_file() {
            bail!("input {} is not present in the sandbox", logical);
        }
        self.tracked_files.insert(logical);
        Ok(())
    }

    /// Record a package-relative file as an output of this target.
    pub fn add_generated_file(&mut self, relative: &str) -> anyhow::Result<()> {
        let logical = self.logical_path(relative);
        if !self.workdir.join(&logical).is_file() {
            bail!("declared output {} was not created", logical);
        }
        self.generated_files.insert(logical);
        Ok(())
    }

    pub fn dependency_manifest(&self, dependency: &TargetIdentity) -> Option<&BuildManifest> {
        self.dependencies.get(dependency).map(Arc::as_ref)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = (&TargetIdentity, &BuildManifest)> {
        self.dependencies.iter().map(|(id, m)| (id, m.as_ref()))
    }

    /// Sandbox paths of the files generated by `dependency`.
    pub fn dependency_outputs(&self, dependency: &TargetIdentity) -> Vec<PathBuf> {
        self.dependency_manifest(dependency)
            .map(|m| {
                m.generated_files
                    .iter()
                    .map(|file| self.workdir.join(file))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Resolve a reference written relative to this target's package.
    pub fn resolve(&self, reference: &str) -> anyhow::Result<TargetIdentity> {
        Ok(TargetIdentity::resolve(reference, self.target.directory())?)
    }

    /// Publish a value for dependents under `key`.
    pub fn propagate(&mut self, key: impl Into<String>, value: impl Serialize) -> anyhow::Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value)
            .with_context(|| format!("propagated value `{}` is not serializable", key))?;
        self.propagated.insert(key, value);
        Ok(())
    }

    /// Values published under `key` by direct dependencies.
    pub fn propagated_by_dependencies(&self, key: &str) -> Vec<(&TargetIdentity, &serde_json::Value)> {
        self.dependencies
            .iter()
            .filter_map(|(id, m)| m.propagated.get(key).map(|v| (id, v)))
            .collect()
    }

    /// Create a new target in this package and add it to the build.
    pub fn define_target(&mut self, entry: RuleEntry) -> anyhow::Result<TargetIdentity> {
        let definition = RuleDefinition::from_entry(entry, self.target.directory(), &self.rule_file)?;
        let identity = definition.identity.clone();
        if identity == self.target {
            bail!("{} cannot redefine itself", identity);
        }
        self.delta.definitions.push(definition);
        self.delta.added.insert(identity.clone());
        Ok(identity)
    }

    /// Add an existing target to the build without depending on it.
    pub fn add_target(&mut self, reference: &str) -> anyhow::Result<TargetIdentity> {
        let identity = self.resolve(reference)?;
        self.delta.added.insert(identity.clone());
        Ok(identity)
    }

    /// Ask to run again once `reference` has been built. The manifest of
    /// this attempt is not persisted.
    pub fn rerun_with_dependency(&mut self, reference: &str) -> anyhow::Result<TargetIdentity> {
        let identity = self.resolve(reference)?;
        if identity == self.target {
            return Err(anyhow!("{} cannot depend on itself", identity));
        }
        self.delta.rerun_with.insert(identity.clone());
        Ok(identity)
    }

    /// Run `command` through `sh -c` in the package directory.
    ///
    /// A non-zero exit status is an error carrying the command's stderr.
    pub async fn run_command(&self, command: &str, env: &[(&str, String)]) -> anyhow::Result<Output> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(self.package_dir())
            .envs(env.iter().map(|(k, v)| (*k, v.as_str())))
            .output()
            .await
            .with_context(|| format!("failed to spawn `{}`", command))?;

        if !output.status.success() {
            bail!(
                "`{}` exited with {}: {}",
                command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }

    pub(crate) fn finish(self) -> ExecutionRecord {
        ExecutionRecord {
            tracked_files: self.tracked_files,
            generated_files: self.generated_files,
            propagated: self.propagated,
            delta: self.delta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn context(workdir: &Path, target: &str) -> ExecutionContext {
        let identity = TargetIdentity::parse(target).unwrap();
        let definition = RuleDefinition {
            rule_file: identity.rule_file(Path::new("/ws")),
            identity,
            rule: "test".to_string(),
            tags: vec![],
            params: Default::default(),
            dependencies: vec![],
        };
        ExecutionContext::new(&definition, workdir.to_path_buf(), BTreeMap::new(), None, 0)
    }

    #[test]
    fn test_tracks_workspace_relative_paths() {
        let sandbox = TempDir::new().unwrap();
        fs::create_dir_all(sandbox.path().join("pkg")).unwrap();
        fs::write(sandbox.path().join("pkg/in.txt"), "x").unwrap();
        fs::write(sandbox.path().join("pkg/out.txt"), "y").unwrap();

        let mut ctx = context(sandbox.path(), "//pkg:t");
        ctx.track_input_file("in.txt").unwrap();
        ctx.add_generated_file("./out.txt").unwrap();
        assert!(ctx.add_generated_file("never.txt").is_err());

        let record = ctx.finish();
        assert!(record.tracked_files.contains("pkg/in.txt"));
        assert!(record.generated_files.contains("pkg/out.txt"));
    }

    #[test]
    fn test_graph_requests_accumulate_in_delta() {
        let sandbox = TempDir::new().unwrap();
        let mut ctx = context(sandbox.path(), "//pkg:t");

        let entry: RuleEntry =
            serde_yaml::from_str("rule: write_file\nname: made\nparams:\n  out: m.txt\n").unwrap();
        let made = ctx.define_target(entry).unwrap();
        let extra = ctx.rerun_with_dependency("//lib:extra").unwrap();
        assert!(ctx.rerun_with_dependency(":t").is_err());
        ctx.propagate("flags", vec!["-O2"]).unwrap();

        let record = ctx.finish();
        assert_eq!(made.to_string(), "//pkg:made");
        assert_eq!(record.delta.definitions.len(), 1);
        assert!(record.delta.added.contains(&made));
        assert!(record.delta.rerun_with.contains(&extra));
        assert_eq!(record.propagated["flags"], serde_json::json!(["-O2"]));
    }

    #[tokio::test]
    async fn test_run_command_reports_stderr_on_failure() {
        let sandbox = TempDir::new().unwrap();
        let ctx = context(sandbox.path(), "//:t");

        let ok = ctx
            .run_command("echo \"$GREETING\" > hi.txt", &[("GREETING", "hello".to_string())])
            .await
            .unwrap();
        assert!(ok.status.success());
        assert_eq!(fs::read_to_string(sandbox.path().join("hi.txt")).unwrap(), "hello\n");

        let err = ctx.run_command("echo boom >&2; exit 3", &[]).await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
