// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Executes a single node: decide, sandbox, run the rule, collect outputs,
//! persist the manifest.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::OutputLayout;
use crate::engine::job::{Job, NodeOutcome};
use crate::errors::ExecutionError;
use crate::incremental::{BuildCheck, BuildManifest, Clock, Decision, IncrementalDecider, ManifestStore};
use crate::observability::messages::incremental::{ManifestDeferred, TargetStale, TargetUpToDate};
use crate::observability::messages::StructuredLog;
use crate::rules::{BinaryExport, ExecutionContext, ExecutionRecord, RuleRegistry};
use crate::target::{RuleDefinition, TargetIdentity};
use crate::traits::{Rule, SandboxFactory, SandboxInput};

/// Shared, read-only machinery every worker uses to execute nodes.
pub struct NodeExecutor {
    layout: OutputLayout,
    rules: RuleRegistry,
    store: ManifestStore,
    decider: IncrementalDecider,
    sandboxes: Arc<dyn SandboxFactory>,
    clock: Arc<dyn Clock>,
}

impl NodeExecutor {
    pub fn new(
        layout: OutputLayout,
        rules: RuleRegistry,
        force: bool,
        sandboxes: Arc<dyn SandboxFactory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store = ManifestStore::new(layout.manifests_dir());
        let decider = IncrementalDecider::new(layout.root(), force);
        Self {
            layout,
            rules,
            store,
            decider,
            sandboxes,
            clock,
        }
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// Execute `job`, or reuse its previous manifest when it is up to date.
    pub async fn execute(&self, job: &Job) -> Result<NodeOutcome, ExecutionError> {
        let definition = job.node.definition();
        let target = &definition.identity;

        let rule = self
            .rules
            .get(&definition.rule)
            .cloned()
            .ok_or_else(|| ExecutionError::RuleCompilation {
                target: target.clone(),
                rule: definition.rule.clone(),
            })?;

        let previous = self.load_previous(target)?;
        let known_manifests = self.with_recorded_dependencies(job, previous.as_ref());

        let decision = self.decider.needs_build(&BuildCheck {
            node: &job.node,
            previous: previous.as_ref(),
            dependencies: &job.dependencies,
            dependency_manifests: &known_manifests,
            attempt: job.attempt,
        });

        let previous_timestamp = previous.as_ref().map(|m| m.build_timestamp);
        match (decision, previous) {
            (Decision::Fresh, Some(previous)) => {
                TargetUpToDate { target }.log();
                return Ok(NodeOutcome {
                    target: target.clone(),
                    manifest: Arc::new(previous),
                    built: false,
                    delta: None,
                });
            }
            (Decision::Fresh, None) => {}
            (Decision::Stale(reason), _) => TargetStale { target, reason: &reason }.log(),
        }

        // Captured before the rule runs so inputs edited mid-build are
        // picked up by the next invocation.
        let build_timestamp = self.clock.now();

        let inputs = self.collect_inputs(definition, job)?;
        let mut sandbox = self.sandboxes.create(target, self.layout.root());
        let workdir = sandbox.mount(&inputs)?;

        let ran = self
            .run_rule(rule, definition, &workdir, job, previous_timestamp)
            .await
            .and_then(|(record, export)| {
                self.collect_outputs(target, &workdir, &record, export.as_ref())?;
                Ok(record)
            });
        let unmounted = sandbox.unmount();
        let mut record = ran?;
        unmounted?;

        // The rule file is an input of every target it defines.
        if let Ok(relative) = definition.rule_file.strip_prefix(self.layout.root()) {
            record
                .tracked_files
                .insert(relative.to_string_lossy().replace('\\', "/"));
        }

        let manifest = BuildManifest {
            build_timestamp,
            depends_on_files: record.tracked_files,
            depends_on_targets: job.dependencies.clone(),
            generated_files: record.generated_files,
            rule: definition.rule.clone(),
            tags: definition.tags.clone(),
            propagated: record.propagated,
        };

        // Rerun only on dependencies the node does not have yet; the
        // scheduler applies the same rule.
        if record.delta.requests_rerun(&job.dependencies) {
            ManifestDeferred { target }.log();
        } else {
            self.store.save(target, &manifest)?;
        }

        Ok(NodeOutcome {
            target: target.clone(),
            manifest: Arc::new(manifest),
            built: true,
            delta: (!record.delta.is_empty()).then_some(record.delta),
        })
    }

    fn load_previous(&self, target: &TargetIdentity) -> Result<Option<BuildManifest>, ExecutionError> {
        match self.store.load(target) {
            Err(e @ ExecutionError::ManifestFormat { .. }) => {
                tracing::warn!(target_id = %target, "ignoring unreadable manifest: {}", e);
                Ok(None)
            }
            other => other,
        }
    }

    /// Job manifests plus stored manifests for dependencies recorded by the
    /// previous build that are not part of this build's live set.
    fn with_recorded_dependencies(
        &self,
        job: &Job,
        previous: Option<&BuildManifest>,
    ) -> BTreeMap<TargetIdentity, Arc<BuildManifest>> {
        let mut manifests = job.dependency_manifests.clone();
        if let Some(previous) = previous {
            for recorded in &previous.depends_on_targets {
                if manifests.contains_key(recorded) {
                    continue;
                }
                if let Ok(Some(stored)) = self.store.load(recorded) {
                    manifests.insert(recorded.clone(), Arc::new(stored));
                }
            }
        }
        manifests
    }

    /// Sources and data of the target itself, plus every file generated by
    /// its dependencies.
    fn collect_inputs(&self, definition: &RuleDefinition, job: &Job) -> Result<Vec<SandboxInput>, ExecutionError> {
        let target = &definition.identity;
        let package = target.package_dir(self.layout.root());
        let mut inputs = Vec::new();

        for entry in definition
            .params
            .file_entries("srcs")
            .into_iter()
            .chain(definition.params.file_entries("data"))
            .chain(definition.params.file_entries("src"))
        {
            let source = package.join(&entry);
            let relative = Path::new(target.directory()).join(&entry);
            if !source.is_file() {
                return Err(ExecutionError::SourceNotFound {
                    file: relative,
                    target: target.clone(),
                });
            }
            inputs.push(SandboxInput::new(source, relative));
        }

        let packages = self.layout.packages_dir();
        for manifest in job.dependency_manifests.values() {
            for generated in &manifest.generated_files {
                inputs.push(SandboxInput::new(packages.join(generated), generated));
            }
        }
        Ok(inputs)
    }

    async fn run_rule(
        &self,
        rule: Arc<dyn Rule>,
        definition: &RuleDefinition,
        workdir: &Path,
        job: &Job,
        previous_timestamp: Option<u64>,
    ) -> Result<(ExecutionRecord, Option<BinaryExport>), ExecutionError> {
        let target = &definition.identity;
        let mut ctx = ExecutionContext::new(
            definition,
            workdir.to_path_buf(),
            job.dependency_manifests.clone(),
            previous_timestamp,
            job.attempt,
        );

        let export = rule
            .execute(&mut ctx, &definition.params)
            .await
            .map_err(|e| ExecutionError::RuleExecution {
                target: target.clone(),
                rule: definition.rule.clone(),
                message: format!("{:#}", e),
            })?;

        let record = ctx.finish();
        let must_export = rule.is_binary() || definition.is_binary_rule_name();
        if must_export && export.is_none() && !record.delta.requests_rerun(&job.dependencies) {
            return Err(ExecutionError::MissingBinaryExport {
                target: target.clone(),
                rule: definition.rule.clone(),
            });
        }
        Ok((record, export))
    }

    /// Copy generated files to the packages tree and the binary, if any, to
    /// the binaries tree.
    fn collect_outputs(
        &self,
        target: &TargetIdentity,
        workdir: &Path,
        record: &ExecutionRecord,
        export: Option<&BinaryExport>,
    ) -> Result<(), ExecutionError> {
        let packages = self.layout.packages_dir();
        for generated in &record.generated_files {
            let destination = packages.join(generated);
            copy_file(&workdir.join(generated), &destination).map_err(|source| ExecutionError::OutputIo {
                target: target.clone(),
                path: destination.clone(),
                source,
            })?;
        }

        if let Some(export) = export {
            let source = workdir.join(target.directory()).join(&export.path);
            let destination = self.layout.binaries_dir(target).join(export.export_name(target));
            copy_file(&source, &destination)
                .and_then(|_| make_executable(&destination))
                .map_err(|e| ExecutionError::BinaryExport {
                    target: target.clone(),
                    message: format!("{} -> {}: {}", source.display(), destination.display(), e),
                })?;
        }
        Ok(())
    }
}

fn copy_file(source: &Path, destination: &Path) -> std::io::Result<()> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, destination).map(|_| ())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
