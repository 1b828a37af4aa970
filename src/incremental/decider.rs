// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Skip-versus-rebuild policy.
//!
//! A target is rebuilt when any of the following holds, checked in order:
//!
//! 1. the invocation forces a rebuild
//! 2. the target sets `build_always: true`
//! 3. the target is running again after requesting a rerun
//! 4. there is no previous manifest
//! 5. one of its current dependencies is absent from the recorded set
//! 6. a dependency manifest is newer than this target's, or missing
//! 7. a recorded input file is newer than the last build, or has vanished
//!
//! Otherwise the previous manifest is reused unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::graph::StagedNode;
use crate::incremental::clock::unix_seconds;
use crate::incremental::BuildManifest;
use crate::target::TargetIdentity;

/// Outcome of a staleness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Fresh,
    Stale(String),
}

impl Decision {
    pub fn is_stale(&self) -> bool {
        matches!(self, Decision::Stale(_))
    }
}

/// Everything the decider needs to know about one pending execution.
pub struct BuildCheck<'a> {
    pub node: &'a StagedNode,
    pub previous: Option<&'a BuildManifest>,
    /// Live dependency set, including dependencies added by reruns.
    pub dependencies: &'a BTreeSet<TargetIdentity>,
    /// Manifests for current dependencies and for dependencies recorded in
    /// `previous`.
    pub dependency_manifests: &'a BTreeMap<TargetIdentity, Arc<BuildManifest>>,
    pub attempt: u32,
}

#[derive(Debug, Clone)]
pub struct IncrementalDecider {
    root: PathBuf,
    force: bool,
}

impl IncrementalDecider {
    pub fn new(root: impl Into<PathBuf>, force: bool) -> Self {
        Self {
            root: root.into(),
            force,
        }
    }

    pub fn needs_build(&self, check: &BuildCheck<'_>) -> Decision {
        if self.force {
            return Decision::Stale("rebuild forced".to_string());
        }
        if check.node.definition().params.build_always() {
            return Decision::Stale("build_always is set".to_string());
        }
        if check.attempt > 0 {
            return Decision::Stale(format!("rerun attempt {}", check.attempt));
        }
        let Some(previous) = check.previous else {
            return Decision::Stale("no previous build".to_string());
        };

        if let Some(added) = check
            .dependencies
            .iter()
            .find(|dep| !previous.depends_on_targets.contains(*dep))
        {
            return Decision::Stale(format!("new dependency {}", added));
        }

        for dependency in check.dependencies.iter().chain(&previous.depends_on_targets) {
            match check.dependency_manifests.get(dependency) {
                None => return Decision::Stale(format!("dependency {} has no manifest", dependency)),
                Some(manifest) if manifest.build_timestamp > previous.build_timestamp => {
                    return Decision::Stale(format!("dependency {} was rebuilt", dependency))
                }
                Some(_) => {}
            }
        }

        for file in &previous.depends_on_files {
            let modified = fs::metadata(self.root.join(file)).and_then(|m| m.modified());
            match modified {
                Ok(time) if unix_seconds(time) > previous.build_timestamp => {
                    return Decision::Stale(format!("{} changed", file))
                }
                Ok(_) => {}
                Err(_) => return Decision::Stale(format!("{} is missing", file)),
            }
        }

        Decision::Fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{RuleDefinition, RuleParams};
    use std::fs::File;
    use std::time::{Duration, SystemTime};
    use tempfile::TempDir;

    fn id(s: &str) -> TargetIdentity {
        TargetIdentity::parse(s).unwrap()
    }

    fn node(build_always: bool) -> StagedNode {
        let mut params = serde_yaml::Mapping::new();
        if build_always {
            params.insert("build_always".into(), true.into());
        }
        StagedNode::new(Arc::new(RuleDefinition {
            identity: id("//pkg:t"),
            rule: "filegroup".to_string(),
            tags: vec![],
            params: RuleParams::new(params),
            dependencies: vec![],
            rule_file: PathBuf::from("pkg/BUILD.yaml"),
        }))
    }

    fn manifest(timestamp: u64, files: &[&str], targets: &[&str]) -> BuildManifest {
        BuildManifest {
            build_timestamp: timestamp,
            depends_on_files: files.iter().map(|f| f.to_string()).collect(),
            depends_on_targets: targets.iter().map(|t| id(t)).collect(),
            ..Default::default()
        }
    }

    fn touch(root: &std::path::Path, rel: &str, at: SystemTime) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let file = File::create(&path).unwrap();
        file.set_modified(at).unwrap();
    }

    struct TestCase {
        name: &'static str,
        force: bool,
        build_always: bool,
        attempt: u32,
        previous: Option<BuildManifest>,
        dependencies: Vec<&'static str>,
        dependency_manifests: Vec<(&'static str, u64)>,
        expect_stale: bool,
    }

    #[test]
    fn test_decisions_table() {
        let workspace = TempDir::new().unwrap();
        let base = SystemTime::UNIX_EPOCH + Duration::from_secs(1_000);
        touch(workspace.path(), "pkg/old.txt", base);
        touch(workspace.path(), "pkg/new.txt", base + Duration::from_secs(500));

        let cases = vec![
            TestCase {
                name: "no manifest",
                force: false,
                build_always: false,
                attempt: 0,
                previous: None,
                dependencies: vec![],
                dependency_manifests: vec![],
                expect_stale: true,
            },
            TestCase {
                name: "everything older",
                force: false,
                build_always: false,
                attempt: 0,
                previous: Some(manifest(1_200, &["pkg/old.txt"], &["//pkg:dep"])),
                dependencies: vec!["//pkg:dep"],
                dependency_manifests: vec![("//pkg:dep", 1_100)],
                expect_stale: false,
            },
            TestCase {
                name: "input newer than build",
                force: false,
                build_always: false,
                attempt: 0,
                previous: Some(manifest(1_200, &["pkg/new.txt"], &[])),
                dependencies: vec![],
                dependency_manifests: vec![],
                expect_stale: true,
            },
            TestCase {
                name: "input vanished",
                force: false,
                build_always: false,
                attempt: 0,
                previous: Some(manifest(1_200, &["pkg/gone.txt"], &[])),
                dependencies: vec![],
                dependency_manifests: vec![],
                expect_stale: true,
            },
            TestCase {
                name: "dependency rebuilt later",
                force: false,
                build_always: false,
                attempt: 0,
                previous: Some(manifest(1_200, &[], &["//pkg:dep"])),
                dependencies: vec!["//pkg:dep"],
                dependency_manifests: vec![("//pkg:dep", 1_201)],
                expect_stale: true,
            },
            TestCase {
                name: "dependency not previously recorded",
                force: false,
                build_always: false,
                attempt: 0,
                previous: Some(manifest(1_200, &[], &[])),
                dependencies: vec!["//pkg:dep"],
                dependency_manifests: vec![("//pkg:dep", 1_000)],
                expect_stale: true,
            },
            TestCase {
                name: "recorded dynamic dependency rebuilt",
                force: false,
                build_always: false,
                attempt: 0,
                previous: Some(manifest(1_200, &[], &["//gen:extra"])),
                dependencies: vec![],
                dependency_manifests: vec![("//gen:extra", 1_300)],
                expect_stale: true,
            },
            TestCase {
                name: "forced",
                force: true,
                build_always: false,
                attempt: 0,
                previous: Some(manifest(1_200, &[], &[])),
                dependencies: vec![],
                dependency_manifests: vec![],
                expect_stale: true,
            },
            TestCase {
                name: "build_always",
                force: false,
                build_always: true,
                attempt: 0,
                previous: Some(manifest(1_200, &[], &[])),
                dependencies: vec![],
                dependency_manifests: vec![],
                expect_stale: true,
            },
            TestCase {
                name: "rerun attempt",
                force: false,
                build_always: false,
                attempt: 1,
                previous: Some(manifest(1_200, &[], &[])),
                dependencies: vec![],
                dependency_manifests: vec![],
                expect_stale: true,
            },
        ];

        for case in cases {
            let decider = IncrementalDecider::new(workspace.path(), case.force);
            let node = node(case.build_always);
            let dependencies: BTreeSet<TargetIdentity> =
                case.dependencies.iter().map(|d| id(d)).collect();
            let dependency_manifests: BTreeMap<TargetIdentity, Arc<BuildManifest>> = case
                .dependency_manifests
                .iter()
                .map(|(d, ts)| (id(d), Arc::new(manifest(*ts, &[], &[]))))
                .collect();

            let decision = decider.needs_build(&BuildCheck {
                node: &node,
                previous: case.previous.as_ref(),
                dependencies: &dependencies,
                dependency_manifests: &dependency_manifests,
                attempt: case.attempt,
            });
            assert_eq!(
                decision.is_stale(),
                case.expect_stale,
                "case '{}' decided {:?}",
                case.name,
                decision
            );
        }
    }
}
