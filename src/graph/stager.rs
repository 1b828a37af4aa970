// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Resolves a requested target into a DAG of staged nodes.
//!
//! # Algorithm
//!
//! Depth-first, post-order, with three marks per identity:
//! - **Unvisited**: no entry in the mark map
//! - **In progress**: on the current traversal path (gray)
//! - **Staged**: fully resolved; the cached node is returned on every later
//!   reference, which also collapses diamond dependencies
//!
//! Meeting an in-progress identity means the graph has a cycle. The error
//! carries the in-progress stack followed by the repeated identity, so
//! `A -> B -> C -> A` reports `//a:A => //b:B => //c:C => //a:A`.
//!
//! Marks for the failed path are removed while the error unwinds, so the
//! stager stays usable after a failed `stage` call.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::errors::StagingError;
use crate::graph::{StagedNode, StagedSet};
use crate::observability::messages::staging::{CycleDetected, TargetStaged};
use crate::observability::messages::StructuredLog;
use crate::target::{TargetIdentity, TargetRegistry};

enum Mark {
    InProgress,
    Staged(Arc<StagedNode>),
}

/// Memoizing graph builder over a [`TargetRegistry`].
pub struct Stager {
    registry: TargetRegistry,
    marks: HashMap<TargetIdentity, Mark>,
    in_progress: Vec<TargetIdentity>,
}

impl Stager {
    pub fn new(registry: TargetRegistry) -> Self {
        Self {
            registry,
            marks: HashMap::new(),
            in_progress: Vec::new(),
        }
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TargetRegistry {
        &mut self.registry
    }

    /// Stage `identity` and return it with its full transitive closure.
    ///
    /// # Example
    /// ```
    /// use the_buildwood::graph::Stager;
    /// use the_buildwood::target::{TargetIdentity, TargetRegistry};
    ///
    /// let workspace = tempfile::TempDir::new().unwrap();
    /// std::fs::write(
    ///     workspace.path().join("BUILD.yaml"),
    ///     "rules:\n  - rule: filegroup\n    name: a\n  - rule: filegroup\n    name: b\n    params:\n      deps: [\":a\"]\n",
    /// ).unwrap();
    ///
    /// let mut stager = Stager::new(TargetRegistry::new(workspace.path()));
    /// let staged = stager.stage(&TargetIdentity::parse("//:b").unwrap()).unwrap();
    /// assert_eq!(staged.len(), 2);
    /// assert_eq!(staged.root.identity().name(), "b");
    /// ```
    pub fn stage(&mut self, identity: &TargetIdentity) -> Result<StagedSet, StagingError> {
        let root = self.stage_node(identity, None).inspect_err(|e| {
            if let Some(path) = e.cycle_path() {
                CycleDetected { path }.log();
            }
        })?;
        let nodes = self.closure(&root);
        Ok(StagedSet { root, nodes })
    }

    /// Staged node for `identity`, if it has been staged.
    pub fn get(&self, identity: &TargetIdentity) -> Option<Arc<StagedNode>> {
        match self.marks.get(identity) {
            Some(Mark::Staged(node)) => Some(node.clone()),
            _ => None,
        }
    }

    fn stage_node(
        &mut self,
        identity: &TargetIdentity,
        used_in: Option<&TargetIdentity>,
    ) -> Result<Arc<StagedNode>, StagingError> {
        match self.marks.get(identity) {
            Some(Mark::Staged(node)) => return Ok(node.clone()),
            Some(Mark::InProgress) => {
                let mut path = self.in_progress.clone();
                path.push(identity.clone());
                return Err(StagingError::Cycle { path });
            }
            None => {}
        }

        let definition = self.registry.lookup(identity, used_in)?;

        self.marks.insert(identity.clone(), Mark::InProgress);
        self.in_progress.push(identity.clone());

        let mut outcome = Ok(());
        for dependency in &definition.dependencies {
            if let Err(e) = self.stage_node(dependency, Some(identity)) {
                outcome = Err(e);
                break;
            }
        }

        self.in_progress.pop();
        if let Err(e) = outcome {
            self.marks.remove(identity);
            return Err(e);
        }

        let node = Arc::new(StagedNode::new(definition));
        self.marks
            .insert(identity.clone(), Mark::Staged(node.clone()));
        TargetStaged {
            target: identity,
            dependency_count: node.dependencies().len(),
        }
        .log();
        Ok(node)
    }

    /// Every staged node reachable from `root`, dependencies first.
    fn closure(&self, root: &Arc<StagedNode>) -> Vec<Arc<StagedNode>> {
        let mut seen = HashSet::new();
        let mut ordered = Vec::new();
        self.collect(root, &mut seen, &mut ordered);
        ordered
    }

    fn collect(
        &self,
        node: &Arc<StagedNode>,
        seen: &mut HashSet<TargetIdentity>,
        ordered: &mut Vec<Arc<StagedNode>>,
    ) {
        if !seen.insert(node.identity().clone()) {
            return;
        }
        for dependency in node.dependencies() {
            if let Some(child) = self.get(dependency) {
                self.collect(&child, seen, ordered);
            }
        }
        ordered.push(node.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    /// Write one rule file per package; each rule is `(name, deps)`.
    fn workspace(packages: Vec<(&str, Vec<(&str, Vec<&str>)>)>) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (package, rules) in packages {
            let mut yaml = String::from("rules:\n");
            for (name, deps) in rules {
                let quoted: Vec<String> = deps.iter().map(|d| format!("\"{}\"", d)).collect();
                yaml.push_str(&format!(
                    "  - rule: filegroup\n    name: {}\n    params:\n      deps: [{}]\n",
                    name,
                    quoted.join(", ")
                ));
            }
            let package_dir = dir.path().join(package);
            fs::create_dir_all(&package_dir).unwrap();
            fs::write(package_dir.join("BUILD.yaml"), yaml).unwrap();
        }
        dir
    }

    fn stager(root: &Path) -> Stager {
        Stager::new(TargetRegistry::new(root))
    }

    fn id(s: &str) -> TargetIdentity {
        TargetIdentity::parse(s).unwrap()
    }

    #[test]
    fn test_acyclic_graph_returns_unique_reachable_identities() {
        let ws = workspace(vec![
            ("", vec![("a", vec![]), ("b", vec![":a"]), ("c", vec![":a"]), ("d", vec![":b", ":c"]), ("unrelated", vec![])]),
        ]);
        let mut stager = stager(ws.path());
        let staged = stager.stage(&id("//:d")).unwrap();

        let names: Vec<&str> = staged.identities().map(|i| i.name()).collect();
        assert_eq!(names.len(), 4);
        let unique: HashSet<&str> = names.iter().copied().collect();
        assert_eq!(unique, HashSet::from(["a", "b", "c", "d"]));

        // Dependencies precede dependents.
        let position = |n: &str| names.iter().position(|x| *x == n).unwrap();
        assert!(position("a") < position("b"));
        assert!(position("a") < position("c"));
        assert!(position("c") < position("d"));
        assert_eq!(staged.root.identity().name(), "d");
    }

    #[test]
    fn test_two_node_cycle_path() {
        let ws = workspace(vec![("x", vec![("a", vec!["//y:b"])]), ("y", vec![("b", vec!["//x:a"])])]);
        let mut stager = stager(ws.path());
        let err = stager.stage(&id("//x:a")).unwrap_err();
        assert_eq!(
            err.cycle_path().unwrap(),
            &[id("//x:a"), id("//y:b"), id("//x:a")]
        );
        assert_eq!(err.to_string(), "Build target cycle: //x:a => //y:b => //x:a");
    }

    #[test]
    fn test_cycle_below_entry_point_reports_only_traversal() {
        let ws = workspace(vec![("", vec![("top", vec![":a"]), ("a", vec![":b"]), ("b", vec![":c"]), ("c", vec![":a"])])]);
        let mut stager = stager(ws.path());
        let err = stager.stage(&id("//:top")).unwrap_err();
        let path: Vec<String> = err.cycle_path().unwrap().iter().map(ToString::to_string).collect();
        assert_eq!(path, vec!["//:top", "//:a", "//:b", "//:c", "//:a"]);
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let ws = workspace(vec![("", vec![("me", vec![":me"])])]);
        let err = stager(ws.path()).stage(&id("//:me")).unwrap_err();
        assert_eq!(err.cycle_path().unwrap().len(), 2);
    }

    #[test]
    fn test_memoized_nodes_are_identical() {
        let ws = workspace(vec![("", vec![("a", vec![]), ("b", vec![":a"]), ("c", vec![":a"])])]);
        let mut stager = stager(ws.path());
        let from_b = stager.stage(&id("//:b")).unwrap();
        let from_c = stager.stage(&id("//:c")).unwrap();

        let a_via_b = from_b.nodes.iter().find(|n| n.identity().name() == "a").unwrap();
        let a_via_c = from_c.nodes.iter().find(|n| n.identity().name() == "a").unwrap();
        assert!(Arc::ptr_eq(a_via_b, a_via_c));
    }

    #[test]
    fn test_stager_is_usable_after_error() {
        let ws = workspace(vec![("", vec![("ok", vec![]), ("broken", vec![":ok", ":missing"])])]);
        let mut stager = stager(ws.path());

        let err = stager.stage(&id("//:broken")).unwrap_err();
        match err {
            StagingError::TargetMissing { target, used_in, .. } => {
                assert_eq!(target, id("//:missing"));
                assert_eq!(used_in, Some(id("//:broken")));
            }
            other => panic!("unexpected error: {}", other),
        }

        // The failed node was unmarked, so a retry fails the same way
        // instead of reporting a bogus cycle.
        assert!(matches!(
            stager.stage(&id("//:broken")),
            Err(StagingError::TargetMissing { .. })
        ));
        assert_eq!(stager.stage(&id("//:ok")).unwrap().len(), 1);
    }
}
