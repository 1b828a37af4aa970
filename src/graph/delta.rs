// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::BTreeSet;

use crate::target::{RuleDefinition, TargetIdentity};

/// Graph mutation requested by one node's execution.
///
/// `definitions` are rule definitions created at execution time (for
/// example by a macro expansion) and must be registered before `added` is
/// staged. `rerun_with` asks for the executing node to run again once the
/// listed targets have completed.
#[derive(Debug, Clone, Default)]
pub struct GraphDelta {
    pub definitions: Vec<RuleDefinition>,
    pub added: BTreeSet<TargetIdentity>,
    pub rerun_with: BTreeSet<TargetIdentity>,
}

impl GraphDelta {
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty() && self.added.is_empty() && self.rerun_with.is_empty()
    }

    /// Requested rerun dependencies that are not in `known`. The node only
    /// reruns when this is non-empty.
    pub fn new_dependencies(&self, known: &BTreeSet<TargetIdentity>) -> BTreeSet<TargetIdentity> {
        self.rerun_with.difference(known).cloned().collect()
    }

    pub fn requests_rerun(&self, known: &BTreeSet<TargetIdentity>) -> bool {
        self.rerun_with.iter().any(|target| !known.contains(target))
    }

    /// Every identity the scheduler must stage for this delta.
    pub fn targets_to_stage(&self) -> BTreeSet<TargetIdentity> {
        self.added.union(&self.rerun_with).cloned().collect()
    }
}
