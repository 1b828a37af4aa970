// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::target::{RuleDefinition, TargetIdentity};

/// A rule definition whose dependencies have all been staged.
///
/// Equality and hashing use the identity only.
#[derive(Debug)]
pub struct StagedNode {
    definition: Arc<RuleDefinition>,
}

impl StagedNode {
    pub(crate) fn new(definition: Arc<RuleDefinition>) -> Self {
        Self { definition }
    }

    pub fn identity(&self) -> &TargetIdentity {
        &self.definition.identity
    }

    pub fn definition(&self) -> &Arc<RuleDefinition> {
        &self.definition
    }

    pub fn dependencies(&self) -> &[TargetIdentity] {
        &self.definition.dependencies
    }
}

impl PartialEq for StagedNode {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl Eq for StagedNode {}

impl Hash for StagedNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// Result of staging one target: the node itself plus its transitive
/// closure, dependencies before dependents.
#[derive(Debug, Clone)]
pub struct StagedSet {
    pub root: Arc<StagedNode>,
    pub nodes: Vec<Arc<StagedNode>>,
}

impl StagedSet {
    pub fn identities(&self) -> impl Iterator<Item = &TargetIdentity> {
        self.nodes.iter().map(|node| node.identity())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
