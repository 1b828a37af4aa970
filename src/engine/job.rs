// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Messages exchanged between the scheduler and its workers.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::graph::{GraphDelta, StagedNode};
use crate::incremental::BuildManifest;
use crate::target::TargetIdentity;

/// One node ready to execute.
#[derive(Debug, Clone)]
pub struct Job {
    pub node: Arc<StagedNode>,
    /// Live dependency set, including dependencies added by reruns.
    pub dependencies: BTreeSet<TargetIdentity>,
    /// Manifests of `dependencies` as recorded when they completed.
    pub dependency_manifests: BTreeMap<TargetIdentity, Arc<BuildManifest>>,
    /// Execution attempt; non-zero after a rerun request.
    pub attempt: u32,
}

impl Job {
    pub fn target(&self) -> &TargetIdentity {
        self.node.identity()
    }
}

/// Ready queue entry.
#[derive(Debug)]
pub(crate) enum WorkItem {
    Build(Job),
    Poison,
}

/// Result of executing one node successfully.
#[derive(Debug, Clone)]
pub struct NodeOutcome {
    pub target: TargetIdentity,
    pub manifest: Arc<BuildManifest>,
    /// False when the previous build was up to date and the rule did not run.
    pub built: bool,
    pub delta: Option<GraphDelta>,
}

/// Leveled report from a worker to the scheduler.
#[derive(Debug)]
pub enum JobResponse {
    /// A job began executing.
    Started {
        worker_id: usize,
        target: TargetIdentity,
        attempt: u32,
    },
    /// A worker waited out its idle timeout. Never fatal.
    Warning { worker_id: usize, message: String },
    Green { worker_id: usize, outcome: NodeOutcome },
    /// The job failed; the build must abort.
    Fatal {
        worker_id: usize,
        target: Option<TargetIdentity>,
        message: String,
    },
}
