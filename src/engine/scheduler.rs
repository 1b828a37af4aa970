// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Build coordinator.
//!
//! The scheduler is the only owner of build bookkeeping. It stages the
//! requested target, hands ready nodes to the [`WorkerPool`] and folds every
//! worker report back into its state until nothing is waiting or in flight.
//!
//! # Node lifecycle
//!
//! ```text
//! waiting --(no remaining deps)--> in flight --Green--> completed
//!    ^                                                      |
//!    +------------------- rerun requested ------------------+
//! ```
//!
//! There is no separate pool of ready-but-undispatched nodes: a waiting node
//! whose remaining set is empty goes straight onto the shared ready queue and
//! counts as in flight from that moment. The queue itself is the READY state.
//!
//! Dependencies added by a rerun are recorded in the node's manifest. On the
//! next build they are staged again from that manifest, so editing one
//! rebuilds it and then its dependent.
//!
//! A `Fatal` report aborts the build. A `Warning` (a worker idled past its
//! timeout) is never fatal; when no waiting node is ready, the scheduler
//! drops one dependency edge that already points at a completed node. That
//! forced advance is a heuristic for lost releases. It does not detect or
//! break a real deadlock.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::engine::executor::NodeExecutor;
use crate::engine::job::{Job, JobResponse, NodeOutcome};
use crate::engine::worker::WorkerPool;
use crate::errors::{BuildError, StagingError};
use crate::graph::{GraphDelta, StagedNode, Stager};
use crate::incremental::{BuildManifest, ManifestStore};
use crate::observability::messages::engine::{
    BuildAborted, BuildCompleted, BuildStarted, ForcedAdvance, GraphExtended, RerunScheduled,
};
use crate::observability::messages::staging::GraphStaged;
use crate::observability::messages::StructuredLog;
use crate::target::TargetIdentity;

/// What a successful build did.
#[derive(Debug, Clone, Default)]
pub struct BuildSummary {
    pub target: Option<TargetIdentity>,
    /// Targets whose rule ran, in completion order.
    pub built: Vec<TargetIdentity>,
    /// Targets reused from their previous manifest.
    pub up_to_date: Vec<TargetIdentity>,
    /// Jobs dispatched, counting every rerun attempt.
    pub executions: usize,
    pub warnings: usize,
    pub forced_advances: usize,
    pub manifests: BTreeMap<TargetIdentity, Arc<BuildManifest>>,
}

impl BuildSummary {
    pub fn total(&self) -> usize {
        self.built.len() + self.up_to_date.len()
    }
}

/// Stages targets and drives them through a worker pool.
pub struct Scheduler {
    stager: Stager,
    executor: Arc<NodeExecutor>,
    workers: usize,
    idle_timeout: Duration,
}

impl Scheduler {
    pub fn new(stager: Stager, executor: Arc<NodeExecutor>, workers: usize, idle_timeout: Duration) -> Self {
        Self {
            stager,
            executor,
            workers: workers.max(1),
            idle_timeout,
        }
    }

    pub fn stager(&self) -> &Stager {
        &self.stager
    }

    pub fn executor(&self) -> &Arc<NodeExecutor> {
        &self.executor
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Build `target` and everything it depends on.
    ///
    /// Staging errors are returned before any worker starts. Any failing
    /// node aborts the whole build with [`BuildError::Fatal`].
    pub async fn build(&mut self, target: &TargetIdentity) -> Result<BuildSummary, BuildError> {
        let staged = self.stager.stage(target)?;
        GraphStaged {
            target,
            node_count: staged.len(),
        }
        .log();

        let started_at = Instant::now();
        let mut state = BuildState::default();
        state.merge_with_history(&staged.nodes, &mut self.stager, self.executor.store());

        let announce = BuildStarted {
            target,
            node_count: state.nodes.len(),
            workers: self.workers,
        };
        announce.log();
        let span = announce.span("build");

        let (responses, mut reports) = mpsc::unbounded_channel();
        let pool = WorkerPool::spawn(
            self.workers,
            self.executor.clone(),
            self.idle_timeout,
            responses,
            CancellationToken::new(),
        );

        let result = drive(&mut state, &mut self.stager, self.executor.store(), &pool, &mut reports)
            .instrument(span)
            .await;
        pool.shutdown(result.is_err()).await;

        if let Err(e) = result {
            let message = e.to_string();
            BuildAborted {
                failed: e.failed_target(),
                message: &message,
            }
            .log();
            return Err(e);
        }

        BuildCompleted {
            target,
            built: state.built.len(),
            skipped: state.up_to_date.len(),
            duration: started_at.elapsed(),
        }
        .log();

        Ok(BuildSummary {
            target: Some(target.clone()),
            built: state.built,
            up_to_date: state.up_to_date,
            executions: state.executions,
            warnings: state.warnings,
            forced_advances: state.forced_advances,
            manifests: state.manifests,
        })
    }
}

async fn drive(
    state: &mut BuildState,
    stager: &mut Stager,
    store: &ManifestStore,
    pool: &WorkerPool,
    reports: &mut mpsc::UnboundedReceiver<JobResponse>,
) -> Result<(), BuildError> {
    loop {
        for job in state.take_ready() {
            pool.dispatch(job)?;
        }
        if state.is_finished() {
            return Ok(());
        }

        match reports.recv().await.ok_or(BuildError::WorkersLost)? {
            JobResponse::Started {
                worker_id,
                target,
                attempt,
            } => {
                tracing::debug!(worker_id, target_id = %target, attempt, "job started");
            }
            JobResponse::Warning { worker_id, message } => {
                tracing::debug!(worker_id, "{}", message);
                state.warnings += 1;
                state.force_advance();
            }
            JobResponse::Green { outcome, .. } => state.complete(outcome, stager, store)?,
            JobResponse::Fatal { target, message, .. } => {
                return Err(BuildError::Fatal { target, message });
            }
        }
    }
}

#[derive(Debug)]
struct ScheduledNode {
    node: Arc<StagedNode>,
    /// Live dependency set; grows only through reruns.
    dependencies: BTreeSet<TargetIdentity>,
    remaining: BTreeSet<TargetIdentity>,
    attempts: u32,
}

#[derive(Debug, Default)]
struct BuildState {
    nodes: BTreeMap<TargetIdentity, ScheduledNode>,
    waiting: BTreeSet<TargetIdentity>,
    in_flight: BTreeSet<TargetIdentity>,
    completed: BTreeSet<TargetIdentity>,
    manifests: BTreeMap<TargetIdentity, Arc<BuildManifest>>,
    built: Vec<TargetIdentity>,
    up_to_date: Vec<TargetIdentity>,
    executions: usize,
    warnings: usize,
    forced_advances: usize,
}

impl BuildState {
    /// Add staged nodes not yet known to this build. Returns the new ones.
    fn merge(&mut self, nodes: &[Arc<StagedNode>]) -> Vec<TargetIdentity> {
        let mut added = Vec::new();
        for node in nodes {
            let id = node.identity();
            if self.nodes.contains_key(id) {
                continue;
            }
            let dependencies: BTreeSet<_> = node.dependencies().iter().cloned().collect();
            let remaining = dependencies.difference(&self.completed).cloned().collect();
            self.nodes.insert(
                id.clone(),
                ScheduledNode {
                    node: node.clone(),
                    dependencies,
                    remaining,
                    attempts: 0,
                },
            );
            self.waiting.insert(id.clone());
            added.push(id.clone());
        }
        added
    }

    /// Merge `nodes`, then give every new node the dependencies its stored
    /// manifest recorded beyond the declared ones, staging them as needed.
    /// Returns how many nodes were added.
    fn merge_with_history(&mut self, nodes: &[Arc<StagedNode>], stager: &mut Stager, store: &ManifestStore) -> usize {
        let mut pending = self.merge(nodes);
        let mut added = pending.len();

        while let Some(id) = pending.pop() {
            let Ok(Some(previous)) = store.load(&id) else {
                continue;
            };
            let recorded: Vec<TargetIdentity> = match self.nodes.get(&id) {
                Some(node) => previous.depends_on_targets.difference(&node.dependencies).cloned().collect(),
                None => continue,
            };

            for dependency in recorded {
                let staged = match stager.stage(&dependency) {
                    Ok(staged) => staged,
                    Err(e) => {
                        tracing::debug!(target_id = %id, dependency = %dependency, "recorded dependency dropped: {}", e);
                        continue;
                    }
                };
                let merged = self.merge(&staged.nodes);
                added += merged.len();
                pending.extend(merged);

                if self.path_between(&dependency, &id).is_some() {
                    tracing::debug!(target_id = %id, dependency = %dependency, "recorded dependency would close a cycle");
                    continue;
                }
                if let Some(node) = self.nodes.get_mut(&id) {
                    node.dependencies.insert(dependency.clone());
                    if !self.completed.contains(&dependency) {
                        node.remaining.insert(dependency);
                    }
                }
            }
        }
        added
    }

    fn is_finished(&self) -> bool {
        self.waiting.is_empty() && self.in_flight.is_empty()
    }

    /// Move every ready waiting node in flight and return its job.
    fn take_ready(&mut self) -> Vec<Job> {
        let ready: Vec<TargetIdentity> = self
            .waiting
            .iter()
            .filter(|id| self.nodes.get(*id).is_some_and(|n| n.remaining.is_empty()))
            .cloned()
            .collect();

        let mut jobs = Vec::with_capacity(ready.len());
        for id in ready {
            self.waiting.remove(&id);
            let Some(scheduled) = self.nodes.get(&id) else {
                continue;
            };
            let dependency_manifests = scheduled
                .dependencies
                .iter()
                .filter_map(|dep| self.manifests.get(dep).map(|m| (dep.clone(), m.clone())))
                .collect();
            jobs.push(Job {
                node: scheduled.node.clone(),
                dependencies: scheduled.dependencies.clone(),
                dependency_manifests,
                attempt: scheduled.attempts,
            });
            self.in_flight.insert(id);
        }
        self.executions += jobs.len();
        jobs
    }

    fn complete(&mut self, outcome: NodeOutcome, stager: &mut Stager, store: &ManifestStore) -> Result<(), BuildError> {
        let id = outcome.target;
        self.in_flight.remove(&id);
        self.completed.insert(id.clone());

        if let Some(delta) = outcome.delta {
            if self.absorb(&id, delta, stager, store)? {
                return Ok(());
            }
        }

        if outcome.built {
            self.built.push(id.clone());
        } else {
            self.up_to_date.push(id.clone());
        }
        self.manifests.insert(id.clone(), outcome.manifest);
        for node in self.nodes.values_mut() {
            node.remaining.remove(&id);
        }
        Ok(())
    }

    /// Fold a graph delta produced by `id` into the build. Returns true when
    /// `id` was sent back to waiting for a rerun.
    fn absorb(
        &mut self,
        id: &TargetIdentity,
        delta: GraphDelta,
        stager: &mut Stager,
        store: &ManifestStore,
    ) -> Result<bool, BuildError> {
        for definition in delta.definitions.iter().cloned() {
            stager.registry_mut().register(definition);
        }

        let fresh = match self.nodes.get(id) {
            Some(node) => delta.new_dependencies(&node.dependencies),
            None => BTreeSet::new(),
        };
        let rerun = !fresh.is_empty();
        if rerun {
            self.completed.remove(id);
        }

        let mut added = 0;
        for target in delta.targets_to_stage() {
            let staged = stager.stage(&target)?;
            added += self.merge_with_history(&staged.nodes, stager, store);
        }
        if added > 0 {
            GraphExtended { from: id, added }.log();
        }

        if !rerun {
            return Ok(false);
        }

        for dependency in &fresh {
            if let Some(path) = self.path_between(dependency, id) {
                let mut cycle = vec![id.clone()];
                cycle.extend(path);
                return Err(StagingError::Cycle { path: cycle }.into());
            }
        }

        let completed = &self.completed;
        let Some(node) = self.nodes.get_mut(id) else {
            return Ok(false);
        };
        node.dependencies.extend(fresh.iter().cloned());
        node.remaining = fresh.difference(completed).cloned().collect();
        node.attempts += 1;
        let waiting_on: Vec<TargetIdentity> = node.remaining.iter().cloned().collect();
        RerunScheduled {
            target: id,
            attempt: node.attempts,
            waiting_on: &waiting_on,
        }
        .log();
        self.waiting.insert(id.clone());
        Ok(true)
    }

    /// Dependency path from `from` to `to`, both ends included.
    fn path_between(&self, from: &TargetIdentity, to: &TargetIdentity) -> Option<Vec<TargetIdentity>> {
        let mut visited = BTreeSet::new();
        let mut path = Vec::new();
        self.search(from, to, &mut visited, &mut path).then_some(path)
    }

    fn search(
        &self,
        current: &TargetIdentity,
        goal: &TargetIdentity,
        visited: &mut BTreeSet<TargetIdentity>,
        path: &mut Vec<TargetIdentity>,
    ) -> bool {
        path.push(current.clone());
        if current == goal {
            return true;
        }
        if visited.insert(current.clone()) {
            if let Some(node) = self.nodes.get(current) {
                for next in &node.dependencies {
                    if self.search(next, goal, visited, path) {
                        return true;
                    }
                }
            }
        }
        path.pop();
        false
    }

    /// Discard one stale edge when no waiting node is ready.
    fn force_advance(&mut self) {
        let stuck = !self.waiting.is_empty()
            && self
                .waiting
                .iter()
                .all(|id| self.nodes.get(id).map_or(true, |n| !n.remaining.is_empty()));
        if !stuck {
            return;
        }

        for id in &self.waiting {
            let Some(node) = self.nodes.get_mut(id) else {
                continue;
            };
            let Some(stale) = node.remaining.iter().find(|dep| self.completed.contains(*dep)).cloned() else {
                continue;
            };
            node.remaining.remove(&stale);
            ForcedAdvance {
                target: id,
                discarded: &stale,
            }
            .log();
            self.forced_advances += 1;
            return;
        }
    }
}
