// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the build lifecycle and scheduler decisions.
//!
//! This module contains message types for logging events related to:
//! * Build start, completion and abort
//! * Dynamic graph growth and rerun scheduling
//! * Forced advances after idle warnings

use crate::observability::messages::StructuredLog;
use crate::target::TargetIdentity;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// Build started for a requested target.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_buildwood::observability::messages::engine::BuildStarted;
/// use the_buildwood::target::TargetIdentity;
///
/// let target = TargetIdentity::parse("//app:main").unwrap();
/// let msg = BuildStarted {
///     target: &target,
///     node_count: 5,
///     workers: 4,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct BuildStarted<'a> {
    pub target: &'a TargetIdentity,
    pub node_count: usize,
    pub workers: usize,
}

impl Display for BuildStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Building {}: {} targets, {} workers",
            self.target, self.node_count, self.workers
        )
    }
}

impl StructuredLog for BuildStarted<'_> {
    fn log(&self) {
        tracing::info!(
            target_id = %self.target,
            node_count = self.node_count,
            workers = self.workers,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "build",
            span_name = name,
            target_id = %self.target,
            node_count = self.node_count,
            workers = self.workers,
        )
    }
}

/// Build finished with every node completed.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use the_buildwood::observability::messages::engine::BuildCompleted;
/// use the_buildwood::target::TargetIdentity;
/// use std::time::Duration;
///
/// let target = TargetIdentity::parse("//app:main").unwrap();
/// let msg = BuildCompleted {
///     target: &target,
///     built: 3,
///     skipped: 2,
///     duration: Duration::from_millis(250),
/// };
///
/// assert!(msg.to_string().contains("3 built"));
/// ```
pub struct BuildCompleted<'a> {
    pub target: &'a TargetIdentity,
    pub built: usize,
    pub skipped: usize,
    pub duration: Duration,
}

impl Display for BuildCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Built {}: {} built, {} up to date in {:?}",
            self.target, self.built, self.skipped, self.duration
        )
    }
}

impl StructuredLog for BuildCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            target_id = %self.target,
            built = self.built,
            skipped = self.skipped,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "build_completed",
            span_name = name,
            target_id = %self.target,
            built = self.built,
            skipped = self.skipped,
            duration = ?self.duration,
        )
    }
}

/// Build aborted after a fatal worker response.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct BuildAborted<'a> {
    pub failed: Option<&'a TargetIdentity>,
    pub message: &'a str,
}

impl Display for BuildAborted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.failed {
            Some(target) => write!(f, "Build aborted by {}: {}", target, self.message),
            None => write!(f, "Build aborted: {}", self.message),
        }
    }
}

impl StructuredLog for BuildAborted<'_> {
    fn log(&self) {
        tracing::error!(
            failed = ?self.failed.map(ToString::to_string),
            error = self.message,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "build_aborted",
            span_name = name,
            failed = ?self.failed.map(ToString::to_string),
            error = self.message,
        )
    }
}

/// A node's execution added new nodes to the live graph.
///
/// # Log Level
/// `info!` - Graph changed while running
pub struct GraphExtended<'a> {
    pub from: &'a TargetIdentity,
    pub added: usize,
}

impl Display for GraphExtended<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} added {} targets to the build", self.from, self.added)
    }
}

impl StructuredLog for GraphExtended<'_> {
    fn log(&self) {
        tracing::info!(from = %self.from, added = self.added, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "graph_extended",
            span_name = name,
            from = %self.from,
            added = self.added,
        )
    }
}

/// A node asked to run again once new dependencies complete.
///
/// # Log Level
/// `info!` - Graph changed while running
pub struct RerunScheduled<'a> {
    pub target: &'a TargetIdentity,
    pub attempt: u32,
    pub waiting_on: &'a [TargetIdentity],
}

impl RerunScheduled<'_> {
    fn waiting_list(&self) -> String {
        self.waiting_on
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Display for RerunScheduled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} will rerun (attempt {}) after {}",
            self.target,
            self.attempt,
            self.waiting_list()
        )
    }
}

impl StructuredLog for RerunScheduled<'_> {
    fn log(&self) {
        tracing::info!(
            target_id = %self.target,
            attempt = self.attempt,
            waiting_on = %self.waiting_list(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "rerun",
            span_name = name,
            target_id = %self.target,
            attempt = self.attempt,
        )
    }
}

/// An idle warning let the scheduler drop an edge to a completed node.
///
/// # Log Level
/// `warn!` - Recovery heuristic fired
pub struct ForcedAdvance<'a> {
    pub target: &'a TargetIdentity,
    pub discarded: &'a TargetIdentity,
}

impl Display for ForcedAdvance<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Forced advance: {} no longer waits on completed {}",
            self.target, self.discarded
        )
    }
}

impl StructuredLog for ForcedAdvance<'_> {
    fn log(&self) {
        tracing::warn!(
            target_id = %self.target,
            discarded = %self.discarded,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "forced_advance",
            span_name = name,
            target_id = %self.target,
            discarded = %self.discarded,
        )
    }
}
