// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for rule file loading and graph staging.

use crate::observability::messages::StructuredLog;
use crate::target::TargetIdentity;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::Span;

/// A rule file was read and parsed.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct RuleFileLoaded<'a> {
    pub path: &'a Path,
    pub rule_count: usize,
}

impl Display for RuleFileLoaded<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Loaded rule file {} ({} rules)",
            self.path.display(),
            self.rule_count
        )
    }
}

impl StructuredLog for RuleFileLoaded<'_> {
    fn log(&self) {
        tracing::debug!(
            path = %self.path.display(),
            rule_count = self.rule_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "rule_file",
            span_name = name,
            path = %self.path.display(),
            rule_count = self.rule_count,
        )
    }
}

/// A target and all of its dependencies were staged.
///
/// # Log Level
/// `trace!` - One event per node
pub struct TargetStaged<'a> {
    pub target: &'a TargetIdentity,
    pub dependency_count: usize,
}

impl Display for TargetStaged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Staged {} with {} dependencies",
            self.target, self.dependency_count
        )
    }
}

impl StructuredLog for TargetStaged<'_> {
    fn log(&self) {
        tracing::trace!(
            target_id = %self.target,
            dependency_count = self.dependency_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "staged",
            span_name = name,
            target_id = %self.target,
            dependency_count = self.dependency_count,
        )
    }
}

/// Staging found a dependency cycle.
///
/// # Log Level
/// `error!` - Build cannot proceed
///
/// # Example
/// ```
/// use the_buildwood::observability::messages::staging::CycleDetected;
/// use the_buildwood::target::TargetIdentity;
///
/// let a = TargetIdentity::parse("//a:x").unwrap();
/// let b = TargetIdentity::parse("//b:y").unwrap();
/// let path = vec![a.clone(), b, a];
/// let msg = CycleDetected { path: &path };
///
/// assert_eq!(msg.to_string(), "Build target cycle: //a:x => //b:y => //a:x");
/// ```
pub struct CycleDetected<'a> {
    pub path: &'a [TargetIdentity],
}

impl CycleDetected<'_> {
    fn joined(&self) -> String {
        self.path
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" => ")
    }
}

impl Display for CycleDetected<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Build target cycle: {}", self.joined())
    }
}

impl StructuredLog for CycleDetected<'_> {
    fn log(&self) {
        tracing::error!(
            cycle = %self.joined(),
            cycle_length = self.path.len(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "cycle",
            span_name = name,
            cycle = %self.joined(),
            cycle_length = self.path.len(),
        )
    }
}

/// A requested target's graph is ready for scheduling.
///
/// # Log Level
/// `info!` - Important operational event
pub struct GraphStaged<'a> {
    pub target: &'a TargetIdentity,
    pub node_count: usize,
}

impl Display for GraphStaged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Staged {} targets for {}", self.node_count, self.target)
    }
}

impl StructuredLog for GraphStaged<'_> {
    fn log(&self) {
        tracing::info!(
            target_id = %self.target,
            node_count = self.node_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "graph",
            span_name = name,
            target_id = %self.target,
            node_count = self.node_count,
        )
    }
}
