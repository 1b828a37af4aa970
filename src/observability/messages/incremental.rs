// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for skip/rebuild decisions and manifest persistence.

use crate::observability::messages::StructuredLog;
use crate::target::TargetIdentity;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::Span;

/// A target is up to date and its rule will not run.
///
/// # Log Level
/// `debug!` - Skips are only interesting when diagnosing
pub struct TargetUpToDate<'a> {
    pub target: &'a TargetIdentity,
}

impl Display for TargetUpToDate<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} is up to date", self.target)
    }
}

impl StructuredLog for TargetUpToDate<'_> {
    fn log(&self) {
        tracing::debug!(target_id = %self.target, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("up_to_date", span_name = name, target_id = %self.target)
    }
}

/// A target needs to be rebuilt.
///
/// # Log Level
/// `info!` - Operational event
///
/// # Example
/// ```
/// use the_buildwood::observability::messages::incremental::TargetStale;
/// use the_buildwood::target::TargetIdentity;
///
/// let target = TargetIdentity::parse("//lib:util").unwrap();
/// let msg = TargetStale { target: &target, reason: "no previous build" };
/// assert_eq!(msg.to_string(), "Building //lib:util: no previous build");
/// ```
pub struct TargetStale<'a> {
    pub target: &'a TargetIdentity,
    pub reason: &'a str,
}

impl Display for TargetStale<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Building {}: {}", self.target, self.reason)
    }
}

impl StructuredLog for TargetStale<'_> {
    fn log(&self) {
        tracing::info!(target_id = %self.target, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "stale",
            span_name = name,
            target_id = %self.target,
            reason = self.reason,
        )
    }
}

/// A manifest was persisted.
///
/// # Log Level
/// `debug!`
pub struct ManifestWritten<'a> {
    pub target: &'a TargetIdentity,
    pub path: &'a Path,
}

impl Display for ManifestWritten<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Wrote manifest for {} to {}", self.target, self.path.display())
    }
}

impl StructuredLog for ManifestWritten<'_> {
    fn log(&self) {
        tracing::debug!(
            target_id = %self.target,
            path = %self.path.display(),
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "manifest_written",
            span_name = name,
            target_id = %self.target,
            path = %self.path.display(),
        )
    }
}

/// A manifest was held back because the target will run again.
///
/// # Log Level
/// `debug!`
pub struct ManifestDeferred<'a> {
    pub target: &'a TargetIdentity,
}

impl Display for ManifestDeferred<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Not persisting manifest for {}: rerun requested", self.target)
    }
}

impl StructuredLog for ManifestDeferred<'_> {
    fn log(&self) {
        tracing::debug!(target_id = %self.target, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!("manifest_deferred", span_name = name, target_id = %self.target)
    }
}
