// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the worker pool.

use crate::observability::messages::StructuredLog;
use crate::target::TargetIdentity;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A worker waited the full idle timeout without receiving a job.
///
/// # Log Level
/// `warn!` - Recoverable, reported to the scheduler
pub struct WorkerIdle {
    pub worker_id: usize,
    pub waited: Duration,
}

impl Display for WorkerIdle {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker {} idle for {:?} waiting on the ready queue",
            self.worker_id, self.waited
        )
    }
}

impl StructuredLog for WorkerIdle {
    fn log(&self) {
        tracing::warn!(
            worker_id = self.worker_id,
            waited_ms = self.waited.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "worker_idle",
            span_name = name,
            worker_id = self.worker_id,
            waited = ?self.waited,
        )
    }
}

/// A worker picked up a job.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct JobStarted<'a> {
    pub worker_id: usize,
    pub target: &'a TargetIdentity,
    pub attempt: u32,
}

impl Display for JobStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker {} started {} (attempt {})",
            self.worker_id, self.target, self.attempt
        )
    }
}

impl StructuredLog for JobStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            worker_id = self.worker_id,
            target_id = %self.target,
            attempt = self.attempt,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "job",
            span_name = name,
            worker_id = self.worker_id,
            target_id = %self.target,
            attempt = self.attempt,
        )
    }
}

/// A job failed and the worker is reporting it as fatal.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct JobFailed<'a> {
    pub worker_id: usize,
    pub target: &'a TargetIdentity,
    pub error: &'a dyn std::error::Error,
}

impl Display for JobFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Worker {} failed {}: {}",
            self.worker_id, self.target, self.error
        )
    }
}

impl StructuredLog for JobFailed<'_> {
    fn log(&self) {
        tracing::error!(
            worker_id = self.worker_id,
            target_id = %self.target,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::span!(
            tracing::Level::ERROR,
            "job_failed",
            span_name = name,
            worker_id = self.worker_id,
            target_id = %self.target,
            error = %self.error,
        )
    }
}

/// A worker loop exited.
///
/// # Log Level
/// `trace!`
pub struct WorkerStopped<'a> {
    pub worker_id: usize,
    pub reason: &'a str,
}

impl Display for WorkerStopped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Worker {} stopped: {}", self.worker_id, self.reason)
    }
}

impl StructuredLog for WorkerStopped<'_> {
    fn log(&self) {
        tracing::trace!(worker_id = self.worker_id, reason = self.reason, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "worker_stopped",
            span_name = name,
            worker_id = self.worker_id,
            reason = self.reason,
        )
    }
}
