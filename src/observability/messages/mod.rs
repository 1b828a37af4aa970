// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! [`StructuredLog`] to emit itself at its own level with typed fields.
//!
//! # Organization
//!
//! * `engine` - build lifecycle and scheduler decisions
//! * `staging` - rule file loading and graph staging
//! * `worker` - worker pool lifecycle and job execution
//! * `incremental` - skip/rebuild decisions and manifest persistence
//!
//! # Usage Pattern
//!
//! ```rust
//! use the_buildwood::observability::messages::engine::BuildStarted;
//! use the_buildwood::observability::messages::StructuredLog;
//! use the_buildwood::target::TargetIdentity;
//!
//! let target = TargetIdentity::parse("//app:main").unwrap();
//! let msg = BuildStarted {
//!     target: &target,
//!     node_count: 5,
//!     workers: 4,
//! };
//!
//! msg.log();
//! tracing::info!("{}", msg);
//! ```

use tracing::Span;

pub mod engine;
pub mod incremental;
pub mod staging;
pub mod worker;

/// A message that knows its own log level and structured fields.
pub trait StructuredLog {
    /// Emit the message as a tracing event.
    fn log(&self);

    /// Open a span carrying the message's fields.
    fn span(&self, name: &str) -> Span;
}
