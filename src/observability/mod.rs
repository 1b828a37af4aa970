// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! All diagnostic and operational log lines come from message types in
//! [`messages`]. Each one implements `Display` for the text of the line and
//! [`messages::StructuredLog`] to emit it with typed fields at the right
//! level, so call sites never carry format strings.
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - build lifecycle and scheduler decisions
//! * `messages::staging` - rule file loading and graph staging
//! * `messages::worker` - worker pool lifecycle and job execution
//! * `messages::incremental` - skip/rebuild decisions and manifests
//!
//! [`init_tracing`] installs the `tracing-subscriber` formatter used by the
//! `buildwood` binary.

pub mod messages;

use tracing_subscriber::EnvFilter;

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is `info`, or `debug` when
/// `verbose` is true. Calling this twice is harmless.
pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
