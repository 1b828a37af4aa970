// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Timestamp-based incremental builds: manifests, the clock that stamps
//! them, and the decider that compares them.

pub mod clock;
mod decider;
mod manifest;

pub use clock::{Clock, SystemClock, TickClock};
pub use decider::{BuildCheck, Decision, IncrementalDecider};
pub use manifest::{BuildManifest, ManifestStore};
