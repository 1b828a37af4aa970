// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Concurrent, incremental execution of a staged build graph.
//!
//! * [`Scheduler`] - single coordinator owning all build bookkeeping
//! * `worker` - fixed pool of watchdog tasks pulling from a shared ready queue
//! * [`NodeExecutor`] - per-node decide, sandbox, run and record

mod executor;
mod job;
mod scheduler;
mod worker;


pub use executor::NodeExecutor;
pub use job::{Job, JobResponse, NodeOutcome};
pub use scheduler::{BuildSummary, Scheduler};
