// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;         // workspace config + runtime assembly
pub mod engine;         // scheduler, workers, node execution
pub mod errors;         // error handling
pub mod graph;          // staging and cycle detection
pub mod incremental;    // manifests and rebuild decisions
pub mod observability;
pub mod rules;          // rule registry + built-in rules
pub mod sandbox;        // default scratch-directory sandbox
pub mod target;         // identities, rule files, target registry
pub mod traits;         // rule and sandbox abstractions
