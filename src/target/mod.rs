// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Target data model: identities, parsed rule definitions and the registry
//! that loads them from `BUILD.yaml` files.

mod definition;
mod identity;
mod registry;

pub use definition::{extract_dependencies, RuleDefinition, RuleEntry, RuleFile, RuleParams};
pub use identity::TargetIdentity;
pub use registry::TargetRegistry;
