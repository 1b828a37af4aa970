// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod rule;
pub mod sandbox;

pub use rule::Rule;
pub use sandbox::{Sandbox, SandboxFactory, SandboxInput};
