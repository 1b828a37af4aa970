// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod delta;
mod staged;
mod stager;

pub use delta::GraphDelta;
pub use staged::{StagedNode, StagedSet};
pub use stager::Stager;
