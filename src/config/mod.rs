// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod layout;
mod loader;
mod runtime;

pub mod consts;

pub use layout::OutputLayout;
pub use loader::{discover_root, load_config, load_workspace_config, Config};
pub use runtime::RuntimeBuilder;
