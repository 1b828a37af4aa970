// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Rule execution context, the static rule registry and the built-in rules.
//!
//! | rule         | outputs                                  |
//! |--------------|------------------------------------------|
//! | `filegroup`  | the listed `srcs` and `data` files       |
//! | `write_file` | one file with literal content            |
//! | `genrule`    | `outs`, produced by a shell command      |
//! | `sh_binary`  | the script, exported as a binary         |

mod context;
mod filegroup;
mod genrule;
mod registry;
mod sh_binary;
mod write_file;

pub use context::{BinaryExport, ExecutionContext};
pub(crate) use context::ExecutionRecord;
pub use filegroup::FileGroupRule;
pub use genrule::GenRule;
pub use registry::RuleRegistry;
pub use sh_binary::ShBinaryRule;
pub use write_file::WriteFileRule;
