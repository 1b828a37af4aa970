// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::rules::{BinaryExport, ExecutionContext};
use crate::target::RuleParams;

/// A build rule: turns a target's declared parameters into outputs.
///
/// Rules run inside a sandbox working directory reachable through the
/// context. They report inputs with `track_input_file`, outputs with
/// `add_generated_file`, and may grow the graph or ask to run again.
#[async_trait]
pub trait Rule: Send + Sync {
    async fn execute(
        &self,
        ctx: &mut ExecutionContext,
        params: &RuleParams,
    ) -> anyhow::Result<Option<BinaryExport>>;

    fn name(&self) -> &'static str;

    /// Binary rules must return an exporter.
    fn is_binary(&self) -> bool {
        self.name().ends_with("_binary") || self.name().ends_with("_test")
    }
}
