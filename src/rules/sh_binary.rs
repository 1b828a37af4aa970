// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::Context;
use async_trait::async_trait;

use crate::rules::{BinaryExport, ExecutionContext};
use crate::target::RuleParams;
use crate::traits::Rule;

/// Exports a shell script as a runnable binary.
pub struct ShBinaryRule;

#[async_trait]
impl Rule for ShBinaryRule {
    async fn execute(
        &self,
        ctx: &mut ExecutionContext,
        params: &RuleParams,
    ) -> anyhow::Result<Option<BinaryExport>> {
        let src = params
            .get_str("src")
            .context("sh_binary requires a `src` parameter")?;
        ctx.track_input_file(src)?;
        ctx.add_generated_file(src)?;

        let export = BinaryExport::file(src);
        Ok(Some(match params.get_str("binary_name") {
            Some(name) => export.named(name),
            None => export,
        }))
    }

    fn name(&self) -> &'static str {
        "sh_binary"
    }
}
