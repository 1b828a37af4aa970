// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use async_trait::async_trait;

use crate::rules::{BinaryExport, ExecutionContext};
use crate::target::RuleParams;
use crate::traits::Rule;

/// Publishes the files listed in `srcs` and `data` as outputs.
pub struct FileGroupRule;

#[async_trait]
impl Rule for FileGroupRule {
    async fn execute(
        &self,
        ctx: &mut ExecutionContext,
        params: &RuleParams,
    ) -> anyhow::Result<Option<BinaryExport>> {
        for file in params
            .file_entries("srcs")
            .into_iter()
            .chain(params.file_entries("data"))
        {
            ctx.track_input_file(&file)?;
            ctx.add_generated_file(&file)?;
        }
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "filegroup"
    }
}
