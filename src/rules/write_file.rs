// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::Context;
use async_trait::async_trait;

use crate::rules::{BinaryExport, ExecutionContext};
use crate::target::RuleParams;
use crate::traits::Rule;

/// Writes `content` to `out`.
///
/// ```yaml
/// - rule: write_file
///   name: greeting
///   params:
///     out: greeting.txt
///     content: "hello"
/// ```
pub struct WriteFileRule;

#[async_trait]
impl Rule for WriteFileRule {
    async fn execute(
        &self,
        ctx: &mut ExecutionContext,
        params: &RuleParams,
    ) -> anyhow::Result<Option<BinaryExport>> {
        let out = params
            .get_str("out")
            .context("write_file requires an `out` parameter")?;
        let content = params.get_str("content").unwrap_or_default();

        let path = ctx.package_dir().join(out);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("writing {}", path.display()))?;

        ctx.add_generated_file(out)?;
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "write_file"
    }
}
