// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use anyhow::Context;
use async_trait::async_trait;

use crate::rules::{BinaryExport, ExecutionContext};
use crate::target::{RuleParams, TargetIdentity};
use crate::traits::Rule;

/// Runs a shell command that turns `srcs` into `outs`.
///
/// The command runs in the package directory with these variables set:
/// * `SRCS` - space separated sandbox paths of every source, including the
///   outputs of referenced targets
/// * `OUTS` - space separated sandbox paths of the declared outputs
/// * `WORKDIR` - sandbox root
///
/// ```yaml
/// - rule: genrule
///   name: shout
///   params:
///     srcs: [":greeting"]
///     outs: [shout.txt]
///     cmd: "tr a-z A-Z < $SRCS > $OUTS"
/// ```
pub struct GenRule;

#[async_trait]
impl Rule for GenRule {
    async fn execute(
        &self,
        ctx: &mut ExecutionContext,
        params: &RuleParams,
    ) -> anyhow::Result<Option<BinaryExport>> {
        let cmd = params
            .get_str("cmd")
            .context("genrule requires a `cmd` parameter")?;
        let outs = params.get_string_list("outs");

        let mut srcs = Vec::new();
        for entry in params.get_string_list("srcs") {
            if TargetIdentity::is_reference(&entry) {
                let dependency = ctx.resolve(&entry)?;
                srcs.extend(ctx.dependency_outputs(&dependency));
            } else {
                ctx.track_input_file(&entry)?;
                srcs.push(ctx.package_dir().join(&entry));
            }
        }

        let package = ctx.package_dir();
        for out in &outs {
            if let Some(parent) = package.join(out).parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let join = |paths: Vec<std::path::PathBuf>| {
            paths
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(" ")
        };
        let env = [
            ("SRCS", join(srcs)),
            ("OUTS", join(outs.iter().map(|o| package.join(o)).collect())),
            ("WORKDIR", ctx.workdir().display().to_string()),
        ];
        ctx.run_command(cmd, &env).await?;

        for out in &outs {
            ctx.add_generated_file(out)?;
        }
        Ok(None)
    }

    fn name(&self) -> &'static str {
        "genrule"
    }
}
