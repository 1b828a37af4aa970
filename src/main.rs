// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod cli;

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use crate::cli::{BuildArgs, Cli, Command};
use the_buildwood::config::{discover_root, load_workspace_config, Config, OutputLayout, RuntimeBuilder};
use the_buildwood::observability::init_tracing;
use the_buildwood::target::TargetIdentity;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir().context("cannot determine the current directory")?;
    let root = discover_root(cli.root.as_deref(), &cwd);
    let config = load_workspace_config(&root)?;

    match cli.command {
        Command::Build(args) => build(&root, &cwd, config, args).await,
        Command::Clean => clean(&root, &config),
    }
}

async fn build(root: &Path, cwd: &Path, config: Config, args: BuildArgs) -> anyhow::Result<()> {
    // `:name` resolves against the package the command runs in.
    let package = cwd
        .strip_prefix(root)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_default();
    let target = TargetIdentity::resolve(&args.target, &package)?;

    let mut scheduler = RuntimeBuilder::new(root, config)
        .workers(args.jobs)
        .force(args.force)
        .build()?;

    let summary = scheduler.build(&target).await?;
    println!(
        "{}: {} built, {} up to date",
        target,
        summary.built.len(),
        summary.up_to_date.len()
    );
    Ok(())
}

fn clean(root: &Path, config: &Config) -> anyhow::Result<()> {
    config.validate()?;
    let layout = OutputLayout::new(root, &config.output_dir);
    match fs::remove_dir_all(layout.output_dir()) {
        Ok(()) => {
            println!("removed {}", layout.output_dir().display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", layout.output_dir().display())),
    }
}
