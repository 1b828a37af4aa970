// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Command-line interface definitions for buildwood.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use the_buildwood::config::consts::ROOT_ENV_VAR;

/// Incremental, parallel build tool driven by BUILD.yaml files.
#[derive(Parser)]
#[command(name = "buildwood", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Workspace root (defaults to the nearest ancestor holding buildwood.yaml).
    #[arg(long, global = true, env = ROOT_ENV_VAR)]
    pub root: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a target and everything it depends on.
    Build(BuildArgs),
    /// Remove the output directory.
    Clean,
}

/// Arguments for the `build` subcommand.
#[derive(Parser)]
pub struct BuildArgs {
    /// Target to build, `//path/to/package:name` or `:name` in the current package.
    pub target: String,

    /// Maximum number of parallel workers (defaults to the CPU count).
    #[arg(long, short = 'j')]
    pub jobs: Option<usize>,

    /// Rebuild every target, ignoring manifests.
    #[arg(long, short = 'f')]
    pub force: bool,
}
