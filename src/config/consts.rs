// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

/// Name of the rule file in each package directory
pub const RULE_FILE_NAME: &str = "BUILD.yaml";
/// Name of the optional workspace configuration file
pub const CONFIG_FILE_NAME: &str = "buildwood.yaml";
/// Environment variable that overrides workspace root discovery
pub const ROOT_ENV_VAR: &str = "BUILDWOOD_ROOT";

/// Default output directory, relative to the workspace root
pub const DEFAULT_OUTPUT_DIR: &str = "GENERATED";
/// Seconds a worker waits on the ready queue before reporting a warning
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 5;
/// Worker count used when available parallelism cannot be detected
pub const FALLBACK_WORKERS: usize = 4;

pub const MANIFESTS_DIR: &str = "MANIFESTS";
pub const PACKAGES_DIR: &str = "PACKAGES";
pub const BINARIES_DIR: &str = "BINARIES";

/// Rule parameter that forces a rebuild on every invocation
pub const BUILD_ALWAYS_PARAM: &str = "build_always";
/// Rule parameter whose entries must all be target references
pub const DEPS_PARAM: &str = "deps";
