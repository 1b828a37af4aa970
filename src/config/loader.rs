// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::consts::{
    CONFIG_FILE_NAME, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_OUTPUT_DIR, FALLBACK_WORKERS,
};
use crate::errors::ConfigError;

/// Workspace configuration, read from `buildwood.yaml` at the workspace root.
///
/// Every field is optional. Command line flags override file values.
///
/// # Fields
/// * `workers` - size of the worker pool (defaults to available parallelism)
/// * `idle_timeout_seconds` - how long a worker waits for a job before
///   reporting a warning (defaults to 5)
/// * `output_dir` - workspace-relative directory for manifests, packages
///   and binaries (defaults to `GENERATED`)
/// * `force` - rebuild every target regardless of manifests
///
/// # Example
/// ```yaml
/// workers: 4
/// idle_timeout_seconds: 5
/// output_dir: GENERATED
/// force: false
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub workers: Option<usize>,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_seconds: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default)]
    pub force: bool,
}

fn default_idle_timeout() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_output_dir() -> String {
    DEFAULT_OUTPUT_DIR.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: None,
            idle_timeout_seconds: default_idle_timeout(),
            output_dir: default_output_dir(),
            force: false,
        }
    }
}

impl Config {
    /// Configured worker count, or the number of available cores.
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(FALLBACK_WORKERS)
        })
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_seconds)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == Some(0) {
            return Err(ConfigError::Invalid("workers must be at least 1".to_string()));
        }
        if self.idle_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "idle_timeout_seconds must be at least 1".to_string(),
            ));
        }
        let output = Path::new(&self.output_dir);
        if self.output_dir.is_empty() || output.is_absolute() || output.components().any(|c| c.as_os_str() == "..") {
            return Err(ConfigError::Invalid(format!(
                "output_dir `{}` must be a relative path inside the workspace",
                self.output_dir
            )));
        }
        Ok(())
    }
}

/// Load and validate a config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: Config = if contents.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?
    };
    config.validate()?;
    Ok(config)
}

/// Config of the workspace at `root`; defaults when it has no config file.
pub fn load_workspace_config(root: &Path) -> Result<Config, ConfigError> {
    let path = root.join(CONFIG_FILE_NAME);
    match fs::metadata(&path) {
        Ok(_) => load_config(&path),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Config::default()),
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

/// Pick the workspace root: an explicit path wins, then the nearest
/// ancestor of `cwd` holding a config file, then `cwd` itself.
pub fn discover_root(explicit: Option<&Path>, cwd: &Path) -> PathBuf {
    if let Some(root) = explicit {
        return root.to_path_buf();
    }
    cwd.ancestors()
        .find(|dir| dir.join(CONFIG_FILE_NAME).is_file())
        .unwrap_or(cwd)
        .to_path_buf()
}
