// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{Config, OutputLayout};
use crate::engine::{NodeExecutor, Scheduler};
use crate::errors::ConfigError;
use crate::graph::Stager;
use crate::incremental::{Clock, SystemClock};
use crate::rules::RuleRegistry;
use crate::sandbox::CopySandboxFactory;
use crate::target::TargetRegistry;
use crate::traits::{Rule, SandboxFactory};

/// Build runtime builder - assembles the target registry, stager, rule
/// registry and scheduler for one workspace.
///
/// Values come from the workspace [`Config`]; the `with_*` methods and the
/// command line overrides replace them.
///
/// # Examples
///
/// ```
/// use the_buildwood::config::{Config, RuntimeBuilder};
///
/// let scheduler = RuntimeBuilder::new("/tmp/workspace", Config::default())
///     .workers(Some(2))
///     .force(true)
///     .build()
///     .unwrap();
///
/// assert_eq!(scheduler.workers(), 2);
/// ```
pub struct RuntimeBuilder {
    root: PathBuf,
    config: Config,
    rules: RuleRegistry,
    clock: Arc<dyn Clock>,
    sandboxes: Arc<dyn SandboxFactory>,
}

impl RuntimeBuilder {
    pub fn new(root: impl Into<PathBuf>, config: Config) -> Self {
        Self {
            root: root.into(),
            config,
            rules: RuleRegistry::with_builtins(),
            clock: Arc::new(SystemClock),
            sandboxes: Arc::new(CopySandboxFactory),
        }
    }

    /// Replace the whole rule registry.
    pub fn with_rules(mut self, rules: RuleRegistry) -> Self {
        self.rules = rules;
        self
    }

    /// Add one rule next to the built-ins.
    pub fn with_rule(mut self, rule: Arc<dyn Rule>) -> Self {
        self.rules.register(rule);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sandbox(mut self, sandboxes: Arc<dyn SandboxFactory>) -> Self {
        self.sandboxes = sandboxes;
        self
    }

    /// Force a rebuild; `false` keeps the configured value.
    pub fn force(mut self, force: bool) -> Self {
        self.config.force |= force;
        self
    }

    /// Override the worker count; `None` keeps the configured value.
    pub fn workers(mut self, workers: Option<usize>) -> Self {
        if workers.is_some() {
            self.config.workers = workers;
        }
        self
    }

    pub fn idle_timeout_seconds(mut self, seconds: u64) -> Self {
        self.config.idle_timeout_seconds = seconds;
        self
    }

    pub fn build(self) -> Result<Scheduler, ConfigError> {
        self.config.validate()?;

        let layout = OutputLayout::new(self.root.clone(), &self.config.output_dir);
        let executor = NodeExecutor::new(layout, self.rules, self.config.force, self.sandboxes, self.clock);
        let stager = Stager::new(TargetRegistry::new(self.root));

        Ok(Scheduler::new(
            stager,
            Arc::new(executor),
            self.config.worker_count(),
            self.config.idle_timeout(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_builder_overrides() {
        struct TestCase {
            name: &'static str,
            config: Config,
            workers: Option<usize>,
            expected_workers: Option<usize>,
            should_fail: bool,
        }

        let cases = vec![
            TestCase {
                name: "cli worker count wins",
                config: Config {
                    workers: Some(8),
                    ..Config::default()
                },
                workers: Some(2),
                expected_workers: Some(2),
                should_fail: false,
            },
            TestCase {
                name: "config worker count kept",
                config: Config {
                    workers: Some(3),
                    ..Config::default()
                },
                workers: None,
                expected_workers: Some(3),
                should_fail: false,
            },
            TestCase {
                name: "zero workers rejected",
                config: Config::default(),
                workers: Some(0),
                expected_workers: None,
                should_fail: true,
            },
            TestCase {
                name: "escaping output dir rejected",
                config: Config {
                    output_dir: "../out".to_string(),
                    ..Config::default()
                },
                workers: None,
                expected_workers: None,
                should_fail: true,
            },
        ];

        for case in cases {
            let built = RuntimeBuilder::new("/ws", case.config).workers(case.workers).build();
            match built {
                Ok(scheduler) => {
                    assert!(!case.should_fail, "case '{}' should fail", case.name);
                    assert_eq!(Some(scheduler.workers()), case.expected_workers, "case '{}'", case.name);
                }
                Err(_) => assert!(case.should_fail, "case '{}' should succeed", case.name),
            }
        }
    }

    #[test]
    fn test_builder_wires_output_layout() {
        let config = Config {
            output_dir: "out".to_string(),
            idle_timeout_seconds: 9,
            ..Config::default()
        };
        let scheduler = RuntimeBuilder::new("/ws", config).build().unwrap();
        assert_eq!(scheduler.executor().layout().output_dir(), std::path::Path::new("/ws/out"));
        assert_eq!(scheduler.stager().registry().root(), std::path::Path::new("/ws"));
        assert_eq!(
            scheduler.executor().store().dir(),
            std::path::Path::new("/ws/out/MANIFESTS")
        );
        assert_eq!(scheduler.idle_timeout(), Duration::from_secs(9));
    }
}
