// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use crate::rules::{FileGroupRule, GenRule, ShBinaryRule, WriteFileRule};
use crate::traits::Rule;

/// Static mapping from rule name to implementation.
#[derive(Clone, Default)]
pub struct RuleRegistry(HashMap<&'static str, Arc<dyn Rule>>);

impl RuleRegistry {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Registry holding every built-in rule.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(FileGroupRule));
        registry.register(Arc::new(WriteFileRule));
        registry.register(Arc::new(GenRule));
        registry.register(Arc::new(ShBinaryRule));
        registry
    }

    /// Add or replace a rule under its own name.
    pub fn register(&mut self, rule: Arc<dyn Rule>) {
        self.0.insert(rule.name(), rule);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Rule>> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &&'static str> {
        self.0.keys()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.0.keys().collect();
        names.sort();
        f.debug_struct("RuleRegistry")
            .field("rule_count", &self.0.len())
            .field("rules", &names)
            .finish()
    }
}
