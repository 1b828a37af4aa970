// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::StagingError;
use crate::observability::messages::staging::RuleFileLoaded;
use crate::observability::messages::StructuredLog;
use crate::target::{RuleDefinition, RuleFile, TargetIdentity};

/// Parsed rule definitions keyed by identity.
///
/// Rule files are read lazily the first time a target in their directory is
/// requested, and each file is parsed at most once.
pub struct TargetRegistry {
    root: PathBuf,
    definitions: HashMap<TargetIdentity, Arc<RuleDefinition>>,
    loaded_files: HashSet<PathBuf>,
}

impl TargetRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            definitions: HashMap::new(),
            loaded_files: HashSet::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Definition for `identity`, loading its rule file on first use.
    ///
    /// `used_in` names the referencing target so a missing-target error can
    /// point at it.
    pub fn lookup(
        &mut self,
        identity: &TargetIdentity,
        used_in: Option<&TargetIdentity>,
    ) -> Result<Arc<RuleDefinition>, StagingError> {
        if let Some(found) = self.definitions.get(identity) {
            return Ok(found.clone());
        }

        let rule_file = identity.rule_file(&self.root);
        if !self.load_file(identity.directory(), &rule_file)? {
            return Err(StagingError::TargetMissing {
                target: identity.clone(),
                used_in: used_in.cloned(),
                reason: format!("no rule file at {}", rule_file.display()),
            });
        }

        self.definitions
            .get(identity)
            .cloned()
            .ok_or_else(|| StagingError::TargetMissing {
                target: identity.clone(),
                used_in: used_in.cloned(),
                reason: format!("no rule named `{}` in {}", identity.name(), rule_file.display()),
            })
    }

    /// Add a definition produced at execution time. An existing definition
    /// with the same identity is replaced.
    pub fn register(&mut self, definition: RuleDefinition) -> Arc<RuleDefinition> {
        let definition = Arc::new(definition);
        self.definitions
            .insert(definition.identity.clone(), definition.clone());
        definition
    }

    pub fn contains(&self, identity: &TargetIdentity) -> bool {
        self.definitions.contains_key(identity)
    }

    /// Parse `rule_file` once. Returns `false` when the file does not exist.
    fn load_file(&mut self, directory: &str, rule_file: &Path) -> Result<bool, StagingError> {
        if self.loaded_files.contains(rule_file) {
            return Ok(true);
        }

        let contents = match fs::read_to_string(rule_file) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(source) => {
                return Err(StagingError::Io {
                    path: rule_file.to_path_buf(),
                    source,
                })
            }
        };

        let parsed: RuleFile = if contents.trim().is_empty() {
            RuleFile::default()
        } else {
            serde_yaml::from_str(&contents).map_err(|source| StagingError::RuleFileParse {
                path: rule_file.to_path_buf(),
                source,
            })?
        };

        let mut in_file = HashMap::new();
        for entry in parsed.rules {
            let definition = RuleDefinition::from_entry(entry, directory, rule_file)?;
            if in_file.contains_key(&definition.identity) {
                return Err(StagingError::DuplicateTarget {
                    target: definition.identity,
                    path: rule_file.to_path_buf(),
                });
            }
            in_file.insert(definition.identity.clone(), Arc::new(definition));
        }

        RuleFileLoaded {
            path: rule_file,
            rule_count: in_file.len(),
        }
        .log();

        self.definitions.extend(in_file);
        self.loaded_files.insert(rule_file.to_path_buf());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_rules(root: &Path, dir: &str, yaml: &str) {
        let package = root.join(dir);
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("BUILD.yaml"), yaml).unwrap();
    }

    #[test]
    fn test_lookup_loads_file_once() {
        let workspace = TempDir::new().unwrap();
        write_rules(
            workspace.path(),
            "pkg",
            "rules:\n  - rule: filegroup\n    name: a\n  - rule: filegroup\n    name: b\n",
        );

        let mut registry = TargetRegistry::new(workspace.path());
        let a = TargetIdentity::parse("//pkg:a").unwrap();
        let b = TargetIdentity::parse("//pkg:b").unwrap();
        let first = registry.lookup(&a, None).unwrap();

        // A rewrite after the first load is not observed.
        fs::write(workspace.path().join("pkg/BUILD.yaml"), "rules: [").unwrap();
        assert!(registry.lookup(&b, None).is_ok());
        assert!(Arc::ptr_eq(&first, &registry.lookup(&a, None).unwrap()));
    }

    #[test]
    fn test_missing_file_and_missing_rule() {
        let workspace = TempDir::new().unwrap();
        write_rules(workspace.path(), "pkg", "rules:\n  - rule: filegroup\n    name: a\n");
        let mut registry = TargetRegistry::new(workspace.path());
        let user = TargetIdentity::parse("//app:main").unwrap();

        let no_file = registry
            .lookup(&TargetIdentity::parse("//nowhere:x").unwrap(), Some(&user))
            .unwrap_err();
        assert!(no_file.to_string().contains("used in \"//app:main\""));

        let no_rule = registry
            .lookup(&TargetIdentity::parse("//pkg:zzz").unwrap(), None)
            .unwrap_err();
        assert!(matches!(no_rule, StagingError::TargetMissing { .. }));
    }

    #[test]
    fn test_duplicate_and_unparsable_files() {
        let workspace = TempDir::new().unwrap();
        write_rules(
            workspace.path(),
            "dup",
            "rules:\n  - rule: filegroup\n    name: a\n  - rule: filegroup\n    name: a\n",
        );
        write_rules(workspace.path(), "bad", "rules: [unclosed");

        let mut registry = TargetRegistry::new(workspace.path());
        let dup = registry.lookup(&TargetIdentity::parse("//dup:a").unwrap(), None);
        assert!(matches!(dup, Err(StagingError::DuplicateTarget { .. })));

        let bad = registry.lookup(&TargetIdentity::parse("//bad:a").unwrap(), None);
        assert!(matches!(bad, Err(StagingError::RuleFileParse { .. })));
    }

    #[test]
    fn test_registered_definitions_take_precedence() {
        let workspace = TempDir::new().unwrap();
        let mut registry = TargetRegistry::new(workspace.path());
        let identity = TargetIdentity::parse("//gen:made").unwrap();
        let definition = RuleDefinition {
            identity: identity.clone(),
            rule: "filegroup".to_string(),
            tags: vec![],
            params: Default::default(),
            dependencies: vec![],
            rule_file: workspace.path().join("gen/BUILD.yaml"),
        };
        registry.register(definition);
        assert!(registry.contains(&identity));
        assert_eq!(registry.lookup(&identity, None).unwrap().rule, "filegroup");
    }
}
