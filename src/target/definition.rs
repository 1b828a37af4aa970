// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::config::consts::{BUILD_ALWAYS_PARAM, DEPS_PARAM};
use crate::errors::StagingError;
use crate::target::TargetIdentity;

/// On-disk shape of a `BUILD.yaml` file.
///
/// # Example
/// ```yaml
/// rules:
///   - rule: write_file
///     name: greeting
///     params:
///       out: greeting.txt
///       content: "hello"
///   - rule: genrule
///     name: shout
///     params:
///       srcs: [":greeting"]
///       outs: [shout.txt]
///       cmd: "tr a-z A-Z < $SRCS > $OUTS"
/// ```
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct RuleFile {
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

/// One rule invocation as written in a rule file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleEntry {
    pub rule: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub params: Mapping,
}

/// Declared parameters of a rule, as arbitrary YAML values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleParams(Mapping);

impl RuleParams {
    pub fn new(values: Mapping) -> Self {
        Self(values)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> bool {
        self.get(key).and_then(Value::as_bool).unwrap_or(false)
    }

    /// String list parameter; a single string is treated as a one-item list.
    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        match self.get(key) {
            Some(Value::String(single)) => vec![single.clone()],
            Some(Value::Sequence(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Entries of a list parameter that are plain paths rather than target
    /// references.
    pub fn file_entries(&self, key: &str) -> Vec<String> {
        self.get_string_list(key)
            .into_iter()
            .filter(|entry| !TargetIdentity::is_reference(entry))
            .collect()
    }

    pub fn build_always(&self) -> bool {
        self.get_bool(BUILD_ALWAYS_PARAM)
    }

    pub fn as_mapping(&self) -> &Mapping {
        &self.0
    }
}

/// A parsed rule invocation: which rule to run, with which parameters, and
/// which targets it depends on.
#[derive(Debug, Clone)]
pub struct RuleDefinition {
    pub identity: TargetIdentity,
    pub rule: String,
    pub tags: Vec<String>,
    pub params: RuleParams,
    /// Dependency identities in declaration order, without duplicates.
    pub dependencies: Vec<TargetIdentity>,
    pub rule_file: PathBuf,
}

impl RuleDefinition {
    /// Build a definition for `entry` declared in package `directory`.
    pub fn from_entry(
        entry: RuleEntry,
        directory: &str,
        rule_file: &Path,
    ) -> Result<Self, StagingError> {
        let identity = TargetIdentity::resolve(&format!(":{}", entry.name), directory)?;
        let dependencies = extract_dependencies(&entry.params, directory)?;
        Ok(Self {
            identity,
            rule: entry.rule,
            tags: entry.tags,
            params: RuleParams::new(entry.params),
            dependencies,
            rule_file: rule_file.to_path_buf(),
        })
    }

    /// Rule names ending in `_binary` or `_test` must hand back a binary.
    pub fn is_binary_rule_name(&self) -> bool {
        self.rule.ends_with("_binary") || self.rule.ends_with("_test")
    }
}

/// Scan `params` for target references.
///
/// Any string value starting with `:` or `//` is a dependency. Every entry of
/// `deps` must be one.
pub fn extract_dependencies(
    params: &Mapping,
    directory: &str,
) -> Result<Vec<TargetIdentity>, StagingError> {
    let mut seen = HashSet::new();
    let mut dependencies = Vec::new();

    for (key, value) in params {
        let is_deps = key.as_str() == Some(DEPS_PARAM);
        collect_references(value, directory, is_deps, &mut seen, &mut dependencies)?;
    }
    Ok(dependencies)
}

fn collect_references(
    value: &Value,
    directory: &str,
    strict: bool,
    seen: &mut HashSet<TargetIdentity>,
    out: &mut Vec<TargetIdentity>,
) -> Result<(), StagingError> {
    match value {
        Value::String(text) => {
            if TargetIdentity::is_reference(text) || strict {
                let identity = TargetIdentity::resolve(text, directory)?;
                if seen.insert(identity.clone()) {
                    out.push(identity);
                }
            }
        }
        Value::Sequence(items) => {
            for item in items {
                collect_references(item, directory, strict, seen, out)?;
            }
        }
        Value::Mapping(map) => {
            for (_, nested) in map {
                collect_references(nested, directory, false, seen, out)?;
            }
        }
        Value::Tagged(tagged) => {
            collect_references(&tagged.value, directory, strict, seen, out)?;
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_params(yaml: &str) -> Mapping {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_references_found_anywhere_in_params() {
        let params = parse_params(
            r#"
srcs: [":a", "local.txt"]
tool: "//tools:gen"
nested:
  inner: [":b"]
deps: [":a", "//lib:c"]
"#,
        );
        let deps = extract_dependencies(&params, "pkg").unwrap();
        let names: Vec<String> = deps.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["//pkg:a", "//tools:gen", "//pkg:b", "//lib:c"]);
    }

    #[test]
    fn test_bare_name_in_deps_is_rejected() {
        let params = parse_params("deps: [\"foo\"]");
        let err = extract_dependencies(&params, "pkg").unwrap_err();
        assert!(matches!(err, StagingError::InvalidTargetReference { .. }));
    }

    #[test]
    fn test_malformed_reference_is_rejected() {
        let params = parse_params("srcs: [\"//a:b:c\"]");
        assert!(extract_dependencies(&params, "").is_err());
    }

    #[test]
    fn test_definition_from_entry() {
        let entry: RuleEntry = serde_yaml::from_str(
            r#"
rule: sh_binary
name: run
tags: [tool]
params:
  src: run.sh
  build_always: true
"#,
        )
        .unwrap();
        let def = RuleDefinition::from_entry(entry, "bin", Path::new("/ws/bin/BUILD.yaml")).unwrap();
        assert_eq!(def.identity.to_string(), "//bin:run");
        assert!(def.dependencies.is_empty());
        assert!(def.is_binary_rule_name());
        assert!(def.params.build_always());
        assert_eq!(def.params.get_str("src"), Some("run.sh"));
        assert_eq!(def.tags, vec!["tool".to_string()]);
    }

    #[test]
    fn test_file_entries_skip_references() {
        let params = RuleParams::new(parse_params("srcs: [\":gen\", \"a.txt\", \"b.txt\"]"));
        assert_eq!(params.file_entries("srcs"), vec!["a.txt", "b.txt"]);
        assert_eq!(params.get_string_list("missing"), Vec::<String>::new());
    }
}
