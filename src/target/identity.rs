// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use crate::config::consts::RULE_FILE_NAME;
use crate::errors::StagingError;

/// Stable key naming one buildable unit: a workspace-relative directory plus
/// a local name.
///
/// The string form is `//relative/directory:name`; the workspace root itself
/// is `//:name`.
///
/// # Example
/// ```
/// use the_buildwood::target::TargetIdentity;
///
/// let id = TargetIdentity::parse("//lib/text:upper").unwrap();
/// assert_eq!(id.directory(), "lib/text");
/// assert_eq!(id.name(), "upper");
///
/// let local = TargetIdentity::resolve(":lower", "lib/text").unwrap();
/// assert_eq!(local.to_string(), "//lib/text:lower");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetIdentity {
    directory: String,
    name: String,
}

impl TargetIdentity {
    pub fn new(directory: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            directory: normalize_directory(&directory.into()),
            name: name.into(),
        }
    }

    /// Parse a fully qualified `//path:name` string.
    pub fn parse(reference: &str) -> Result<Self, StagingError> {
        let Some(rest) = reference.strip_prefix("//") else {
            return Err(StagingError::invalid_reference(
                reference,
                "qualified references must start with `//`",
            ));
        };
        let parts: Vec<&str> = rest.split(':').collect();
        if parts.len() != 2 {
            return Err(StagingError::invalid_reference(
                reference,
                "expected exactly one `:` separating path and name",
            ));
        }
        Self::from_parts(reference, parts[0], parts[1])
    }

    /// Resolve a reference as written inside a rule file located in
    /// `base_directory`. `:name` is local to that directory, `//path:name`
    /// is qualified.
    pub fn resolve(reference: &str, base_directory: &str) -> Result<Self, StagingError> {
        if reference.starts_with("//") {
            return Self::parse(reference);
        }
        match reference.strip_prefix(':') {
            Some(name) if name.contains(':') => Err(StagingError::invalid_reference(
                reference,
                "expected exactly one `:` separating path and name",
            )),
            Some(name) => Self::from_parts(reference, base_directory, name),
            None => Err(StagingError::invalid_reference(
                reference,
                "expected `:name` or `//path:name`",
            )),
        }
    }

    /// True when `value` uses target reference syntax.
    pub fn is_reference(value: &str) -> bool {
        value.starts_with(':') || value.starts_with("//")
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path of the package directory under `root`.
    pub fn package_dir(&self, root: &Path) -> PathBuf {
        if self.directory.is_empty() {
            root.to_path_buf()
        } else {
            root.join(&self.directory)
        }
    }

    /// Absolute path of the rule file that defines this target.
    pub fn rule_file(&self, root: &Path) -> PathBuf {
        self.package_dir(root).join(RULE_FILE_NAME)
    }

    fn from_parts(reference: &str, directory: &str, name: &str) -> Result<Self, StagingError> {
        if name.is_empty() {
            return Err(StagingError::invalid_reference(reference, "target name is empty"));
        }
        if name.contains('/') {
            return Err(StagingError::invalid_reference(
                reference,
                "target name may not contain `/`",
            ));
        }
        if directory.split('/').any(|segment| segment == "..") {
            return Err(StagingError::invalid_reference(
                reference,
                "path may not leave the workspace",
            ));
        }
        Ok(Self::new(directory, name))
    }
}

fn normalize_directory(directory: &str) -> String {
    directory
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

impl Display for TargetIdentity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "//{}:{}", self.directory, self.name)
    }
}

impl TryFrom<String> for TargetIdentity {
    type Error = StagingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TargetIdentity> for String {
    fn from(value: TargetIdentity) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestCase {
        reference: &'static str,
        base: &'static str,
        expected: Option<&'static str>,
    }

    #[test]
    fn test_resolve_table() {
        let cases = vec![
            TestCase { reference: ":x", base: "pkg", expected: Some("//pkg:x") },
            TestCase { reference: ":x", base: "", expected: Some("//:x") },
            TestCase { reference: "//a/b:c", base: "pkg", expected: Some("//a/b:c") },
            TestCase { reference: "//:top", base: "pkg", expected: Some("//:top") },
            TestCase { reference: "//a/b/:c", base: "", expected: Some("//a/b:c") },
            TestCase { reference: "//a/b", base: "", expected: None },
            TestCase { reference: ":", base: "pkg", expected: None },
            TestCase { reference: "//a:b:c", base: "", expected: None },
            TestCase { reference: ":a:b", base: "pkg", expected: None },
            TestCase { reference: "foo", base: "pkg", expected: None },
            TestCase { reference: "//../x:y", base: "", expected: None },
        ];

        for case in cases {
            let result = TargetIdentity::resolve(case.reference, case.base);
            match case.expected {
                Some(expected) => assert_eq!(
                    result.unwrap().to_string(),
                    expected,
                    "reference {}",
                    case.reference
                ),
                None => assert!(
                    matches!(result, Err(StagingError::InvalidTargetReference { .. })),
                    "reference {} should be rejected",
                    case.reference
                ),
            }
        }
    }

    #[test]
    fn test_identity_is_value_typed() {
        let a = TargetIdentity::resolve(":x", "pkg").unwrap();
        let b = TargetIdentity::parse("//pkg:x").unwrap();
        assert_eq!(a, b);

        let mut set = std::collections::HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_serde_uses_string_form() {
        let id = TargetIdentity::parse("//lib:util").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"//lib:util\"");

        let back: TargetIdentity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);

        assert!(serde_json::from_str::<TargetIdentity>("\"lib:util\"").is_err());
    }

    #[test]
    fn test_paths_under_root() {
        let root = Path::new("/ws");
        let nested = TargetIdentity::parse("//a/b:c").unwrap();
        assert_eq!(nested.rule_file(root), PathBuf::from("/ws/a/b/BUILD.yaml"));

        let top = TargetIdentity::parse("//:c").unwrap();
        assert_eq!(top.package_dir(root), PathBuf::from("/ws"));
    }
}
