//! Target labels.
//!
//! A label names one target: `@repo//package/path:name`. The repository part
//! is optional; targets in an external repository live under
//! `external/<repo>` in the execution root.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing a malformed label.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid label `{label}`: {reason}")]
pub struct LabelParseError {
    pub label: String,
    pub reason: &'static str,
}

/// A fully qualified target label.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label {
    repository: Option<String>,
    package: String,
    name: String,
}

impl Label {
    /// Create a label in the main repository.
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Label {
            repository: None,
            package: package.into(),
            name: name.into(),
        }
    }

    /// Parse `@repo//pkg:name`, `//pkg:name`, or `//pkg` (name = last segment).
    pub fn parse(s: &str) -> Result<Self, LabelParseError> {
        let err = |reason| LabelParseError {
            label: s.to_string(),
            reason,
        };

        let (repository, rest) = match s.strip_prefix('@') {
            Some(after) => {
                let idx = after.find("//").ok_or_else(|| err("missing `//` after repository"))?;
                let repo = &after[..idx];
                if repo.is_empty() {
                    return Err(err("empty repository name"));
                }
                (Some(repo.to_string()), &after[idx..])
            }
            None => (None, s),
        };

        let rest = rest
            .strip_prefix("//")
            .ok_or_else(|| err("labels must start with `//`"))?;

        let (package, name) = match rest.split_once(':') {
            Some((pkg, name)) => (pkg, name.to_string()),
            None => {
                let last = rest.rsplit('/').next().unwrap_or(rest);
                (rest, last.to_string())
            }
        };

        if name.is_empty() {
            return Err(err("empty target name"));
        }
        if package.starts_with('/') || package.ends_with('/') {
            return Err(err("package may not start or end with `/`"));
        }
        if package.split('/').any(|seg| seg == ".." || seg == ".") {
            return Err(err("package may not contain `.` or `..` segments"));
        }

        Ok(Label {
            repository,
            package: package.to_string(),
            name,
        })
    }

    /// Repository name, if external.
    pub fn repository(&self) -> Option<&str> {
        self.repository.as_deref()
    }

    /// Package path within the repository.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Target name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Execution-root-relative path of the repository (empty for main).
    pub fn repository_path(&self) -> PathBuf {
        match &self.repository {
            Some(repo) => PathBuf::from("external").join(repo),
            None => PathBuf::new(),
        }
    }

    /// Execution-root-relative path of the package directory.
    pub fn package_path(&self) -> PathBuf {
        self.repository_path().join(&self.package)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(repo) = &self.repository {
            write!(f, "@{}", repo)?;
        }
        write!(f, "//{}:{}", self.package, self.name)
    }
}

impl FromStr for Label {
    type Err = LabelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::parse(s)
    }
}

impl TryFrom<String> for Label {
    type Error = LabelParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Label::parse(&s)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.to_string()
    }
}
