//! Artifacts - files that analysis reasons about.
//!
//! An artifact is either a source file (its execution path is its
//! workspace-relative path) or a derived file under an output root.
//! Analysis only names artifacts; it never reads or writes them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Whether an artifact is checked in or produced by an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Source,
    Derived,
}

/// A file identified by its execution-root-relative path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Artifact {
    exec_path: PathBuf,
    root: PathBuf,
    kind: ArtifactKind,
}

impl Artifact {
    /// A source artifact at the given execution path.
    pub fn source(exec_path: impl Into<PathBuf>) -> Self {
        Artifact {
            exec_path: exec_path.into(),
            root: PathBuf::new(),
            kind: ArtifactKind::Source,
        }
    }

    /// A derived artifact under `root` (e.g. `out/k8-opt/bin`).
    pub fn derived(root: impl Into<PathBuf>, root_relative: impl AsRef<Path>) -> Self {
        let root = root.into();
        Artifact {
            exec_path: root.join(root_relative),
            root,
            kind: ArtifactKind::Derived,
        }
    }

    /// Path relative to the execution root.
    pub fn exec_path(&self) -> &Path {
        &self.exec_path
    }

    /// Path relative to the artifact's root.
    pub fn root_relative_path(&self) -> &Path {
        self.exec_path
            .strip_prefix(&self.root)
            .unwrap_or(&self.exec_path)
    }

    /// The root this artifact lives under (empty for sources).
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    pub fn is_source(&self) -> bool {
        self.kind == ArtifactKind::Source
    }

    /// Final path component.
    pub fn basename(&self) -> String {
        self.exec_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Check whether the basename ends with the given suffix (e.g. `.pic.a`).
    pub fn has_suffix(&self, suffix: &str) -> bool {
        self.basename().ends_with(suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_artifact() {
        let a = Artifact::source("net/http.h");
        assert!(a.is_source());
        assert_eq!(a.exec_path(), Path::new("net/http.h"));
        assert_eq!(a.root_relative_path(), Path::new("net/http.h"));
        assert_eq!(a.basename(), "http.h");
    }

    #[test]
    fn test_derived_artifact() {
        let a = Artifact::derived("out/k8-opt/bin", "net/libhttp.pic.a");
        assert!(!a.is_source());
        assert_eq!(a.exec_path(), Path::new("out/k8-opt/bin/net/libhttp.pic.a"));
        assert_eq!(a.root_relative_path(), Path::new("net/libhttp.pic.a"));
        assert!(a.has_suffix(".pic.a"));
    }

    #[test]
    fn test_ordering_by_exec_path() {
        let mut v = vec![Artifact::source("b.h"), Artifact::source("a.h")];
        v.sort();
        assert_eq!(v[0].basename(), "a.h");
    }
}
