//! Build file loading.
//!
//! A build file is TOML with one `[[target]]` table per target. File
//! attributes are package-relative; they are resolved to execution paths
//! here.
//!
//! ```toml
//! [[target]]
//! label = "//net:http"
//! srcs = ["http.cc", "internal.h"]
//! hdrs = ["http.h"]
//! deps = ["//base:base"]
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::artifact::Artifact;
use crate::core::label::Label;
use crate::core::target::{HeadersCheckingMode, LinkTargetType, TargetAttributes};

/// Rule kind of a build file target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// A C/C++ library or binary
    #[default]
    Cc,
    /// A group of files exposed as runfiles
    Filegroup,
}

/// One `[[target]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildTarget {
    pub label: Label,

    #[serde(default)]
    pub kind: TargetKind,

    #[serde(default)]
    pub srcs: Vec<PathBuf>,

    #[serde(default)]
    pub hdrs: Vec<PathBuf>,

    #[serde(default)]
    pub private_hdrs: Vec<PathBuf>,

    #[serde(default)]
    pub textual_hdrs: Vec<PathBuf>,

    #[serde(default)]
    pub additional_exported_hdrs: Vec<PathBuf>,

    #[serde(default)]
    pub deps: Vec<Label>,

    #[serde(default)]
    pub copts: Vec<String>,

    #[serde(default)]
    pub linkopts: Vec<String>,

    #[serde(default)]
    pub defines: Vec<String>,

    #[serde(default)]
    pub includes: Vec<String>,

    #[serde(default)]
    pub nocopts: Option<String>,

    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub link_type: LinkTargetType,

    #[serde(default)]
    pub alwayslink: bool,

    #[serde(default)]
    pub neverlink: bool,

    #[serde(default)]
    pub headers_checking_mode: Option<HeadersCheckingMode>,

    #[serde(default)]
    pub loose_include_dirs: Vec<PathBuf>,

    #[serde(default)]
    pub generate_module_map: Option<bool>,

    #[serde(default)]
    pub check_deps_provider: Option<bool>,
}

/// Defaults applied to attributes a target leaves unset.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeDefaults {
    pub headers_checking_mode: Option<HeadersCheckingMode>,
    pub check_deps_provider: Option<bool>,
}

fn in_package(package: &Path, files: &[PathBuf]) -> Vec<Artifact> {
    files
        .iter()
        .map(|f| Artifact::source(package.join(f)))
        .collect()
}

impl BuildTarget {
    /// Source artifacts of this target, as execution paths.
    pub fn source_artifacts(&self) -> Vec<Artifact> {
        in_package(&self.label.package_path(), &self.srcs)
    }

    /// Convert to analysis attributes.
    pub fn to_attributes(&self, defaults: AttributeDefaults) -> TargetAttributes {
        let package = self.label.package_path();
        let mut attrs = TargetAttributes::new(self.label.clone());
        attrs.srcs = in_package(&package, &self.srcs);
        attrs.hdrs = in_package(&package, &self.hdrs);
        attrs.private_hdrs = in_package(&package, &self.private_hdrs);
        attrs.textual_hdrs = in_package(&package, &self.textual_hdrs);
        attrs.additional_exported_hdrs = self
            .additional_exported_hdrs
            .iter()
            .map(|h| package.join(h))
            .collect();
        attrs.copts = self.copts.clone();
        attrs.linkopts = self.linkopts.clone();
        attrs.defines = self.defines.clone();
        attrs.includes = self.includes.clone();
        attrs.nocopts = self.nocopts.clone();
        attrs.features = self.features.clone();
        attrs.link_type = self.link_type;
        attrs.alwayslink = self.alwayslink;
        attrs.neverlink = self.neverlink;
        attrs.headers_checking_mode = self
            .headers_checking_mode
            .or(defaults.headers_checking_mode)
            .unwrap_or_default();
        attrs.loose_include_dirs = self.loose_include_dirs.clone();
        attrs.generate_module_map = self.generate_module_map.unwrap_or(true);
        attrs.check_deps_provider = self
            .check_deps_provider
            .or(defaults.check_deps_provider)
            .unwrap_or(true);
        attrs
    }
}

/// A parsed build file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildFile {
    #[serde(default, rename = "target")]
    pub targets: Vec<BuildTarget>,
}

impl BuildFile {
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Load a build file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = crate::util::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("failed to parse build file: {}", path.display()))
    }

    pub fn target(&self, label: &Label) -> Option<&BuildTarget> {
        self.targets.iter().find(|t| &t.label == label)
    }
}
