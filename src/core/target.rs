//! Per-target attributes.
//!
//! `TargetAttributes` holds the already-parsed attribute values of one C/C++
//! target. Paths are execution paths; resolving them against the package
//! happens when the build file is loaded.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::artifact::Artifact;
use crate::core::label::Label;

/// How strictly header inclusion is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadersCheckingMode {
    #[default]
    Strict,
    Loose,
    Warn,
}

impl HeadersCheckingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeadersCheckingMode::Strict => "strict",
            HeadersCheckingMode::Loose => "loose",
            HeadersCheckingMode::Warn => "warn",
        }
    }
}

impl fmt::Display for HeadersCheckingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeadersCheckingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(HeadersCheckingMode::Strict),
            "loose" => Ok(HeadersCheckingMode::Loose),
            "warn" => Ok(HeadersCheckingMode::Warn),
            _ => Err(format!(
                "invalid headers checking mode `{}`: expected strict, loose, or warn",
                s
            )),
        }
    }
}

/// What kind of output a target links into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkTargetType {
    #[default]
    StaticLibrary,
    PicStaticLibrary,
    AlwaysLinkStaticLibrary,
    AlwaysLinkPicStaticLibrary,
    DynamicLibrary,
    NodepsDynamicLibrary,
    Executable,
}

impl LinkTargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkTargetType::StaticLibrary => "static",
            LinkTargetType::PicStaticLibrary => "pic-static",
            LinkTargetType::AlwaysLinkStaticLibrary => "alwayslink-static",
            LinkTargetType::AlwaysLinkPicStaticLibrary => "alwayslink-pic-static",
            LinkTargetType::DynamicLibrary => "dynamic",
            LinkTargetType::NodepsDynamicLibrary => "nodeps-dynamic",
            LinkTargetType::Executable => "executable",
        }
    }

    pub fn is_static_library(&self) -> bool {
        matches!(
            self,
            LinkTargetType::StaticLibrary
                | LinkTargetType::PicStaticLibrary
                | LinkTargetType::AlwaysLinkStaticLibrary
                | LinkTargetType::AlwaysLinkPicStaticLibrary
        )
    }

    pub fn is_dynamic_library(&self) -> bool {
        matches!(
            self,
            LinkTargetType::DynamicLibrary | LinkTargetType::NodepsDynamicLibrary
        )
    }

    pub fn is_alwayslink(&self) -> bool {
        matches!(
            self,
            LinkTargetType::AlwaysLinkStaticLibrary | LinkTargetType::AlwaysLinkPicStaticLibrary
        )
    }

    /// Whether this link type only produces position-independent outputs.
    pub fn requires_pic(&self) -> bool {
        matches!(
            self,
            LinkTargetType::PicStaticLibrary
                | LinkTargetType::AlwaysLinkPicStaticLibrary
                | LinkTargetType::DynamicLibrary
                | LinkTargetType::NodepsDynamicLibrary
        )
    }

    /// Upgrade a static type to its always-link variant.
    pub fn with_alwayslink(self, alwayslink: bool) -> Self {
        match (self, alwayslink) {
            (LinkTargetType::StaticLibrary, true) => LinkTargetType::AlwaysLinkStaticLibrary,
            (LinkTargetType::PicStaticLibrary, true) => LinkTargetType::AlwaysLinkPicStaticLibrary,
            (other, _) => other,
        }
    }
}

impl fmt::Display for LinkTargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_true() -> bool {
    true
}

/// Attribute values of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAttributes {
    pub label: Label,

    /// Sources, private headers, and precompiled objects/libraries
    #[serde(default)]
    pub srcs: Vec<Artifact>,

    /// Public headers
    #[serde(default)]
    pub hdrs: Vec<Artifact>,

    #[serde(default)]
    pub private_hdrs: Vec<Artifact>,

    /// Headers that may only be textually included
    #[serde(default)]
    pub textual_hdrs: Vec<Artifact>,

    /// Extra exported header paths listed in the module map
    #[serde(default)]
    pub additional_exported_hdrs: Vec<PathBuf>,

    #[serde(default)]
    pub copts: Vec<String>,

    #[serde(default)]
    pub linkopts: Vec<String>,

    #[serde(default)]
    pub defines: Vec<String>,

    /// Package-relative system include directories
    #[serde(default)]
    pub includes: Vec<String>,

    /// Regular expression removing matching copts
    #[serde(default)]
    pub nocopts: Option<String>,

    /// Requested features; a leading `-` disables
    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub link_type: LinkTargetType,

    #[serde(default)]
    pub alwayslink: bool,

    #[serde(default)]
    pub neverlink: bool,

    #[serde(default)]
    pub headers_checking_mode: HeadersCheckingMode,

    /// Package-relative directories allowed for undeclared inclusion
    #[serde(default)]
    pub loose_include_dirs: Vec<PathBuf>,

    #[serde(default = "default_true")]
    pub generate_module_map: bool,

    /// Fail if a C/C++ dependency does not supply compilation info
    #[serde(default = "default_true")]
    pub check_deps_provider: bool,
}

impl TargetAttributes {
    /// A target with every attribute at its default.
    pub fn new(label: Label) -> Self {
        TargetAttributes {
            label,
            srcs: Vec::new(),
            hdrs: Vec::new(),
            private_hdrs: Vec::new(),
            textual_hdrs: Vec::new(),
            additional_exported_hdrs: Vec::new(),
            copts: Vec::new(),
            linkopts: Vec::new(),
            defines: Vec::new(),
            includes: Vec::new(),
            nocopts: None,
            features: Vec::new(),
            link_type: LinkTargetType::default(),
            alwayslink: false,
            neverlink: false,
            headers_checking_mode: HeadersCheckingMode::default(),
            loose_include_dirs: Vec::new(),
            generate_module_map: true,
            check_deps_provider: true,
        }
    }

    /// Effective link type after applying `alwayslink`.
    pub fn effective_link_type(&self) -> LinkTargetType {
        self.link_type.with_alwayslink(self.alwayslink)
    }

    /// Features requested by the target (entries without a leading `-`).
    pub fn requested_features(&self) -> impl Iterator<Item = &str> {
        self.features
            .iter()
            .filter(|f| !f.starts_with('-'))
            .map(String::as_str)
    }

    /// Features disabled by the target (entries with a leading `-`).
    pub fn disabled_features(&self) -> impl Iterator<Item = &str> {
        self.features.iter().filter_map(|f| f.strip_prefix('-'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_polarity() {
        let mut attrs = TargetAttributes::new(Label::parse("//a:b").unwrap());
        attrs.features = vec!["thin_lto".into(), "-module_maps".into()];
        assert_eq!(attrs.requested_features().collect::<Vec<_>>(), vec!["thin_lto"]);
        assert_eq!(attrs.disabled_features().collect::<Vec<_>>(), vec!["module_maps"]);
    }

    #[test]
    fn test_alwayslink_upgrade() {
        let mut attrs = TargetAttributes::new(Label::parse("//a:b").unwrap());
        attrs.alwayslink = true;
        assert_eq!(
            attrs.effective_link_type(),
            LinkTargetType::AlwaysLinkStaticLibrary
        );
        attrs.link_type = LinkTargetType::DynamicLibrary;
        assert_eq!(attrs.effective_link_type(), LinkTargetType::DynamicLibrary);
    }

    #[test]
    fn test_headers_checking_mode_parse() {
        assert_eq!(
            "LOOSE".parse::<HeadersCheckingMode>().unwrap(),
            HeadersCheckingMode::Loose
        );
        assert!("lenient".parse::<HeadersCheckingMode>().is_err());
    }
}
