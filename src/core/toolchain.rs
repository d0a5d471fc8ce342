//! Toolchain descriptors.
//!
//! A toolchain descriptor is loaded once per toolchain definition and shared
//! (read-only) by every target analyzed against it. It carries tool paths,
//! capability flags, and the raw feature/action-config declarations that the
//! feature graph is built from.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A tool a toolchain may declare a path for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    Gcc,
    Ar,
    Ld,
    Cpp,
    Gcov,
    Nm,
    Objcopy,
    Objdump,
    Strip,
    Dwp,
    LlvmProfdata,
}

impl Tool {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tool::Gcc => "gcc",
            Tool::Ar => "ar",
            Tool::Ld => "ld",
            Tool::Cpp => "cpp",
            Tool::Gcov => "gcov",
            Tool::Nm => "nm",
            Tool::Objcopy => "objcopy",
            Tool::Objdump => "objdump",
            Tool::Strip => "strip",
            Tool::Dwp => "dwp",
            Tool::LlvmProfdata => "llvm-profdata",
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability flags of a toolchain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainCapabilities {
    pub supports_pic: bool,
    /// Every compilation must be position independent
    pub needs_pic: bool,
    pub supports_fission: bool,
    pub is_llvm: bool,
    pub supports_embedded_runtimes: bool,
    pub supports_header_parsing: bool,
    pub supports_interface_shared_libraries: bool,
}

/// A parsed toolchain definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolchainDescriptor {
    /// Unique toolchain identifier
    pub identifier: String,

    pub target_cpu: String,

    #[serde(default)]
    pub target_libc: String,

    #[serde(default)]
    pub compiler: String,

    #[serde(default)]
    pub tool_paths: BTreeMap<Tool, PathBuf>,

    #[serde(default)]
    pub capabilities: ToolchainCapabilities,

    #[serde(default)]
    pub builtin_sysroot: Option<PathBuf>,

    /// Include directories the compiler searches implicitly
    #[serde(default)]
    pub builtin_include_directories: Vec<PathBuf>,

    /// Headers shipped with the toolchain, as execution paths
    #[serde(default)]
    pub headers: Vec<PathBuf>,

    #[serde(default)]
    pub default_features: Vec<String>,

    #[serde(default)]
    pub default_action_configs: Vec<String>,

    /// Features enabled for every target regardless of requests
    #[serde(default)]
    pub unconditional_features: Vec<String>,

    #[serde(default, rename = "feature")]
    pub features: Vec<Feature>,

    #[serde(default, rename = "action_config")]
    pub action_configs: Vec<ActionConfig>,
}

impl ToolchainDescriptor {
    /// Parse a descriptor from TOML text.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn tool_path(&self, tool: Tool) -> Option<&Path> {
        self.tool_paths.get(&tool).map(|p| p.as_path())
    }

    /// Names the toolchain enables by default, in declaration order.
    ///
    /// Includes the explicit default lists and every feature or action config
    /// declared with `enabled = true`.
    pub fn default_selectables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let declared = self
            .default_features
            .iter()
            .chain(&self.default_action_configs)
            .cloned()
            .chain(
                self.features
                    .iter()
                    .filter(|f| f.enabled)
                    .map(|f| f.name.clone()),
            )
            .chain(
                self.action_configs
                    .iter()
                    .filter(|a| a.enabled)
                    .map(|a| a.config_name.clone()),
            );
        for name in declared {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }
}

/// A set of feature names that must all be enabled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    pub features: Vec<String>,
}

/// Conditions on enabled (`features`) and disabled (`not_features`) names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WithFeatureSet {
    pub features: Vec<String>,
    pub not_features: Vec<String>,
}

/// A named, toggleable toolchain capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub flag_sets: Vec<FlagSet>,

    #[serde(default)]
    pub env_sets: Vec<EnvSet>,

    /// Alternative prerequisite sets; one must be fully enabled
    #[serde(default)]
    pub requires: Vec<FeatureSet>,

    #[serde(default)]
    pub implies: Vec<String>,

    /// Capabilities this feature provides; at most one provider may be enabled
    #[serde(default)]
    pub provides: Vec<String>,
}

/// A tool invocation choice within an action config.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRef {
    pub tool_path: PathBuf,

    #[serde(default)]
    pub with_features: Vec<WithFeatureSet>,

    #[serde(default)]
    pub execution_requirements: Vec<String>,
}

/// How to invoke an external tool for one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub config_name: String,

    pub action_name: String,

    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub tools: Vec<ToolRef>,

    #[serde(default)]
    pub flag_sets: Vec<FlagSet>,

    #[serde(default)]
    pub implies: Vec<String>,
}

/// Flags applied to some actions when conditions hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagSet {
    /// Actions this set applies to (empty inside an action config: its own action)
    pub actions: Vec<String>,
    pub with_features: Vec<WithFeatureSet>,
    pub expand_if_all_available: Vec<String>,
    pub flag_groups: Vec<FlagGroup>,
}

/// Environment entries applied to some actions when conditions hold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvSet {
    pub actions: Vec<String>,
    pub with_features: Vec<WithFeatureSet>,
    pub env_entries: Vec<EnvEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvEntry {
    pub key: String,
    pub value: FlagTemplate,
}

/// Condition that a variable equals a fixed string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableEquals {
    pub variable: String,
    pub value: String,
}

/// The payload of a flag group: either flags or nested groups, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum FlagGroupContent {
    Flags(Vec<FlagTemplate>),
    Groups(Vec<FlagGroup>),
}

/// A possibly conditional, possibly iterated group of flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFlagGroup", into = "RawFlagGroup")]
pub struct FlagGroup {
    pub content: FlagGroupContent,
    pub iterate_over: Option<String>,
    pub expand_if_available: Vec<String>,
    pub expand_if_not_available: Vec<String>,
    pub expand_if_true: Option<String>,
    pub expand_if_false: Option<String>,
    pub expand_if_equal: Option<VariableEquals>,
}

impl FlagGroup {
    /// An unconditional group of literal flags.
    pub fn flags(flags: Vec<FlagTemplate>) -> Self {
        FlagGroup {
            content: FlagGroupContent::Flags(flags),
            iterate_over: None,
            expand_if_available: Vec::new(),
            expand_if_not_available: Vec::new(),
            expand_if_true: None,
            expand_if_false: None,
            expand_if_equal: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RawFlagGroup {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    flags: Vec<FlagTemplate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    flag_groups: Vec<FlagGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iterate_over: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    expand_if_available: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    expand_if_not_available: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expand_if_true: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expand_if_false: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expand_if_equal: Option<VariableEquals>,
}

impl TryFrom<RawFlagGroup> for FlagGroup {
    type Error = String;

    fn try_from(raw: RawFlagGroup) -> Result<Self, Self::Error> {
        let content = match (raw.flags.is_empty(), raw.flag_groups.is_empty()) {
            (false, true) => FlagGroupContent::Flags(raw.flags),
            (true, false) => FlagGroupContent::Groups(raw.flag_groups),
            (false, false) => {
                return Err("flag group declares both `flags` and `flag_groups`".to_string())
            }
            (true, true) => {
                return Err("flag group declares neither `flags` nor `flag_groups`".to_string())
            }
        };
        Ok(FlagGroup {
            content,
            iterate_over: raw.iterate_over,
            expand_if_available: raw.expand_if_available,
            expand_if_not_available: raw.expand_if_not_available,
            expand_if_true: raw.expand_if_true,
            expand_if_false: raw.expand_if_false,
            expand_if_equal: raw.expand_if_equal,
        })
    }
}

impl From<FlagGroup> for RawFlagGroup {
    fn from(group: FlagGroup) -> Self {
        let (flags, flag_groups) = match group.content {
            FlagGroupContent::Flags(flags) => (flags, Vec::new()),
            FlagGroupContent::Groups(groups) => (Vec::new(), groups),
        };
        RawFlagGroup {
            flags,
            flag_groups,
            iterate_over: group.iterate_over,
            expand_if_available: group.expand_if_available,
            expand_if_not_available: group.expand_if_not_available,
            expand_if_true: group.expand_if_true,
            expand_if_false: group.expand_if_false,
            expand_if_equal: group.expand_if_equal,
        }
    }
}

/// Error parsing a flag template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("unterminated variable reference in `{0}`")]
    Unterminated(String),

    #[error("empty variable name in `{0}`")]
    EmptyVariable(String),

    #[error("`%` must be followed by `{{` or `%` in `{0}`")]
    StrayPercent(String),
}

/// One piece of a parsed flag template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateChunk {
    Literal(String),
    Variable(String),
}

/// A flag with `%{variable}` placeholders; `%%` is a literal percent sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FlagTemplate {
    raw: String,
    chunks: Vec<TemplateChunk>,
}

impl FlagTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut chunks = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars();

        while let Some(c) = chars.next() {
            if c != '%' {
                literal.push(c);
                continue;
            }
            match chars.next() {
                Some('%') => literal.push('%'),
                Some('{') => {
                    let mut name = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(TemplateError::Unterminated(raw.to_string()));
                    }
                    if name.trim().is_empty() {
                        return Err(TemplateError::EmptyVariable(raw.to_string()));
                    }
                    if !literal.is_empty() {
                        chunks.push(TemplateChunk::Literal(std::mem::take(&mut literal)));
                    }
                    chunks.push(TemplateChunk::Variable(name.trim().to_string()));
                }
                _ => return Err(TemplateError::StrayPercent(raw.to_string())),
            }
        }
        if !literal.is_empty() {
            chunks.push(TemplateChunk::Literal(literal));
        }

        Ok(FlagTemplate {
            raw: raw.to_string(),
            chunks,
        })
    }

    pub fn chunks(&self) -> &[TemplateChunk] {
        &self.chunks
    }

    /// Variables referenced by this template.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().filter_map(|c| match c {
            TemplateChunk::Variable(name) => Some(name.as_str()),
            TemplateChunk::Literal(_) => None,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for FlagTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for FlagTemplate {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FlagTemplate::parse(s)
    }
}

impl TryFrom<String> for FlagTemplate {
    type Error = TemplateError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        FlagTemplate::parse(&s)
    }
}

impl From<FlagTemplate> for String {
    fn from(t: FlagTemplate) -> Self {
        t.raw
    }
}
