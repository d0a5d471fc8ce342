//! Fixture builders for common test scenarios.

use std::path::PathBuf;

use crate::builder::aggregate::{CcInfo, Dependency};
use crate::builder::compilation::CompilationContext;
use crate::builder::linking::LinkingOutputs;
use crate::core::label::Label;
use crate::core::target::TargetAttributes;
use crate::core::toolchain::{ActionConfig, Feature, FeatureSet, ToolchainDescriptor};

/// A toolchain with no features and default capabilities.
pub fn toolchain(cpu: &str) -> ToolchainDescriptor {
    ToolchainDescriptor {
        identifier: format!("test-{}", cpu),
        target_cpu: cpu.to_string(),
        target_libc: "glibc".to_string(),
        compiler: "clang".to_string(),
        tool_paths: Default::default(),
        capabilities: Default::default(),
        builtin_sysroot: None,
        builtin_include_directories: Vec::new(),
        headers: Vec::new(),
        default_features: Vec::new(),
        default_action_configs: Vec::new(),
        unconditional_features: Vec::new(),
        features: Vec::new(),
        action_configs: Vec::new(),
    }
}

/// Builder for a [`Feature`] declaration.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    feature: Feature,
}

pub fn feature(name: &str) -> FeatureBuilder {
    FeatureBuilder {
        feature: Feature {
            name: name.to_string(),
            enabled: false,
            flag_sets: Vec::new(),
            env_sets: Vec::new(),
            requires: Vec::new(),
            implies: Vec::new(),
            provides: Vec::new(),
        },
    }
}

impl FeatureBuilder {
    pub fn enabled(mut self) -> Self {
        self.feature.enabled = true;
        self
    }

    pub fn implies(mut self, names: &[&str]) -> Self {
        self.feature
            .implies
            .extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Each inner slice is one alternative prerequisite set.
    pub fn requires(mut self, sets: &[&[&str]]) -> Self {
        self.feature.requires.extend(sets.iter().map(|set| FeatureSet {
            features: set.iter().map(|n| n.to_string()).collect(),
        }));
        self
    }

    pub fn provides(mut self, capabilities: &[&str]) -> Self {
        self.feature
            .provides
            .extend(capabilities.iter().map(|c| c.to_string()));
        self
    }

    pub fn build(self) -> Feature {
        self.feature
    }
}

pub fn action_config(name: &str, action: &str) -> ActionConfig {
    ActionConfig {
        config_name: name.to_string(),
        action_name: action.to_string(),
        enabled: false,
        tools: Vec::new(),
        flag_sets: Vec::new(),
        implies: Vec::new(),
    }
}

pub fn label(s: &str) -> Label {
    match Label::parse(s) {
        Ok(label) => label,
        Err(e) => panic!("bad fixture label {}: {}", s, e),
    }
}

/// Attributes for a target with nothing set.
pub fn target(s: &str) -> TargetAttributes {
    TargetAttributes::new(label(s))
}

/// A C/C++ dependency exposing the given context and outputs.
pub fn cc_dep(
    s: &str,
    compilation_context: CompilationContext,
    linking_outputs: Option<LinkingOutputs>,
) -> Dependency {
    Dependency::cc(
        label(s),
        CcInfo {
            compilation_context,
            linking_outputs,
        },
    )
}

/// A minimal LLVM toolchain in the descriptor TOML format.
pub const LLVM_TOOLCHAIN_TOML: &str = r#"
identifier = "clang-k8"
target_cpu = "k8"
compiler = "clang"
default_features = ["module_maps"]

[tool_paths]
gcc = "/usr/bin/clang"
ar = "/usr/bin/llvm-ar"
llvm-profdata = "/usr/bin/llvm-profdata"

[capabilities]
supports_pic = true
is_llvm = true

[[feature]]
name = "pic"

[[feature]]
name = "module_maps"

[[feature]]
name = "opt"

[[feature]]
name = "thin_lto"

[[feature]]
name = "fdo_optimize"

[[feature]]
name = "enable_fdo_thinlto"
"#;

pub fn llvm_toolchain() -> ToolchainDescriptor {
    match ToolchainDescriptor::from_toml_str(LLVM_TOOLCHAIN_TOML) {
        Ok(tc) => tc,
        Err(e) => panic!("bad fixture toolchain: {}", e),
    }
}

pub fn paths(items: &[&str]) -> Vec<PathBuf> {
    items.iter().map(PathBuf::from).collect()
}
