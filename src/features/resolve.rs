//! Feature resolution for one target.
//!
//! Resolution assembles an ordered candidate list from the build
//! configuration, the target, and the toolchain, drops everything marked
//! unsupported, and hands the rest to the feature graph. The result is then
//! checked against the toolchain invariants.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use petgraph::graph::NodeIndex;
use serde::{Serialize, Serializer};

use crate::core::configuration::{BuildConfiguration, CompilationMode};
use crate::core::errors::AnalysisError;
use crate::core::toolchain::ToolchainDescriptor;
use crate::core::variables::BuildVariables;
use crate::fdo::BranchFdoMode;
use crate::features::expand::{
    expand_flag_set, expand_template, with_features_satisfied, ExpansionError, Scope,
};
use crate::features::graph::{FeatureGraph, Selectable};
use crate::features::names;

/// Everything the resolver needs to know about one (target, configuration).
#[derive(Debug, Clone, Default)]
pub struct FeatureRequest {
    pub requested: Vec<String>,
    pub unsupported: Vec<String>,
    pub compilation_mode: CompilationMode,
    pub is_host: bool,
    pub fission: bool,
    pub coverage: bool,
    pub llvm_coverage_map_format: bool,
    pub fdo_mode: BranchFdoMode,
    pub prefetch_hints: bool,
    pub lipo: bool,
    pub force_pic: bool,
}

impl FeatureRequest {
    /// Combine the build configuration with a target's own feature lists.
    pub fn new<'a>(
        config: &BuildConfiguration,
        target_requested: impl IntoIterator<Item = &'a str>,
        target_disabled: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut requested = config.requested_features.clone();
        requested.extend(target_requested.into_iter().map(String::from));
        let mut unsupported = config.disabled_features.clone();
        unsupported.extend(target_disabled.into_iter().map(String::from));

        FeatureRequest {
            requested,
            unsupported,
            compilation_mode: config.compilation_mode,
            is_host: config.is_host,
            fission: config.fission,
            coverage: config.collect_code_coverage,
            llvm_coverage_map_format: config.llvm_coverage_map_format,
            fdo_mode: BranchFdoMode::Off,
            prefetch_hints: config.fdo.prefetch_hints.is_some(),
            lipo: config.lipo,
            force_pic: config.force_pic,
        }
    }

    pub fn with_fdo_mode(mut self, mode: BranchFdoMode) -> Self {
        self.fdo_mode = mode;
        self
    }
}

/// The ordered enabled feature and action-config names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedFeatureSet {
    pub features: Vec<String>,
    pub action_configs: Vec<String>,
}

impl ResolvedFeatureSet {
    pub fn contains(&self, name: &str) -> bool {
        self.features.iter().any(|f| f == name) || self.action_configs.iter().any(|a| a == name)
    }
}

/// The resolved features of one target, with flag expansion over them.
#[derive(Debug, Clone)]
pub struct FeatureConfiguration {
    graph: Arc<FeatureGraph>,
    enabled: Vec<NodeIndex>,
    enabled_set: HashSet<NodeIndex>,
    resolved: ResolvedFeatureSet,
}

impl Serialize for FeatureConfiguration {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.resolved.serialize(serializer)
    }
}

impl PartialEq for FeatureConfiguration {
    fn eq(&self, other: &Self) -> bool {
        self.graph.toolchain() == other.graph.toolchain() && self.resolved == other.resolved
    }
}

impl FeatureConfiguration {
    fn new(graph: Arc<FeatureGraph>, enabled: Vec<NodeIndex>) -> Self {
        let mut resolved = ResolvedFeatureSet::default();
        for node in &enabled {
            match graph.selectable(*node) {
                Selectable::Feature(f) => resolved.features.push(f.name.clone()),
                Selectable::ActionConfig(a) => resolved.action_configs.push(a.config_name.clone()),
            }
        }
        let enabled_set = enabled.iter().copied().collect();
        FeatureConfiguration {
            graph,
            enabled,
            enabled_set,
            resolved,
        }
    }

    pub fn resolved(&self) -> &ResolvedFeatureSet {
        &self.resolved
    }

    /// Check whether a feature (not an action config) is enabled.
    pub fn is_enabled(&self, name: &str) -> bool {
        self.resolved.features.iter().any(|f| f == name)
    }

    pub fn is_action_config_enabled(&self, action: &str) -> bool {
        self.graph
            .action_config_for(action)
            .is_some_and(|node| self.enabled_set.contains(&node))
    }

    fn is_name_enabled(&self, name: &str) -> bool {
        self.graph
            .node(name)
            .is_some_and(|node| self.enabled_set.contains(&node))
    }

    /// Expand the command line for `action`.
    ///
    /// Flag sets of the action's config come first, then those of enabled
    /// features in declaration order.
    pub fn command_line(
        &self,
        action: &str,
        variables: &BuildVariables,
    ) -> Result<Vec<String>, ExpansionError> {
        let mut scope = Scope::new(variables);
        let mut out = Vec::new();

        if let Some(node) = self.graph.action_config_for(action) {
            if self.enabled_set.contains(&node) {
                if let Selectable::ActionConfig(config) = self.graph.selectable(node) {
                    for flag_set in &config.flag_sets {
                        if with_features_satisfied(&flag_set.with_features, |n| {
                            self.is_name_enabled(n)
                        }) {
                            expand_flag_set(flag_set, &mut scope, &mut out)?;
                        }
                    }
                }
            }
        }

        for node in &self.enabled {
            if let Selectable::Feature(feature) = self.graph.selectable(*node) {
                for flag_set in &feature.flag_sets {
                    if flag_set.actions.iter().any(|a| a == action)
                        && with_features_satisfied(&flag_set.with_features, |n| {
                            self.is_name_enabled(n)
                        })
                    {
                        expand_flag_set(flag_set, &mut scope, &mut out)?;
                    }
                }
            }
        }

        Ok(out)
    }

    /// Expand the environment for `action`; later entries win.
    pub fn environment(
        &self,
        action: &str,
        variables: &BuildVariables,
    ) -> Result<BTreeMap<String, String>, ExpansionError> {
        let scope = Scope::new(variables);
        let mut env = BTreeMap::new();
        for node in &self.enabled {
            if let Selectable::Feature(feature) = self.graph.selectable(*node) {
                for env_set in &feature.env_sets {
                    if env_set.actions.iter().any(|a| a == action)
                        && with_features_satisfied(&env_set.with_features, |n| {
                            self.is_name_enabled(n)
                        })
                    {
                        for entry in &env_set.env_entries {
                            env.insert(entry.key.clone(), expand_template(&entry.value, &scope)?);
                        }
                    }
                }
            }
        }
        Ok(env)
    }

    /// The tool for `action`: the first tool of its enabled action config
    /// whose `with_features` conditions hold.
    pub fn tool_for_action(&self, action: &str) -> Option<&Path> {
        let node = self.graph.action_config_for(action)?;
        if !self.enabled_set.contains(&node) {
            return None;
        }
        match self.graph.selectable(node) {
            Selectable::ActionConfig(config) => config
                .tools
                .iter()
                .find(|tool| {
                    with_features_satisfied(&tool.with_features, |n| self.is_name_enabled(n))
                })
                .map(|tool| tool.tool_path.as_path()),
            Selectable::Feature(_) => None,
        }
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|n| n == name) {
        list.push(name.to_string());
    }
}

/// Assemble the ordered candidate list for a request.
///
/// Unsupported names are not filtered here.
pub fn candidate_features(toolchain: &ToolchainDescriptor, request: &FeatureRequest) -> Vec<String> {
    let caps = &toolchain.capabilities;
    let unsupported = |name: &str| request.unsupported.iter().any(|u| u == name);
    let mut candidates = Vec::new();

    push_unique(&mut candidates, request.compilation_mode.as_str());

    for &name in names::DEFAULT_FEATURES {
        if !unsupported(name) {
            push_unique(&mut candidates, name);
        }
    }
    for &name in names::DEFAULT_ACTION_CONFIGS {
        push_unique(&mut candidates, name);
    }

    for name in &request.requested {
        push_unique(&mut candidates, name);
    }

    for name in toolchain.default_selectables() {
        push_unique(&mut candidates, &name);
    }

    if caps.supports_embedded_runtimes {
        push_unique(&mut candidates, names::STATIC_LINK_CPP_RUNTIMES);
    }

    push_unique(
        &mut candidates,
        if request.is_host {
            names::HOST
        } else {
            names::NONHOST
        },
    );

    if request.fission && caps.supports_fission {
        push_unique(&mut candidates, names::PER_OBJECT_DEBUG_INFO);
    }

    if request.coverage {
        push_unique(&mut candidates, names::COVERAGE);
        push_unique(
            &mut candidates,
            if request.llvm_coverage_map_format {
                names::LLVM_COVERAGE_MAP_FORMAT
            } else {
                names::GCC_COVERAGE_MAP_FORMAT
            },
        );
    }

    let thin_lto_allowed = caps.is_llvm && !unsupported(names::THIN_LTO);
    match request.fdo_mode {
        BranchFdoMode::Vanilla => push_unique(&mut candidates, names::FDO_INSTRUMENT),
        BranchFdoMode::LlvmFdo => {
            push_unique(&mut candidates, names::FDO_OPTIMIZE);
            if thin_lto_allowed {
                push_unique(&mut candidates, names::ENABLE_FDO_THINLTO);
            }
        }
        BranchFdoMode::AutoFdo => {
            push_unique(&mut candidates, names::AUTOFDO);
            if thin_lto_allowed {
                push_unique(&mut candidates, names::ENABLE_AFDO_THINLTO);
            }
        }
        BranchFdoMode::XbinaryFdo => {
            push_unique(&mut candidates, names::XBINARYFDO);
            if thin_lto_allowed {
                push_unique(&mut candidates, names::ENABLE_XFDO_THINLTO);
            }
        }
        BranchFdoMode::Off => {}
    }
    if request.prefetch_hints {
        push_unique(&mut candidates, names::FDO_PREFETCH_HINTS);
    }

    let static_runtime = request
        .requested
        .iter()
        .any(|r| r == names::STATIC_LINK_MSVCRT);
    let debug = request.compilation_mode == CompilationMode::Dbg;
    let runtime = match (static_runtime, debug) {
        (true, true) => names::STATIC_LINK_MSVCRT_DEBUG,
        (true, false) => names::STATIC_LINK_MSVCRT_NO_DEBUG,
        (false, true) => names::DYNAMIC_LINK_MSVCRT_DEBUG,
        (false, false) => names::DYNAMIC_LINK_MSVCRT_NO_DEBUG,
    };
    push_unique(&mut candidates, runtime);

    if request.lipo {
        push_unique(
            &mut candidates,
            if caps.is_llvm {
                names::THIN_LTO
            } else {
                names::LIPO
            },
        );
    }

    candidates
}

/// Resolve the enabled features for one target.
pub fn resolve_features(
    toolchain: &ToolchainDescriptor,
    graph: &Arc<FeatureGraph>,
    request: &FeatureRequest,
) -> Result<FeatureConfiguration, AnalysisError> {
    let mut unsupported: Vec<String> = request.unsupported.clone();
    if !toolchain.capabilities.supports_header_parsing {
        push_unique(&mut unsupported, names::PARSE_HEADERS);
        push_unique(&mut unsupported, names::PREPROCESS_HEADERS);
    }
    let is_unsupported = |name: &str| unsupported.iter().any(|u| u == name);

    let candidates: Vec<String> = candidate_features(toolchain, request)
        .into_iter()
        .filter(|c| !is_unsupported(c.as_str()))
        .collect();
    tracing::debug!("feature candidates: {:?}", candidates);

    let roots = candidates
        .iter()
        .map(String::as_str)
        .chain(toolchain.unconditional_features.iter().map(String::as_str));
    let enabled = graph.select(roots);
    let configuration = FeatureConfiguration::new(Arc::clone(graph), enabled);

    check_provides(graph, &configuration)?;

    for name in &unsupported {
        if configuration.is_name_enabled(name) {
            return Err(AnalysisError::configuration(
                "features",
                format!(
                    "the toolchain unconditionally implies feature `{}`, which this target marks unsupported",
                    name
                ),
            ));
        }
    }

    let pic_required = request.force_pic || toolchain.capabilities.needs_pic;
    if pic_required
        && !configuration.is_enabled(names::PIC)
        && !configuration.is_enabled(names::SUPPORTS_PIC)
    {
        return Err(AnalysisError::fatal(
            &toolchain.identifier,
            "pic",
            "PIC compilation is required by the configuration or toolchain, but neither `pic` nor `supports_pic` is enabled",
        ));
    }

    tracing::debug!(
        "resolved {} features and {} action configs",
        configuration.resolved.features.len(),
        configuration.resolved.action_configs.len()
    );
    Ok(configuration)
}

fn check_provides(
    graph: &FeatureGraph,
    configuration: &FeatureConfiguration,
) -> Result<(), AnalysisError> {
    let mut providers: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for node in &configuration.enabled {
        if let Selectable::Feature(feature) = graph.selectable(*node) {
            for capability in &feature.provides {
                providers
                    .entry(capability.as_str())
                    .or_default()
                    .push(&feature.name);
            }
        }
    }
    for (capability, features) in providers {
        if features.len() > 1 {
            return Err(AnalysisError::fatal(
                graph.toolchain(),
                format!("provides:{}", capability),
                format!(
                    "symbol `{}` is provided by all of the following enabled features: {}",
                    capability,
                    features.join(", ")
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::ErrorKind;
    use crate::test_support::fixtures::{feature, toolchain};

    fn resolve(
        tc: &ToolchainDescriptor,
        request: &FeatureRequest,
    ) -> Result<FeatureConfiguration, AnalysisError> {
        let graph = Arc::new(FeatureGraph::build(tc).unwrap());
        resolve_features(tc, &graph, request)
    }

    #[test]
    fn test_candidates_start_with_compilation_mode() {
        let tc = toolchain("k8");
        let request = FeatureRequest {
            compilation_mode: CompilationMode::Opt,
            ..Default::default()
        };
        let candidates = candidate_features(&tc, &request);
        assert_eq!(candidates[0], "opt");
        assert!(candidates.contains(&"nonhost".to_string()));
        assert!(candidates.contains(&"module_maps".to_string()));
    }

    #[test]
    fn test_unsupported_default_is_not_a_candidate() {
        let tc = toolchain("k8");
        let request = FeatureRequest {
            unsupported: vec!["module_maps".into()],
            ..Default::default()
        };
        assert!(!candidate_features(&tc, &request).contains(&"module_maps".to_string()));
    }

    #[test]
    fn test_resolved_set_excludes_unsupported() {
        let mut tc = toolchain("k8");
        tc.features = vec![
            feature("opt").build(),
            feature("module_maps").build(),
            feature("thin_lto").build(),
        ];
        tc.default_features = vec!["thin_lto".into()];
        let request = FeatureRequest {
            compilation_mode: CompilationMode::Opt,
            requested: vec!["thin_lto".into(), "module_maps".into()],
            unsupported: vec!["thin_lto".into(), "module_maps".into()],
            ..Default::default()
        };
        let config = resolve(&tc, &request).unwrap();
        assert!(config.is_enabled("opt"));
        assert!(!config.is_enabled("thin_lto"));
        assert!(!config.is_enabled("module_maps"));
    }

    #[test]
    fn test_unconditionally_implied_unsupported_feature_fails() {
        let mut tc = toolchain("k8");
        tc.features = vec![feature("module_maps").build()];
        tc.unconditional_features = vec!["module_maps".into()];
        let request = FeatureRequest {
            unsupported: vec!["module_maps".into()],
            ..Default::default()
        };
        let err = resolve(&tc, &request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("unconditionally implies feature `module_maps`"));
    }

    #[test]
    fn test_llvm_fdo_enables_thinlto_pseudo_feature() {
        let mut tc = toolchain("k8");
        tc.capabilities.is_llvm = true;
        tc.features = vec![
            feature("thin_lto").build(),
            feature("fdo_optimize").build(),
            feature("enable_fdo_thinlto").build(),
        ];
        let request = FeatureRequest {
            requested: vec!["thin_lto".into()],
            compilation_mode: CompilationMode::Opt,
            fdo_mode: BranchFdoMode::LlvmFdo,
            ..Default::default()
        };
        let config = resolve(&tc, &request).unwrap();
        assert!(config.is_enabled("fdo_optimize"));
        assert!(config.is_enabled("enable_fdo_thinlto"));
        assert!(config.is_enabled("thin_lto"));
    }

    #[test]
    fn test_thinlto_pseudo_feature_respects_unsupported_thin_lto() {
        let mut tc = toolchain("k8");
        tc.capabilities.is_llvm = true;
        tc.features = vec![feature("fdo_optimize").build(), feature("enable_fdo_thinlto").build()];
        let request = FeatureRequest {
            unsupported: vec!["thin_lto".into()],
            fdo_mode: BranchFdoMode::LlvmFdo,
            ..Default::default()
        };
        let config = resolve(&tc, &request).unwrap();
        assert!(config.is_enabled("fdo_optimize"));
        assert!(!config.is_enabled("enable_fdo_thinlto"));
    }

    #[test]
    fn test_instrumentation_takes_precedence() {
        let tc = toolchain("k8");
        let request = FeatureRequest {
            fdo_mode: BranchFdoMode::Vanilla,
            ..Default::default()
        };
        let candidates = candidate_features(&tc, &request);
        assert!(candidates.contains(&"fdo_instrument".to_string()));
        assert!(!candidates.contains(&"fdo_optimize".to_string()));
    }

    #[test]
    fn test_debug_mode_selects_dynamic_debug_runtime() {
        let mut tc = toolchain("k8");
        tc.features = vec![
            feature("dynamic_link_msvcrt_debug").build(),
            feature("dynamic_link_msvcrt_no_debug").build(),
        ];
        let request = FeatureRequest {
            compilation_mode: CompilationMode::Dbg,
            ..Default::default()
        };
        let config = resolve(&tc, &request).unwrap();
        assert!(config.is_enabled("dynamic_link_msvcrt_debug"));
        assert!(!config.is_enabled("dynamic_link_msvcrt_no_debug"));
    }

    #[test]
    fn test_static_runtime_request() {
        let tc = toolchain("k8");
        let request = FeatureRequest {
            requested: vec!["static_link_msvcrt".into()],
            ..Default::default()
        };
        let candidates = candidate_features(&tc, &request);
        assert!(candidates.contains(&"static_link_msvcrt_no_debug".to_string()));
        assert!(!candidates.contains(&"dynamic_link_msvcrt_no_debug".to_string()));
    }

    #[test]
    fn test_lipo_mapping() {
        let mut tc = toolchain("k8");
        let request = FeatureRequest {
            lipo: true,
            ..Default::default()
        };
        assert!(candidate_features(&tc, &request).contains(&"lipo".to_string()));
        tc.capabilities.is_llvm = true;
        let candidates = candidate_features(&tc, &request);
        assert!(candidates.contains(&"thin_lto".to_string()));
        assert!(!candidates.contains(&"lipo".to_string()));
    }

    #[test]
    fn test_fission_requires_toolchain_support() {
        let mut tc = toolchain("k8");
        let request = FeatureRequest {
            fission: true,
            ..Default::default()
        };
        assert!(!candidate_features(&tc, &request).contains(&"per_object_debug_info".to_string()));
        tc.capabilities.supports_fission = true;
        assert!(candidate_features(&tc, &request).contains(&"per_object_debug_info".to_string()));
    }

    #[test]
    fn test_coverage_format_variants_are_exclusive() {
        let tc = toolchain("k8");
        let request = FeatureRequest {
            coverage: true,
            llvm_coverage_map_format: true,
            ..Default::default()
        };
        let candidates = candidate_features(&tc, &request);
        assert!(candidates.contains(&"llvm_coverage_map_format".to_string()));
        assert!(!candidates.contains(&"gcc_coverage_map_format".to_string()));
    }

    #[test]
    fn test_provides_collision_is_fatal() {
        let mut tc = toolchain("k8");
        tc.features = vec![
            feature("libcxx").provides(&["stdlib"]).build(),
            feature("libstdcxx").provides(&["stdlib"]).build(),
        ];
        let request = FeatureRequest {
            requested: vec!["libcxx".into(), "libstdcxx".into()],
            ..Default::default()
        };
        let err = resolve(&tc, &request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FatalInternal);
        assert!(err.to_string().contains("stdlib"));
        assert!(err.message().contains("libcxx, libstdcxx"));
    }

    #[test]
    fn test_pic_required_but_not_enabled() {
        let mut tc = toolchain("k8");
        tc.capabilities.needs_pic = true;
        let err = resolve(&tc, &FeatureRequest::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FatalInternal);

        tc.features = vec![feature("pic").build()];
        assert!(resolve(&tc, &FeatureRequest::default()).is_ok());
    }

    #[test]
    fn test_header_parsing_unsupported_without_capability() {
        let mut tc = toolchain("k8");
        tc.features = vec![feature("parse_headers").build()];
        let request = FeatureRequest {
            requested: vec!["parse_headers".into()],
            ..Default::default()
        };
        assert!(!resolve(&tc, &request).unwrap().is_enabled("parse_headers"));

        tc.capabilities.supports_header_parsing = true;
        assert!(resolve(&tc, &request).unwrap().is_enabled("parse_headers"));
    }

    #[test]
    fn test_command_line_order_and_tool_selection() {
        let toml = r#"
identifier = "k8-gcc"
target_cpu = "k8"

[[feature]]
name = "opt"
[[feature.flag_sets]]
actions = ["c++-compile"]
[[feature.flag_sets.flag_groups]]
flags = ["-O2"]

[[feature]]
name = "sysroot"
enabled = true
[[feature.flag_sets]]
actions = ["c++-compile"]
expand_if_all_available = ["sysroot"]
[[feature.flag_sets.flag_groups]]
flags = ["--sysroot=%{sysroot}"]
[[feature.env_sets]]
actions = ["c++-compile"]
[[feature.env_sets.env_entries]]
key = "SYSROOT"
value = "%{sysroot}"

[[action_config]]
config_name = "c++-compile"
action_name = "c++-compile"
enabled = true
[[action_config.tools]]
tool_path = "bin/clang-opt"
with_features = [{ features = ["opt"] }]
[[action_config.tools]]
tool_path = "bin/clang"
[[action_config.flag_sets]]
[[action_config.flag_sets.flag_groups]]
flags = ["-c"]
"#;
        let tc = ToolchainDescriptor::from_toml_str(toml).unwrap();
        let request = FeatureRequest {
            compilation_mode: CompilationMode::Opt,
            ..Default::default()
        };
        let config = resolve(&tc, &request).unwrap();

        let mut vars = BuildVariables::new();
        vars.insert_string("sysroot", "/sr");
        assert_eq!(
            config.command_line("c++-compile", &vars).unwrap(),
            vec!["-c", "-O2", "--sysroot=/sr"]
        );
        assert_eq!(
            config.environment("c++-compile", &vars).unwrap().get("SYSROOT"),
            Some(&"/sr".to_string())
        );
        assert_eq!(
            config.tool_for_action("c++-compile"),
            Some(Path::new("bin/clang-opt"))
        );
        assert!(config.is_action_config_enabled("c++-compile"));
        assert!(config.command_line("c++-link-executable", &vars).unwrap().is_empty());
    }
}
