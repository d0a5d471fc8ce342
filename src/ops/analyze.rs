//! Implementation of `ccprovider analyze`.
//!
//! Targets of a build file are ordered by their `deps`, grouped into levels
//! whose members only depend on earlier levels, and each level is resolved
//! in parallel through the provider cache.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use crate::builder::{resolve_many, Dependency, ProviderCache, ProviderRequest, Runfiles, ToolchainProvider};
use crate::core::configuration::BuildConfiguration;
use crate::core::errors::{AnalysisError, AnalysisFailure};
use crate::core::label::Label;
use crate::core::target::TargetAttributes;
use crate::core::toolchain::ToolchainDescriptor;
use crate::features::FeatureGraph;
use crate::ops::build_file::{AttributeDefaults, BuildFile, BuildTarget, TargetKind};

/// Load a toolchain definition from disk.
pub fn load_toolchain(path: &Path) -> Result<ToolchainDescriptor> {
    let contents = crate::util::fs::read_to_string(path)?;
    ToolchainDescriptor::from_toml_str(&contents)
        .with_context(|| format!("failed to parse toolchain: {}", path.display()))
}

/// Options for the analyze command.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Targets to analyze with their dependencies (empty = all)
    pub targets: Vec<Label>,

    /// Defaults for attributes a target leaves unset
    pub defaults: AttributeDefaults,
}

/// Providers and failures of one analysis pass, in build file order.
#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub providers: Vec<Arc<ToolchainProvider>>,
    pub failures: Vec<AnalysisFailure>,
}

impl AnalysisReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn provider(&self, label: &Label) -> Option<&Arc<ToolchainProvider>> {
        self.providers.iter().find(|p| &p.label == label)
    }

    pub fn failure(&self, label: &Label) -> Option<&AnalysisFailure> {
        self.failures.iter().find(|f| &f.target == label)
    }
}

enum Outcome {
    Provider(Arc<ToolchainProvider>),
    Failed,
}

struct TargetGraph<'a> {
    graph: DiGraph<&'a BuildTarget, ()>,
    nodes: HashMap<&'a Label, NodeIndex>,
}

/// Index targets and add an edge from every dependency to its dependent.
///
/// Dependencies naming no target are returned as attribute errors.
fn build_graph(build: &BuildFile) -> Result<(TargetGraph<'_>, Vec<AnalysisFailure>)> {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();
    for target in &build.targets {
        let node = graph.add_node(target);
        if nodes.insert(&target.label, node).is_some() {
            bail!("target `{}` is declared more than once", target.label);
        }
    }

    let mut failures = Vec::new();
    for target in &build.targets {
        let to = nodes[&target.label];
        let mut errors = Vec::new();
        for dep in &target.deps {
            match nodes.get(dep) {
                Some(&from) => {
                    graph.update_edge(from, to, ());
                }
                None => errors.push(AnalysisError::attribute(
                    &target.label,
                    "deps",
                    format!("no target named `{}` in the build file", dep),
                )),
            }
        }
        if !errors.is_empty() {
            failures.push(AnalysisFailure::new(target.label.clone(), errors));
        }
    }

    Ok((TargetGraph { graph, nodes }, failures))
}

/// Failures for the members of `component` if it forms a dependency cycle.
fn cycle_failures(graph: &DiGraph<&BuildTarget, ()>, component: &[NodeIndex]) -> Vec<AnalysisFailure> {
    let is_cycle = component.len() > 1
        || component
            .first()
            .is_some_and(|&n| graph.contains_edge(n, n));
    if !is_cycle {
        return Vec::new();
    }
    let mut members: Vec<String> = component
        .iter()
        .map(|&n| graph[n].label.to_string())
        .collect();
    members.sort();
    component
        .iter()
        .map(|&node| {
            AnalysisFailure::single(
                graph[node].label.clone(),
                AnalysisError::configuration(
                    "deps",
                    format!("dependency cycle between {}", members.join(", ")),
                ),
            )
        })
        .collect()
}

/// The targets to analyze: the requested ones plus their transitive deps.
fn selected_nodes(targets: &TargetGraph<'_>, requested: &[Label]) -> Result<HashSet<NodeIndex>> {
    if requested.is_empty() {
        return Ok(targets.graph.node_indices().collect());
    }

    let mut selected = HashSet::new();
    let reversed = Reversed(&targets.graph);
    for label in requested {
        let Some(&start) = targets.nodes.get(label) else {
            bail!("unknown target `{}`", label);
        };
        let mut dfs = Dfs::new(reversed, start);
        while let Some(node) = dfs.next(reversed) {
            selected.insert(node);
        }
    }
    Ok(selected)
}

/// What a dependent sees of an already-analyzed target.
fn dependency_view(target: &BuildTarget, outcome: Option<&Outcome>) -> Dependency {
    match target.kind {
        TargetKind::Filegroup => Dependency::opaque(target.label.clone())
            .with_runfiles(target.source_artifacts().into_iter().collect::<Runfiles>()),
        TargetKind::Cc => match outcome {
            Some(Outcome::Provider(provider)) => {
                Dependency::cc(target.label.clone(), provider.cc_info())
                    .with_runfiles(provider.aggregation.runfiles.dynamic_mode.clone())
            }
            _ => Dependency {
                label: target.label.clone(),
                is_cc: true,
                cc_info: None,
                runfiles: Runfiles::new(),
            },
        },
    }
}

/// Analyze every selected C/C++ target of `build`.
///
/// A target whose dependency failed, or sits on a dependency cycle, still
/// runs; the missing compilation info then fails its dependency check unless
/// the target opts out. Targets unrelated to a failure are unaffected.
pub fn analyze_build(
    toolchain: &ToolchainDescriptor,
    build: &BuildFile,
    config: &BuildConfiguration,
    cache: &ProviderCache,
    opts: &AnalyzeOptions,
) -> Result<AnalysisReport> {
    let feature_graph = Arc::new(FeatureGraph::build(toolchain)?);
    let (targets, mut failures) = build_graph(build)?;
    let selected = selected_nodes(&targets, &opts.targets)?;
    let graph = &targets.graph;

    let mut outcomes: HashMap<NodeIndex, Outcome> = HashMap::new();
    for failure in &failures {
        outcomes.insert(targets.nodes[&failure.target], Outcome::Failed);
    }

    // Components come out dependents-first; reversed, every dependency
    // precedes its dependents. Level = 1 + deepest dependency level.
    let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
    let mut levels: Vec<Vec<NodeIndex>> = Vec::new();
    for component in tarjan_scc(graph).into_iter().rev() {
        let level = component
            .iter()
            .flat_map(|&node| graph.neighbors_directed(node, petgraph::Direction::Incoming))
            .filter_map(|dep| depth.get(&dep).map(|d| d + 1))
            .max()
            .unwrap_or(0);
        for &node in &component {
            depth.insert(node, level);
        }

        let cycle = cycle_failures(graph, &component);
        if !cycle.is_empty() {
            for &node in &component {
                outcomes.insert(node, Outcome::Failed);
            }
            failures.extend(cycle);
            continue;
        }

        let &[node] = component.as_slice() else {
            continue;
        };
        if !selected.contains(&node)
            || graph[node].kind != TargetKind::Cc
            || outcomes.contains_key(&node)
        {
            continue;
        }
        if levels.len() <= level {
            levels.resize_with(level + 1, Vec::new);
        }
        levels[level].push(node);
    }

    for (index, level) in levels.iter().enumerate() {
        tracing::debug!("analyzing level {} ({} targets)", index, level.len());

        let attributes: Vec<TargetAttributes> = level
            .iter()
            .map(|&node| graph[node].to_attributes(opts.defaults))
            .collect();
        let deps: Vec<Vec<Dependency>> = level
            .iter()
            .map(|&node| {
                graph[node]
                    .deps
                    .iter()
                    .map(|dep| {
                        let dep_node = targets.nodes[dep];
                        dependency_view(graph[dep_node], outcomes.get(&dep_node))
                    })
                    .collect()
            })
            .collect();
        let requests: Vec<ProviderRequest<'_>> = attributes
            .iter()
            .zip(&deps)
            .map(|(target, deps)| ProviderRequest {
                target,
                deps,
                toolchain,
                graph: &feature_graph,
                config,
            })
            .collect();

        for (&node, result) in level.iter().zip(resolve_many(cache, &requests)) {
            let outcome = match result {
                Ok(provider) => Outcome::Provider(provider),
                Err(failure) => {
                    tracing::debug!("analysis of {} failed", failure.target);
                    failures.push(failure);
                    Outcome::Failed
                }
            };
            outcomes.insert(node, outcome);
        }
    }

    let mut report = AnalysisReport::default();
    for target in &build.targets {
        let node = targets.nodes[&target.label];
        if !selected.contains(&node) {
            continue;
        }
        if let Some(Outcome::Provider(provider)) = outcomes.get(&node) {
            report.providers.push(Arc::clone(provider));
        }
    }
    let position: HashMap<&Label, usize> = build
        .targets
        .iter()
        .enumerate()
        .map(|(i, t)| (&t.label, i))
        .collect();
    failures.retain(|f| selected.contains(&targets.nodes[&f.target]));
    failures.sort_by_key(|f| position[&f.target]);
    report.failures = failures;

    tracing::info!(
        "analyzed {} targets, {} failed",
        report.providers.len() + report.failures.len(),
        report.failures.len()
    );
    Ok(report)
}

/// Expand the command line of `action` for one analyzed target.
pub fn expand_flags(report: &AnalysisReport, label: &Label, action: &str) -> Result<Vec<String>> {
    let Some(provider) = report.provider(label) else {
        bail!("`{}` was not analyzed successfully", label);
    };
    provider
        .command_line(action)
        .with_context(|| format!("failed to expand `{}` for {}", action, label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::artifact::Artifact;
    use crate::core::errors::ErrorKind;
    use crate::test_support::fixtures::{label, toolchain};

    fn analyze(build: &str, targets: &[&str]) -> AnalysisReport {
        let build = BuildFile::from_toml_str(build).unwrap();
        let opts = AnalyzeOptions {
            targets: targets.iter().map(|t| label(t)).collect(),
            ..Default::default()
        };
        analyze_build(
            &toolchain("k8"),
            &build,
            &BuildConfiguration::default(),
            &ProviderCache::new(),
            &opts,
        )
        .unwrap()
    }

    const CHAIN: &str = r#"
[[target]]
label = "//net:http"
srcs = ["http.cc"]
hdrs = ["http.h"]
deps = ["//base:base", "//data:certs"]

[[target]]
label = "//base:base"
srcs = ["base.cc"]
hdrs = ["base.h"]
defines = ["BASE=1"]

[[target]]
label = "//data:certs"
kind = "filegroup"
srcs = ["ca.pem"]
"#;

    #[test]
    fn test_dependencies_flow_into_dependents() {
        let report = analyze(CHAIN, &[]);
        assert!(report.is_success());

        let labels: Vec<String> = report.providers.iter().map(|p| p.label.to_string()).collect();
        assert_eq!(labels, vec!["//net:http", "//base:base"]);

        let http = report.provider(&label("//net:http")).unwrap();
        let ctx = &http.aggregation.compilation_context;
        assert!(ctx.declared_include_srcs.contains(&Artifact::source("base/base.h")));
        assert!(ctx.defines.contains(&"BASE=1".to_string()));
        assert!(http
            .aggregation
            .runfiles
            .dynamic_mode
            .contains(&Artifact::source("data/ca.pem")));
    }

    #[test]
    fn test_target_filter_selects_transitive_deps() {
        let report = analyze(CHAIN, &["//base:base"]);
        assert_eq!(report.providers.len(), 1);
        assert!(report.provider(&label("//net:http")).is_none());
    }

    #[test]
    fn test_unknown_filter_target_is_an_error() {
        let build = BuildFile::from_toml_str(CHAIN).unwrap();
        let opts = AnalyzeOptions {
            targets: vec![label("//nope:nope")],
            ..Default::default()
        };
        let err = analyze_build(
            &toolchain("k8"),
            &build,
            &BuildConfiguration::default(),
            &ProviderCache::new(),
            &opts,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown target"));
    }

    #[test]
    fn test_unknown_dep_fails_target_and_dependents() {
        let report = analyze(
            r#"
[[target]]
label = "//app:app"
deps = ["//lib:lib"]

[[target]]
label = "//lib:lib"
deps = ["//missing:missing"]
"#,
            &[],
        );
        assert!(report.providers.is_empty());

        let lib = report.failure(&label("//lib:lib")).unwrap();
        assert!(lib.errors[0].message().contains("//missing:missing"));

        let app = report.failure(&label("//app:app")).unwrap();
        assert!(app.has_kind(ErrorKind::Attribute));
        assert!(app.errors[0].message().contains("//lib:lib"));
    }

    #[test]
    fn test_cycle_fails_only_its_members_and_dependents() {
        let report = analyze(
            r#"
[[target]]
label = "//a:a"
deps = ["//b:b"]

[[target]]
label = "//b:b"
deps = ["//a:a"]

[[target]]
label = "//c:c"

[[target]]
label = "//d:d"
deps = ["//a:a"]
"#,
            &[],
        );
        assert!(report.provider(&label("//c:c")).is_some());
        assert_eq!(report.providers.len(), 1);

        let failed: Vec<String> = report.failures.iter().map(|f| f.target.to_string()).collect();
        assert_eq!(failed, vec!["//a:a", "//b:b", "//d:d"]);
        for cyclic in ["//a:a", "//b:b"] {
            let failure = report.failure(&label(cyclic)).unwrap();
            assert!(failure.has_kind(ErrorKind::Configuration));
            assert!(failure.errors[0].message().contains("//a:a, //b:b"));
        }
        assert!(report
            .failure(&label("//d:d"))
            .unwrap()
            .has_kind(ErrorKind::Attribute));
    }

    #[test]
    fn test_duplicate_label_is_rejected() {
        let build = BuildFile::from_toml_str(
            "[[target]]\nlabel = \"//a:a\"\n\n[[target]]\nlabel = \"//a:a\"\n",
        )
        .unwrap();
        let err = analyze_build(
            &toolchain("k8"),
            &build,
            &BuildConfiguration::default(),
            &ProviderCache::new(),
            &AnalyzeOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_expand_flags_requires_a_provider() {
        let report = analyze(CHAIN, &[]);
        let err = expand_flags(&report, &label("//data:certs"), "c++-compile").unwrap_err();
        assert!(err.to_string().contains("not analyzed"));
    }
}
