//! Toolchain provider assembly.
//!
//! A [`ToolchainProvider`] is everything downstream action creation needs for
//! one target: resolved features, build variables, profile artifacts, the
//! aggregated compilation and linking outputs, and the scheduled actions.

use std::sync::Arc;

use serde::Serialize;

use crate::builder::actions::{Action, ActionRegistry};
use crate::builder::aggregate::{aggregate, check_dependencies, Aggregation, AggregationRequest, CcInfo, Dependency};
use crate::builder::linking::LinkMode;
use crate::builder::variables::assemble_build_variables;
use crate::core::configuration::BuildConfiguration;
use crate::core::errors::{AnalysisFailure, ErrorCollector};
use crate::core::label::Label;
use crate::core::target::TargetAttributes;
use crate::core::toolchain::ToolchainDescriptor;
use crate::core::variables::BuildVariables;
use crate::fdo::{detect_mode, resolve_fdo, BranchFdoMode, FdoResolution, ProfileArtifacts};
use crate::features::names::{self, actions};
use crate::features::{resolve_features, ExpansionError, FeatureConfiguration, FeatureGraph, FeatureRequest};
use crate::util::paths::to_slash;

/// Inputs for one target's provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderRequest<'a> {
    pub target: &'a TargetAttributes,
    pub deps: &'a [Dependency],
    pub toolchain: &'a ToolchainDescriptor,
    /// Feature graph built from `toolchain`
    pub graph: &'a Arc<FeatureGraph>,
    pub config: &'a BuildConfiguration,
}

/// The resolved configuration of one target.
#[derive(Debug, Clone, Serialize)]
pub struct ToolchainProvider {
    pub label: Label,
    pub toolchain: String,
    pub features: FeatureConfiguration,
    pub fdo_mode: BranchFdoMode,
    pub profile_artifacts: ProfileArtifacts,
    pub build_variables: BuildVariables,
    #[serde(flatten)]
    pub aggregation: Aggregation,
    pub actions: Vec<Action>,
}

fn is_link_action(action: &str) -> bool {
    matches!(
        action,
        actions::CPP_LINK_EXECUTABLE
            | actions::CPP_LINK_DYNAMIC_LIBRARY
            | actions::CPP_LINK_NODEPS_DYNAMIC_LIBRARY
            | actions::CPP_LINK_STATIC_LIBRARY
    )
}

impl ToolchainProvider {
    /// What dependents of this target see.
    pub fn cc_info(&self) -> CcInfo {
        self.aggregation.cc_info()
    }

    /// Variables for compile actions: toolchain variables plus include paths,
    /// defines, and user copts.
    pub fn compile_variables(&self) -> BuildVariables {
        let mut vars = self.build_variables.clone();
        self.aggregation.compilation_context.add_variables(&mut vars);
        vars.insert_list("user_compile_flags", self.aggregation.copts.clone());
        vars
    }

    /// Variables for link actions.
    pub fn link_variables(&self, mode: LinkMode) -> BuildVariables {
        let mut vars = self.build_variables.clone();
        let outputs = &self.aggregation.linking_outputs;
        let use_pic = self.features.is_enabled(names::PIC);
        vars.insert_list("user_link_flags", outputs.linkopt_flags());
        vars.insert_list(
            "libraries_to_link",
            outputs
                .link_line(mode, use_pic)
                .into_iter()
                .map(|l| to_slash(l.artifact().exec_path()))
                .collect(),
        );
        vars
    }

    /// Expand the command line for `action` with the matching variables.
    ///
    /// Link actions link dynamically for shared-library outputs and
    /// statically otherwise.
    pub fn command_line(&self, action: &str) -> Result<Vec<String>, ExpansionError> {
        let vars = if is_link_action(action) {
            let mode = match action {
                actions::CPP_LINK_DYNAMIC_LIBRARY | actions::CPP_LINK_NODEPS_DYNAMIC_LIBRARY => {
                    LinkMode::Dynamic
                }
                _ => LinkMode::Static,
            };
            self.link_variables(mode)
        } else {
            self.compile_variables()
        };
        self.features.command_line(action, &vars)
    }
}

/// Assemble the provider for one target.
///
/// The dependency check fails fast. Configuration and attribute problems
/// are collected so every independent diagnostic is reported at once; a
/// failure that leaves nothing to continue with stops early with what has
/// been collected so far.
pub fn assemble(request: &ProviderRequest<'_>) -> Result<ToolchainProvider, AnalysisFailure> {
    let target = request.target;
    let label = &target.label;
    let toolchain = request.toolchain;
    tracing::debug!("assembling provider for {} with {}", label, toolchain.identifier);

    check_dependencies(target, request.deps)
        .map_err(|e| AnalysisFailure::single(label.clone(), e))?;

    let mut errors = ErrorCollector::new();

    let mode = errors.or_default(detect_mode(request.config), BranchFdoMode::Off);

    let feature_request = FeatureRequest::new(
        request.config,
        target.requested_features(),
        target.disabled_features(),
    )
    .with_fdo_mode(mode);
    let features = match resolve_features(toolchain, request.graph, &feature_request) {
        Ok(features) => features,
        Err(e) => {
            errors.push(e);
            return Err(AnalysisFailure::new(label.clone(), errors.into_errors()));
        }
    };

    let mut registry = ActionRegistry::new();
    let fdo = errors.or_default(
        resolve_fdo(label, toolchain, request.config, mode, &mut registry),
        FdoResolution::default(),
    );

    let build_variables = assemble_build_variables(toolchain, request.config, &features, &fdo);

    let aggregation_request = AggregationRequest {
        target,
        deps: request.deps,
        toolchain,
        config: request.config,
        features: &features,
    };
    let aggregation = match aggregate(&aggregation_request, &mut registry, &mut errors) {
        Ok(aggregation) => aggregation,
        Err(e) => {
            errors.push(e);
            return Err(AnalysisFailure::new(label.clone(), errors.into_errors()));
        }
    };

    let provider = ToolchainProvider {
        label: label.clone(),
        toolchain: toolchain.identifier.clone(),
        features,
        fdo_mode: fdo.mode,
        profile_artifacts: fdo.artifacts,
        build_variables,
        aggregation,
        actions: registry.into_actions(),
    };
    errors.finish(label, provider)
}
