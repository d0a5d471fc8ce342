//! Implementation of `ccprovider features` and `ccprovider fdo`.
//!
//! Both inspect one stage of provider assembly in isolation, without a
//! build file.

use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;

use crate::builder::{Action, ActionRegistry};
use crate::core::configuration::BuildConfiguration;
use crate::core::label::Label;
use crate::core::toolchain::ToolchainDescriptor;
use crate::fdo::{detect_mode, resolve_fdo, FdoResolution};
use crate::features::{resolve_features, FeatureConfiguration, FeatureGraph, FeatureRequest};

/// Resolve the features enabled for `features` (a leading `-` disables)
/// under `config`.
pub fn resolve_feature_set(
    toolchain: &ToolchainDescriptor,
    config: &BuildConfiguration,
    features: &[String],
) -> Result<FeatureConfiguration> {
    let graph = Arc::new(FeatureGraph::build(toolchain)?);
    let mode = detect_mode(config)?;
    let requested = features
        .iter()
        .filter(|f| !f.starts_with('-'))
        .map(String::as_str);
    let disabled = features.iter().filter_map(|f| f.strip_prefix('-'));
    let request = FeatureRequest::new(config, requested, disabled).with_fdo_mode(mode);
    Ok(resolve_features(toolchain, &graph, &request)?)
}

/// FDO resolution of one target plus the actions it schedules.
#[derive(Debug, Clone, Serialize)]
pub struct FdoReport {
    #[serde(flatten)]
    pub resolution: FdoResolution,
    pub actions: Vec<Action>,
}

/// Resolve the profile inputs of `config` for `label`.
pub fn resolve_profiles(
    toolchain: &ToolchainDescriptor,
    config: &BuildConfiguration,
    label: &Label,
) -> Result<FdoReport> {
    let mode = detect_mode(config)?;
    let mut registry = ActionRegistry::new();
    let resolution = resolve_fdo(label, toolchain, config, mode, &mut registry)?;
    tracing::debug!(
        "{} resolved to {} with {} action(s)",
        label,
        resolution.mode,
        registry.len()
    );
    Ok(FdoReport {
        resolution,
        actions: registry.into_actions(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use crate::core::configuration::CompilationMode;
    use crate::fdo::{BranchFdoMode, ProfileReference};
    use crate::test_support::fixtures::{label, llvm_toolchain};

    #[test]
    fn test_feature_set_honors_polarity() {
        let tc = llvm_toolchain();
        let config = BuildConfiguration {
            compilation_mode: CompilationMode::Opt,
            ..Default::default()
        };

        let features =
            resolve_feature_set(&tc, &config, &["thin_lto".into(), "-module_maps".into()]).unwrap();
        assert!(features.is_enabled("opt"));
        assert!(features.is_enabled("thin_lto"));
        assert!(!features.is_enabled("module_maps"));
    }

    #[test]
    fn test_profiles_outside_opt_are_ignored() {
        let tc = llvm_toolchain();
        let mut config = BuildConfiguration::default();
        config.fdo.optimize = Some(ProfileReference::Path(PathBuf::from("/p/app.profdata")));

        let report = resolve_profiles(&tc, &config, &label("//app:app")).unwrap();
        assert_eq!(report.resolution.mode, BranchFdoMode::Off);
        assert!(report.actions.is_empty());
    }

    #[test]
    fn test_llvm_profile_schedules_symlink() {
        let tc = llvm_toolchain();
        let mut config = BuildConfiguration {
            compilation_mode: CompilationMode::Opt,
            ..Default::default()
        };
        config.fdo.optimize = Some(ProfileReference::Path(PathBuf::from("/p/app.profdata")));

        let report = resolve_profiles(&tc, &config, &label("//app:app")).unwrap();
        assert_eq!(report.resolution.mode, BranchFdoMode::LlvmFdo);
        let mnemonics: Vec<&str> = report.actions.iter().map(Action::mnemonic).collect();
        assert_eq!(mnemonics, vec!["Symlink"]);
    }

    #[test]
    fn test_unknown_profile_extension_fails() {
        let tc = llvm_toolchain();
        let mut config = BuildConfiguration {
            compilation_mode: CompilationMode::Opt,
            ..Default::default()
        };
        config.fdo.optimize = Some(ProfileReference::Path(PathBuf::from("/p/app.gcda")));

        assert!(resolve_profiles(&tc, &config, &label("//app:app")).is_err());
    }
}
