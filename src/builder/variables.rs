//! Build variable assembly.

use crate::core::configuration::BuildConfiguration;
use crate::core::toolchain::ToolchainDescriptor;
use crate::core::variables::BuildVariables;
use crate::fdo::{BranchFdoMode, FdoResolution};
use crate::features::{names, FeatureConfiguration};
use crate::util::paths::to_slash;

pub const SYSROOT: &str = "sysroot";
pub const MINIMUM_OS_VERSION: &str = "minimum_os_version";
pub const FDO_INSTRUMENT_PATH: &str = "fdo_instrument_path";
pub const FDO_PROFILE_PATH: &str = "fdo_profile_path";
pub const FDO_PREFETCH_HINTS_PATH: &str = "fdo_prefetch_hints_path";

/// Compute the toolchain-level variables for one target.
pub fn assemble_build_variables(
    toolchain: &ToolchainDescriptor,
    config: &BuildConfiguration,
    features: &FeatureConfiguration,
    fdo: &FdoResolution,
) -> BuildVariables {
    let mut vars = BuildVariables::new();

    if let Some(sysroot) = config.sysroot.as_ref().or(toolchain.builtin_sysroot.as_ref()) {
        vars.insert_string(SYSROOT, to_slash(sysroot));
    }

    if let Some(version) = &config.minimum_os_version {
        vars.insert_string(MINIMUM_OS_VERSION, version.clone());
    }

    if let Some(path) = &fdo.instrument_path {
        if features.is_enabled(names::FDO_INSTRUMENT) {
            vars.insert_string(FDO_INSTRUMENT_PATH, path.clone());
        }
    }

    if let Some(profile) = &fdo.artifacts.profile {
        let feature = match fdo.mode {
            BranchFdoMode::LlvmFdo => Some(names::FDO_OPTIMIZE),
            BranchFdoMode::AutoFdo => Some(names::AUTOFDO),
            BranchFdoMode::XbinaryFdo => Some(names::XBINARYFDO),
            BranchFdoMode::Off | BranchFdoMode::Vanilla => None,
        };
        match feature {
            Some(name) if features.is_enabled(name) => {
                vars.insert_string(FDO_PROFILE_PATH, to_slash(profile.exec_path()));
            }
            _ => tracing::debug!(
                "not exposing {} profile: matching feature is not enabled",
                fdo.mode
            ),
        }
    }

    if let Some(hints) = &fdo.artifacts.prefetch_hints {
        vars.insert_string(FDO_PREFETCH_HINTS_PATH, to_slash(hints.exec_path()));
    }

    vars
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::core::artifact::Artifact;
    use crate::features::{resolve_features, FeatureGraph, FeatureRequest};
    use crate::test_support::fixtures::{feature, toolchain};

    fn features_for(tc: &ToolchainDescriptor, mode: BranchFdoMode) -> FeatureConfiguration {
        let graph = Arc::new(FeatureGraph::build(tc).unwrap());
        let request = FeatureRequest {
            fdo_mode: mode,
            ..Default::default()
        };
        resolve_features(tc, &graph, &request).unwrap()
    }

    #[test]
    fn test_sysroot_override_wins() {
        let mut tc = toolchain("k8");
        tc.builtin_sysroot = Some(PathBuf::from("/builtin"));
        let features = features_for(&tc, BranchFdoMode::Off);
        let fdo = FdoResolution::default();

        let vars = assemble_build_variables(&tc, &BuildConfiguration::default(), &features, &fdo);
        assert_eq!(vars.get_string(SYSROOT), Some("/builtin"));

        let config = BuildConfiguration {
            sysroot: Some(PathBuf::from("/override")),
            minimum_os_version: Some("10.15".into()),
            ..Default::default()
        };
        let vars = assemble_build_variables(&tc, &config, &features, &fdo);
        assert_eq!(vars.get_string(SYSROOT), Some("/override"));
        assert_eq!(vars.get_string(MINIMUM_OS_VERSION), Some("10.15"));
    }

    #[test]
    fn test_profile_path_requires_matching_feature() {
        let mut fdo = FdoResolution {
            mode: BranchFdoMode::LlvmFdo,
            ..Default::default()
        };
        fdo.artifacts.profile = Some(Artifact::derived("out/bin", "app/_fdo/s/s.profdata"));
        fdo.artifacts.prefetch_hints = Some(Artifact::derived("out/bin", "app/_fdo/s/h.txt"));

        let tc = toolchain("k8");
        let vars = assemble_build_variables(
            &tc,
            &BuildConfiguration::default(),
            &features_for(&tc, BranchFdoMode::LlvmFdo),
            &fdo,
        );
        assert!(!vars.contains(FDO_PROFILE_PATH));
        assert_eq!(
            vars.get_string(FDO_PREFETCH_HINTS_PATH),
            Some("out/bin/app/_fdo/s/h.txt")
        );

        let mut tc = toolchain("k8");
        tc.features = vec![feature("fdo_optimize").build()];
        let vars = assemble_build_variables(
            &tc,
            &BuildConfiguration::default(),
            &features_for(&tc, BranchFdoMode::LlvmFdo),
            &fdo,
        );
        assert_eq!(
            vars.get_string(FDO_PROFILE_PATH),
            Some("out/bin/app/_fdo/s/s.profdata")
        );
    }
}
