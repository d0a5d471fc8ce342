//! ccprovider - analysis-time C/C++ toolchain configuration
//!
//! This crate turns a toolchain definition, a build configuration, and a
//! target's attributes into a resolved provider: enabled features, build
//! variables, staged FDO profiles, and the aggregated compilation and
//! linking outputs dependents consume.

pub mod builder;
pub mod core;
pub mod fdo;
pub mod features;
pub mod ops;
pub mod util;

/// Fixtures shared by unit tests.
#[cfg(test)]
pub mod test_support;

pub use builder::{assemble, CcInfo, Dependency, ProviderCache, ProviderRequest, ToolchainProvider};
pub use core::{
    AnalysisError, AnalysisFailure, BuildConfiguration, Label, TargetAttributes,
    ToolchainDescriptor,
};
pub use features::{FeatureConfiguration, FeatureGraph};
