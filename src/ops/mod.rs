//! High-level operations.
//!
//! This module contains the implementation of ccprovider commands.

pub mod analyze;
pub mod build_file;
pub mod inspect;

pub use analyze::{analyze_build, expand_flags, load_toolchain, AnalysisReport, AnalyzeOptions};
pub use build_file::{AttributeDefaults, BuildFile, BuildTarget, TargetKind};
pub use inspect::{resolve_feature_set, resolve_profiles, FdoReport};
