//! Core data model.
//!
//! This module contains the value types shared by every analysis stage:
//! - Labels and artifacts
//! - Toolchain descriptors and their feature declarations
//! - The build configuration snapshot and per-target attributes
//! - Libraries to link, build variables, and analysis errors

pub mod artifact;
pub mod configuration;
pub mod errors;
pub mod label;
pub mod library;
pub mod target;
pub mod toolchain;
pub mod variables;

pub use artifact::{Artifact, ArtifactKind};
pub use configuration::{BuildConfiguration, CompilationMode, FdoOptions};
pub use errors::{AnalysisError, AnalysisFailure, ErrorCollector, ErrorKind};
pub use label::Label;
pub use library::{library_identifier, ArtifactCategory, LibraryToLink};
pub use target::{HeadersCheckingMode, LinkTargetType, TargetAttributes};
pub use toolchain::{ActionConfig, Feature, FlagGroup, FlagSet, Tool, ToolchainDescriptor};
pub use variables::{BuildVariables, VariableValue};
