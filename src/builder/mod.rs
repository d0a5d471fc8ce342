//! Provider assembly.
//!
//! This module turns resolved features and FDO artifacts into build
//! variables, aggregates compilation and linking outputs across
//! dependencies, and memoizes the finished providers.

pub mod actions;
pub mod aggregate;
pub mod cache;
pub mod compilation;
pub mod linking;
pub mod module_map;
pub mod provider;
pub mod variables;

pub use actions::{Action, ActionConflict, ActionRegistry};
pub use aggregate::{aggregate, Aggregation, AggregationRequest, CcInfo, Dependency};
pub use cache::{resolve_many, ProviderCache};
pub use compilation::{CompilationContext, ModuleMapRef};
pub use linking::{LinkMode, LinkingOutputs, Linkopts, Runfiles, RunfilesPair};
pub use provider::{assemble, ProviderRequest, ToolchainProvider};
pub use variables::assemble_build_variables;
