//! Feature resolution.
//!
//! The feature graph is built once per toolchain; each target resolves its
//! own enabled set against it and expands flags through the resulting
//! [`FeatureConfiguration`].

pub mod expand;
pub mod graph;
pub mod names;
pub mod resolve;

pub use expand::ExpansionError;
pub use graph::{FeatureGraph, Selectable};
pub use resolve::{
    candidate_features, resolve_features, FeatureConfiguration, FeatureRequest,
    ResolvedFeatureSet,
};
