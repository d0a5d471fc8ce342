//! Test utilities for ccprovider unit tests.
//!
//! Fixtures build toolchains, features, targets, and dependencies with the
//! minimum of boilerplate so tests can state only what they exercise.
//!
//! # Example
//!
//! ```rust,ignore
//! use ccprovider::test_support::fixtures::{feature, toolchain};
//!
//! let mut tc = toolchain("k8");
//! tc.features = vec![feature("opt").implies(&["lto"]).build(), feature("lto").build()];
//! ```

pub mod fixtures;

pub use fixtures::*;
