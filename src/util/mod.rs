//! Shared utilities

pub mod config;
pub mod diagnostic;
pub mod fs;
pub mod hash;
pub mod paths;
pub mod tokenize;

pub use config::Config;
pub use diagnostic::Diagnostic;
pub use hash::Fingerprint;
