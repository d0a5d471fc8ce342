//! Analysis error types and diagnostics.
//!
//! Three kinds of failure can come out of analysis:
//! - configuration errors (toolchain declarations, FDO inputs, missing tools)
//! - attribute errors (misuse of a target attribute)
//! - fatal internal errors (toolchain invariants that cannot be recovered from)
//!
//! Attribute and configuration errors are collected per target so a single
//! pass can report every independent problem.

use std::fmt;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::label::Label;
use crate::util::diagnostic::Diagnostic;

/// The category of an [`AnalysisError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Attribute,
    FatalInternal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Attribute => "attribute",
            ErrorKind::FatalInternal => "fatal-internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single analysis failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum AnalysisError {
    /// A malformed or contradictory toolchain/configuration input.
    #[error("configuration error in `{field}`: {message}")]
    #[diagnostic(code(ccprovider::config::invalid))]
    Configuration { field: String, message: String },

    /// A target-level attribute misuse.
    #[error("{target}: in attribute `{attribute}`: {message}")]
    #[diagnostic(code(ccprovider::attribute::invalid))]
    Attribute {
        target: Label,
        attribute: String,
        message: String,
    },

    /// A toolchain-definition invariant violation.
    #[error("toolchain `{toolchain}` violates `{invariant}`: {message}")]
    #[diagnostic(code(ccprovider::toolchain::invariant))]
    FatalInternal {
        toolchain: String,
        invariant: String,
        message: String,
    },
}

impl AnalysisError {
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn attribute(
        target: &Label,
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        AnalysisError::Attribute {
            target: target.clone(),
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    pub fn fatal(
        toolchain: impl Into<String>,
        invariant: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        AnalysisError::FatalInternal {
            toolchain: toolchain.into(),
            invariant: invariant.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Configuration { .. } => ErrorKind::Configuration,
            AnalysisError::Attribute { .. } => ErrorKind::Attribute,
            AnalysisError::FatalInternal { .. } => ErrorKind::FatalInternal,
        }
    }

    /// The diagnostic message without location prefixes.
    pub fn message(&self) -> &str {
        match self {
            AnalysisError::Configuration { message, .. }
            | AnalysisError::Attribute { message, .. }
            | AnalysisError::FatalInternal { message, .. } => message,
        }
    }

    /// Convert to a user-facing diagnostic attached to `target`.
    pub fn to_diagnostic(&self, target: Option<&Label>) -> Diagnostic {
        match self {
            AnalysisError::Configuration { field, message } => {
                let mut diag = Diagnostic::error(message.clone()).with_attribute(field.clone());
                if let Some(target) = target {
                    diag = diag.with_target(target.to_string());
                }
                if field.starts_with("tool_paths.") {
                    diag = diag.with_suggestion(format!(
                        "Declare `{}` in the toolchain definition",
                        field
                    ));
                }
                diag
            }

            AnalysisError::Attribute {
                target,
                attribute,
                message,
            } => Diagnostic::error(message.clone())
                .with_target(target.to_string())
                .with_attribute(attribute.clone()),

            AnalysisError::FatalInternal {
                toolchain,
                invariant,
                message,
            } => {
                let mut diag = Diagnostic::error(message.clone())
                    .with_context(format!("toolchain: {}", toolchain))
                    .with_context(format!("invariant: {}", invariant))
                    .with_suggestion("Fix the toolchain definition".to_string());
                if let Some(target) = target {
                    diag = diag.with_target(target.to_string());
                }
                diag
            }
        }
    }
}

/// Every error collected while analyzing one target.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("analysis of `{target}` failed with {} error(s)", errors.len())]
pub struct AnalysisFailure {
    pub target: Label,
    pub errors: Vec<AnalysisError>,
}

impl AnalysisFailure {
    pub fn new(target: Label, errors: Vec<AnalysisError>) -> Self {
        AnalysisFailure { target, errors }
    }

    pub fn single(target: Label, error: AnalysisError) -> Self {
        AnalysisFailure {
            target,
            errors: vec![error],
        }
    }

    /// Check whether any collected error has the given kind.
    pub fn has_kind(&self, kind: ErrorKind) -> bool {
        self.errors.iter().any(|e| e.kind() == kind)
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.errors
            .iter()
            .map(|e| e.to_diagnostic(Some(&self.target)))
            .collect()
    }
}

/// Accumulates errors for one target while defaults are substituted.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<AnalysisError>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: AnalysisError) {
        tracing::debug!("collected {} error: {}", error.kind(), error);
        self.errors.push(error);
    }

    /// Record the error of a fallible step and substitute `default`.
    pub fn or_default<T>(&mut self, result: Result<T, AnalysisError>, default: T) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                self.push(e);
                default
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Finish collecting; fail with every recorded error if there were any.
    pub fn finish<T>(self, target: &Label, value: T) -> Result<T, AnalysisFailure> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(AnalysisFailure::new(target.clone(), self.errors))
        }
    }

    pub fn into_errors(self) -> Vec<AnalysisError> {
        self.errors
    }
}
