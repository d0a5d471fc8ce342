//! Target-scoped diagnostic messages.
//!
//! Every diagnostic names the target it attaches to and, where there is one,
//! the offending attribute or toolchain field, followed by the actionable cause.

use std::fmt;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional location and suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Target the message is attached to
    pub target: Option<String>,
    /// Attribute or toolchain field at fault
    pub attribute: Option<String>,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            target: None,
            attribute: None,
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(message)
        }
    }

    /// Attach the diagnostic to a target.
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Name the attribute or field at fault.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m".to_string(),
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m".to_string(),
            }
        } else {
            self.severity.to_string()
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        match (&self.target, &self.attribute) {
            (Some(target), Some(attr)) => {
                output.push_str(&format!("  --> {} (attribute `{}`)\n", target, attr))
            }
            (Some(target), None) => output.push_str(&format!("  --> {}\n", target)),
            (None, Some(attr)) => output.push_str(&format!("  --> `{}`\n", attr)),
            (None, None) => {}
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("defines entry `A B` must be a single token")
            .with_target("//net:http")
            .with_attribute("defines")
            .with_context("tokenized into 2 words")
            .with_suggestion("Split the entry into two defines");

        let output = diag.format(false);
        assert!(output.starts_with("error: defines entry"));
        assert!(output.contains("--> //net:http (attribute `defines`)"));
        assert!(output.contains("= tokenized into 2 words"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Split the entry"));
    }

    #[test]
    fn test_warning_without_location() {
        let output = Diagnostic::warning("profile ignored outside opt").format(false);
        assert_eq!(output, "warning: profile ignored outside opt\n");
    }
}
