//! Scheduled actions.
//!
//! Analysis never runs tools; it only records the work the executor will do
//! later. Registration is keyed by output path, so scheduling the same action
//! twice is a no-op and two different actions claiming one output is an error.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::core::artifact::Artifact;
use crate::core::errors::AnalysisError;

/// A unit of work scheduled for the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Action {
    Symlink {
        input: Artifact,
        output: Artifact,
        progress_message: String,
    },
    Unzip {
        zipper: PathBuf,
        archive: Artifact,
        member: String,
        output: Artifact,
    },
    IndexProfile {
        tool: PathBuf,
        input: Artifact,
        output: Artifact,
    },
    WriteModuleMap {
        output: Artifact,
        contents: String,
    },
    SolibSymlink {
        input: Artifact,
        output: Artifact,
    },
}

impl Action {
    pub fn output(&self) -> &Artifact {
        match self {
            Action::Symlink { output, .. }
            | Action::Unzip { output, .. }
            | Action::IndexProfile { output, .. }
            | Action::WriteModuleMap { output, .. }
            | Action::SolibSymlink { output, .. } => output,
        }
    }

    pub fn inputs(&self) -> Vec<&Artifact> {
        match self {
            Action::Symlink { input, .. }
            | Action::IndexProfile { input, .. }
            | Action::SolibSymlink { input, .. } => vec![input],
            Action::Unzip { archive, .. } => vec![archive],
            Action::WriteModuleMap { .. } => Vec::new(),
        }
    }

    /// Short action name for logs and listings.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Action::Symlink { .. } => "Symlink",
            Action::Unzip { .. } => "FdoProfileUnzip",
            Action::IndexProfile { .. } => "LLVMProfDataAction",
            Action::WriteModuleMap { .. } => "CppModuleMap",
            Action::SolibSymlink { .. } => "SolibSymlink",
        }
    }
}

/// Two different actions claim the same output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("conflicting actions for output `{}`: {existing} and {new}", output.display())]
pub struct ActionConflict {
    pub output: PathBuf,
    pub existing: &'static str,
    pub new: &'static str,
}

impl ActionConflict {
    pub fn into_analysis_error(self, toolchain: &str) -> AnalysisError {
        AnalysisError::fatal(toolchain, "unique-action-outputs", self.to_string())
    }
}

/// Actions scheduled by one resolution, in registration order.
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<Action>,
    by_output: HashMap<PathBuf, usize>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action and return its output.
    pub fn register(&mut self, action: Action) -> Result<Artifact, ActionConflict> {
        let output = action.output().clone();
        let key = output.exec_path().to_path_buf();

        if let Some(&idx) = self.by_output.get(&key) {
            let existing = &self.actions[idx];
            if *existing == action {
                tracing::trace!("{} for `{}` already scheduled", action.mnemonic(), key.display());
                return Ok(output);
            }
            return Err(ActionConflict {
                output: key,
                existing: existing.mnemonic(),
                new: action.mnemonic(),
            });
        }

        tracing::debug!("scheduling {} -> {}", action.mnemonic(), key.display());
        self.by_output.insert(key, self.actions.len());
        self.actions.push(action);
        Ok(output)
    }

    /// The action producing `output`, if any.
    pub fn producer(&self, output: &Path) -> Option<&Action> {
        self.by_output.get(output).map(|&idx| &self.actions[idx])
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn into_actions(self) -> Vec<Action> {
        self.actions
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
