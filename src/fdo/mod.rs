//! Feedback-directed optimization.
//!
//! Profile inputs are classified by file extension into a [`BranchFdoMode`]
//! and converted (for LLVM profiles) into an indexed profile under a
//! target-local directory.

pub mod pipeline;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::artifact::Artifact;

pub use pipeline::{detect_mode, resolve_fdo, FdoResolution};

/// Which profile workflow applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BranchFdoMode {
    #[default]
    Off,
    /// Instrumented build
    Vanilla,
    AutoFdo,
    XbinaryFdo,
    LlvmFdo,
}

impl BranchFdoMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BranchFdoMode::Off => "OFF",
            BranchFdoMode::Vanilla => "VANILLA",
            BranchFdoMode::AutoFdo => "AUTO_FDO",
            BranchFdoMode::XbinaryFdo => "XBINARY_FDO",
            BranchFdoMode::LlvmFdo => "LLVM_FDO",
        }
    }

    /// Whether a profile is consumed for optimization.
    pub fn is_optimizing(&self) -> bool {
        matches!(
            self,
            BranchFdoMode::AutoFdo | BranchFdoMode::XbinaryFdo | BranchFdoMode::LlvmFdo
        )
    }
}

impl fmt::Display for BranchFdoMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a profile comes from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileReference {
    /// An absolute path outside the workspace
    Path(PathBuf),

    /// An artifact in the build
    Artifact(Artifact),

    /// A profile packaged by a profile target, with an optional proto profile
    Packaged {
        profile: Artifact,
        #[serde(default)]
        proto_profile: Option<Artifact>,
    },
}

impl ProfileReference {
    /// The path whose extension determines the profile format.
    pub fn path(&self) -> &Path {
        match self {
            ProfileReference::Path(path) => path,
            ProfileReference::Artifact(artifact) => artifact.exec_path(),
            ProfileReference::Packaged { profile, .. } => profile.exec_path(),
        }
    }

    pub fn basename(&self) -> String {
        self.path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn proto_profile(&self) -> Option<&Artifact> {
        match self {
            ProfileReference::Packaged { proto_profile, .. } => proto_profile.as_ref(),
            _ => None,
        }
    }
}

/// Target-local profile artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileArtifacts {
    /// Indexed (LLVM) or symlinked (AutoFDO/XBinary) profile
    pub profile: Option<Artifact>,
    pub prefetch_hints: Option<Artifact>,
    pub proto_profile: Option<Artifact>,
}

impl ProfileArtifacts {
    pub fn is_empty(&self) -> bool {
        self.profile.is_none() && self.prefetch_hints.is_none() && self.proto_profile.is_none()
    }
}
