//! FDO profile pipeline.
//!
//! ```text
//! NONE -> MODE_DETECTED -> [UNZIP] -> RAW_SYMLINKED -> INDEXED
//! ```
//!
//! Mode detection is purely extension based. LLVM profiles are brought into
//! indexed form; AutoFDO and XBinary profiles are symlinked as they are.
//! All outputs live under `<bin>/<package>/_fdo/<target>/`, and every step is
//! registered with the action registry, so resolving the same reference twice
//! schedules nothing new.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::builder::actions::{Action, ActionRegistry};
use crate::core::artifact::Artifact;
use crate::core::configuration::BuildConfiguration;
use crate::core::errors::AnalysisError;
use crate::core::label::Label;
use crate::core::toolchain::{Tool, ToolchainDescriptor};
use crate::fdo::{BranchFdoMode, ProfileArtifacts, ProfileReference};

const AUTOFDO_EXTENSION: &str = "afdo";
const XBINARY_EXTENSION: &str = "xfdo";
const LLVM_INDEXED_EXTENSION: &str = "profdata";
const LLVM_RAW_EXTENSION: &str = "profraw";
const ZIP_EXTENSION: &str = "zip";

/// Outcome of FDO resolution for one target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FdoResolution {
    pub mode: BranchFdoMode,
    pub artifacts: ProfileArtifacts,
    /// Profile output directory of an instrumented build
    pub instrument_path: Option<String>,
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

/// Classify a profile by its file extension.
pub fn mode_from_extension(path: &Path) -> Option<BranchFdoMode> {
    match extension(path)? {
        AUTOFDO_EXTENSION => Some(BranchFdoMode::AutoFdo),
        XBINARY_EXTENSION => Some(BranchFdoMode::XbinaryFdo),
        LLVM_INDEXED_EXTENSION | LLVM_RAW_EXTENSION | ZIP_EXTENSION => {
            Some(BranchFdoMode::LlvmFdo)
        }
        _ => None,
    }
}

/// Determine the FDO mode for a build configuration.
///
/// Instrumentation wins over an optimization profile. Profiles are only
/// honored in `opt` mode.
pub fn detect_mode(config: &BuildConfiguration) -> Result<BranchFdoMode, AnalysisError> {
    if config.fdo.instrument.is_some() {
        return Ok(BranchFdoMode::Vanilla);
    }
    let Some(reference) = &config.fdo.optimize else {
        return Ok(BranchFdoMode::Off);
    };
    if !config.is_opt() {
        tracing::warn!(
            "ignoring FDO profile `{}`: profiles are only used in opt mode, not {}",
            reference.path().display(),
            config.compilation_mode
        );
        return Ok(BranchFdoMode::Off);
    }
    mode_from_extension(reference.path()).ok_or_else(|| {
        AnalysisError::configuration(
            "fdo.optimize",
            format!(
                "unrecognized FDO profile `{}`: expected a .{}, .{}, .{}, .{}, or .{} file",
                reference.basename(),
                AUTOFDO_EXTENSION,
                XBINARY_EXTENSION,
                LLVM_INDEXED_EXTENSION,
                LLVM_RAW_EXTENSION,
                ZIP_EXTENSION
            ),
        )
    })
}

/// The artifact a reference points at.
fn input_artifact(
    label: &Label,
    attribute: &str,
    reference: &ProfileReference,
) -> Result<Artifact, AnalysisError> {
    match reference {
        ProfileReference::Path(path) if path.is_absolute() => Ok(Artifact::source(path.clone())),
        ProfileReference::Path(path) => Err(AnalysisError::attribute(
            label,
            attribute,
            format!(
                "profile path `{}` must be absolute; use an artifact for workspace files",
                path.display()
            ),
        )),
        ProfileReference::Artifact(artifact) => Ok(artifact.clone()),
        ProfileReference::Packaged { profile, .. } => Ok(profile.clone()),
    }
}

struct Pipeline<'a> {
    toolchain: &'a ToolchainDescriptor,
    bin_dir: PathBuf,
    fdo_dir: PathBuf,
    actions: &'a mut ActionRegistry,
}

impl Pipeline<'_> {
    fn output(&self, name: &str) -> Artifact {
        Artifact::derived(&self.bin_dir, self.fdo_dir.join(name))
    }

    fn schedule(&mut self, action: Action) -> Result<Artifact, AnalysisError> {
        self.actions
            .register(action)
            .map_err(|c| c.into_analysis_error(&self.toolchain.identifier))
    }

    fn symlink(&mut self, input: Artifact, name: &str, what: &str) -> Result<Artifact, AnalysisError> {
        let output = self.output(name);
        let progress_message = format!("Symlinking {} {}", what, input.exec_path().display());
        self.schedule(Action::Symlink {
            input,
            output,
            progress_message,
        })
    }

    fn llvm_profile(
        &mut self,
        config: &BuildConfiguration,
        input: Artifact,
        basename: &str,
    ) -> Result<Artifact, AnalysisError> {
        let ext = extension(Path::new(basename)).unwrap_or_default();
        if ext == LLVM_INDEXED_EXTENSION {
            return self.symlink(input, basename, "LLVM profile");
        }

        // Validate every tool before scheduling anything.
        let profdata = self
            .toolchain
            .tool_path(Tool::LlvmProfdata)
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                AnalysisError::configuration(
                    "tool_paths.llvm-profdata",
                    format!(
                        "toolchain `{}` does not declare `llvm-profdata`, which is needed to index `{}`",
                        self.toolchain.identifier, basename
                    ),
                )
            })?;
        let zipper = if ext == ZIP_EXTENSION {
            Some(config.fdo.zipper.clone().ok_or_else(|| {
                AnalysisError::configuration(
                    "fdo.zipper",
                    format!("a zip tool is required to extract the zipped profile `{}`", basename),
                )
            })?)
        } else {
            None
        };

        let raw = match zipper {
            Some(zipper) => {
                let archive = self.symlink(input, basename, "LLVM profile archive")?;
                let member = format!("{}.{}", self.toolchain.target_cpu, LLVM_RAW_EXTENSION);
                let output = self.output(&member);
                self.schedule(Action::Unzip {
                    zipper,
                    archive,
                    member,
                    output,
                })?
            }
            None => self.symlink(input, basename, "LLVM raw profile")?,
        };

        let stem = Path::new(basename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let output = self.output(&format!("{}.{}", stem, LLVM_INDEXED_EXTENSION));
        self.schedule(Action::IndexProfile {
            tool: profdata,
            input: raw,
            output,
        })
    }
}

/// Resolve profile inputs into target-local artifacts.
pub fn resolve_fdo(
    label: &Label,
    toolchain: &ToolchainDescriptor,
    config: &BuildConfiguration,
    mode: BranchFdoMode,
    actions: &mut ActionRegistry,
) -> Result<FdoResolution, AnalysisError> {
    let mut pipeline = Pipeline {
        toolchain,
        bin_dir: config.bin_dir(),
        fdo_dir: label.package_path().join("_fdo").join(label.name()),
        actions,
    };
    let mut resolution = FdoResolution {
        mode,
        ..Default::default()
    };

    if mode == BranchFdoMode::Vanilla {
        resolution.instrument_path = config.fdo.instrument.clone();
    }

    if mode.is_optimizing() {
        if let Some(reference) = &config.fdo.optimize {
            let input = input_artifact(label, "fdo_optimize", reference)?;
            let basename = reference.basename();
            tracing::debug!("resolving {} profile `{}` for {}", mode, basename, label);

            let profile = match mode {
                BranchFdoMode::LlvmFdo => pipeline.llvm_profile(config, input, &basename)?,
                _ => pipeline.symlink(input, &basename, "FDO profile")?,
            };
            resolution.artifacts.profile = Some(profile);

            if let Some(proto) = reference.proto_profile() {
                let name = proto.basename();
                resolution.artifacts.proto_profile =
                    Some(pipeline.symlink(proto.clone(), &name, "proto profile")?);
            }
        }
    }

    if let Some(hints) = &config.fdo.prefetch_hints {
        let input = input_artifact(label, "fdo_prefetch_hints", hints)?;
        let basename = hints.basename();
        resolution.artifacts.prefetch_hints =
            Some(pipeline.symlink(input, &basename, "prefetch hints")?);
    }

    Ok(resolution)
}
