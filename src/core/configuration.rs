//! Build configuration snapshot.
//!
//! A `BuildConfiguration` is the immutable set of global options one analysis
//! pass runs under. It is built by the caller (the CLI builds it from the
//! config file plus flags) and shared by every target.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::fdo::ProfileReference;

/// Compilation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilationMode {
    #[default]
    Fastbuild,
    Dbg,
    Opt,
}

impl CompilationMode {
    /// The mode name, also used as a pseudo-feature.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilationMode::Fastbuild => "fastbuild",
            CompilationMode::Dbg => "dbg",
            CompilationMode::Opt => "opt",
        }
    }
}

impl fmt::Display for CompilationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an invalid compilation mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCompilationModeError(String);

impl fmt::Display for ParseCompilationModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid compilation mode `{}`: expected fastbuild, dbg, or opt",
            self.0
        )
    }
}

impl std::error::Error for ParseCompilationModeError {}

impl FromStr for CompilationMode {
    type Err = ParseCompilationModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fastbuild" => Ok(CompilationMode::Fastbuild),
            "dbg" => Ok(CompilationMode::Dbg),
            "opt" => Ok(CompilationMode::Opt),
            _ => Err(ParseCompilationModeError(s.to_string())),
        }
    }
}

/// Feedback-directed optimization options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FdoOptions {
    /// Directory instrumented binaries write profiles to
    pub instrument: Option<String>,

    /// Profile to optimize with
    pub optimize: Option<ProfileReference>,

    pub prefetch_hints: Option<ProfileReference>,

    /// Archive extraction tool for zipped profiles
    pub zipper: Option<PathBuf>,
}

/// Global options for one analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfiguration {
    pub compilation_mode: CompilationMode,

    /// Analyzing for the host (exec) platform
    pub is_host: bool,

    pub fission: bool,

    pub collect_code_coverage: bool,

    /// Use the LLVM coverage mapping format instead of gcov
    pub llvm_coverage_map_format: bool,

    pub requested_features: Vec<String>,

    pub disabled_features: Vec<String>,

    pub force_pic: bool,

    pub lipo: bool,

    pub fdo: FdoOptions,

    pub minimum_os_version: Option<String>,

    /// Overrides the toolchain's builtin sysroot
    pub sysroot: Option<PathBuf>,

    /// Root of derived artifacts, e.g. `out/k8-opt`
    pub output_root: PathBuf,
}

impl Default for BuildConfiguration {
    fn default() -> Self {
        BuildConfiguration {
            compilation_mode: CompilationMode::default(),
            is_host: false,
            fission: false,
            collect_code_coverage: false,
            llvm_coverage_map_format: false,
            requested_features: Vec::new(),
            disabled_features: Vec::new(),
            force_pic: false,
            lipo: false,
            fdo: FdoOptions::default(),
            minimum_os_version: None,
            sysroot: None,
            output_root: PathBuf::from("out"),
        }
    }
}

impl BuildConfiguration {
    pub fn is_opt(&self) -> bool {
        self.compilation_mode == CompilationMode::Opt
    }

    /// Root for derived binaries and intermediate outputs.
    pub fn bin_dir(&self) -> PathBuf {
        self.output_root.join("bin")
    }

    /// Root for generated sources and headers.
    pub fn genfiles_dir(&self) -> PathBuf {
        self.output_root.join("genfiles")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compilation_mode_roundtrip() {
        for mode in [
            CompilationMode::Fastbuild,
            CompilationMode::Dbg,
            CompilationMode::Opt,
        ] {
            assert_eq!(mode.as_str().parse::<CompilationMode>().unwrap(), mode);
        }
        let err = "release".parse::<CompilationMode>().unwrap_err();
        assert!(err.to_string().contains("release"));
    }

    #[test]
    fn test_output_roots() {
        let config = BuildConfiguration {
            output_root: PathBuf::from("out/k8-opt"),
            ..Default::default()
        };
        assert_eq!(config.bin_dir(), PathBuf::from("out/k8-opt/bin"));
        assert_eq!(config.genfiles_dir(), PathBuf::from("out/k8-opt/genfiles"));
    }
}
