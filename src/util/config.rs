//! Configuration file support for ccprovider.
//!
//! ccprovider supports two configuration file locations:
//! - Global: `~/.ccprovider/config.toml` - User-wide defaults
//! - Project: `.ccprovider/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Command-line flags
//! take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::configuration::{BuildConfiguration, CompilationMode};
use crate::core::target::HeadersCheckingMode;
use crate::util::diagnostic::Diagnostic;

/// ccprovider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Analysis defaults
    pub analysis: AnalysisConfig,

    /// FDO settings
    pub fdo: FdoConfig,
}

/// Defaults for the build configuration snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Compilation mode (fastbuild, dbg, opt)
    pub compilation_mode: Option<String>,

    /// Root of derived artifacts
    pub output_root: Option<PathBuf>,

    /// Features to request; a leading `-` disables
    pub features: Vec<String>,

    #[serde(default)]
    pub force_pic: bool,

    #[serde(default)]
    pub fission: bool,

    #[serde(default)]
    pub coverage: bool,

    /// Default headers checking mode for targets that do not set one
    pub headers_checking_mode: Option<String>,

    /// Whether C/C++ dependencies must supply compilation info
    pub check_deps_provider: Option<bool>,
}

/// FDO-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FdoConfig {
    /// Tool used to extract zipped LLVM profiles
    pub zipper: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        let analysis = other.analysis;
        if analysis.compilation_mode.is_some() {
            self.analysis.compilation_mode = analysis.compilation_mode;
        }
        if analysis.output_root.is_some() {
            self.analysis.output_root = analysis.output_root;
        }
        if !analysis.features.is_empty() {
            self.analysis.features.extend(analysis.features);
        }
        if analysis.force_pic {
            self.analysis.force_pic = true;
        }
        if analysis.fission {
            self.analysis.fission = true;
        }
        if analysis.coverage {
            self.analysis.coverage = true;
        }
        if analysis.headers_checking_mode.is_some() {
            self.analysis.headers_checking_mode = analysis.headers_checking_mode;
        }
        if analysis.check_deps_provider.is_some() {
            self.analysis.check_deps_provider = analysis.check_deps_provider;
        }

        if other.fdo.zipper.is_some() {
            self.fdo.zipper = other.fdo.zipper;
        }
    }

    /// Parse compilation mode from config string.
    pub fn compilation_mode(&self) -> Option<CompilationMode> {
        self.analysis
            .compilation_mode
            .as_ref()
            .and_then(|s| s.parse().ok())
    }

    /// Parse headers checking mode from config string.
    pub fn headers_checking_mode(&self) -> Option<HeadersCheckingMode> {
        self.analysis
            .headers_checking_mode
            .as_ref()
            .and_then(|s| s.parse().ok())
    }

    /// Warnings for values that will be ignored because they do not parse.
    pub fn validate(&self) -> Vec<Diagnostic> {
        let mut warnings = Vec::new();
        if let Some(mode) = &self.analysis.compilation_mode {
            if let Err(e) = mode.parse::<CompilationMode>() {
                warnings.push(
                    Diagnostic::warning(format!("{}; using the default", e))
                        .with_attribute("analysis.compilation_mode"),
                );
            }
        }
        if let Some(mode) = &self.analysis.headers_checking_mode {
            if let Err(e) = mode.parse::<HeadersCheckingMode>() {
                warnings.push(
                    Diagnostic::warning(format!("{}; using the default", e))
                        .with_attribute("analysis.headers_checking_mode")
                        .with_suggestion("Use one of strict, loose, or warn"),
                );
            }
        }
        warnings
    }

    /// Build the configuration snapshot these defaults describe.
    pub fn build_configuration(&self) -> BuildConfiguration {
        let mut config = BuildConfiguration::default();
        if let Some(mode) = self.compilation_mode() {
            config.compilation_mode = mode;
        }
        if let Some(root) = &self.analysis.output_root {
            config.output_root = root.clone();
        }
        for feature in &self.analysis.features {
            match feature.strip_prefix('-') {
                Some(disabled) => config.disabled_features.push(disabled.to_string()),
                None => config.requested_features.push(feature.clone()),
            }
        }
        config.force_pic = self.analysis.force_pic;
        config.fission = self.analysis.fission;
        config.collect_code_coverage = self.analysis.coverage;
        config.fdo.zipper = self.fdo.zipper.clone();
        config
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.ccprovider/config.toml)
/// 2. Global config (~/.ccprovider/config.toml)
/// 3. Defaults
pub fn load_config(global_path: &Path, project_path: &Path) -> Config {
    let mut config = Config::default();

    if global_path.exists() {
        config.merge(Config::load_or_default(global_path));
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global ccprovider config directory (~/.ccprovider).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".ccprovider"))
}

/// Get the global config path (~/.ccprovider/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.ccprovider/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".ccprovider").join("config.toml")
}
