//! Command implementations

pub mod analyze;
pub mod fdo;
pub mod features;
pub mod flags;

use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cli::ConfigArgs;
use ccprovider::core::{
    AnalysisFailure, Artifact, BuildConfiguration, CompilationMode, Label, ToolchainDescriptor,
};
use ccprovider::fdo::ProfileReference;
use ccprovider::ops::{load_toolchain, AttributeDefaults};
use ccprovider::util::config::{global_config_path, load_config, project_config_path};
use ccprovider::util::diagnostic::emit;
use ccprovider::util::fs::find_project_root;
use ccprovider::util::Config;

/// Everything loaded from config files and flags.
pub struct Inputs {
    pub toolchain: ToolchainDescriptor,
    pub config: BuildConfiguration,
    pub settings: Config,
}

impl Inputs {
    pub fn defaults(&self) -> AttributeDefaults {
        AttributeDefaults {
            headers_checking_mode: self.settings.headers_checking_mode(),
            check_deps_provider: self.settings.analysis.check_deps_provider,
        }
    }
}

/// A profile on the command line: absolute paths stay outside the
/// workspace, relative ones name a source artifact.
fn profile_reference(path: &Path) -> ProfileReference {
    if path.is_absolute() {
        ProfileReference::Path(path.to_path_buf())
    } else {
        ProfileReference::Artifact(Artifact::source(path))
    }
}

/// Load the toolchain and merge config files with command-line flags.
pub fn load_inputs(args: &ConfigArgs, color: bool) -> Result<Inputs> {
    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let project_root = find_project_root(&cwd).unwrap_or(cwd);
    let settings = load_config(
        &global_config_path().unwrap_or_default(),
        &project_config_path(&project_root),
    );

    for warning in settings.validate() {
        emit(&warning, color);
    }

    let mut config = settings.build_configuration();
    if let Some(mode) = &args.compilation_mode {
        config.compilation_mode = mode.parse::<CompilationMode>()?;
    }
    if let Some(root) = &args.output_root {
        config.output_root = root.clone();
    }
    for feature in &args.features {
        match feature.strip_prefix('-') {
            Some(disabled) => config.disabled_features.push(disabled.to_string()),
            None => config.requested_features.push(feature.clone()),
        }
    }
    config.force_pic |= args.force_pic;
    config.fission |= args.fission;
    config.collect_code_coverage |= args.coverage;
    config.is_host = args.host;
    if let Some(profile) = &args.fdo_optimize {
        config.fdo.optimize = Some(profile_reference(profile));
    }
    if let Some(dir) = &args.fdo_instrument {
        config.fdo.instrument = Some(dir.clone());
    }
    if let Some(hints) = &args.fdo_prefetch_hints {
        config.fdo.prefetch_hints = Some(profile_reference(hints));
    }
    if let Some(zipper) = &args.zipper {
        config.fdo.zipper = Some(zipper.clone());
    }

    let toolchain = load_toolchain(&args.toolchain)?;
    tracing::debug!(
        "using toolchain {} in {} mode",
        toolchain.identifier,
        config.compilation_mode
    );

    Ok(Inputs {
        toolchain,
        config,
        settings,
    })
}

pub fn parse_labels(labels: &[String]) -> Result<Vec<Label>> {
    labels
        .iter()
        .map(|l| Label::parse(l).map_err(anyhow::Error::from))
        .collect()
}

pub fn use_color(no_color: bool) -> bool {
    !no_color && std::io::stderr().is_terminal()
}

/// Print every collected diagnostic of the failed targets.
pub fn report_failures(failures: &[AnalysisFailure], color: bool) {
    for failure in failures {
        for diagnostic in failure.diagnostics() {
            emit(&diagnostic, color);
        }
    }
}

pub fn display_path(path: &Path) -> String {
    ccprovider::util::paths::to_slash(path)
}
