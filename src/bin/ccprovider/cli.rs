//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// ccprovider - resolve C/C++ toolchain providers for build targets
#[derive(Parser)]
#[command(name = "ccprovider")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the features a toolchain enables for a configuration
    Features(FeaturesArgs),

    /// Show how FDO profiles resolve for a target
    Fdo(FdoArgs),

    /// Analyze the targets of a build file
    Analyze(AnalyzeArgs),

    /// Expand the command line of an action for a target
    Flags(FlagsArgs),
}

/// Toolchain and build configuration shared by every command.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Toolchain definition (TOML)
    #[arg(short, long, env = "CCPROVIDER_TOOLCHAIN")]
    pub toolchain: PathBuf,

    /// Compilation mode (fastbuild, dbg, opt)
    #[arg(short = 'c', long)]
    pub compilation_mode: Option<String>,

    /// Request a feature; prefix with `-` to disable it
    #[arg(long = "feature", value_name = "NAME", allow_hyphen_values = true)]
    pub features: Vec<String>,

    /// Root of derived artifacts
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// Compile everything position-independent
    #[arg(long)]
    pub force_pic: bool,

    /// Split debug info into separate files
    #[arg(long)]
    pub fission: bool,

    /// Instrument for code coverage
    #[arg(long)]
    pub coverage: bool,

    /// Analyze for the host platform
    #[arg(long)]
    pub host: bool,

    /// Profile to optimize with (.afdo, .xfdo, .profdata, .profraw, .zip)
    #[arg(long, value_name = "PATH")]
    pub fdo_optimize: Option<PathBuf>,

    /// Build instrumented binaries writing profiles to DIR
    #[arg(long, value_name = "DIR")]
    pub fdo_instrument: Option<String>,

    /// Cache prefetch hints file
    #[arg(long, value_name = "PATH")]
    pub fdo_prefetch_hints: Option<PathBuf>,

    /// Tool used to extract zipped LLVM profiles
    #[arg(long, value_name = "PATH")]
    pub zipper: Option<PathBuf>,
}

#[derive(Args)]
pub struct FeaturesArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct FdoArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Label the profiles are staged for
    #[arg(long, default_value = "//:profile")]
    pub label: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Build file listing the targets
    #[arg(short, long, default_value = "BUILD.toml")]
    pub build: PathBuf,

    /// Targets to analyze (default: all)
    pub targets: Vec<String>,

    /// Output providers as JSON
    #[arg(long)]
    pub json: bool,

    /// Write the JSON providers to a file instead of stdout
    #[arg(short, long, requires = "json")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct FlagsArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Build file listing the targets
    #[arg(short, long, default_value = "BUILD.toml")]
    pub build: PathBuf,

    /// Target to expand flags for
    pub target: String,

    /// Action name, e.g. c++-compile or c++-link-executable
    #[arg(short, long, default_value = "c++-compile")]
    pub action: String,
}
