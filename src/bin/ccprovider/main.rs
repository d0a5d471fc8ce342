//! ccprovider CLI - analysis-time C/C++ toolchain configuration

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("ccprovider=debug")
    } else {
        EnvFilter::new("ccprovider=info")
    };

    // stdout carries command output
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let color = commands::use_color(cli.no_color);
    match cli.command {
        Commands::Features(args) => commands::features::execute(args, color),
        Commands::Fdo(args) => commands::fdo::execute(args, color),
        Commands::Analyze(args) => commands::analyze::execute(args, color),
        Commands::Flags(args) => commands::flags::execute(args, color),
    }
}
