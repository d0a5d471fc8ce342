//! `ccprovider analyze` command

use anyhow::{bail, Result};

use crate::cli::AnalyzeArgs;
use crate::commands::{display_path, load_inputs, parse_labels, report_failures};
use ccprovider::builder::{ProviderCache, ToolchainProvider};
use ccprovider::fdo::BranchFdoMode;
use ccprovider::ops::{analyze_build, AnalyzeOptions, BuildFile};
use ccprovider::util::fs::write_string;

fn print_provider(provider: &ToolchainProvider) {
    let aggregation = &provider.aggregation;
    println!("{}", provider.label);
    println!("  features: {}", provider.features.resolved().features.join(" "));
    if provider.fdo_mode != BranchFdoMode::Off {
        println!("  fdo: {}", provider.fdo_mode);
    }
    for object in aggregation
        .compilation_outputs
        .objects
        .iter()
        .chain(&aggregation.compilation_outputs.pic_objects)
    {
        println!("  object: {}", display_path(object.exec_path()));
    }
    for output in &aggregation.outputs {
        println!("  output: {}", display_path(output.exec_path()));
    }
    for file in aggregation.runfiles.dynamic_mode.files() {
        println!("  runfile: {}", display_path(file.exec_path()));
    }
}

pub fn execute(args: AnalyzeArgs, color: bool) -> Result<()> {
    let inputs = load_inputs(&args.config, color)?;
    let build = BuildFile::load(&args.build)?;
    let opts = AnalyzeOptions {
        targets: parse_labels(&args.targets)?,
        defaults: inputs.defaults(),
    };

    let cache = ProviderCache::new();
    let report = analyze_build(&inputs.toolchain, &build, &inputs.config, &cache, &opts)?;

    if args.json {
        let providers: Vec<&ToolchainProvider> =
            report.providers.iter().map(|p| p.as_ref()).collect();
        let json = serde_json::to_string_pretty(&providers)?;
        match &args.output {
            Some(path) => {
                write_string(path, &json)?;
                tracing::info!("wrote {} provider(s) to {}", providers.len(), path.display());
            }
            None => println!("{}", json),
        }
    } else {
        for provider in &report.providers {
            print_provider(provider);
        }
    }

    if !report.is_success() {
        report_failures(&report.failures, color);
        bail!("analysis failed for {} target(s)", report.failures.len());
    }
    Ok(())
}
