//! `ccprovider flags` command

use anyhow::{bail, Result};

use crate::cli::FlagsArgs;
use crate::commands::{load_inputs, parse_labels, report_failures};
use ccprovider::builder::ProviderCache;
use ccprovider::ops::{analyze_build, expand_flags, AnalyzeOptions, BuildFile};

pub fn execute(args: FlagsArgs, color: bool) -> Result<()> {
    let inputs = load_inputs(&args.config, color)?;
    let build = BuildFile::load(&args.build)?;
    let targets = parse_labels(std::slice::from_ref(&args.target))?;
    let label = targets[0].clone();
    let opts = AnalyzeOptions {
        targets,
        defaults: inputs.defaults(),
    };

    let cache = ProviderCache::new();
    let report = analyze_build(&inputs.toolchain, &build, &inputs.config, &cache, &opts)?;
    if let Some(failure) = report.failure(&label) {
        report_failures(std::slice::from_ref(failure), color);
        bail!("cannot expand flags: analysis of {} failed", label);
    }

    let flags = expand_flags(&report, &label, &args.action)?;
    println!("{}", flags.join(" "));
    Ok(())
}
