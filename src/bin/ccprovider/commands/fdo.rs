//! `ccprovider fdo` command

use anyhow::Result;

use crate::cli::FdoArgs;
use crate::commands::{display_path, load_inputs, parse_labels};
use ccprovider::ops::resolve_profiles;

pub fn execute(args: FdoArgs, color: bool) -> Result<()> {
    let inputs = load_inputs(&args.config, color)?;
    let label = parse_labels(std::slice::from_ref(&args.label))?.remove(0);
    let report = resolve_profiles(&inputs.toolchain, &inputs.config, &label)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let artifacts = &report.resolution.artifacts;
    println!("mode: {}", report.resolution.mode);
    if let Some(profile) = &artifacts.profile {
        println!("profile: {}", display_path(profile.exec_path()));
    }
    if let Some(hints) = &artifacts.prefetch_hints {
        println!("prefetch hints: {}", display_path(hints.exec_path()));
    }
    if let Some(proto) = &artifacts.proto_profile {
        println!("proto profile: {}", display_path(proto.exec_path()));
    }
    if let Some(dir) = &report.resolution.instrument_path {
        println!("instrument path: {}", dir);
    }
    for action in &report.actions {
        println!(
            "  {} {}",
            action.mnemonic(),
            display_path(action.output().exec_path())
        );
    }
    Ok(())
}
