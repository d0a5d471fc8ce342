//! `ccprovider features` command

use anyhow::Result;

use crate::cli::FeaturesArgs;
use crate::commands::load_inputs;
use ccprovider::ops::resolve_feature_set;

pub fn execute(args: FeaturesArgs, color: bool) -> Result<()> {
    let inputs = load_inputs(&args.config, color)?;
    let features = resolve_feature_set(&inputs.toolchain, &inputs.config, &[])?;
    let resolved = features.resolved();

    if args.json {
        println!("{}", serde_json::to_string_pretty(resolved)?);
        return Ok(());
    }

    println!("# Features enabled by `{}`:", inputs.toolchain.identifier);
    for name in &resolved.features {
        println!("  {}", name);
    }
    if !resolved.action_configs.is_empty() {
        println!();
        println!("# Action configs:");
        for name in &resolved.action_configs {
            println!("  {}", name);
        }
    }
    Ok(())
}
