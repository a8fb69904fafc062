//! `resolve` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use devices::{DeviceProbe, RoleMapping, RoleResolver, UdevProbe};

use crate::cli::ResolveArgs;

/// Execute the `resolve` command
pub fn run_resolve(args: &ResolveArgs) -> Result<()> {
    resolve_with(args, &UdevProbe::default())
}

fn resolve_with(args: &ResolveArgs, probe: &dyn DeviceProbe) -> Result<()> {
    info!(config = %args.config.display(), "Resolving device roles");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let mapping = RoleResolver::new(blueprint.resolver.clone())
        .resolve(probe)
        .context("Failed to enumerate video devices")?;

    if args.json {
        let json = serde_json::to_string_pretty(&mapping).context("Failed to serialize mapping")?;
        println!("{}", json);
    } else {
        print_mapping(&mapping);
    }

    if args.write {
        if RoleResolver::apply(&mut blueprint, &mapping) {
            config_loader::ConfigLoader::save_to_path(&blueprint, &args.config)
                .with_context(|| format!("Failed to write {}", args.config.display()))?;
            info!(config = %args.config.display(), "Configuration updated");
        } else {
            info!("Channel indices already up to date");
        }
    }

    Ok(())
}

fn print_mapping(mapping: &RoleMapping) {
    if mapping.is_empty() {
        println!("No matching capture devices found");
        return;
    }
    println!("🔌 Resolved devices");
    for (i, (role, channel)) in mapping.iter().enumerate() {
        let prefix = if i + 1 == mapping.len() { "└─" } else { "├─" };
        println!("   {} {} -> /dev/video{}", prefix, role, channel);
    }
}
