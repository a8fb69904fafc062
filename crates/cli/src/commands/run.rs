//! `run` command implementation.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use contracts::SessionBlueprint;
use devices::{BackendRegistry, RoleResolver, UdevProbe};
use supervisor::Supervisor;

use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut blueprint, args);

    if args.resolve {
        let mapping = RoleResolver::new(blueprint.resolver.clone())
            .resolve(&UdevProbe::default())
            .context("Failed to resolve video devices")?;
        if RoleResolver::apply(&mut blueprint, &mapping) {
            info!(?mapping, "Channel indices updated for this session");
        }
    }

    let enabled: Vec<String> = blueprint
        .enabled_sensors()
        .map(|(role, _)| role.to_string())
        .collect();
    info!(
        session = %blueprint.session.name,
        duration_secs = blueprint.session.duration_secs,
        warmup_secs = blueprint.session.warmup_secs,
        output_root = %blueprint.session.output_root.display(),
        sensors = ?enabled,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        config_loader::ConfigLoader::validate(&blueprint)
            .context("Configuration invalid after overrides")?;
        info!("Dry run mode - configuration is valid, exiting");
        print_session_plan(&blueprint);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    // Ctrl+C / SIGTERM drain the session instead of killing it
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            warn!("Received shutdown signal, draining capture units...");
            cancel.cancel();
        });
    }

    let supervisor = Supervisor::new(blueprint, Arc::new(BackendRegistry));
    let report = supervisor
        .run(cancel)
        .await
        .context("Capture session failed to start")?;

    report.print_summary();

    let failed = report.failures().count();
    if failed > 0 && failed == report.outcomes.len() {
        anyhow::bail!("All {failed} capture units failed");
    }

    info!(
        frames = report.total_frames(),
        chunks = report.total_chunks(),
        failed_units = failed,
        "Capture Rig finished"
    );
    Ok(())
}

/// Apply CLI overrides on top of the configuration file
fn apply_overrides(blueprint: &mut SessionBlueprint, args: &RunArgs) {
    let session = &mut blueprint.session;
    if let Some(ref name) = args.name {
        info!(name = %name, "Overriding session name from CLI");
        session.name = name.clone();
    }
    if let Some(duration) = args.duration {
        info!(duration_secs = duration, "Overriding duration from CLI");
        session.duration_secs = duration;
    }
    if let Some(warmup) = args.warmup {
        info!(warmup_secs = warmup, "Overriding warm-up from CLI");
        session.warmup_secs = warmup;
    }
    if let Some(ref output) = args.output {
        info!(output_root = %output.display(), "Overriding output root from CLI");
        session.output_root = output.clone();
    }
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print the session plan for dry-run mode
fn print_session_plan(blueprint: &SessionBlueprint) {
    let session = &blueprint.session;
    println!("\n=== Session Plan ===\n");
    println!("Session: {}", session.name);
    if session.duration_secs < 0 {
        println!("  Duration: until interrupted");
    } else {
        println!("  Duration: {}s", session.duration_secs);
    }
    println!("  Warm-up: {}s", session.warmup_secs);
    println!("  Drain grace: {}s", session.drain_grace_secs);

    println!("\nSensors:");
    for (role, sensor) in blueprint.enabled_sensors() {
        println!(
            "  - {} every {}s -> {}",
            role,
            sensor.chunk_duration_secs,
            blueprint.output_directory(role).display()
        );
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> RunArgs {
        RunArgs {
            config: PathBuf::from("capture.toml"),
            name: Some("patient7".into()),
            duration: Some(-1),
            warmup: None,
            output: Some(PathBuf::from("/mnt/ssd")),
            resolve: false,
            dry_run: false,
            metrics_port: 0,
        }
    }

    #[test]
    fn test_overrides_only_touch_given_fields() {
        let mut blueprint: SessionBlueprint = serde_json::from_str(
            r#"{ "session": { "name": "user1", "warmup_secs": 5.0 }, "sensors": {} }"#,
        )
        .unwrap();

        apply_overrides(&mut blueprint, &args());

        assert_eq!(blueprint.session.name, "patient7");
        assert_eq!(blueprint.session.duration_secs, -1);
        assert_eq!(blueprint.session.warmup_secs, 5.0);
        assert_eq!(blueprint.session.output_root, PathBuf::from("/mnt/ssd"));
    }
}
