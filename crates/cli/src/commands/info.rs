//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{SensorRole, SessionBlueprint, StreamSpec};

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    session: SessionInfo,
    sensors: Vec<SensorInfo>,
}

#[derive(Serialize)]
struct SessionInfo {
    name: String,
    /// `None` when unbounded
    duration_secs: Option<i64>,
    warmup_secs: f64,
    drain_grace_secs: f64,
    output_root: String,
}

#[derive(Serialize)]
struct SensorInfo {
    role: SensorRole,
    enabled: bool,
    stream: String,
    chunk_duration_secs: f64,
    output_directory: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    channel_index: Option<u32>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&blueprint, args.all);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn describe_stream(role: SensorRole, blueprint: &SessionBlueprint) -> String {
    let Some(sensor) = blueprint.sensors.get(&role) else {
        return "-".to_string();
    };
    match sensor.stream(role) {
        Ok(StreamSpec::Video { fps, resolution }) => {
            format!("{}x{} @ {} fps", resolution.width, resolution.height, fps)
        }
        Ok(StreamSpec::Audio {
            sampling_rate,
            channels,
        }) => format!("{} Hz, {} ch", sampling_rate, channels),
        Err(_) => "incomplete".to_string(),
    }
}

fn build_config_info(blueprint: &SessionBlueprint, all: bool) -> ConfigInfo {
    let session = &blueprint.session;

    // launch order, not table order
    let sensors = SensorRole::ALL
        .into_iter()
        .filter_map(|role| blueprint.sensors.get(&role).map(|s| (role, s)))
        .filter(|(_, sensor)| all || sensor.enabled)
        .map(|(role, sensor)| SensorInfo {
            role,
            enabled: sensor.enabled,
            stream: describe_stream(role, blueprint),
            chunk_duration_secs: sensor.chunk_duration_secs,
            output_directory: blueprint.output_directory(role).display().to_string(),
            channel_index: sensor.channel_index,
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        session: SessionInfo {
            name: session.name.clone(),
            duration_secs: (session.duration_secs >= 0).then_some(session.duration_secs),
            warmup_secs: session.warmup_secs,
            drain_grace_secs: session.drain_grace_secs,
            output_root: session.output_root.display().to_string(),
        },
        sensors,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Capture Rig Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let session = &info.session;
    println!("📍 Session");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Name: {}", session.name);
    match session.duration_secs {
        Some(secs) => println!("   ├─ Duration: {}s", secs),
        None => println!("   ├─ Duration: until interrupted"),
    }
    println!("   ├─ Warm-up: {}s", session.warmup_secs);
    println!("   ├─ Drain grace: {}s", session.drain_grace_secs);
    println!("   └─ Output: {}", session.output_root);

    println!("\n📷 Sensors ({})", info.sensors.len());
    for (i, sensor) in info.sensors.iter().enumerate() {
        let is_last = i == info.sensors.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        let state = if sensor.enabled { "" } else { " [disabled]" };
        println!("   {} {} ({}){}", prefix, sensor.role, sensor.stream, state);
        println!(
            "   {}  ├─ Chunk: {}s",
            child_prefix, sensor.chunk_duration_secs
        );
        if let Some(channel) = sensor.channel_index {
            println!("   {}  ├─ Channel: /dev/video{}", child_prefix, channel);
        }
        println!("   {}  └─ Output: {}", child_prefix, sensor.output_directory);
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blueprint() -> SessionBlueprint {
        config_loader::ConfigLoader::load_from_str(
            r#"
[session]
name = "patient7"
output_root = "/mnt/ssd"

[sensors.audio]
sampling_rate = 44100
channels = 2
chunk_duration_secs = 600.0

[sensors.thermal]
fps = 8.0
resolution = { width = 160, height = 120 }
chunk_duration_secs = 1200.0
channel_index = 4

[sensors.rgb]
enabled = false
fps = 30.0
resolution = { width = 1920, height = 1080 }
chunk_duration_secs = 600.0
"#,
            config_loader::ConfigFormat::Toml,
        )
        .unwrap()
    }

    #[test]
    fn test_info_lists_enabled_in_launch_order() {
        let info = build_config_info(&blueprint(), false);
        let roles: Vec<SensorRole> = info.sensors.iter().map(|s| s.role).collect();
        assert_eq!(roles, vec![SensorRole::Thermal, SensorRole::Audio]);

        assert_eq!(info.sensors[0].stream, "160x120 @ 8 fps");
        assert_eq!(info.sensors[0].channel_index, Some(4));
        assert_eq!(info.sensors[1].stream, "44100 Hz, 2 ch");
        assert_eq!(info.sensors[1].output_directory, "/mnt/ssd/audio");
    }

    #[test]
    fn test_info_all_includes_disabled() {
        let info = build_config_info(&blueprint(), true);
        assert_eq!(info.sensors.len(), 3);

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["session"]["name"], "patient7");
        assert_eq!(json["sensors"][2]["role"], "rgb");
        assert_eq!(json["sensors"][2]["enabled"], false);
        assert!(json["sensors"][2].get("channel_index").is_none());
    }
}
