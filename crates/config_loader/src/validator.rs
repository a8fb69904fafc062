//! 配置校验模块
//!
//! 校验规则：
//! - session.name 非空
//! - 至少启用一个传感器
//! - chunk_duration_secs > 0
//! - 所有时长不超过 MAX_PERIOD_SECS
//! - 视频角色需要 fps / resolution，音频角色需要 sampling_rate / channels
//! - 各角色输出目录互不相同
//! - 解析规则 pattern 非空

use std::collections::HashMap;

use contracts::{ContractError, SessionBlueprint, StreamSpec, MAX_PERIOD_SECS};

/// 校验 SessionBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    validate_session(blueprint)?;
    validate_sensor_presence(blueprint)?;
    validate_chunk_durations(blueprint)?;
    validate_streams(blueprint)?;
    validate_output_directories(blueprint)?;
    validate_resolver(blueprint)?;
    Ok(())
}

/// 校验会话参数
fn validate_session(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let session = &blueprint.session;
    if session.name.trim().is_empty() {
        return Err(ContractError::config_validation(
            "session.name",
            "session name cannot be empty",
        ));
    }
    if session.duration_secs > MAX_PERIOD_SECS as i64 {
        return Err(ContractError::config_validation(
            "session.duration_secs",
            format!(
                "duration_secs must be <= {MAX_PERIOD_SECS}, got {}",
                session.duration_secs
            ),
        ));
    }
    check_period("session.warmup_secs", session.warmup_secs)?;
    check_period("session.drain_grace_secs", session.drain_grace_secs)?;
    Ok(())
}

/// Finite, non-negative and at most `MAX_PERIOD_SECS`
fn check_period(field: &str, secs: f64) -> Result<(), ContractError> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(ContractError::config_validation(
            field,
            format!("must be >= 0, got {secs}"),
        ));
    }
    if secs > MAX_PERIOD_SECS as f64 {
        return Err(ContractError::config_validation(
            field,
            format!("must be <= {MAX_PERIOD_SECS}, got {secs}"),
        ));
    }
    Ok(())
}

/// 至少一个启用的传感器
fn validate_sensor_presence(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    if blueprint.enabled_sensors().next().is_none() {
        return Err(ContractError::config_validation(
            "sensors",
            "no enabled sensors configured",
        ));
    }
    Ok(())
}

/// 校验分块时长
fn validate_chunk_durations(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    for (role, sensor) in blueprint.enabled_sensors() {
        let secs = sensor.chunk_duration_secs;
        let field = format!("sensors.{role}.chunk_duration_secs");
        if secs == 0.0 {
            return Err(ContractError::config_validation(
                field,
                format!("chunk_duration_secs must be > 0, got {secs}"),
            ));
        }
        check_period(&field, secs)?;
    }
    Ok(())
}

/// 校验流参数
fn validate_streams(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    for (role, sensor) in blueprint.enabled_sensors() {
        match sensor.stream(role)? {
            StreamSpec::Video { fps, resolution } => {
                if !fps.is_finite() || fps <= 0.0 {
                    return Err(ContractError::config_validation(
                        format!("sensors.{role}.fps"),
                        format!("fps must be > 0, got {fps}"),
                    ));
                }
                if resolution.width == 0 || resolution.height == 0 {
                    return Err(ContractError::config_validation(
                        format!("sensors.{role}.resolution"),
                        format!(
                            "resolution must be non-zero, got {}x{}",
                            resolution.width, resolution.height
                        ),
                    ));
                }
            }
            StreamSpec::Audio {
                sampling_rate,
                channels,
            } => {
                if sampling_rate == 0 || channels == 0 {
                    return Err(ContractError::config_validation(
                        format!("sensors.{role}"),
                        format!(
                            "sampling_rate and channels must be > 0, got {sampling_rate} Hz / {channels} ch"
                        ),
                    ));
                }
            }
        }
    }
    Ok(())
}

/// 输出目录按角色独占
fn validate_output_directories(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let mut seen = HashMap::new();
    for (role, _) in blueprint.enabled_sensors() {
        let dir = blueprint.output_directory(role);
        if let Some(other) = seen.insert(dir.clone(), role) {
            return Err(ContractError::config_validation(
                format!("sensors.{role}.output_directory"),
                format!(
                    "output directory '{}' is already used by '{other}'",
                    dir.display()
                ),
            ));
        }
    }
    Ok(())
}

/// 校验解析规则
fn validate_resolver(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    for (idx, rule) in blueprint.resolver.rules.iter().enumerate() {
        if rule.pattern.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("resolver.rules[{idx}].pattern"),
                "pattern cannot be empty",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        ConfigVersion, ResolverConfig, SensorConfig, SensorRole, SessionSettings,
    };
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn minimal_blueprint() -> SessionBlueprint {
        let mut sensors = BTreeMap::new();
        sensors.insert(SensorRole::Thermal, SensorConfig::video(8.0, 160, 120, 1200.0));
        sensors.insert(SensorRole::Audio, SensorConfig::audio(44_100, 2, 600.0));
        SessionBlueprint {
            version: ConfigVersion::V1,
            session: SessionSettings::default(),
            sensors,
            resolver: ResolverConfig::default(),
        }
    }

    #[test]
    fn test_valid_config() {
        let bp = minimal_blueprint();
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_empty_session_name() {
        let mut bp = minimal_blueprint();
        bp.session.name = "  ".into();
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("cannot be empty"), "got: {err}");
    }

    #[test]
    fn test_no_enabled_sensors() {
        let mut bp = minimal_blueprint();
        for sensor in bp.sensors.values_mut() {
            sensor.enabled = false;
        }
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("no enabled sensors"), "got: {err}");
    }

    #[test]
    fn test_zero_chunk_duration() {
        let mut bp = minimal_blueprint();
        bp.sensors.get_mut(&SensorRole::Thermal).unwrap().chunk_duration_secs = 0.0;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("sensors.thermal.chunk_duration_secs"), "got: {err}");
    }

    #[test]
    fn test_huge_chunk_duration() {
        let mut bp = minimal_blueprint();
        bp.sensors.get_mut(&SensorRole::Audio).unwrap().chunk_duration_secs = 1e20;
        let err = validate(&bp).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("sensors.audio.chunk_duration_secs"), "got: {err}");
    }

    #[test]
    fn test_huge_session_duration() {
        let mut bp = minimal_blueprint();
        bp.session.duration_secs = i64::MAX;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("session.duration_secs"), "got: {err}");

        bp.session.duration_secs = MAX_PERIOD_SECS as i64;
        assert!(validate(&bp).is_ok());
        bp.session.duration_secs = -1;
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_warmup_and_grace_bounds() {
        let mut bp = minimal_blueprint();
        bp.session.warmup_secs = 1e300;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("session.warmup_secs"), "got: {err}");

        bp.session.warmup_secs = 0.0;
        bp.session.drain_grace_secs = f64::INFINITY;
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("session.drain_grace_secs"), "got: {err}");
    }

    #[test]
    fn test_audio_missing_channels() {
        let mut bp = minimal_blueprint();
        bp.sensors.get_mut(&SensorRole::Audio).unwrap().channels = None;
        let err = validate(&bp).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("sensors.audio.channels"), "got: {err}");
    }

    #[test]
    fn test_invalid_fps() {
        let mut bp = minimal_blueprint();
        bp.sensors.get_mut(&SensorRole::Thermal).unwrap().fps = Some(-5.0);
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("fps must be > 0"), "got: {err}");
    }

    #[test]
    fn test_disabled_sensor_not_validated() {
        let mut bp = minimal_blueprint();
        let mut depth = SensorConfig::video(30.0, 640, 480, 0.0);
        depth.enabled = false;
        bp.sensors.insert(SensorRole::Depth, depth);
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_shared_output_directory() {
        let mut bp = minimal_blueprint();
        for sensor in bp.sensors.values_mut() {
            sensor.output_directory = Some(PathBuf::from("/tmp/shared"));
        }
        let err = validate(&bp).unwrap_err().to_string();
        assert!(err.contains("already used"), "got: {err}");
    }
}
