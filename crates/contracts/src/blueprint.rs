//! SessionBlueprint - Config Loader 输出
//!
//! 描述一次采集会话的完整配置：会话参数、各传感器角色配置、硬件角色解析规则。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::{ContractError, SensorRole};

/// Upper bound of every configured period (session, chunk, warm-up, grace): 366 days
pub const MAX_PERIOD_SECS: u64 = 366 * 24 * 60 * 60;

/// Seconds to `Duration`, saturating instead of panicking on out-of-range input
fn saturating_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的会话配置蓝图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionBlueprint {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 会话设置
    pub session: SessionSettings,

    /// 角色 -> 传感器配置
    #[serde(default)]
    pub sensors: BTreeMap<SensorRole, SensorConfig>,

    /// 硬件角色解析规则
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// 会话设置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// 会话名称 (文件名前缀)
    #[serde(default = "default_session_name")]
    pub name: String,

    /// 采集时长 (秒)，负数表示无限制
    #[serde(default = "default_duration_secs")]
    pub duration_secs: i64,

    /// 预热时间 (秒)：所有设备初始化完成的上限
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: f64,

    /// 输出根目录
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,

    /// 排空宽限期 (秒)
    #[serde(default = "default_drain_grace_secs")]
    pub drain_grace_secs: f64,
}

fn default_session_name() -> String {
    "user1".to_string()
}

fn default_duration_secs() -> i64 {
    28_800
}

fn default_warmup_secs() -> f64 {
    30.0
}

fn default_output_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_drain_grace_secs() -> f64 {
    10.0
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            name: default_session_name(),
            duration_secs: default_duration_secs(),
            warmup_secs: default_warmup_secs(),
            output_root: default_output_root(),
            drain_grace_secs: default_drain_grace_secs(),
        }
    }
}

impl SessionSettings {
    pub fn duration(&self) -> SessionDuration {
        SessionDuration::from_secs(self.duration_secs)
    }

    pub fn warmup(&self) -> Duration {
        saturating_secs(self.warmup_secs)
    }

    pub fn drain_grace(&self) -> Duration {
        saturating_secs(self.drain_grace_secs)
    }
}

/// Capture duration of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDuration {
    /// Stop after the given time
    Bounded(Duration),
    /// Run until cancelled
    Unbounded,
}

impl SessionDuration {
    /// Negative seconds mean unbounded.
    pub fn from_secs(secs: i64) -> Self {
        if secs < 0 {
            SessionDuration::Unbounded
        } else {
            SessionDuration::Bounded(Duration::from_secs(secs as u64))
        }
    }

    /// Whether `elapsed` has reached the bound.
    pub fn is_elapsed(&self, elapsed: Duration) -> bool {
        match self {
            SessionDuration::Bounded(limit) => elapsed >= *limit,
            SessionDuration::Unbounded => false,
        }
    }

    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            SessionDuration::Bounded(limit) => Some(*limit),
            SessionDuration::Unbounded => None,
        }
    }
}

/// 设备后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceBackend {
    /// 合成数据 (无需硬件)
    #[default]
    Synthetic,
}

/// 图像分辨率
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// 单个角色的传感器配置 (会话开始后不可变)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorConfig {
    /// 是否启用
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// 设备后端
    #[serde(default)]
    pub backend: DeviceBackend,

    /// 帧率 (视频角色)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,

    /// 分辨率 (视频角色)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,

    /// 采样率 (音频角色)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_rate: Option<u32>,

    /// 声道数 (音频角色)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,

    /// 分块时长 (秒)，必填
    pub chunk_duration_secs: f64,

    /// 设备通道号 (/dev/videoN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_index: Option<u32>,

    /// 输出目录，缺省为 `<output_root>/<role>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,

    /// 热成像：是否转换为摄氏度
    #[serde(default = "default_true")]
    pub to_celsius: bool,

    /// 合成后端：产生 N 帧后设备结束
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_limit: Option<u64>,
}

fn default_true() -> bool {
    true
}

/// Stream parameters of a sensor, resolved from its optional fields
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StreamSpec {
    Video { fps: f64, resolution: Resolution },
    Audio { sampling_rate: u32, channels: u16 },
}

impl SensorConfig {
    /// Minimal video sensor configuration.
    pub fn video(fps: f64, width: u32, height: u32, chunk_duration_secs: f64) -> Self {
        Self {
            enabled: true,
            backend: DeviceBackend::Synthetic,
            fps: Some(fps),
            resolution: Some(Resolution { width, height }),
            sampling_rate: None,
            channels: None,
            chunk_duration_secs,
            channel_index: None,
            output_directory: None,
            to_celsius: true,
            frame_limit: None,
        }
    }

    /// Minimal audio sensor configuration.
    pub fn audio(sampling_rate: u32, channels: u16, chunk_duration_secs: f64) -> Self {
        Self {
            fps: None,
            resolution: None,
            sampling_rate: Some(sampling_rate),
            channels: Some(channels),
            ..Self::video(0.0, 0, 0, chunk_duration_secs)
        }
    }

    pub fn chunk_duration(&self) -> Duration {
        saturating_secs(self.chunk_duration_secs)
    }

    /// Resolve the stream parameters required by `role`.
    ///
    /// # Errors
    /// `ConfigValidation` naming the first missing field.
    pub fn stream(&self, role: SensorRole) -> Result<StreamSpec, ContractError> {
        let missing = |field: &str| {
            ContractError::config_validation(
                format!("sensors.{role}.{field}"),
                format!("required field for role '{role}' is missing"),
            )
        };

        if role.is_video() {
            let fps = self.fps.ok_or_else(|| missing("fps"))?;
            let resolution = self.resolution.ok_or_else(|| missing("resolution"))?;
            Ok(StreamSpec::Video { fps, resolution })
        } else {
            let sampling_rate = self.sampling_rate.ok_or_else(|| missing("sampling_rate"))?;
            let channels = self.channels.ok_or_else(|| missing("channels"))?;
            Ok(StreamSpec::Audio {
                sampling_rate,
                channels,
            })
        }
    }
}

/// 硬件角色解析规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// 设备信息必须包含的子串 (过滤元数据节点)
    #[serde(default = "default_require")]
    pub require: Option<String>,

    /// 子串 -> 角色 匹配规则，按顺序匹配
    #[serde(default = "default_rules")]
    pub rules: Vec<RoleRule>,
}

/// 单条匹配规则 (大小写不敏感)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleRule {
    pub pattern: String,
    pub role: SensorRole,
}

fn default_require() -> Option<String> {
    Some("capture".to_string())
}

fn default_rules() -> Vec<RoleRule> {
    vec![
        RoleRule {
            pattern: "streamcam".to_string(),
            role: SensorRole::Rgb,
        },
        RoleRule {
            pattern: "brio".to_string(),
            role: SensorRole::HiRes,
        },
    ]
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            require: default_require(),
            rules: default_rules(),
        }
    }
}

impl SessionBlueprint {
    /// Enabled sensors in launch order.
    pub fn enabled_sensors(&self) -> impl Iterator<Item = (SensorRole, &SensorConfig)> {
        SensorRole::ALL.into_iter().filter_map(move |role| {
            self.sensors
                .get(&role)
                .filter(|config| config.enabled)
                .map(|config| (role, config))
        })
    }

    /// Output directory of a role (explicit, or `<output_root>/<role>`).
    pub fn output_directory(&self, role: SensorRole) -> PathBuf {
        self.sensors
            .get(&role)
            .and_then(|config| config.output_directory.clone())
            .unwrap_or_else(|| self.session.output_root.join(role.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_blueprint() -> SessionBlueprint {
        let mut sensors = BTreeMap::new();
        sensors.insert(SensorRole::Thermal, SensorConfig::video(8.0, 160, 120, 1200.0));
        sensors.insert(SensorRole::Audio, SensorConfig::audio(44_100, 2, 600.0));
        let mut rgb = SensorConfig::video(30.0, 1920, 1080, 600.0);
        rgb.enabled = false;
        sensors.insert(SensorRole::Rgb, rgb);

        SessionBlueprint {
            version: ConfigVersion::V1,
            session: SessionSettings::default(),
            sensors,
            resolver: ResolverConfig::default(),
        }
    }

    #[test]
    fn session_duration_negative_is_unbounded() {
        assert_eq!(SessionDuration::from_secs(-1), SessionDuration::Unbounded);
        assert!(!SessionDuration::Unbounded.is_elapsed(Duration::from_secs(u32::MAX as u64)));

        let bounded = SessionDuration::from_secs(5);
        assert!(!bounded.is_elapsed(Duration::from_secs(4)));
        assert!(bounded.is_elapsed(Duration::from_secs(5)));
    }

    #[test]
    fn out_of_range_periods_saturate() {
        let mut sensor = SensorConfig::video(30.0, 2, 2, 1e20);
        assert_eq!(sensor.chunk_duration(), Duration::MAX);
        sensor.chunk_duration_secs = f64::NAN;
        assert_eq!(sensor.chunk_duration(), Duration::ZERO);

        let session = SessionSettings {
            duration_secs: i64::MAX,
            drain_grace_secs: f64::INFINITY,
            ..SessionSettings::default()
        };
        assert_eq!(session.drain_grace(), Duration::MAX);
        assert!(session.duration().as_duration().is_some());
    }

    #[test]
    fn enabled_sensors_skip_disabled_in_launch_order() {
        let bp = sample_blueprint();
        let roles: Vec<_> = bp.enabled_sensors().map(|(role, _)| role).collect();
        assert_eq!(roles, vec![SensorRole::Thermal, SensorRole::Audio]);
    }

    #[test]
    fn output_directory_defaults_to_role_dir() {
        let mut bp = sample_blueprint();
        assert_eq!(
            bp.output_directory(SensorRole::Thermal),
            PathBuf::from("data/thermal")
        );

        bp.sensors.get_mut(&SensorRole::Thermal).unwrap().output_directory =
            Some(PathBuf::from("/mnt/disk/lepton"));
        assert_eq!(
            bp.output_directory(SensorRole::Thermal),
            PathBuf::from("/mnt/disk/lepton")
        );
    }

    #[test]
    fn stream_reports_missing_field() {
        let mut config = SensorConfig::video(8.0, 160, 120, 10.0);
        config.resolution = None;
        let err = config.stream(SensorRole::Depth).unwrap_err();
        assert!(err.to_string().contains("sensors.depth.resolution"), "got: {err}");

        let audio = SensorConfig::audio(16_000, 1, 10.0);
        assert_eq!(
            audio.stream(SensorRole::Audio).unwrap(),
            StreamSpec::Audio {
                sampling_rate: 16_000,
                channels: 1
            }
        );
    }
}
