//! SensorRole - logical sensor function
//!
//! A role names what a sensor is used for (thermal, depth, ...), independent of
//! which physical device currently provides it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical sensor role.
///
/// Ordering is stable and used for deterministic iteration (`BTreeMap` keys),
/// so launch order, reports and resolver output never depend on hash order.
/// Serialized as a plain string so it can key TOML/JSON tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SensorRole {
    /// Standard RGB webcam (e.g. StreamCam)
    Rgb,
    /// High resolution camera (e.g. Brio 4K)
    HiRes,
    /// Radiometric thermal camera (e.g. Lepton)
    Thermal,
    /// Depth camera (e.g. RealSense)
    Depth,
    /// Microphone array
    Audio,
}

impl SensorRole {
    /// All roles in launch order.
    pub const ALL: [SensorRole; 5] = [
        SensorRole::Thermal,
        SensorRole::Depth,
        SensorRole::Audio,
        SensorRole::HiRes,
        SensorRole::Rgb,
    ];

    /// Canonical lowercase name, also used as the default output sub-directory.
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorRole::Rgb => "rgb",
            SensorRole::HiRes => "hires",
            SensorRole::Thermal => "thermal",
            SensorRole::Depth => "depth",
            SensorRole::Audio => "audio",
        }
    }

    /// Whether the role produces image frames (as opposed to audio blocks).
    pub fn is_video(&self) -> bool {
        !matches!(self, SensorRole::Audio)
    }
}

impl fmt::Display for SensorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rgb" => Ok(SensorRole::Rgb),
            "hires" | "hi_res" => Ok(SensorRole::HiRes),
            "thermal" => Ok(SensorRole::Thermal),
            "depth" => Ok(SensorRole::Depth),
            "audio" => Ok(SensorRole::Audio),
            other => Err(format!("unknown sensor role '{other}'")),
        }
    }
}

impl TryFrom<String> for SensorRole {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SensorRole> for String {
    fn from(role: SensorRole) -> Self {
        role.as_str().to_string()
    }
}
