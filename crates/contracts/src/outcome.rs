//! UnitOutcome - Capture Unit 终止结果
//!
//! Reported by each unit when its execution context ends, aggregated by the
//! supervisor into the session summary.

use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::SensorRole;

/// Why a capture unit stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Termination {
    /// Configured duration completed
    DurationElapsed,
    /// `grab()` returned no data (disconnect / end of stream)
    DeviceEnded,
    /// Operator interrupt or supervisor drain
    Cancelled,
    /// Device could not be initialized
    InitFailed(String),
    /// Error raised by grab or transform
    CaptureError(String),
    /// Unit context panicked outside the capture loop
    Panicked(String),
    /// Unit did not exit within the drain grace period
    Unresponsive,
}

impl Termination {
    /// Normal terminations are not reported as failures.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Termination::InitFailed(_)
                | Termination::CaptureError(_)
                | Termination::Panicked(_)
                | Termination::Unresponsive
        )
    }

    /// Stable label for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Termination::DurationElapsed => "duration_elapsed",
            Termination::DeviceEnded => "device_ended",
            Termination::Cancelled => "cancelled",
            Termination::InitFailed(_) => "init_failed",
            Termination::CaptureError(_) => "capture_error",
            Termination::Panicked(_) => "panicked",
            Termination::Unresponsive => "unresponsive",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::DurationElapsed => f.write_str("duration completed"),
            Termination::DeviceEnded => f.write_str("device ended"),
            Termination::Cancelled => f.write_str("cancelled"),
            Termination::InitFailed(msg) => write!(f, "init failed: {msg}"),
            Termination::CaptureError(msg) => write!(f, "error: {msg}"),
            Termination::Panicked(msg) => write!(f, "panicked: {msg}"),
            Termination::Unresponsive => f.write_str("unresponsive"),
        }
    }
}

/// Final report of one capture unit
#[derive(Debug, Clone, Serialize)]
pub struct UnitOutcome {
    pub role: SensorRole,
    pub termination: Termination,
    /// Frames appended to the buffer
    pub frames_captured: u64,
    /// Chunk files persisted
    pub chunks_written: u64,
    /// Flushes that failed (frames lost)
    pub write_failures: u64,
    /// Time between barrier release and loop exit
    pub capture_time: Duration,
}

impl UnitOutcome {
    /// Outcome with no capture activity.
    pub fn idle(role: SensorRole, termination: Termination) -> Self {
        Self {
            role,
            termination,
            frames_captured: 0,
            chunks_written: 0,
            write_failures: 0,
            capture_time: Duration::ZERO,
        }
    }
}
