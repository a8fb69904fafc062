//! SessionState - 会话状态
//!
//! Published by the supervisor on a `watch` channel at every transition.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use contracts::{SensorRole, Termination};
use serde::Serialize;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Starting,
    WarmingUp,
    Capturing,
    Draining,
    Terminated,
}

impl SessionPhase {
    /// Position in the state machine, for the phase gauge
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Idle => "idle",
            SessionPhase::Starting => "starting",
            SessionPhase::WarmingUp => "warming_up",
            SessionPhase::Capturing => "capturing",
            SessionPhase::Draining => "draining",
            SessionPhase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Per-unit liveness; advances independently per unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitLiveness {
    /// Launched, not yet capturing
    Pending,
    /// Past the start barrier
    Running,
    /// Ended normally
    Completed,
    /// Ended with a failure
    Failed,
}

impl UnitLiveness {
    pub fn is_finished(self) -> bool {
        matches!(self, UnitLiveness::Completed | UnitLiveness::Failed)
    }

    /// Final liveness for a termination reason
    pub fn from_termination(termination: &Termination) -> Self {
        if termination.is_failure() {
            UnitLiveness::Failed
        } else {
            UnitLiveness::Completed
        }
    }
}

/// Snapshot of a running session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub phase: SessionPhase,
    /// Set once, when the start barrier is released
    pub start_released: bool,
    pub units: BTreeMap<SensorRole, UnitLiveness>,
    /// Barrier release instant (t0 of the session)
    pub started_at: Option<Instant>,
}

impl SessionState {
    /// Time since the start barrier was released
    pub fn elapsed(&self) -> Duration {
        self.started_at
            .map(|started| started.elapsed())
            .unwrap_or_default()
    }

    /// Units still pending or running
    pub fn outstanding(&self) -> usize {
        self.units.values().filter(|l| !l.is_finished()).count()
    }
}
