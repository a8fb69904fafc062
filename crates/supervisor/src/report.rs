//! Session report and end-of-session summary.

use std::time::Duration;

use contracts::{SensorRole, UnitOutcome};
use serde::Serialize;

/// Result of one supervised session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Session name
    pub session: String,

    /// One outcome per launched unit, in launch order
    pub outcomes: Vec<UnitOutcome>,

    /// Units waiting on the barrier when it was released
    pub barrier_arrivals: usize,

    /// Units that had not reached the barrier at release
    pub stragglers: Vec<SensorRole>,

    /// Ended by operator interrupt
    pub cancelled: bool,

    /// Wall time from launch to termination
    pub elapsed: Duration,
}

impl SessionReport {
    pub fn outcome(&self, role: SensorRole) -> Option<&UnitOutcome> {
        self.outcomes.iter().find(|o| o.role == role)
    }

    /// Units whose termination counts as a failure
    pub fn failures(&self) -> impl Iterator<Item = &UnitOutcome> {
        self.outcomes.iter().filter(|o| o.termination.is_failure())
    }

    /// Whether every unit ended normally
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    pub fn total_frames(&self) -> u64 {
        self.outcomes.iter().map(|o| o.frames_captured).sum()
    }

    pub fn total_chunks(&self) -> u64 {
        self.outcomes.iter().map(|o| o.chunks_written).sum()
    }

    /// One line per unit: `thermal: device ended (120 frames, 3 chunks)`
    pub fn unit_lines(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .map(|o| {
                let mut line = format!(
                    "{}: {} ({} frames, {} chunks",
                    o.role, o.termination, o.frames_captured, o.chunks_written
                );
                if o.write_failures > 0 {
                    line.push_str(&format!(", {} failed writes", o.write_failures));
                }
                line.push(')');
                line
            })
            .collect()
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                      Session Summary                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Overview");
        println!("   ├─ Session: {}", self.session);
        println!("   ├─ Duration: {:.2}s", self.elapsed.as_secs_f64());
        println!("   ├─ Units: {}", self.outcomes.len());
        println!("   ├─ Frames captured: {}", self.total_frames());
        println!("   ├─ Chunks written: {}", self.total_chunks());
        println!(
            "   └─ Ended by: {}",
            if self.cancelled { "interrupt" } else { "completion" }
        );

        println!("\n🎥 Units");
        let lines = self.unit_lines();
        for (i, line) in lines.iter().enumerate() {
            let branch = if i + 1 == lines.len() { "└─" } else { "├─" };
            println!("   {branch} {line}");
        }

        if !self.stragglers.is_empty() {
            println!("\n⚠️  Late to start barrier");
            for role in &self.stragglers {
                println!("   ├─ {role}");
            }
        }

        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Termination;

    fn report() -> SessionReport {
        let mut thermal = UnitOutcome::idle(SensorRole::Thermal, Termination::DeviceEnded);
        thermal.frames_captured = 2;
        thermal.chunks_written = 1;
        let mut audio = UnitOutcome::idle(SensorRole::Audio, Termination::DurationElapsed);
        audio.frames_captured = 10;
        audio.chunks_written = 2;
        audio.write_failures = 1;

        SessionReport {
            session: "s1".into(),
            outcomes: vec![
                thermal,
                UnitOutcome::idle(SensorRole::Depth, Termination::InitFailed("absent".into())),
                audio,
            ],
            barrier_arrivals: 2,
            stragglers: vec![],
            cancelled: false,
            elapsed: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_single_failure_visible_not_fatal() {
        let report = report();
        assert!(!report.is_clean());
        let failed: Vec<SensorRole> = report.failures().map(|o| o.role).collect();
        assert_eq!(failed, vec![SensorRole::Depth]);
        assert_eq!(report.total_frames(), 12);
        assert_eq!(report.total_chunks(), 3);
    }

    #[test]
    fn test_unit_lines() {
        let lines = report().unit_lines();
        assert_eq!(lines[0], "thermal: device ended (2 frames, 1 chunks)");
        assert_eq!(lines[1], "depth: init failed: absent (0 frames, 0 chunks)");
        assert!(lines[2].ends_with("1 failed writes)"));
    }

    #[test]
    fn test_report_serializes() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["outcomes"][0]["role"], "thermal");
        assert_eq!(json["outcomes"][1]["termination"]["kind"], "init_failed");
    }
}
