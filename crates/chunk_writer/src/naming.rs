//! Chunk file naming
//!
//! `{session}_{YYYY-MM-DD_HH-MM-SS-ffffff}.{ext}`, local wall clock with
//! microsecond precision.

use chrono::{DateTime, Local, SubsecRound, TimeDelta};

/// chrono format of the timestamp part
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S-%6f";

/// Replace characters outside `[A-Za-z0-9._-]` with `_`.
///
/// Empty names and names made only of dots become `session`.
pub fn sanitize_session(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.chars().all(|c| c == '.') {
        "session".to_string()
    } else {
        cleaned
    }
}

/// Format one file name
pub fn chunk_file_name(session: &str, stamp: &DateTime<Local>, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        sanitize_session(session),
        stamp.format(TIMESTAMP_FORMAT),
        extension
    )
}

/// Strictly increasing timestamp source
///
/// Two chunks of the same writer never share a timestamp, even within one
/// microsecond or across a wall clock step backwards.
#[derive(Debug, Default)]
pub struct ChunkClock {
    last: Option<DateTime<Local>>,
}

impl ChunkClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp from the wall clock
    pub fn next(&mut self) -> DateTime<Local> {
        self.next_from(Local::now())
    }

    /// Next timestamp given the current wall clock reading
    pub fn next_from(&mut self, now: DateTime<Local>) -> DateTime<Local> {
        let now = now.trunc_subsecs(6);
        let stamp = match self.last {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last = Some(stamp);
        stamp
    }

    /// Skip past `stamp` (used when the name is already taken on disk)
    pub fn bump(&mut self) -> DateTime<Local> {
        self.next_from(self.last.unwrap_or_else(Local::now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(micros: i64) -> DateTime<Local> {
        Local.timestamp_micros(1_700_000_000_000_000 + micros).unwrap()
    }

    #[test]
    fn test_sanitize_session() {
        assert_eq!(sanitize_session("patient 07/run#2"), "patient_07_run_2");
        assert_eq!(sanitize_session("ok-name_1.2"), "ok-name_1.2");
        assert_eq!(sanitize_session(""), "session");
        assert_eq!(sanitize_session(".."), "session");
        assert_eq!(sanitize_session("séance"), "s_ance");
    }

    #[test]
    fn test_file_name_format() {
        let stamp = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap()
            + TimeDelta::microseconds(42);
        assert_eq!(
            chunk_file_name("s1", &stamp, "tiff"),
            "s1_2024-03-09_14-05-07-000042.tiff"
        );
    }

    #[test]
    fn test_clock_strictly_increasing_on_collision() {
        let mut clock = ChunkClock::new();
        let a = clock.next_from(at(10));
        let b = clock.next_from(at(10));
        let c = clock.next_from(at(10));
        assert!(a < b && b < c);
        assert_eq!(c - a, TimeDelta::microseconds(2));
    }

    #[test]
    fn test_clock_survives_regression() {
        let mut clock = ChunkClock::new();
        let a = clock.next_from(at(1_000));
        let b = clock.next_from(at(500));
        assert!(b > a);
        let c = clock.next_from(at(5_000));
        assert_eq!(c, at(5_000));
    }

    #[test]
    fn test_sub_microsecond_readings_collapse() {
        let mut clock = ChunkClock::new();
        let base = at(0);
        let a = clock.next_from(base + TimeDelta::nanoseconds(100));
        let b = clock.next_from(base + TimeDelta::nanoseconds(900));
        assert_ne!(
            chunk_file_name("s", &a, "wav"),
            chunk_file_name("s", &b, "wav")
        );
    }
}
