use chrono::{DateTime, Utc};

use crate::record::{clock_id, ClockReading};

/// Correlates the document's trace-relative nanosecond timeline with
/// wall-clock time.
///
/// Trace timestamps are monotonic nanoseconds with an arbitrary zero; the
/// anchor pins that zero to a UTC instant so a reader can place the timeline
/// in real time.
#[derive(Debug, Clone)]
pub struct TimeAnchor {
    wall: DateTime<Utc>,
}

impl TimeAnchor {
    /// Anchors trace time zero to the current wall-clock time.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Anchors trace time zero to a given instant.
    pub fn at(wall: DateTime<Utc>) -> Self {
        TimeAnchor { wall }
    }

    pub fn wall(&self) -> DateTime<Utc> {
        self.wall
    }

    /// The clock readings for a snapshot record: the monotonic domain at its
    /// zero point, and the realtime domain at the anchored wall time.
    pub fn clock_snapshot(&self) -> Vec<ClockReading> {
        let unix_ns = self.wall.timestamp_nanos_opt().unwrap_or(0).max(0) as u64;
        vec![
            ClockReading {
                clock_id: clock_id::MONOTONIC,
                timestamp: 0,
            },
            ClockReading {
                clock_id: clock_id::REALTIME,
                timestamp: unix_ns,
            },
        ]
    }

    /// Maps a trace timestamp back to wall-clock time.
    pub fn to_wall(&self, trace_ns: u64) -> DateTime<Utc> {
        let nanos = trace_ns.min(i64::MAX as u64) as i64;
        self.wall + chrono::Duration::nanoseconds(nanos)
    }
}

impl Default for TimeAnchor {
    fn default() -> Self {
        Self::new()
    }
}
