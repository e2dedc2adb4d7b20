//! The record model of a trace container.
//!
//! A document is an ordered sequence of records; the on-wire order is the
//! emission order. All types compare with `PartialEq` so that a decoded
//! document can be checked record-for-record against the one it was
//! serialized from.

/// Builtin clock domain identifiers for clock snapshots.
pub mod clock_id {
    pub const REALTIME: u32 = 1;
    pub const REALTIME_COARSE: u32 = 2;
    pub const MONOTONIC: u32 = 3;
    pub const MONOTONIC_COARSE: u32 = 4;
    pub const MONOTONIC_RAW: u32 = 5;
    pub const BOOTTIME: u32 = 6;
}

/// A single record in a trace container.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    ClockSnapshot(ClockSnapshot),
    TrackDescriptor(TrackDescriptor),
    Event(Event),
    LogEntry(LogEntry),
}

/// A synchronization point mapping clock domains to comparable timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockSnapshot {
    pub clocks: Vec<ClockReading>,
}

/// One clock domain's reading within a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    pub clock_id: u32,
    pub timestamp: u64,
}

/// Declares a timeline lane that events attach to.
///
/// `uuid` is never zero; zero is reserved to mean "no parent" on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDescriptor {
    pub uuid: u64,
    pub name: String,
    pub parent_uuid: Option<u64>,
    pub kind: TrackKind,
}

/// The shape of a track.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackKind {
    Process { pid: u32 },
    Thread { pid: u32, tid: u32 },
    Counter { unit: String },
    Generic,
}

/// A timeline event within one sequence.
///
/// `state_cleared` is set on the first record emitted for a sequence and on
/// no other. `interned` carries the interning declarations that became
/// pending since the previous event of the same sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub timestamp_ns: u64,
    pub sequence_id: u32,
    pub state_cleared: bool,
    pub interned: Vec<InternedEntry>,
    pub payload: EventPayload,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventPayload {
    Instant {
        track_uuid: u64,
        name: String,
        body_iid: Option<u64>,
        source_location_iid: Option<u64>,
    },
    SliceBegin {
        track_uuid: u64,
        name: String,
        categories: Vec<String>,
        annotations: Vec<DebugAnnotation>,
        flow_ids: Vec<u64>,
    },
    SliceEnd {
        track_uuid: u64,
    },
    Counter {
        track_uuid: u64,
        value: CounterValue,
    },
}

impl EventPayload {
    /// The track this event attaches to.
    pub fn track_uuid(&self) -> u64 {
        match self {
            EventPayload::Instant { track_uuid, .. }
            | EventPayload::SliceBegin { track_uuid, .. }
            | EventPayload::SliceEnd { track_uuid }
            | EventPayload::Counter { track_uuid, .. } => *track_uuid,
        }
    }
}

/// A named value attached to a slice-begin event.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugAnnotation {
    pub name: String,
    pub value: AnnotationValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Str(String),
    Int(i64),
    Double(f64),
    Bool(bool),
    Json(serde_json::Value),
}

impl From<&str> for AnnotationValue {
    fn from(s: &str) -> Self {
        AnnotationValue::Str(s.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(s: String) -> Self {
        AnnotationValue::Str(s)
    }
}

impl From<i64> for AnnotationValue {
    fn from(i: i64) -> Self {
        AnnotationValue::Int(i)
    }
}

impl From<f64> for AnnotationValue {
    fn from(f: f64) -> Self {
        AnnotationValue::Double(f)
    }
}

impl From<bool> for AnnotationValue {
    fn from(b: bool) -> Self {
        AnnotationValue::Bool(b)
    }
}

impl From<serde_json::Value> for AnnotationValue {
    fn from(v: serde_json::Value) -> Self {
        AnnotationValue::Json(v)
    }
}

/// A counter sample value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CounterValue {
    Int(i64),
    Double(f64),
}

impl From<i64> for CounterValue {
    fn from(i: i64) -> Self {
        CounterValue::Int(i)
    }
}

impl From<f64> for CounterValue {
    fn from(f: f64) -> Self {
        CounterValue::Double(f)
    }
}

/// A batch of log events, independent of the track graph.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp_ns: u64,
    pub sequence_id: u32,
    pub state_cleared: bool,
    pub events: Vec<LogEvent>,
    pub stats: LogStats,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub buffer: LogBuffer,
    pub priority: LogPriority,
    pub pid: u32,
    pub tid: u32,
    pub uid: u32,
    pub timestamp_ns: u64,
    pub tag: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogStats {
    pub total: u64,
    pub failed: u64,
    pub skipped: u64,
}

/// The log buffer a log event was written to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(u8)]
pub enum LogBuffer {
    #[default]
    Main = 0,
    Radio = 1,
    Events = 2,
    System = 3,
    Crash = 4,
    Stats = 5,
    Security = 6,
    Kernel = 7,
}

impl LogBuffer {
    /// Parse from the binary wire format byte value.
    pub fn from_wire_byte(b: u8) -> Self {
        match b {
            0 => Self::Main,
            1 => Self::Radio,
            2 => Self::Events,
            3 => Self::System,
            4 => Self::Crash,
            5 => Self::Stats,
            6 => Self::Security,
            7 => Self::Kernel,
            _ => Self::Main,
        }
    }
}

/// A log event's priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogPriority {
    #[default]
    Unspecified = 0,
    Verbose = 2,
    Debug = 3,
    Info = 4,
    Warn = 5,
    Error = 6,
    Fatal = 7,
}

impl LogPriority {
    /// Parse from the binary wire format byte value.
    pub fn from_wire_byte(b: u8) -> Self {
        match b {
            2 => Self::Verbose,
            3 => Self::Debug,
            4 => Self::Info,
            5 => Self::Warn,
            6 => Self::Error,
            7 => Self::Fatal,
            _ => Self::Unspecified,
        }
    }
}

/// A declaration binding an interned id to its payload value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternedEntry {
    pub iid: u64,
    pub payload: InternedPayload,
}

/// A value replaced by a small integer reference, declared once per sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InternedPayload {
    EventName(String),
    LogMessageBody(String),
    SourceLocation(SourceLocation),
}

impl InternedPayload {
    pub fn category(&self) -> InternCategory {
        match self {
            InternedPayload::EventName(_) => InternCategory::EventName,
            InternedPayload::LogMessageBody(_) => InternCategory::LogMessageBody,
            InternedPayload::SourceLocation(_) => InternCategory::SourceLocation,
        }
    }
}

/// The interning categories; each has its own independent iid space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InternCategory {
    EventName,
    LogMessageBody,
    SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub function: String,
    pub file: String,
    pub line: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_priority_wire_bytes() {
        assert_eq!(LogPriority::from_wire_byte(4), LogPriority::Info);
        assert_eq!(LogPriority::from_wire_byte(7), LogPriority::Fatal);
        // Unknown and unused byte values fall back to Unspecified.
        assert_eq!(LogPriority::from_wire_byte(1), LogPriority::Unspecified);
        assert_eq!(LogPriority::from_wire_byte(0xFF), LogPriority::Unspecified);
    }

    #[test]
    fn test_log_buffer_wire_bytes() {
        assert_eq!(LogBuffer::from_wire_byte(1), LogBuffer::Radio);
        assert_eq!(LogBuffer::from_wire_byte(7), LogBuffer::Kernel);
        assert_eq!(LogBuffer::from_wire_byte(0xFF), LogBuffer::Main);
    }

    #[test]
    fn test_payload_track_uuid() {
        let payload = EventPayload::Counter {
            track_uuid: 7,
            value: 42i64.into(),
        };
        assert_eq!(payload.track_uuid(), 7);
    }

    #[test]
    fn test_intern_categories() {
        assert_eq!(
            InternedPayload::EventName("a".into()).category(),
            InternCategory::EventName
        );
        assert_eq!(
            InternedPayload::LogMessageBody("a".into()).category(),
            InternCategory::LogMessageBody
        );
    }
}
