//! Builder and encoder for binary trace containers.
//!
//! A [`TraceDocument`] is assembled from high-level tracing calls (track
//! registration, instant events, slice begin/end pairs, counter samples, log
//! events) and serialized into one linear binary artifact a timeline viewer
//! can parse. The crate's job is keeping the cross-referencing identifier
//! spaces consistent while it does so: every event references a track that
//! exists, interned values are declared before use within their sequence,
//! each sequence clears its incremental state exactly once, and slices nest
//! correctly per track.
//!
//! # Container format
//!
//! The container is the 4-byte magic `TRCF` and a little-endian u16 format
//! version, followed by records until end of stream:
//!
//! | Offset | Size | Field       |
//! |--------|------|-------------|
//! | 0      | 1    | Record type |
//! | 1      | 4    | Body length |
//! | 5      | N    | Record body |
//!
//! Record bodies are encoded with uvarint/zigzag-varint integers,
//! fixed-width little-endian words, and length-prefixed UTF-8 strings; the
//! layout per record type is defined in [`wire`] and the `encode` module.
//! The sibling parser crate decodes the same format.
//!
//! # Usage
//!
//! ```
//! use tracefile::{SliceBeginData, TimeAnchor, TraceDocument};
//!
//! # fn main() -> Result<(), tracefile::Error> {
//! let mut doc = TraceDocument::new();
//! doc.add_clock_snapshot(TimeAnchor::new().clock_snapshot());
//!
//! let proc = doc.create_process_track("process-1", 100);
//! let thread = doc.create_thread_track("thread-1", 100, 200, Some(proc))?;
//!
//! let mut events = doc.builder(1);
//! events.slice_begin(SliceBeginData {
//!     track_uuid: thread,
//!     name: "work",
//!     time_us: 1000,
//!     ..Default::default()
//! })?;
//! events.slice_end(thread, 1500)?;
//!
//! assert!(doc.validate().is_empty());
//! let bytes = doc.serialize();
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```
//!
//! The document is single-writer by design: one sequence id corresponds to
//! one logical writer, and the event builder holds the document's mutable
//! borrow for the duration of its use.

// Re-exported so downstream crates share the same JSON value type as the
// `AnnotationValue::Json` variant.
pub use serde_json;

mod builder;
mod document;
mod encode;
mod eventbuf;
mod intern;
mod sequence;
mod track;
mod validate;

pub mod error;
pub mod record;
pub mod time_anchor;
pub mod wire;

pub use builder::{EventBuilder, LogEventData, SliceBeginData};
pub use document::{RecordRef, TraceDocument};
pub use error::Error;
pub use intern::InternTable;
pub use record::{
    clock_id, AnnotationValue, ClockReading, ClockSnapshot, CounterValue, DebugAnnotation, Event,
    EventPayload, InternCategory, InternedEntry, InternedPayload, LogBuffer, LogEntry, LogEvent,
    LogPriority, LogStats, Record, SourceLocation, TrackDescriptor, TrackKind,
};
pub use sequence::SequenceContext;
pub use time_anchor::TimeAnchor;
pub use track::{IdAllocator, TrackRegistry};
pub use validate::{IssueKind, Severity, ValidationIssue};
