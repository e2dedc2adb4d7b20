use bytes::Bytes;

use crate::builder::EventBuilder;
use crate::encode;
use crate::error::Error;
use crate::intern::InternTable;
use crate::record::{ClockReading, ClockSnapshot, Record, TrackKind};
use crate::sequence::SequenceContext;
use crate::track::TrackRegistry;
use crate::validate::{self, ValidationIssue};

/// A reference to an appended record: its index in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRef(pub(crate) usize);

impl RecordRef {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The root aggregate: an ordered sequence of records plus the accounting
/// state that keeps the identifier spaces consistent.
///
/// A document has a single writer. Emission order is the on-wire order.
#[derive(Debug, Default)]
pub struct TraceDocument {
    records: Vec<Record>,
    pub(crate) tracks: TrackRegistry,
    pub(crate) interns: InternTable,
    pub(crate) sequences: SequenceContext,
}

impl PartialEq for TraceDocument {
    /// Documents compare by their record sequences; the accounting state is
    /// derived from them.
    fn eq(&self, other: &Self) -> bool {
        self.records == other.records
    }
}

impl TraceDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// The records in emission order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub(crate) fn append(&mut self, record: Record) -> RecordRef {
        self.records.push(record);
        RecordRef(self.records.len() - 1)
    }

    /// Appends a clock snapshot: an independent synchronization point
    /// mapping clock domains to comparable timestamps. May be added any
    /// number of times; a well-formed container has at least one.
    pub fn add_clock_snapshot(&mut self, clocks: Vec<ClockReading>) -> RecordRef {
        self.append(Record::ClockSnapshot(ClockSnapshot { clocks }))
    }

    /// Creates a generic track, optionally under a parent track.
    ///
    /// Appends one descriptor record and returns the track's uuid. Every
    /// call creates a new distinct track, even for a repeated name; callers
    /// wanting de-duplication cache the returned uuid.
    pub fn create_track(&mut self, name: &str, parent_uuid: Option<u64>) -> Result<u64, Error> {
        let desc = self.tracks.register(name, parent_uuid, TrackKind::Generic)?;
        let uuid = desc.uuid;
        self.append(Record::TrackDescriptor(desc));
        Ok(uuid)
    }

    /// Creates a process track.
    pub fn create_process_track(&mut self, name: &str, pid: u32) -> u64 {
        let desc = self.tracks.register_root(name, TrackKind::Process { pid });
        let uuid = desc.uuid;
        self.append(Record::TrackDescriptor(desc));
        uuid
    }

    /// Creates a thread track, typically under its process track.
    pub fn create_thread_track(
        &mut self,
        name: &str,
        pid: u32,
        tid: u32,
        parent_uuid: Option<u64>,
    ) -> Result<u64, Error> {
        let desc = self
            .tracks
            .register(name, parent_uuid, TrackKind::Thread { pid, tid })?;
        let uuid = desc.uuid;
        self.append(Record::TrackDescriptor(desc));
        Ok(uuid)
    }

    /// Creates a counter track with a unit name.
    pub fn create_counter_track(
        &mut self,
        name: &str,
        unit: &str,
        parent_uuid: Option<u64>,
    ) -> Result<u64, Error> {
        let kind = TrackKind::Counter {
            unit: unit.to_string(),
        };
        let desc = self.tracks.register(name, parent_uuid, kind)?;
        let uuid = desc.uuid;
        self.append(Record::TrackDescriptor(desc));
        Ok(uuid)
    }

    /// Returns the event writer for one sequence.
    pub fn builder(&mut self, sequence_id: u32) -> EventBuilder<'_> {
        EventBuilder::new(self, sequence_id)
    }

    /// Marks a sequence finalized. Interning in it fails from here on.
    pub fn finish_sequence(&mut self, sequence_id: u32) {
        self.interns.finalize(sequence_id);
        log::debug!("finalized sequence {sequence_id}");
    }

    /// Encodes all records, in emission order, into the container wire
    /// format. Pure: does not mutate the document, and the output is
    /// bit-identical for an identical record sequence.
    pub fn serialize(&self) -> Bytes {
        encode::encode_document(&self.records)
    }

    /// Writes the serialized container to a byte sink as one bulk write.
    ///
    /// The sink's lifecycle (paths, permissions, retries) belongs to the
    /// caller.
    pub fn write_to<W: std::io::Write>(&self, sink: &mut W) -> std::io::Result<()> {
        let buf = self.serialize();
        sink.write_all(&buf)?;
        sink.flush()?;
        log::debug!(
            "wrote trace container: {} records, {} bytes",
            self.records.len(),
            buf.len()
        );
        Ok(())
    }

    /// Checks the record sequence against the container invariants and
    /// returns the findings. Never fails: a document may be intentionally
    /// incomplete, so callers choose which findings to treat as fatal.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        validate::validate_records(&self.records)
    }

    /// Rebuilds a document from an already-decoded record sequence.
    ///
    /// The accounting state is replayed tolerantly: known tracks and open
    /// slices, interning scopes, sequence markers, and the identifier
    /// high-water mark all continue where the records left off. No
    /// validation happens here; that is [`TraceDocument::validate`].
    pub fn from_records(records: Vec<Record>) -> Self {
        let mut doc = TraceDocument::new();
        for record in &records {
            match record {
                Record::ClockSnapshot(_) => {}
                Record::TrackDescriptor(desc) => doc.tracks.observe(desc.uuid),
                Record::Event(event) => {
                    doc.sequences.open(event.sequence_id).mark_emitted();
                    for entry in &event.interned {
                        doc.interns.observe(event.sequence_id, entry);
                    }
                    doc.replay_slice_state(event);
                }
                Record::LogEntry(entry) => {
                    doc.sequences.open(entry.sequence_id).mark_emitted();
                }
            }
        }
        doc.records = records;
        doc
    }

    fn replay_slice_state(&mut self, event: &crate::record::Event) {
        use crate::record::EventPayload;
        use crate::track::OpenSlice;

        match &event.payload {
            EventPayload::SliceBegin { track_uuid, .. } => {
                if let Some(state) = self.tracks.state_mut(*track_uuid) {
                    state.open_slice = Some(OpenSlice {
                        begin_ns: event.timestamp_ns,
                    });
                }
            }
            EventPayload::SliceEnd { track_uuid } => {
                if let Some(state) = self.tracks.state_mut(*track_uuid) {
                    state.open_slice = None;
                }
            }
            EventPayload::Instant { .. } | EventPayload::Counter { .. } => {}
        }
    }
}
