use crate::document::{RecordRef, TraceDocument};
use crate::error::Error;
use crate::record::{
    AnnotationValue, CounterValue, DebugAnnotation, Event, EventPayload, InternedPayload,
    LogBuffer, LogEntry, LogEvent, LogPriority, LogStats, Record, SourceLocation,
};
use crate::track::OpenSlice;

/// A scoped event writer bound to one sequence.
///
/// One sequence corresponds to one logical writer; obtaining the builder
/// through [`TraceDocument::builder`] makes that structural, since the
/// builder holds the document's single mutable borrow.
///
/// Timestamps are taken in microseconds at this boundary and converted
/// exactly to the document's internal nanosecond unit.
pub struct EventBuilder<'a> {
    doc: &'a mut TraceDocument,
    sequence_id: u32,
}

/// Parameters for a slice-begin event.
#[derive(Debug, Default)]
pub struct SliceBeginData<'a> {
    pub track_uuid: u64,
    pub name: &'a str,
    pub time_us: u64,
    pub categories: &'a [&'a str],
    pub annotations: &'a [(&'a str, AnnotationValue)],
    pub flow_ids: &'a [u64],
}

/// Parameters for a log event.
#[derive(Debug, Default)]
pub struct LogEventData<'a> {
    pub time_us: u64,
    pub tag: &'a str,
    pub message: &'a str,
    pub priority: LogPriority,
    pub buffer: LogBuffer,
    pub pid: u32,
    pub tid: u32,
    pub uid: u32,
}

impl<'a> EventBuilder<'a> {
    pub(crate) fn new(doc: &'a mut TraceDocument, sequence_id: u32) -> Self {
        EventBuilder { doc, sequence_id }
    }

    pub fn sequence_id(&self) -> u32 {
        self.sequence_id
    }

    /// Emits an instant event on a track.
    ///
    /// With `log_body`, the body and a synthetic source location are interned
    /// and their iids attached; the declarations ride along on this event.
    /// Instants never touch the per-track slice state.
    pub fn instant(
        &mut self,
        track_uuid: u64,
        name: &str,
        time_us: u64,
        log_body: Option<&str>,
    ) -> Result<RecordRef, Error> {
        let timestamp_ns = us_to_ns(time_us)?;
        self.require_track(track_uuid)?;

        let (body_iid, source_location_iid) = match log_body {
            Some(body) => {
                let body_iid = self
                    .doc
                    .interns
                    .intern(self.sequence_id, InternedPayload::LogMessageBody(body.to_string()))?;
                let loc = SourceLocation {
                    function: name.to_string(),
                    file: String::new(),
                    line: 0,
                };
                let loc_iid = self
                    .doc
                    .interns
                    .intern(self.sequence_id, InternedPayload::SourceLocation(loc))?;
                (Some(body_iid), Some(loc_iid))
            }
            None => (None, None),
        };

        Ok(self.emit(
            timestamp_ns,
            EventPayload::Instant {
                track_uuid,
                name: name.to_string(),
                body_iid,
                source_location_iid,
            },
        ))
    }

    /// Opens a slice on a track.
    ///
    /// At most one slice may be open per track; a second begin without an
    /// intervening end fails.
    pub fn slice_begin(&mut self, data: SliceBeginData<'_>) -> Result<RecordRef, Error> {
        let timestamp_ns = us_to_ns(data.time_us)?;

        let state = self
            .doc
            .tracks
            .state_mut(data.track_uuid)
            .ok_or(Error::UnknownTrack(data.track_uuid))?;
        if state.open_slice.is_some() {
            return Err(Error::SliceAlreadyOpen(data.track_uuid));
        }
        state.open_slice = Some(OpenSlice {
            begin_ns: timestamp_ns,
        });

        let payload = EventPayload::SliceBegin {
            track_uuid: data.track_uuid,
            name: data.name.to_string(),
            categories: data.categories.iter().map(|c| c.to_string()).collect(),
            annotations: data
                .annotations
                .iter()
                .map(|(name, value)| DebugAnnotation {
                    name: name.to_string(),
                    value: value.clone(),
                })
                .collect(),
            flow_ids: data.flow_ids.to_vec(),
        };
        Ok(self.emit(timestamp_ns, payload))
    }

    /// Closes the open slice on a track.
    ///
    /// The end timestamp must not precede the matching begin.
    pub fn slice_end(&mut self, track_uuid: u64, time_us: u64) -> Result<RecordRef, Error> {
        let timestamp_ns = us_to_ns(time_us)?;

        let state = self
            .doc
            .tracks
            .state_mut(track_uuid)
            .ok_or(Error::UnknownTrack(track_uuid))?;
        let open = state.open_slice.ok_or(Error::NoOpenSlice(track_uuid))?;
        if timestamp_ns < open.begin_ns {
            return Err(Error::NonMonotonicTime {
                track_uuid,
                begin_ns: open.begin_ns,
                end_ns: timestamp_ns,
            });
        }
        state.open_slice = None;

        Ok(self.emit(timestamp_ns, EventPayload::SliceEnd { track_uuid }))
    }

    /// Emits a counter sample. Counters are stateless samples.
    pub fn counter(
        &mut self,
        track_uuid: u64,
        time_us: u64,
        value: impl Into<CounterValue>,
    ) -> Result<RecordRef, Error> {
        let timestamp_ns = us_to_ns(time_us)?;
        self.require_track(track_uuid)?;
        Ok(self.emit(
            timestamp_ns,
            EventPayload::Counter {
                track_uuid,
                value: value.into(),
            },
        ))
    }

    /// Appends a log entry. The log channel is independent of the track
    /// graph, so there is no track to resolve.
    pub fn log_event(&mut self, data: LogEventData<'_>) -> Result<RecordRef, Error> {
        let timestamp_ns = us_to_ns(data.time_us)?;

        let state_cleared = self.doc.sequences.open(self.sequence_id).stamp();
        let entry = LogEntry {
            timestamp_ns,
            sequence_id: self.sequence_id,
            state_cleared,
            events: vec![LogEvent {
                buffer: data.buffer,
                priority: data.priority,
                pid: data.pid,
                tid: data.tid,
                uid: data.uid,
                timestamp_ns,
                tag: data.tag.to_string(),
                message: data.message.to_string(),
            }],
            stats: LogStats {
                total: 1,
                failed: 0,
                skipped: 0,
            },
        };
        Ok(self.doc.append(Record::LogEntry(entry)))
    }

    fn require_track(&self, track_uuid: u64) -> Result<(), Error> {
        if self.doc.tracks.contains(track_uuid) {
            Ok(())
        } else {
            Err(Error::UnknownTrack(track_uuid))
        }
    }

    /// The single append choke point for track events: drains pending
    /// interning declarations, stamps the sequence, appends the record.
    fn emit(&mut self, timestamp_ns: u64, payload: EventPayload) -> RecordRef {
        let interned = self.doc.interns.take_pending(self.sequence_id);
        let state_cleared = self.doc.sequences.open(self.sequence_id).stamp();
        self.doc.append(Record::Event(Event {
            timestamp_ns,
            sequence_id: self.sequence_id,
            state_cleared,
            interned,
            payload,
        }))
    }
}

fn us_to_ns(time_us: u64) -> Result<u64, Error> {
    time_us
        .checked_mul(1000)
        .ok_or(Error::TimestampOverflow(time_us))
}
