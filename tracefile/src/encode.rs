//! Record encoding into the container wire format.
//!
//! The container is the magic bytes and format version followed by
//! type/length-delimited records; each record body is encoded with the
//! [`EventBuffer`] primitives. The layout is mirrored by the parser crate
//! and must stay in lockstep with it within a format version.

use bytes::Bytes;

use crate::eventbuf::EventBuffer;
use crate::record::{
    AnnotationValue, CounterValue, Event, EventPayload, InternedEntry, InternedPayload, LogEntry,
    Record, TrackKind,
};
use crate::wire;

pub(crate) fn encode_document(records: &[Record]) -> Bytes {
    let mut eb = EventBuffer::with_capacity(16 + records.len() * 64);
    eb.bytes(&wire::MAGIC);
    eb.u16(wire::FORMAT_VERSION);

    for record in records {
        let body = encode_record_body(record);
        eb.byte(record_type(record));
        eb.u32(body.len() as u32);
        eb.raw(&body);
    }

    eb.freeze()
}

fn record_type(record: &Record) -> u8 {
    match record {
        Record::ClockSnapshot(_) => wire::CLOCK_SNAPSHOT,
        Record::TrackDescriptor(_) => wire::TRACK_DESCRIPTOR,
        Record::Event(_) => wire::EVENT,
        Record::LogEntry(_) => wire::LOG_ENTRY,
    }
}

fn encode_record_body(record: &Record) -> Bytes {
    let mut eb = EventBuffer::with_capacity(64);
    match record {
        Record::ClockSnapshot(snapshot) => {
            eb.uvarint(snapshot.clocks.len() as u64);
            for clock in &snapshot.clocks {
                eb.uvarint(clock.clock_id);
                eb.u64(clock.timestamp);
            }
        }

        Record::TrackDescriptor(desc) => {
            eb.u64(desc.uuid);
            eb.str(&desc.name);
            eb.u64(desc.parent_uuid.unwrap_or(0));
            match &desc.kind {
                TrackKind::Generic => eb.byte(wire::TRACK_GENERIC),
                TrackKind::Process { pid } => {
                    eb.byte(wire::TRACK_PROCESS);
                    eb.uvarint(*pid);
                }
                TrackKind::Thread { pid, tid } => {
                    eb.byte(wire::TRACK_THREAD);
                    eb.uvarint(*pid);
                    eb.uvarint(*tid);
                }
                TrackKind::Counter { unit } => {
                    eb.byte(wire::TRACK_COUNTER);
                    eb.str(unit);
                }
            }
        }

        Record::Event(event) => encode_event(&mut eb, event),
        Record::LogEntry(entry) => encode_log_entry(&mut eb, entry),
    }
    eb.freeze()
}

fn encode_event(eb: &mut EventBuffer, event: &Event) {
    eb.u64(event.timestamp_ns);
    eb.u32(event.sequence_id);
    eb.bool(event.state_cleared);

    // Interning declarations precede the payload that references them.
    eb.uvarint(event.interned.len() as u64);
    for entry in &event.interned {
        encode_interned_entry(eb, entry);
    }

    match &event.payload {
        EventPayload::Instant {
            track_uuid,
            name,
            body_iid,
            source_location_iid,
        } => {
            eb.byte(wire::EVENT_INSTANT);
            eb.u64(*track_uuid);
            eb.str(name);
            eb.uvarint(body_iid.unwrap_or(0));
            eb.uvarint(source_location_iid.unwrap_or(0));
        }

        EventPayload::SliceBegin {
            track_uuid,
            name,
            categories,
            annotations,
            flow_ids,
        } => {
            eb.byte(wire::EVENT_SLICE_BEGIN);
            eb.u64(*track_uuid);
            eb.str(name);
            eb.uvarint(categories.len() as u64);
            for category in categories {
                eb.str(category);
            }
            eb.uvarint(annotations.len() as u64);
            for annotation in annotations {
                eb.str(&annotation.name);
                encode_annotation_value(eb, &annotation.value);
            }
            eb.uvarint(flow_ids.len() as u64);
            for flow_id in flow_ids {
                eb.uvarint(*flow_id);
            }
        }

        EventPayload::SliceEnd { track_uuid } => {
            eb.byte(wire::EVENT_SLICE_END);
            eb.u64(*track_uuid);
        }

        EventPayload::Counter { track_uuid, value } => {
            eb.byte(wire::EVENT_COUNTER);
            eb.u64(*track_uuid);
            match value {
                CounterValue::Int(i) => {
                    eb.byte(wire::COUNTER_INT);
                    eb.ivarint(*i);
                }
                CounterValue::Double(f) => {
                    eb.byte(wire::COUNTER_DOUBLE);
                    eb.f64(*f);
                }
            }
        }
    }
}

fn encode_interned_entry(eb: &mut EventBuffer, entry: &InternedEntry) {
    match &entry.payload {
        InternedPayload::EventName(name) => {
            eb.byte(wire::INTERN_EVENT_NAME);
            eb.uvarint(entry.iid);
            eb.str(name);
        }
        InternedPayload::LogMessageBody(body) => {
            eb.byte(wire::INTERN_LOG_MESSAGE_BODY);
            eb.uvarint(entry.iid);
            eb.str(body);
        }
        InternedPayload::SourceLocation(loc) => {
            eb.byte(wire::INTERN_SOURCE_LOCATION);
            eb.uvarint(entry.iid);
            eb.str(&loc.function);
            eb.str(&loc.file);
            eb.uvarint(loc.line);
        }
    }
}

fn encode_annotation_value(eb: &mut EventBuffer, value: &AnnotationValue) {
    match value {
        AnnotationValue::Str(s) => {
            eb.byte(wire::ANNOTATION_STR);
            eb.str(s);
        }
        AnnotationValue::Int(i) => {
            eb.byte(wire::ANNOTATION_INT);
            eb.ivarint(*i);
        }
        AnnotationValue::Double(f) => {
            eb.byte(wire::ANNOTATION_DOUBLE);
            eb.f64(*f);
        }
        AnnotationValue::Bool(b) => {
            eb.byte(wire::ANNOTATION_BOOL);
            eb.bool(*b);
        }
        AnnotationValue::Json(v) => {
            eb.byte(wire::ANNOTATION_JSON);
            eb.str(serde_json::to_string(v).unwrap_or_default());
        }
    }
}

fn encode_log_entry(eb: &mut EventBuffer, entry: &LogEntry) {
    eb.u64(entry.timestamp_ns);
    eb.u32(entry.sequence_id);
    eb.bool(entry.state_cleared);

    eb.uvarint(entry.events.len() as u64);
    for event in &entry.events {
        eb.byte(event.buffer as u8);
        eb.byte(event.priority as u8);
        eb.uvarint(event.pid);
        eb.uvarint(event.tid);
        eb.uvarint(event.uid);
        eb.u64(event.timestamp_ns);
        eb.str(&event.tag);
        eb.str(&event.message);
    }

    eb.uvarint(entry.stats.total);
    eb.uvarint(entry.stats.failed);
    eb.uvarint(entry.stats.skipped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ClockReading, ClockSnapshot};

    #[test]
    fn test_container_header() {
        let buf = encode_document(&[]);
        assert_eq!(&buf[..4], b"TRCF");
        assert_eq!(
            u16::from_le_bytes([buf[4], buf[5]]),
            wire::FORMAT_VERSION
        );
        assert_eq!(buf.len(), 6);
    }

    #[test]
    fn test_record_framing() {
        let record = Record::ClockSnapshot(ClockSnapshot {
            clocks: vec![ClockReading {
                clock_id: 1,
                timestamp: 2,
            }],
        });
        let buf = encode_document(std::slice::from_ref(&record));

        assert_eq!(buf[6], wire::CLOCK_SNAPSHOT);
        let body_len = u32::from_le_bytes([buf[7], buf[8], buf[9], buf[10]]) as usize;
        assert_eq!(buf.len(), 11 + body_len);
        // count=1, clock_id=1 as uvarint, timestamp as fixed 8 bytes.
        assert_eq!(body_len, 1 + 1 + 8);
    }

    #[test]
    fn test_zero_parent_means_none() {
        let record = Record::TrackDescriptor(crate::record::TrackDescriptor {
            uuid: 3,
            name: String::new(),
            parent_uuid: None,
            kind: TrackKind::Generic,
        });
        let buf = encode_document(std::slice::from_ref(&record));
        let body = &buf[11..];
        // uuid, empty name, parent 0, generic kind byte.
        assert_eq!(body[..8], 3u64.to_le_bytes());
        assert_eq!(body[8], 0x00);
        assert_eq!(body[9..17], 0u64.to_le_bytes());
        assert_eq!(body[17], wire::TRACK_GENERIC);
    }
}
