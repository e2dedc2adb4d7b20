use std::io::Read;

use tracefile::wire;
use tracefile::{
    AnnotationValue, ClockReading, ClockSnapshot, CounterValue, DebugAnnotation, Event,
    EventPayload, InternedEntry, InternedPayload, LogBuffer, LogEntry, LogEvent, LogPriority,
    LogStats, Record, SourceLocation, TraceDocument, TrackDescriptor, TrackKind,
};

use crate::error::ParseError;
use crate::reader::{self, EventReader};

/// Decode a complete trace container into a document.
///
/// Aborts on the first structurally invalid byte; a corrupt stream cannot be
/// resynchronized. The result is not semantically re-validated here; that is
/// `TraceDocument::validate`'s job.
pub fn decode(bytes: &[u8]) -> Result<TraceDocument, ParseError> {
    let mut cursor = std::io::Cursor::new(bytes);
    let version = reader::read_container_header(&mut cursor)?;

    let mut records = Vec::new();
    loop {
        match parse_record(&mut cursor, version) {
            Ok(record) => records.push(record),
            Err(ParseError::EndOfStream) => break,
            Err(e) => return Err(e),
        }
    }

    Ok(TraceDocument::from_records(records))
}

/// Parse a single record from the reader.
///
/// Reads one complete record (header + body) from the stream.
/// Returns `ParseError::EndOfStream` when there are no more records.
pub fn parse_record(reader: &mut impl Read, version: u16) -> Result<Record, ParseError> {
    let header = reader::read_record_header(reader)?;
    let body = reader::read_body(reader, header.body_len)?;
    let mut r = EventReader::new(&body, version);

    let record = match header.record_type {
        wire::CLOCK_SNAPSHOT => Record::ClockSnapshot(r.clock_snapshot()),
        wire::TRACK_DESCRIPTOR => Record::TrackDescriptor(r.track_descriptor()?),
        wire::EVENT => Record::Event(r.event()?),
        wire::LOG_ENTRY => Record::LogEntry(r.log_entry()),
        other => return Err(ParseError::UnknownRecordType(other)),
    };

    if r.has_error() {
        return Err(ParseError::UnexpectedEof);
    }
    if r.bytes_read() != body.len() {
        return Err(ParseError::InvalidData(format!(
            "{} trailing bytes in record body",
            body.len() - r.bytes_read()
        )));
    }

    Ok(record)
}

fn non_zero_u64(val: u64) -> Option<u64> {
    if val == 0 {
        None
    } else {
        Some(val)
    }
}

// === Record-specific parsing methods on EventReader ===

impl EventReader<'_> {
    fn clock_snapshot(&mut self) -> ClockSnapshot {
        let n = self.uvarint() as usize;
        let mut clocks = Vec::new();
        for _ in 0..n {
            if self.has_error() {
                break;
            }
            let clock_id = self.uvarint() as u32;
            let timestamp = self.uint64();
            clocks.push(ClockReading {
                clock_id,
                timestamp,
            });
        }
        ClockSnapshot { clocks }
    }

    fn track_descriptor(&mut self) -> Result<TrackDescriptor, ParseError> {
        let uuid = self.uint64();
        let name = self.string();
        let parent = self.uint64();
        let kind = match self.byte() {
            wire::TRACK_GENERIC => TrackKind::Generic,
            wire::TRACK_PROCESS => TrackKind::Process {
                pid: self.uvarint() as u32,
            },
            wire::TRACK_THREAD => TrackKind::Thread {
                pid: self.uvarint() as u32,
                tid: self.uvarint() as u32,
            },
            wire::TRACK_COUNTER => TrackKind::Counter {
                unit: self.string(),
            },
            other => {
                return Err(ParseError::InvalidData(format!(
                    "unknown track kind byte 0x{other:02x}"
                )));
            }
        };
        Ok(TrackDescriptor {
            uuid,
            name,
            parent_uuid: non_zero_u64(parent),
            kind,
        })
    }

    fn event(&mut self) -> Result<Event, ParseError> {
        let timestamp_ns = self.uint64();
        let sequence_id = self.uint32();
        let state_cleared = self.bool_val();

        let n = self.uvarint() as usize;
        let mut interned = Vec::new();
        for _ in 0..n {
            if self.has_error() {
                break;
            }
            interned.push(self.interned_entry()?);
        }

        let payload = match self.byte() {
            wire::EVENT_INSTANT => {
                let track_uuid = self.uint64();
                let name = self.string();
                let body_iid = self.opt_uvarint();
                let source_location_iid = self.opt_uvarint();
                EventPayload::Instant {
                    track_uuid,
                    name,
                    body_iid,
                    source_location_iid,
                }
            }
            wire::EVENT_SLICE_BEGIN => {
                let track_uuid = self.uint64();
                let name = self.string();

                let n = self.uvarint() as usize;
                let mut categories = Vec::new();
                for _ in 0..n {
                    if self.has_error() {
                        break;
                    }
                    categories.push(self.string());
                }

                let n = self.uvarint() as usize;
                let mut annotations = Vec::new();
                for _ in 0..n {
                    if self.has_error() {
                        break;
                    }
                    annotations.push(self.annotation()?);
                }

                let n = self.uvarint() as usize;
                let mut flow_ids = Vec::new();
                for _ in 0..n {
                    if self.has_error() {
                        break;
                    }
                    flow_ids.push(self.uvarint());
                }

                EventPayload::SliceBegin {
                    track_uuid,
                    name,
                    categories,
                    annotations,
                    flow_ids,
                }
            }
            wire::EVENT_SLICE_END => EventPayload::SliceEnd {
                track_uuid: self.uint64(),
            },
            wire::EVENT_COUNTER => {
                let track_uuid = self.uint64();
                let value = match self.byte() {
                    wire::COUNTER_INT => CounterValue::Int(self.varint()),
                    wire::COUNTER_DOUBLE => CounterValue::Double(self.float64()),
                    other => {
                        if self.has_error() {
                            return Err(ParseError::UnexpectedEof);
                        }
                        return Err(ParseError::InvalidData(format!(
                            "unknown counter value byte 0x{other:02x}"
                        )));
                    }
                };
                EventPayload::Counter { track_uuid, value }
            }
            other => {
                if self.has_error() {
                    return Err(ParseError::UnexpectedEof);
                }
                return Err(ParseError::InvalidData(format!(
                    "unknown event payload byte 0x{other:02x}"
                )));
            }
        };

        Ok(Event {
            timestamp_ns,
            sequence_id,
            state_cleared,
            interned,
            payload,
        })
    }

    fn interned_entry(&mut self) -> Result<InternedEntry, ParseError> {
        let category = self.byte();
        let iid = self.uvarint();
        let payload = match category {
            wire::INTERN_EVENT_NAME => InternedPayload::EventName(self.string()),
            wire::INTERN_LOG_MESSAGE_BODY => InternedPayload::LogMessageBody(self.string()),
            wire::INTERN_SOURCE_LOCATION => InternedPayload::SourceLocation(SourceLocation {
                function: self.string(),
                file: self.string(),
                line: self.uvarint() as u32,
            }),
            other => {
                if self.has_error() {
                    return Err(ParseError::UnexpectedEof);
                }
                return Err(ParseError::InvalidData(format!(
                    "unknown intern category byte 0x{other:02x}"
                )));
            }
        };
        Ok(InternedEntry { iid, payload })
    }

    fn annotation(&mut self) -> Result<DebugAnnotation, ParseError> {
        let name = self.string();
        let value = match self.byte() {
            wire::ANNOTATION_STR => AnnotationValue::Str(self.string()),
            wire::ANNOTATION_INT => AnnotationValue::Int(self.varint()),
            wire::ANNOTATION_DOUBLE => AnnotationValue::Double(self.float64()),
            wire::ANNOTATION_BOOL => AnnotationValue::Bool(self.bool_val()),
            wire::ANNOTATION_JSON => {
                let raw = self.string();
                if self.has_error() {
                    return Err(ParseError::UnexpectedEof);
                }
                let value = parse_json_value(&raw)?;
                AnnotationValue::Json(value)
            }
            other => {
                if self.has_error() {
                    return Err(ParseError::UnexpectedEof);
                }
                return Err(ParseError::InvalidData(format!(
                    "unknown annotation value byte 0x{other:02x}"
                )));
            }
        };
        Ok(DebugAnnotation { name, value })
    }

    fn log_entry(&mut self) -> LogEntry {
        let timestamp_ns = self.uint64();
        let sequence_id = self.uint32();
        let state_cleared = self.bool_val();

        let n = self.uvarint() as usize;
        let mut events = Vec::new();
        for _ in 0..n {
            if self.has_error() {
                break;
            }
            events.push(LogEvent {
                buffer: LogBuffer::from_wire_byte(self.byte()),
                priority: LogPriority::from_wire_byte(self.byte()),
                pid: self.uvarint() as u32,
                tid: self.uvarint() as u32,
                uid: self.uvarint() as u32,
                timestamp_ns: self.uint64(),
                tag: self.string(),
                message: self.string(),
            });
        }

        let stats = LogStats {
            total: self.uvarint(),
            failed: self.uvarint(),
            skipped: self.uvarint(),
        };

        LogEntry {
            timestamp_ns,
            sequence_id,
            state_cleared,
            events,
            stats,
        }
    }
}

fn parse_json_value(raw: &str) -> Result<tracefile::serde_json::Value, ParseError> {
    tracefile::serde_json::from_str(raw)
        .map_err(|e| ParseError::InvalidData(format!("bad json annotation value: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_parse_record_unknown_type() {
        let mut data = Vec::new();
        data.push(0x77);
        data.extend_from_slice(&0u32.to_le_bytes());
        let mut cursor = std::io::Cursor::new(&data);
        assert_matches!(
            parse_record(&mut cursor, wire::FORMAT_VERSION),
            Err(ParseError::UnknownRecordType(0x77))
        );
    }

    #[test]
    fn test_parse_record_truncated_body() {
        let mut data = Vec::new();
        data.push(wire::EVENT);
        data.extend_from_slice(&100u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 10]); // far fewer than 100 bytes
        let mut cursor = std::io::Cursor::new(&data);
        assert_matches!(
            parse_record(&mut cursor, wire::FORMAT_VERSION),
            Err(ParseError::Io(_))
        );
    }

    #[test]
    fn test_parse_record_underrun_body() {
        // A clock snapshot body claiming one reading but ending early.
        let mut data = Vec::new();
        data.push(wire::CLOCK_SNAPSHOT);
        data.extend_from_slice(&2u32.to_le_bytes());
        data.push(0x01); // count = 1
        data.push(0x01); // clock id, then the u64 timestamp is missing
        let mut cursor = std::io::Cursor::new(&data);
        assert_matches!(
            parse_record(&mut cursor, wire::FORMAT_VERSION),
            Err(ParseError::UnexpectedEof)
        );
    }

    #[test]
    fn test_parse_record_trailing_bytes() {
        // A clock snapshot with zero readings, followed by a stray byte
        // inside the declared body length.
        let mut data = Vec::new();
        data.push(wire::CLOCK_SNAPSHOT);
        data.extend_from_slice(&2u32.to_le_bytes());
        data.push(0x00); // count = 0
        data.push(0xAB); // trailing
        let mut cursor = std::io::Cursor::new(&data);
        assert_matches!(
            parse_record(&mut cursor, wire::FORMAT_VERSION),
            Err(ParseError::InvalidData(_))
        );
    }

    #[test]
    fn test_parse_empty_clock_snapshot() {
        let mut data = Vec::new();
        data.push(wire::CLOCK_SNAPSHOT);
        data.extend_from_slice(&1u32.to_le_bytes());
        data.push(0x00); // count = 0
        let mut cursor = std::io::Cursor::new(&data);
        let record = parse_record(&mut cursor, wire::FORMAT_VERSION).unwrap();
        assert_eq!(
            record,
            Record::ClockSnapshot(ClockSnapshot { clocks: Vec::new() })
        );
    }
}
