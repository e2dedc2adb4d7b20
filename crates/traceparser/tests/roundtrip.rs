use assert_matches::assert_matches;
use chrono::TimeZone;

use tracefile::{
    clock_id, AnnotationValue, EventPayload, LogBuffer, LogEventData, LogPriority, Record,
    Severity, SliceBeginData, TimeAnchor, TraceDocument, TrackKind,
};
use tracefile_traceparser::{decode, ParseError};

fn anchor() -> TimeAnchor {
    TimeAnchor::at(
        chrono::Utc
            .with_ymd_and_hms(2022, 11, 7, 18, 19, 51)
            .unwrap(),
    )
}

/// Builds a document exercising every record kind and payload variant.
fn full_document() -> TraceDocument {
    let mut doc = TraceDocument::new();
    doc.add_clock_snapshot(anchor().clock_snapshot());

    let proc = doc.create_process_track("process-1", 100);
    let thread = doc
        .create_thread_track("thread-1", 100, 200, Some(proc))
        .unwrap();
    let counter = doc
        .create_counter_track("cpu_counter", "MHz", Some(proc))
        .unwrap();
    let logs = doc.create_track("Android Logs", None).unwrap();

    let mut events = doc.builder(1);
    events
        .instant(logs, "boot", 500, Some("message for log test"))
        .unwrap();
    events
        .slice_begin(SliceBeginData {
            track_uuid: thread,
            name: "Application",
            time_us: 1000,
            categories: &["C1", "net"],
            annotations: &[
                ("delay_ms", AnnotationValue::Int(30)),
                ("source", AnnotationValue::Str("radio".into())),
                ("ratio", AnnotationValue::Double(0.75)),
                ("cached", AnnotationValue::Bool(false)),
                (
                    "extra",
                    AnnotationValue::Json(tracefile::serde_json::json!({"a": [1, 2]})),
                ),
            ],
            flow_ids: &[1055895987],
        })
        .unwrap();
    events.counter(counter, 1200, 4200i64).unwrap();
    events.counter(counter, 1300, 0.5f64).unwrap();
    events.slice_end(thread, 1500).unwrap();
    events
        .log_event(LogEventData {
            time_us: 1600,
            tag: "my_tag",
            message: "test log text from my custom",
            priority: LogPriority::Info,
            buffer: LogBuffer::Radio,
            pid: 100,
            tid: 200,
            uid: 400,
        })
        .unwrap();

    doc
}

#[test]
fn test_roundtrip_full_document() {
    let doc = full_document();
    assert!(doc.validate().is_empty());

    let bytes = doc.serialize();
    let decoded = decode(&bytes).unwrap();

    assert_eq!(decoded.records(), doc.records());
    assert_eq!(decoded, doc);
    assert!(decoded.validate().is_empty());

    // Re-serializing the decoded document reproduces the bytes exactly.
    assert_eq!(decoded.serialize(), bytes);
}

#[test]
fn test_roundtrip_empty_document() {
    let doc = TraceDocument::new();
    let decoded = decode(&doc.serialize()).unwrap();
    assert!(decoded.records().is_empty());
}

#[test]
fn test_process_thread_slice_scenario() {
    let mut doc = TraceDocument::new();
    let proc = doc.create_process_track("proc-1", 100);
    let thread = doc
        .create_thread_track("thread-1", 100, 200, Some(proc))
        .unwrap();
    let mut events = doc.builder(1);
    events
        .slice_begin(SliceBeginData {
            track_uuid: thread,
            name: "work",
            time_us: 1000,
            ..Default::default()
        })
        .unwrap();
    events.slice_end(thread, 1500).unwrap();

    // No findings beyond the tolerated missing clock snapshot.
    let issues = doc.validate();
    assert!(issues.iter().all(|i| i.severity() == Severity::Warning));

    let decoded = decode(&doc.serialize()).unwrap();
    let records = decoded.records();
    assert_eq!(records.len(), 4);

    let proc_desc = match &records[0] {
        Record::TrackDescriptor(d) => d,
        other => panic!("unexpected record {other:?}"),
    };
    assert_eq!(proc_desc.name, "proc-1");
    assert_eq!(proc_desc.kind, TrackKind::Process { pid: 100 });

    let thread_desc = match &records[1] {
        Record::TrackDescriptor(d) => d,
        other => panic!("unexpected record {other:?}"),
    };
    assert_eq!(thread_desc.name, "thread-1");
    assert_eq!(thread_desc.kind, TrackKind::Thread { pid: 100, tid: 200 });
    assert_eq!(thread_desc.parent_uuid, Some(proc_desc.uuid));

    assert_matches!(
        &records[2],
        Record::Event(e) if matches!(e.payload, EventPayload::SliceBegin { .. })
    );
    assert_matches!(
        &records[3],
        Record::Event(e) if matches!(e.payload, EventPayload::SliceEnd { .. })
    );
}

#[test]
fn test_roundtrip_preserves_interning() {
    let mut doc = TraceDocument::new();
    doc.add_clock_snapshot(vec![tracefile::ClockReading {
        clock_id: clock_id::REALTIME,
        timestamp: 1,
    }]);
    let track = doc.create_process_track("proc", 1);
    let mut events = doc.builder(1);
    events.instant(track, "a", 10, Some("hello")).unwrap();
    events.instant(track, "a", 20, Some("hello")).unwrap();
    events.instant(track, "a", 30, Some("world")).unwrap();

    let decoded = decode(&doc.serialize()).unwrap();

    let interned_counts: Vec<usize> = decoded
        .records()
        .iter()
        .filter_map(|r| match r {
            Record::Event(e) => Some(e.interned.len()),
            _ => None,
        })
        .collect();
    // First event declares body + source location, the repeat declares
    // nothing, the new body declares only itself.
    assert_eq!(interned_counts, vec![2, 0, 1]);
    assert!(decoded.validate().is_empty());
}

#[test]
fn test_roundtrip_log_entry_fields() {
    let mut doc = TraceDocument::new();
    doc.builder(9)
        .log_event(LogEventData {
            time_us: 1_734_138_868_000_000,
            tag: "radio",
            message: "signal lost",
            priority: LogPriority::Warn,
            buffer: LogBuffer::Radio,
            pid: 1,
            tid: 2,
            uid: 3,
        })
        .unwrap();

    let decoded = decode(&doc.serialize()).unwrap();
    let entry = match &decoded.records()[0] {
        Record::LogEntry(entry) => entry,
        other => panic!("unexpected record {other:?}"),
    };
    assert_eq!(entry.sequence_id, 9);
    assert!(entry.state_cleared);
    assert_eq!(entry.events[0].priority, LogPriority::Warn);
    assert_eq!(entry.events[0].buffer, LogBuffer::Radio);
    assert_eq!(entry.events[0].message, "signal lost");
    assert_eq!(entry.stats.total, 1);
}

#[test]
fn test_decode_rejects_bad_magic() {
    let mut bytes = full_document().serialize().to_vec();
    bytes[0] = b'X';
    assert_matches!(decode(&bytes), Err(ParseError::BadMagic(_)));
}

#[test]
fn test_decode_rejects_future_version() {
    let mut bytes = full_document().serialize().to_vec();
    bytes[4] = 0xFF;
    bytes[5] = 0xFF;
    assert_matches!(decode(&bytes), Err(ParseError::UnsupportedVersion(0xFFFF)));
}

#[test]
fn test_decode_rejects_unknown_record_type() {
    let mut bytes = full_document().serialize().to_vec();
    // The first record's type byte sits right after the container header.
    bytes[6] = 0x7F;
    assert_matches!(decode(&bytes), Err(ParseError::UnknownRecordType(0x7F)));
}

#[test]
fn test_decode_rejects_truncation() {
    let bytes = full_document().serialize();
    // Chopping anywhere inside the stream must never panic, and must fail
    // unless the cut lands exactly on a record boundary.
    let full = decode(&bytes).unwrap();
    let mut clean_cuts = 0;
    for cut in 0..bytes.len() {
        match decode(&bytes[..cut]) {
            Ok(doc) => {
                clean_cuts += 1;
                assert!(doc.records().len() < full.records().len());
            }
            Err(_) => {}
        }
    }
    // Only the record boundaries (one per record, including the bare
    // container header) decode cleanly.
    assert_eq!(clean_cuts, full.records().len());
}

#[test]
fn test_decoded_document_extends() {
    let doc = full_document();
    let max_uuid = doc
        .records()
        .iter()
        .filter_map(|r| match r {
            Record::TrackDescriptor(d) => Some(d.uuid),
            _ => None,
        })
        .max()
        .unwrap();

    let mut decoded = decode(&doc.serialize()).unwrap();

    // Fresh tracks allocate past everything the decoded stream used.
    let fresh = decoded.create_track("fresh", None).unwrap();
    assert!(fresh > max_uuid);

    // The already-cleared sequence does not clear again.
    let r = decoded.builder(1).instant(fresh, "more", 2000, None).unwrap();
    match &decoded.records()[r.index()] {
        Record::Event(e) => assert!(!e.state_cleared),
        other => panic!("unexpected record {other:?}"),
    }

    assert!(decoded.validate().iter().all(|i| i.severity() == Severity::Warning));
}
