//! Non-mutating validation of a record sequence.
//!
//! The pass replays the records in emission order and collects findings
//! instead of failing, since a document may be intentionally incomplete.
//! Invariant violations are `Error` severity; conditions that trace viewers
//! tolerate (an unterminated slice, a missing clock snapshot) are `Warning`.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use crate::record::{EventPayload, InternCategory, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    UnknownTrack,
    UnknownParent,
    ZeroTrackUuid,
    DuplicateTrackUuid,
    MissingStateClear,
    RepeatedStateClear,
    UndeclaredInternId,
    SliceAlreadyOpen,
    UnmatchedSliceEnd,
    UnclosedSlice,
    NonMonotonicSequenceTime,
    MissingClockSnapshot,
}

impl IssueKind {
    pub fn severity(self) -> Severity {
        match self {
            IssueKind::UnclosedSlice | IssueKind::MissingClockSnapshot => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// One finding from the validation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    /// The offending record, where the finding is tied to one.
    pub record_index: Option<usize>,
    pub kind: IssueKind,
    pub detail: String,
}

impl ValidationIssue {
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.record_index {
            Some(index) => write!(f, "record {index}: {}", self.detail),
            None => write!(f, "{}", self.detail),
        }
    }
}

#[derive(Debug, Default)]
struct SequenceReplay {
    cleared_seen: bool,
    last_timestamp_ns: u64,
    declared: HashSet<(InternCategory, u64)>,
}

struct Replay {
    issues: Vec<ValidationIssue>,
    // Track uuid -> open slice begin record index, in creation order so the
    // trailing unclosed-slice findings come out deterministically.
    tracks: IndexMap<u64, Option<usize>>,
    sequences: HashMap<u32, SequenceReplay>,
    saw_clock_snapshot: bool,
}

pub(crate) fn validate_records(records: &[Record]) -> Vec<ValidationIssue> {
    let mut replay = Replay {
        issues: Vec::new(),
        tracks: IndexMap::new(),
        sequences: HashMap::new(),
        saw_clock_snapshot: false,
    };

    for (index, record) in records.iter().enumerate() {
        match record {
            Record::ClockSnapshot(_) => replay.saw_clock_snapshot = true,
            Record::TrackDescriptor(desc) => replay.track_descriptor(index, desc),
            Record::Event(event) => replay.event(index, event),
            Record::LogEntry(entry) => {
                replay.sequence_record(index, entry.sequence_id, entry.state_cleared, entry.timestamp_ns);
            }
        }
    }

    replay.finish()
}

impl Replay {
    fn push(&mut self, record_index: Option<usize>, kind: IssueKind, detail: String) {
        self.issues.push(ValidationIssue {
            record_index,
            kind,
            detail,
        });
    }

    fn track_descriptor(&mut self, index: usize, desc: &crate::record::TrackDescriptor) {
        if desc.uuid == 0 {
            self.push(
                Some(index),
                IssueKind::ZeroTrackUuid,
                format!("track {:?} has the reserved uuid 0", desc.name),
            );
        }
        if let Some(parent) = desc.parent_uuid {
            if !self.tracks.contains_key(&parent) {
                self.push(
                    Some(index),
                    IssueKind::UnknownParent,
                    format!("track {} references unknown parent {parent}", desc.uuid),
                );
            }
        }
        if self.tracks.insert(desc.uuid, None).is_some() {
            self.push(
                Some(index),
                IssueKind::DuplicateTrackUuid,
                format!("track uuid {} declared more than once", desc.uuid),
            );
        }
    }

    fn event(&mut self, index: usize, event: &crate::record::Event) {
        self.sequence_record(index, event.sequence_id, event.state_cleared, event.timestamp_ns);

        // Declarations carried by this event count as "at or before" its
        // own interned references.
        let seq = self.sequences.entry(event.sequence_id).or_default();
        for entry in &event.interned {
            seq.declared.insert((entry.payload.category(), entry.iid));
        }

        let track_uuid = event.payload.track_uuid();
        let known_track = self.tracks.contains_key(&track_uuid);
        if !known_track {
            self.push(
                Some(index),
                IssueKind::UnknownTrack,
                format!("event references unknown track {track_uuid}"),
            );
        }

        match &event.payload {
            EventPayload::Instant {
                body_iid,
                source_location_iid,
                ..
            } => {
                self.check_iid(index, event.sequence_id, InternCategory::LogMessageBody, *body_iid);
                self.check_iid(
                    index,
                    event.sequence_id,
                    InternCategory::SourceLocation,
                    *source_location_iid,
                );
            }
            EventPayload::SliceBegin { .. } => {
                if known_track {
                    let open = self.tracks.get(&track_uuid).copied().flatten();
                    if open.is_some() {
                        self.push(
                            Some(index),
                            IssueKind::SliceAlreadyOpen,
                            format!("slice begins on track {track_uuid} while one is open"),
                        );
                    } else {
                        self.tracks.insert(track_uuid, Some(index));
                    }
                }
            }
            EventPayload::SliceEnd { .. } => {
                if known_track {
                    let open = self.tracks.get(&track_uuid).copied().flatten();
                    if open.is_none() {
                        self.push(
                            Some(index),
                            IssueKind::UnmatchedSliceEnd,
                            format!("slice ends on track {track_uuid} with none open"),
                        );
                    } else {
                        self.tracks.insert(track_uuid, None);
                    }
                }
            }
            EventPayload::Counter { .. } => {}
        }
    }

    fn check_iid(
        &mut self,
        index: usize,
        sequence_id: u32,
        category: InternCategory,
        iid: Option<u64>,
    ) {
        let Some(iid) = iid else { return };
        let declared = self
            .sequences
            .get(&sequence_id)
            .is_some_and(|seq| seq.declared.contains(&(category, iid)));
        if !declared {
            self.push(
                Some(index),
                IssueKind::UndeclaredInternId,
                format!("{category:?} iid {iid} used before declaration in sequence {sequence_id}"),
            );
        }
    }

    fn sequence_record(
        &mut self,
        index: usize,
        sequence_id: u32,
        state_cleared: bool,
        timestamp_ns: u64,
    ) {
        let seq = self.sequences.entry(sequence_id).or_default();
        let first = !seq.cleared_seen;
        seq.cleared_seen = true;
        let last_timestamp_ns = seq.last_timestamp_ns;
        let regressed = timestamp_ns < last_timestamp_ns;
        if !regressed {
            seq.last_timestamp_ns = timestamp_ns;
        }

        if first && !state_cleared {
            self.push(
                Some(index),
                IssueKind::MissingStateClear,
                format!("first record of sequence {sequence_id} does not clear state"),
            );
        } else if !first && state_cleared {
            self.push(
                Some(index),
                IssueKind::RepeatedStateClear,
                format!("sequence {sequence_id} clears state more than once"),
            );
        }

        if regressed {
            self.push(
                Some(index),
                IssueKind::NonMonotonicSequenceTime,
                format!(
                    "timestamp regresses within sequence {sequence_id} ({last_timestamp_ns} -> {timestamp_ns})"
                ),
            );
        }
    }

    fn finish(mut self) -> Vec<ValidationIssue> {
        let unclosed: Vec<(u64, usize)> = self
            .tracks
            .iter()
            .filter_map(|(uuid, open)| open.map(|index| (*uuid, index)))
            .collect();
        for (uuid, begin_index) in unclosed {
            self.push(
                Some(begin_index),
                IssueKind::UnclosedSlice,
                format!("slice on track {uuid} is never ended"),
            );
        }

        if !self.saw_clock_snapshot {
            self.push(
                None,
                IssueKind::MissingClockSnapshot,
                "document has no clock snapshot".to_string(),
            );
        }

        self.issues
    }
}
