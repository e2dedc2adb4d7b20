use std::collections::HashMap;

use crate::error::Error;
use crate::record::{InternCategory, InternedEntry, InternedPayload};

/// De-duplicates repeated payload values into small integer references.
///
/// Each sequence has its own interning scope, and within a sequence each
/// category has its own 1-based iid space. The first time a value is seen it
/// is assigned the next iid and queued as a pending declaration; the builder
/// flushes pending declarations into the next event of that sequence, which
/// keeps every declaration at or before its first use on the wire.
#[derive(Debug, Default)]
pub struct InternTable {
    sequences: HashMap<u32, SequenceInterns>,
}

#[derive(Debug, Default)]
struct SequenceInterns {
    ids: HashMap<InternedPayload, u64>,
    next_iid: HashMap<InternCategory, u64>,
    pending: Vec<InternedEntry>,
    finalized: bool,
}

impl InternTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the iid for `payload` in `sequence_id`'s scope, interning it
    /// if it has not been seen before. Idempotent by value.
    pub fn intern(&mut self, sequence_id: u32, payload: InternedPayload) -> Result<u64, Error> {
        let seq = self.sequences.entry(sequence_id).or_default();
        if seq.finalized {
            return Err(Error::InvalidState(sequence_id));
        }
        if let Some(&iid) = seq.ids.get(&payload) {
            return Ok(iid);
        }

        let next = seq.next_iid.entry(payload.category()).or_insert(1);
        let iid = *next;
        *next += 1;

        seq.ids.insert(payload.clone(), iid);
        seq.pending.push(InternedEntry { iid, payload });
        Ok(iid)
    }

    /// Drains the declarations queued since the last event of the sequence.
    pub fn take_pending(&mut self, sequence_id: u32) -> Vec<InternedEntry> {
        match self.sequences.get_mut(&sequence_id) {
            Some(seq) => std::mem::take(&mut seq.pending),
            None => Vec::new(),
        }
    }

    /// Marks a sequence finalized; further interning in it fails.
    pub fn finalize(&mut self, sequence_id: u32) {
        self.sequences.entry(sequence_id).or_default().finalized = true;
    }

    /// Records an externally-decoded declaration so that later interning of
    /// the same value reuses its iid and fresh iids start past it.
    pub(crate) fn observe(&mut self, sequence_id: u32, entry: &InternedEntry) {
        let seq = self.sequences.entry(sequence_id).or_default();
        seq.ids.insert(entry.payload.clone(), entry.iid);
        let next = seq.next_iid.entry(entry.payload.category()).or_insert(1);
        if entry.iid >= *next {
            *next = entry.iid + 1;
        }
    }
}
