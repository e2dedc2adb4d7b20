use indexmap::IndexMap;

use crate::error::Error;
use crate::record::{TrackDescriptor, TrackKind};

/// Issues unique track identifiers within one document.
///
/// Identifiers start at 1 and are never reused; zero is reserved to mean
/// "no parent" on the wire. Not thread-safe: a document has a single writer.
#[derive(Debug)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        IdAllocator { next: 1 }
    }

    /// Returns the next identifier, strictly increasing.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Moves the allocator past `id`, so it is never issued again.
    pub(crate) fn bump_past(&mut self, id: u64) {
        if id >= self.next {
            self.next = id + 1;
        }
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// An open slice on a track, waiting for its matching end.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpenSlice {
    pub begin_ns: u64,
}

#[derive(Debug, Default)]
pub(crate) struct TrackState {
    pub open_slice: Option<OpenSlice>,
}

/// Owns the set of known tracks and their per-track slice state.
///
/// Insertion order is creation order, which keeps everything derived from
/// iterating the registry deterministic.
#[derive(Debug, Default)]
pub struct TrackRegistry {
    alloc: IdAllocator,
    tracks: IndexMap<u64, TrackState>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, uuid: u64) -> bool {
        self.tracks.contains_key(&uuid)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Registers a new root track, allocating its uuid.
    pub(crate) fn register_root(&mut self, name: &str, kind: TrackKind) -> TrackDescriptor {
        let uuid = self.alloc.next_id();
        self.tracks.insert(uuid, TrackState::default());
        TrackDescriptor {
            uuid,
            name: name.to_string(),
            parent_uuid: None,
            kind,
        }
    }

    /// Registers a new track under an optional parent.
    ///
    /// The parent must already exist: descriptors never forward-reference.
    pub(crate) fn register(
        &mut self,
        name: &str,
        parent_uuid: Option<u64>,
        kind: TrackKind,
    ) -> Result<TrackDescriptor, Error> {
        if let Some(parent) = parent_uuid {
            if !self.tracks.contains_key(&parent) {
                return Err(Error::UnknownParent(parent));
            }
        }
        let mut desc = self.register_root(name, kind);
        desc.parent_uuid = parent_uuid;
        Ok(desc)
    }

    pub(crate) fn state_mut(&mut self, uuid: u64) -> Option<&mut TrackState> {
        self.tracks.get_mut(&uuid)
    }

    /// Records an externally-decoded track, moving the allocator past its
    /// uuid. Tolerant: duplicates are absorbed.
    pub(crate) fn observe(&mut self, uuid: u64) {
        self.alloc.bump_past(uuid);
        self.tracks.entry(uuid).or_default();
    }
}
