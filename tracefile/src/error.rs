/// Errors surfaced immediately at the offending builder call.
///
/// The builder is fail-fast for structural misuse: a failed call appends
/// nothing, so the document is left exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown track uuid {0}")]
    UnknownTrack(u64),

    #[error("unknown parent track uuid {0}")]
    UnknownParent(u64),

    #[error("track {0} already has an open slice")]
    SliceAlreadyOpen(u64),

    #[error("track {0} has no open slice")]
    NoOpenSlice(u64),

    #[error("slice end at {end_ns}ns precedes its begin at {begin_ns}ns on track {track_uuid}")]
    NonMonotonicTime {
        track_uuid: u64,
        begin_ns: u64,
        end_ns: u64,
    },

    #[error("timestamp {0}us does not fit the nanosecond range")]
    TimestampOverflow(u64),

    #[error("sequence {0} has been finalized")]
    InvalidState(u32),
}
