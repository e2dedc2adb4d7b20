/// Errors that can occur while parsing a trace container.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Reached end of stream at a clean record boundary (no more records).
    #[error("end of stream")]
    EndOfStream,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("bad container magic {0:02x?}")]
    BadMagic([u8; 4]),

    #[error("unsupported container format version {0}")]
    UnsupportedVersion(u16),

    #[error("unknown record type: 0x{0:02x}")]
    UnknownRecordType(u8),

    #[error("unexpected end of record body")]
    UnexpectedEof,

    #[error("parse error: {0}")]
    InvalidData(String),
}
