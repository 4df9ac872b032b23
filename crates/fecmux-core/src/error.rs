//! Error types shared by every fecmux layer.
//!
//! All of these are local, recoverable conditions. Late or missing blocks are
//! never reported here; the reordering buffer absorbs them.

use std::io;

use thiserror::Error;

use crate::StreamId;

/// Convenience result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ErrorKind>;

/// Errors surfaced to the immediate caller.
#[derive(Debug, Error)]
pub enum ErrorKind {
    /// The operation referenced a stream id that was never registered.
    #[error("stream {0} is not registered")]
    UnknownStream(StreamId),
    /// A stream id was registered twice without being removed in between.
    #[error("stream {0} is already registered")]
    DuplicateStream(StreamId),
    /// No encoded block is queued.
    #[error("no encoded block is available")]
    EmptyQueue,
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The decode window cannot absorb the encoder's redundancy window.
    #[error("window size {window} must exceed the encoder redundancy window {redundancy}")]
    WindowTooSmall {
        /// Configured decode window.
        window: usize,
        /// Redundancy window reported by the encoder.
        redundancy: usize,
    },
    /// A payload does not fit in a single wire block.
    #[error("block of {size} bytes exceeds the maximum of {max} bytes")]
    BlockTooLarge {
        /// Payload size.
        size: usize,
        /// Maximum allowed payload size.
        max: usize,
    },
    /// A received datagram is not a valid wire block.
    #[error("could not decode block: {0}")]
    DecodingError(DecodingErrorKind),
    /// A stream codec rejected its input.
    #[error("codec failure: {0}")]
    Codec(String),
    /// Transport level failure.
    #[error("i/o error: {0}")]
    IOError(#[from] io::Error),
}

/// Reasons a wire block fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodingErrorKind {
    /// Datagram ended inside the header or payload.
    #[error("datagram is truncated")]
    Truncated,
    /// Header carries a version this build does not speak.
    #[error("unsupported wire version {0}")]
    UnsupportedVersion(u8),
    /// Declared payload length disagrees with the datagram size.
    #[error("declared payload length {declared} but {available} bytes remain")]
    LengthMismatch {
        /// Length from the header.
        declared: usize,
        /// Bytes actually present after the header.
        available: usize,
    },
    /// CRC32 trailer does not match the block contents.
    #[error("checksum mismatch: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        /// Checksum computed over the received bytes.
        expected: u32,
        /// Checksum carried in the trailer.
        actual: u32,
    },
}

impl From<DecodingErrorKind> for ErrorKind {
    fn from(kind: DecodingErrorKind) -> Self {
        ErrorKind::DecodingError(kind)
    }
}
