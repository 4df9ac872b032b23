#![warn(missing_docs)]

//! fecmux-core: foundational types and utilities.
//!
//! This crate provides the minimal set of core utilities shared across all layers:
//! - Configuration types
//! - Error handling
//! - Protocol constants
//! - Shared byte buffers and the datagram transport abstraction
//!
//! Stream logic lives in specialized crates:
//! - `fecmux-protocol`: chunks, wire block format, codec interfaces
//! - `fecmux-stream`: multiplexer and reordering delivery buffer
//! - `fecmux-host`: UDP transport and relay loops

/// Identifier of a logical sub-stream.
pub type StreamId = u8;

/// Position of a block in the single global transmission sequence.
pub type GlobalIndex = u32;

/// Protocol constants shared across layers.
pub mod constants {
    /// Current wire format version, stored in the high nibble of the flags byte.
    pub const PROTOCOL_VERSION: u8 = 1;
    /// Size of the wire block header: flags, stream id, global index, payload length.
    pub const BLOCK_HEADER_SIZE: usize = 8;
    /// Size of the optional CRC32 trailer.
    pub const CHECKSUM_SIZE: usize = 4;
    /// Default number of pending blocks held by the reordering buffer.
    pub const DEFAULT_WINDOW_SIZE: usize = 64;
    /// Default distance behind the delivery horizon that is treated as a sender restart.
    pub const DEFAULT_RESYNC_DISTANCE: u32 = 4096;
    /// Default payload bytes per wire block.
    pub const DEFAULT_BLOCK_SIZE: usize = 1400;
    /// Default receive buffer size for one datagram.
    pub const DEFAULT_MAX_DATAGRAM_SIZE: usize = 2048;
}

/// Configuration options for the stream and host layers.
pub mod config;
/// Error types and results.
pub mod error;
/// Shared, reference-counted byte slices with zero-copy slicing.
pub mod shared;
/// Transport abstraction for pluggable datagram I/O.
pub mod transport;
