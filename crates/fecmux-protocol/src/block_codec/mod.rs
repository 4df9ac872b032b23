//! Wire block serialization and deserialization.
//!
//! Every transport datagram carries exactly one block:
//!
//! ```text
//! u8  flags        high nibble: version, bit 0: checksum trailer present
//! u8  stream_id
//! u32 global_idx   big endian
//! u16 payload_len  big endian
//! [payload_len bytes]
//! [u32 CRC32 of everything above, big endian, only if flagged]
//! ```
//!
//! # Module Organization
//!
//! - [`encoder`] - Chunk encoding to binary format
//! - [`decoder`] - Chunk decoding from binary format
//! - [`checksum`] - CRC32 checksum utilities for data integrity

pub mod checksum;
pub mod decoder;
pub mod encoder;


pub use decoder::BlockDecoder;
pub use encoder::BlockEncoder;

pub use checksum::{append_checksum_from, validate_and_strip_checksum};

/// Flags bit marking a CRC32 trailer.
pub const FLAG_CHECKSUM: u8 = 0x01;
