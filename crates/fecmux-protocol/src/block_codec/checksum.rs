//! CRC32 checksum utilities for data integrity verification.

use crc32fast::Hasher;
use fecmux_core::{constants::CHECKSUM_SIZE, error::DecodingErrorKind};

/// Appends a CRC32 of `data[start..]` to the buffer in-place.
pub fn append_checksum_from(data: &mut Vec<u8>, start: usize) {
    let mut hasher = Hasher::new();
    hasher.update(&data[start..]);
    let checksum = hasher.finalize();
    data.extend_from_slice(&checksum.to_be_bytes());
}

/// Validates and strips the CRC32 trailer from block data.
/// Returns the data without checksum if valid.
pub fn validate_and_strip_checksum(data: &[u8]) -> Result<&[u8], DecodingErrorKind> {
    if data.len() < CHECKSUM_SIZE {
        return Err(DecodingErrorKind::Truncated);
    }

    let (payload, checksum_bytes) = data.split_at(data.len() - CHECKSUM_SIZE);
    let received_checksum = u32::from_be_bytes([
        checksum_bytes[0],
        checksum_bytes[1],
        checksum_bytes[2],
        checksum_bytes[3],
    ]);

    let mut hasher = Hasher::new();
    hasher.update(payload);
    let computed_checksum = hasher.finalize();

    if received_checksum != computed_checksum {
        return Err(DecodingErrorKind::ChecksumMismatch {
            expected: computed_checksum,
            actual: received_checksum,
        });
    }

    Ok(payload)
}
