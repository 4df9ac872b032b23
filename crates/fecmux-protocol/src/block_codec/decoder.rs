//! Block decoding.
//!
//! Validates version, checksum, and declared length before handing back an
//! owned chunk. Nothing here trusts the datagram size the transport reported.

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use fecmux_core::{
    constants::{BLOCK_HEADER_SIZE, PROTOCOL_VERSION},
    error::{DecodingErrorKind, Result},
    shared::SharedBytes,
};

use super::{checksum::validate_and_strip_checksum, FLAG_CHECKSUM};
use crate::chunk::Chunk;

/// Deserializes wire blocks back into chunks.
pub struct BlockDecoder;

impl BlockDecoder {
    /// Decodes one datagram into a chunk.
    pub fn decode(datagram: &[u8]) -> Result<Chunk> {
        if datagram.len() < BLOCK_HEADER_SIZE {
            return Err(DecodingErrorKind::Truncated.into());
        }

        let flags = datagram[0];
        let version = flags >> 4;
        if version != PROTOCOL_VERSION {
            return Err(DecodingErrorKind::UnsupportedVersion(version).into());
        }

        let body = if flags & FLAG_CHECKSUM != 0 {
            validate_and_strip_checksum(datagram)?
        } else {
            datagram
        };
        if body.len() < BLOCK_HEADER_SIZE {
            return Err(DecodingErrorKind::Truncated.into());
        }

        let mut cursor = Cursor::new(&body[1..BLOCK_HEADER_SIZE]);
        let stream_id = cursor.read_u8().map_err(|_| DecodingErrorKind::Truncated)?;
        let global_idx =
            cursor.read_u32::<BigEndian>().map_err(|_| DecodingErrorKind::Truncated)?;
        let declared = cursor.read_u16::<BigEndian>().map_err(|_| DecodingErrorKind::Truncated)?
            as usize;

        let payload = &body[BLOCK_HEADER_SIZE..];
        if payload.len() != declared {
            return Err(DecodingErrorKind::LengthMismatch { declared, available: payload.len() }
                .into());
        }

        Ok(Chunk::new(stream_id, global_idx, SharedBytes::copy_from_slice(payload)))
    }
}
