//! Block encoding.
//!
//! Provides binary serialization of chunks for transmission as one datagram each.

use std::io::Write;

use byteorder::{BigEndian, WriteBytesExt};
use fecmux_core::{
    constants::{BLOCK_HEADER_SIZE, CHECKSUM_SIZE, PROTOCOL_VERSION},
    error::{ErrorKind, Result},
};

use super::{checksum::append_checksum_from, FLAG_CHECKSUM};
use crate::chunk::Chunk;

/// Serializes chunks into wire blocks.
pub struct BlockEncoder;

impl BlockEncoder {
    /// Encodes a chunk into the provided buffer (appends bytes).
    pub fn encode_into(buffer: &mut Vec<u8>, chunk: &Chunk, with_checksum: bool) -> Result<()> {
        if chunk.len() > u16::MAX as usize {
            return Err(ErrorKind::BlockTooLarge { size: chunk.len(), max: u16::MAX as usize });
        }

        let start = buffer.len();
        let mut flags = PROTOCOL_VERSION << 4;
        if with_checksum {
            flags |= FLAG_CHECKSUM;
        }

        buffer.write_u8(flags)?;
        buffer.write_u8(chunk.stream_id())?;
        buffer.write_u32::<BigEndian>(chunk.global_idx())?;
        buffer.write_u16::<BigEndian>(chunk.len() as u16)?;
        buffer.write_all(chunk.payload())?;

        if with_checksum {
            append_checksum_from(buffer, start);
        }
        Ok(())
    }

    /// Encodes a chunk into a freshly allocated datagram.
    pub fn encode(chunk: &Chunk, with_checksum: bool) -> Result<Vec<u8>> {
        let trailer = if with_checksum { CHECKSUM_SIZE } else { 0 };
        let mut buffer = Vec::with_capacity(BLOCK_HEADER_SIZE + chunk.len() + trailer);
        Self::encode_into(&mut buffer, chunk, with_checksum)?;
        Ok(buffer)
    }
}
