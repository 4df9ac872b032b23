//! Chunk and ordering key types.
//!
//! A `Chunk` is the unit handed from stage to stage: an opaque payload plus the
//! stream it belongs to and its position in the global transmission sequence.
//! It is deliberately not `Clone`; each pipeline stage owns it exclusively.

use fecmux_core::{shared::SharedBytes, GlobalIndex, StreamId};

/// Opaque payload tagged with stream and sequence metadata.
#[derive(Debug, PartialEq, Eq)]
pub struct Chunk {
    stream_id: StreamId,
    global_idx: GlobalIndex,
    payload: SharedBytes,
}

impl Chunk {
    /// Creates a chunk from its parts.
    pub fn new(stream_id: StreamId, global_idx: GlobalIndex, payload: impl Into<SharedBytes>) -> Self {
        Self { stream_id, global_idx, payload: payload.into() }
    }

    /// Returns the stream this chunk belongs to.
    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    /// Returns the position of this chunk in the global sequence.
    pub fn global_idx(&self) -> GlobalIndex {
        self.global_idx
    }

    /// Returns the ordering key of this chunk.
    pub fn key(&self) -> ChunkKey {
        ChunkKey { global_idx: self.global_idx, stream_id: self.stream_id }
    }

    /// Returns the payload bytes.
    pub fn payload(&self) -> &[u8] {
        self.payload.as_slice()
    }

    /// Returns the payload length.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Returns true if the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Releases the payload, consuming the chunk.
    pub fn into_payload(self) -> SharedBytes {
        self.payload
    }
}

/// Total order used by the reordering buffer.
///
/// Field order matters: the derived `Ord` compares `global_idx` first and breaks
/// ties with `stream_id` ascending.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChunkKey {
    /// Global sequence position.
    pub global_idx: GlobalIndex,
    /// Originating stream.
    pub stream_id: StreamId,
}

impl ChunkKey {
    /// Creates a key.
    pub fn new(stream_id: StreamId, global_idx: GlobalIndex) -> Self {
        Self { global_idx, stream_id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_accessors() {
        let chunk = Chunk::new(2, 40, vec![1, 2, 3]);
        assert_eq!(chunk.stream_id(), 2);
        assert_eq!(chunk.global_idx(), 40);
        assert_eq!(chunk.payload(), &[1, 2, 3]);
        assert_eq!(chunk.len(), 3);
        assert!(!chunk.is_empty());
        assert_eq!(chunk.into_payload().to_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn test_key_orders_by_index_then_stream() {
        let mut keys = vec![
            ChunkKey::new(1, 5),
            ChunkKey::new(0, 7),
            ChunkKey::new(0, 5),
            ChunkKey::new(9, 1),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![ChunkKey::new(9, 1), ChunkKey::new(0, 5), ChunkKey::new(1, 5), ChunkKey::new(0, 7)]
        );
    }
}
