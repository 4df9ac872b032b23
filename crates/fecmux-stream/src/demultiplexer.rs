//! Receive-side counterpart of the [`Multiplexer`](crate::multiplexer::Multiplexer).
//!
//! Parses wire blocks, routes them to the decoder registered for their stream,
//! and feeds whatever the decoders finish into one shared
//! [`ReorderingBuffer`]. The application polls `available()` / `pop()`.

use std::{collections::BTreeMap, fmt};

use fecmux_core::{
    config::Config,
    error::{ErrorKind, Result},
    StreamId,
};
use fecmux_protocol::{block_codec::BlockDecoder, chunk::Chunk, codec::StreamDecoder};
use tracing::debug;

use crate::reordering_buffer::ReorderingBuffer;

/// Per-stream decoders feeding a shared reordering buffer.
pub struct Demultiplexer {
    decoders: BTreeMap<StreamId, Box<dyn StreamDecoder>>,
    buffer: ReorderingBuffer,
}

impl fmt::Debug for Demultiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Demultiplexer")
            .field("streams", &self.decoders.keys().collect::<Vec<_>>())
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl Demultiplexer {
    /// Creates a demultiplexer with the window settings from `config`.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_buffer(ReorderingBuffer::from_config(config)?))
    }

    /// Creates a demultiplexer around an existing reordering buffer.
    pub fn with_buffer(buffer: ReorderingBuffer) -> Self {
        Self { decoders: BTreeMap::new(), buffer }
    }

    /// Registers a decoder under `stream_id`.
    pub fn add_stream(&mut self, stream_id: StreamId, decoder: Box<dyn StreamDecoder>) -> Result<()> {
        if self.decoders.contains_key(&stream_id) {
            return Err(ErrorKind::DuplicateStream(stream_id));
        }
        debug!(stream_id, "decode stream registered");
        self.decoders.insert(stream_id, decoder);
        Ok(())
    }

    /// Unregisters the decoder for `stream_id` and hands it back.
    ///
    /// Blocks of that stream already in the reordering buffer are still delivered.
    pub fn remove_stream(&mut self, stream_id: StreamId) -> Result<Box<dyn StreamDecoder>> {
        let decoder = self.decoders.remove(&stream_id).ok_or(ErrorKind::UnknownStream(stream_id))?;
        debug!(stream_id, "decode stream removed");
        Ok(decoder)
    }

    /// Parses one datagram and decodes it.
    ///
    /// Returns the number of decoded blocks accepted for delivery.
    pub fn decode(&mut self, datagram: &[u8]) -> Result<usize> {
        let chunk = BlockDecoder::decode(datagram)?;
        self.decode_chunk(chunk)
    }

    /// Decodes an already parsed block.
    pub fn decode_chunk(&mut self, chunk: Chunk) -> Result<usize> {
        let stream_id = chunk.stream_id();
        let decoder =
            self.decoders.get_mut(&stream_id).ok_or(ErrorKind::UnknownStream(stream_id))?;
        decoder.decode(chunk.global_idx(), chunk.into_payload())?;

        let mut accepted = 0;
        while let Some((global_idx, block)) = decoder.poll_decoded() {
            if self.buffer.add_block(stream_id, global_idx, block).is_accepted() {
                accepted += 1;
            }
        }
        Ok(accepted)
    }

    /// Returns true if a delivered chunk is waiting.
    pub fn available(&self) -> bool {
        self.buffer.available()
    }

    /// Returns the next delivered chunk, or None if nothing is ready.
    pub fn pop(&mut self) -> Option<Chunk> {
        self.buffer.pop()
    }

    /// Delivers every pending block, for shutdown or end of input.
    pub fn flush(&mut self) -> usize {
        self.buffer.flush()
    }

    /// Returns true if `stream_id` has a decoder.
    pub fn contains_stream(&self, stream_id: StreamId) -> bool {
        self.decoders.contains_key(&stream_id)
    }

    /// Returns the reordering buffer for inspection.
    pub fn buffer(&self) -> &ReorderingBuffer {
        &self.buffer
    }
}

#[cfg(test)]
mod tests {
    use fecmux_core::shared::SharedBytes;
    use fecmux_protocol::{block_codec::BlockEncoder, codec::PassthroughDecoder};

    use super::*;

    /// Holds blocks back until `group` of them arrived, then releases them all.
    struct GroupingDecoder {
        group: usize,
        held: Vec<(u32, SharedBytes)>,
        ready: Vec<(u32, SharedBytes)>,
    }

    impl StreamDecoder for GroupingDecoder {
        fn decode(&mut self, global_idx: u32, block: SharedBytes) -> Result<()> {
            self.held.push((global_idx, block));
            if self.held.len() == self.group {
                self.ready.append(&mut self.held);
            }
            Ok(())
        }

        fn poll_decoded(&mut self) -> Option<(u32, SharedBytes)> {
            if self.ready.is_empty() {
                None
            } else {
                Some(self.ready.remove(0))
            }
        }
    }

    fn demux(window_size: usize) -> Demultiplexer {
        let mut demux = Demultiplexer::new(&Config { window_size, ..Config::default() }).unwrap();
        demux.add_stream(0, Box::new(PassthroughDecoder::new())).unwrap();
        demux
    }

    fn wire(stream_id: StreamId, idx: u32) -> Vec<u8> {
        BlockEncoder::encode(&Chunk::new(stream_id, idx, vec![idx as u8]), true).unwrap()
    }

    #[test]
    fn test_decode_routes_to_buffer() {
        let mut demux = demux(2);
        assert_eq!(demux.decode(&wire(0, 1)).unwrap(), 1);
        assert_eq!(demux.decode(&wire(0, 0)).unwrap(), 1);
        assert!(!demux.available());
        demux.decode(&wire(0, 2)).unwrap();

        let chunk = demux.pop().unwrap();
        assert_eq!(chunk.global_idx(), 0);
        assert_eq!(chunk.payload(), &[0]);
    }

    #[test]
    fn test_block_ahead_of_full_window_counted() {
        let mut demux = demux(1);
        assert_eq!(demux.decode(&wire(0, 5)).unwrap(), 1);
        // Sorts before the only pending block, so it is delivered straight away
        assert_eq!(demux.decode(&wire(0, 4)).unwrap(), 1);
        assert_eq!(demux.pop().unwrap().global_idx(), 4);
        assert_eq!(demux.decode(&wire(0, 3)).unwrap(), 0);
    }

    #[test]
    fn test_unknown_stream_rejected() {
        let mut demux = demux(4);
        assert!(matches!(demux.decode(&wire(7, 0)), Err(ErrorKind::UnknownStream(7))));
        assert!(demux.buffer().is_empty());
    }

    #[test]
    fn test_malformed_datagram_rejected() {
        let mut demux = demux(4);
        assert!(matches!(demux.decode(&[0xFF; 3]), Err(ErrorKind::DecodingError(_))));
    }

    #[test]
    fn test_duplicate_stream_rejected() {
        let mut demux = demux(4);
        assert!(matches!(
            demux.add_stream(0, Box::new(PassthroughDecoder::new())),
            Err(ErrorKind::DuplicateStream(0))
        ));
        demux.remove_stream(0).unwrap();
        assert!(!demux.contains_stream(0));
    }

    #[test]
    fn test_decoder_latency_reordered_by_buffer() {
        let mut demux = demux(8);
        demux
            .add_stream(
                1,
                Box::new(GroupingDecoder { group: 2, held: Vec::new(), ready: Vec::new() }),
            )
            .unwrap();

        // Stream 1 finishes index 0 only once index 2 arrived
        assert_eq!(demux.decode(&wire(1, 0)).unwrap(), 0);
        assert_eq!(demux.decode(&wire(0, 1)).unwrap(), 1);
        assert_eq!(demux.decode(&wire(1, 2)).unwrap(), 2);

        assert_eq!(demux.flush(), 3);
        let order: Vec<(StreamId, u32)> = std::iter::from_fn(|| demux.pop())
            .map(|c| (c.stream_id(), c.global_idx()))
            .collect();
        assert_eq!(order, vec![(1, 0), (0, 1), (1, 2)]);
    }
}
