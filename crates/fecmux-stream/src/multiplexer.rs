//! Send-side stream multiplexing.
//!
//! The `Multiplexer` owns one encoder per stream and presents their combined
//! output as a single queue of wire-ready chunks. Every chunk leaving the queue
//! is stamped with the next value of one counter shared by all streams, so the
//! transmission order is total no matter which stream produced the block.
//!
//! Registering a stream id twice is rejected; replacing an encoder takes an
//! explicit `remove_stream` followed by `add_stream`.

use std::{collections::BTreeMap, fmt};

use fecmux_core::{
    error::{ErrorKind, Result},
    shared::SharedBytes,
    GlobalIndex, StreamId,
};
use fecmux_protocol::{chunk::Chunk, codec::StreamEncoder, sequence::GlobalSequence};
use tracing::debug;

use crate::block_queue::BlockQueue;

/// Stream registry plus global sequencing for outgoing blocks.
pub struct Multiplexer {
    encoders: BTreeMap<StreamId, Box<dyn StreamEncoder>>,
    queue: BlockQueue,
    sequence: GlobalSequence,
}

impl fmt::Debug for Multiplexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Multiplexer")
            .field("streams", &self.encoders.keys().collect::<Vec<_>>())
            .field("queue", &self.queue)
            .field("sequence", &self.sequence)
            .finish()
    }
}

impl Default for Multiplexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Multiplexer {
    /// Creates a multiplexer with no streams and the counter at zero.
    pub fn new() -> Self {
        Self::with_sequence(GlobalSequence::new())
    }

    /// Creates a multiplexer whose counter continues from `sequence`.
    pub fn with_sequence(sequence: GlobalSequence) -> Self {
        Self { encoders: BTreeMap::new(), queue: BlockQueue::default(), sequence }
    }

    /// Registers an encoder under `stream_id`.
    pub fn add_stream(&mut self, stream_id: StreamId, encoder: Box<dyn StreamEncoder>) -> Result<()> {
        if self.encoders.contains_key(&stream_id) {
            return Err(ErrorKind::DuplicateStream(stream_id));
        }
        debug!(stream_id, redundancy = encoder.redundancy_window(), "stream registered");
        self.encoders.insert(stream_id, encoder);
        Ok(())
    }

    /// Unregisters the encoder for `stream_id` and hands it back.
    ///
    /// Blocks the stream already produced stay queued and keep their place in
    /// the transmission order.
    pub fn remove_stream(&mut self, stream_id: StreamId) -> Result<Box<dyn StreamEncoder>> {
        let encoder = self.encoders.remove(&stream_id).ok_or(ErrorKind::UnknownStream(stream_id))?;
        debug!(stream_id, queued = self.queue.count_for(stream_id), "stream removed");
        Ok(encoder)
    }

    /// Feeds `payload` to the stream's encoder and queues whatever blocks it produced.
    ///
    /// Returns the number of blocks queued. On error nothing is queued.
    pub fn add_data(&mut self, stream_id: StreamId, payload: impl Into<SharedBytes>) -> Result<usize> {
        let encoder =
            self.encoders.get_mut(&stream_id).ok_or(ErrorKind::UnknownStream(stream_id))?;
        let blocks = encoder.encode(payload.into())?;
        let produced = blocks.len();

        let mut backlogged = false;
        for block in blocks {
            backlogged |= self.queue.enqueue(stream_id, block);
        }
        if backlogged {
            debug!(queued = self.queue.len(), "encoded block backlog reached high-water mark");
        }
        Ok(produced)
    }

    /// Returns true if at least one wire-ready block is queued.
    pub fn has_encoded_blocks(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Pops the oldest queued block and assigns it the next global index.
    pub fn get_encoded_block(&mut self) -> Result<Chunk> {
        self.next_encoded_block().ok_or(ErrorKind::EmptyQueue)
    }

    /// Non-failing variant of [`Multiplexer::get_encoded_block`] for polling loops.
    pub fn next_encoded_block(&mut self) -> Option<Chunk> {
        let queued = self.queue.dequeue()?;
        let global_idx = self.sequence.next_index();
        Some(Chunk::new(queued.stream_id, global_idx, queued.block))
    }

    /// Returns the index the next outgoing block will carry.
    pub fn next_global_index(&self) -> GlobalIndex {
        self.sequence.peek()
    }

    /// Returns the number of blocks waiting for transmission.
    pub fn queued_blocks(&self) -> usize {
        self.queue.len()
    }

    /// Returns true if `stream_id` is registered.
    pub fn contains_stream(&self, stream_id: StreamId) -> bool {
        self.encoders.contains_key(&stream_id)
    }

    /// Returns the number of registered streams.
    pub fn stream_count(&self) -> usize {
        self.encoders.len()
    }

    /// Largest redundancy window across registered encoders.
    ///
    /// The receiver's window size must be strictly larger than this.
    pub fn max_redundancy_window(&self) -> usize {
        self.encoders.values().map(|e| e.redundancy_window()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use fecmux_protocol::codec::PassthroughEncoder;

    use super::*;

    /// Emits `copies` blocks per payload and reports a fixed redundancy window.
    struct RepeatingEncoder {
        copies: usize,
        redundancy: usize,
    }

    impl StreamEncoder for RepeatingEncoder {
        fn encode(&mut self, payload: SharedBytes) -> Result<Vec<SharedBytes>> {
            Ok(vec![payload; self.copies])
        }

        fn redundancy_window(&self) -> usize {
            self.redundancy
        }
    }

    struct FailingEncoder;

    impl StreamEncoder for FailingEncoder {
        fn encode(&mut self, _payload: SharedBytes) -> Result<Vec<SharedBytes>> {
            Err(ErrorKind::Codec("refused".into()))
        }
    }

    fn passthrough(max: usize) -> Box<dyn StreamEncoder> {
        Box::new(PassthroughEncoder::new(max))
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut mux = Multiplexer::new();
        mux.add_stream(0, passthrough(16)).unwrap();
        assert!(matches!(mux.add_stream(0, passthrough(16)), Err(ErrorKind::DuplicateStream(0))));
        assert_eq!(mux.stream_count(), 1);
    }

    #[test]
    fn test_replace_via_remove_then_add() {
        let mut mux = Multiplexer::new();
        mux.add_stream(4, passthrough(16)).unwrap();
        mux.remove_stream(4).unwrap();
        assert!(!mux.contains_stream(4));
        mux.add_stream(4, passthrough(2)).unwrap();
        assert_eq!(mux.add_data(4, vec![0; 4]).unwrap(), 2);
    }

    #[test]
    fn test_remove_unknown_stream() {
        let mut mux = Multiplexer::new();
        assert!(matches!(mux.remove_stream(9), Err(ErrorKind::UnknownStream(9))));
    }

    #[test]
    fn test_removed_stream_keeps_queued_blocks() {
        let mut mux = Multiplexer::new();
        mux.add_stream(1, passthrough(16)).unwrap();
        mux.add_data(1, vec![1, 2]).unwrap();
        mux.remove_stream(1).unwrap();

        let chunk = mux.get_encoded_block().unwrap();
        assert_eq!(chunk.stream_id(), 1);
        assert!(matches!(mux.add_data(1, vec![3]), Err(ErrorKind::UnknownStream(1))));
    }

    #[test]
    fn test_empty_queue() {
        let mut mux = Multiplexer::new();
        assert!(!mux.has_encoded_blocks());
        assert!(matches!(mux.get_encoded_block(), Err(ErrorKind::EmptyQueue)));
        assert!(mux.next_encoded_block().is_none());
        // A failed pop must not consume a sequence number
        assert_eq!(mux.next_global_index(), 0);
    }

    #[test]
    fn test_codec_failure_queues_nothing() {
        let mut mux = Multiplexer::new();
        mux.add_stream(0, Box::new(FailingEncoder)).unwrap();
        assert!(matches!(mux.add_data(0, vec![1]), Err(ErrorKind::Codec(_))));
        assert_eq!(mux.queued_blocks(), 0);
    }

    #[test]
    fn test_interleaved_streams_share_one_counter() {
        let mut mux = Multiplexer::new();
        mux.add_stream(0, Box::new(RepeatingEncoder { copies: 1, redundancy: 0 })).unwrap();
        mux.add_stream(1, Box::new(RepeatingEncoder { copies: 1, redundancy: 0 })).unwrap();

        let mut seen = Vec::new();
        for round in 0..4u8 {
            mux.add_data(round % 2, vec![round]).unwrap();
            let chunk = mux.get_encoded_block().unwrap();
            seen.push((chunk.stream_id(), chunk.global_idx()));
        }
        assert_eq!(seen, vec![(0, 0), (1, 1), (0, 2), (1, 3)]);
    }

    #[test]
    fn test_counter_wraps() {
        let mut mux = Multiplexer::with_sequence(GlobalSequence::starting_at(u32::MAX));
        mux.add_stream(0, passthrough(1)).unwrap();
        mux.add_data(0, vec![1, 2]).unwrap();
        assert_eq!(mux.get_encoded_block().unwrap().global_idx(), u32::MAX);
        assert_eq!(mux.get_encoded_block().unwrap().global_idx(), 0);
    }

    #[test]
    fn test_max_redundancy_window() {
        let mut mux = Multiplexer::new();
        assert_eq!(mux.max_redundancy_window(), 0);
        mux.add_stream(0, Box::new(RepeatingEncoder { copies: 1, redundancy: 8 })).unwrap();
        mux.add_stream(1, Box::new(RepeatingEncoder { copies: 1, redundancy: 3 })).unwrap();
        assert_eq!(mux.max_redundancy_window(), 8);
    }
}
