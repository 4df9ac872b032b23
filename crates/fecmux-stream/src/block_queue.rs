use std::collections::VecDeque;

use fecmux_core::{shared::SharedBytes, StreamId};

/// A block produced by a stream encoder, not yet stamped with a global index.
#[derive(Debug, PartialEq, Eq)]
pub struct QueuedBlock {
    /// Stream whose encoder produced the block
    pub stream_id: StreamId,
    /// Opaque encoded bytes
    pub block: SharedBytes,
}

/// Merged queue of wire-ready blocks from every stream, in production order.
#[derive(Debug)]
pub struct BlockQueue {
    /// Pending blocks, oldest first
    blocks: VecDeque<QueuedBlock>,
    /// Backlog size at which `enqueue` reports the queue should be drained
    high_water_mark: usize,
}

impl BlockQueue {
    /// Creates a new block queue with the specified high-water mark.
    pub fn new(high_water_mark: usize) -> Self {
        Self { blocks: VecDeque::with_capacity(high_water_mark), high_water_mark }
    }

    /// Enqueues a block at the tail.
    /// Returns true if the backlog reached the high-water mark.
    pub fn enqueue(&mut self, stream_id: StreamId, block: SharedBytes) -> bool {
        self.blocks.push_back(QueuedBlock { stream_id, block });
        self.blocks.len() >= self.high_water_mark
    }

    /// Removes the oldest block.
    pub fn dequeue(&mut self) -> Option<QueuedBlock> {
        self.blocks.pop_front()
    }

    /// Returns the number of queued blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Returns the number of queued blocks produced by `stream_id`.
    pub fn count_for(&self, stream_id: StreamId) -> usize {
        self.blocks.iter().filter(|b| b.stream_id == stream_id).count()
    }
}

impl Default for BlockQueue {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(b: u8) -> SharedBytes {
        SharedBytes::from_vec(vec![b])
    }

    #[test]
    fn test_queue_basic_operations() {
        let mut queue = BlockQueue::new(3);

        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);

        queue.enqueue(0, bytes(1));
        assert_eq!(queue.len(), 1);
        assert!(!queue.is_empty());
    }

    #[test]
    fn test_queue_high_water_mark() {
        let mut queue = BlockQueue::new(2);

        assert!(!queue.enqueue(0, bytes(1)));
        assert!(queue.enqueue(1, bytes(2)));

        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_queue_is_fifo_across_streams() {
        let mut queue = BlockQueue::default();

        queue.enqueue(1, bytes(10));
        queue.enqueue(0, bytes(20));
        queue.enqueue(1, bytes(30));

        assert_eq!(queue.count_for(1), 2);
        assert_eq!(queue.len(), 3);

        let first = queue.dequeue().unwrap();
        assert_eq!(first.stream_id, 1);
        assert_eq!(first.block.as_slice(), &[10]);
        assert_eq!(queue.dequeue().unwrap().stream_id, 0);
        assert_eq!(queue.dequeue().unwrap().block.as_slice(), &[30]);
        assert!(queue.dequeue().is_none());
    }
}
