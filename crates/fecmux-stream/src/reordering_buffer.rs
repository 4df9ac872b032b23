//! Window-bounded in-order delivery of decoded blocks.
//!
//! Decoded blocks arrive in arbitrary order: UDP reorders and drops datagrams,
//! and the codec finishes blocks with variable latency. The `ReorderingBuffer`
//! holds at most `window_size` of them in a working window sorted by
//! [`ChunkKey`] (global index, then stream id). Once the window is full, each
//! new arrival first pushes the lowest entry out to the delivery queue, where
//! the application pops it in FIFO order. An arrival that sorts before every
//! pending entry of a full window goes straight to the delivery queue.
//!
//! # Entry lifecycle
//!
//! `Pending` (working window) -> `Delivered` (delivery queue) -> `Consumed` (popped).
//! Nothing moves backwards.
//!
//! # Staleness
//!
//! There is no clock. A block that never arrives is skipped as soon as the
//! window evicts past it. The last delivered key is the *delivery horizon*;
//! anything arriving at or behind it is too late and is dropped, which keeps
//! delivery free of duplicates and in non-decreasing order. A block far behind
//! the horizon (more than `resync_distance`) means the sender restarted its
//! counter: the window is flushed and ordering starts over.
//!
//! # Counter wrap
//!
//! The window is keyed by each index's distance from a base index rather than
//! by the raw index, so blocks on both sides of the u32 wrap sort in
//! transmission order. The base follows the horizon and is moved forward once
//! the horizon is half the counter range away from it.

use std::collections::{BTreeMap, VecDeque};

use fecmux_core::{
    config::Config,
    error::{ErrorKind, Result},
    shared::SharedBytes,
    GlobalIndex, StreamId,
};
use fecmux_protocol::{
    chunk::{Chunk, ChunkKey},
    sequence::sequence_less_than,
};
use tracing::{debug, trace, warn};

const HALF_RANGE: u32 = 1 << 31;

/// How far below the first arrival an empty, never-delivered window still sorts correctly.
const INITIAL_SLACK: u32 = 1 << 30;

/// What happened to a block handed to [`ReorderingBuffer::add_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Placed in the working window.
    Buffered,
    /// Sorted before every entry of a full window; moved straight to the delivery queue.
    Delivered,
    /// Same stream and index is already pending or was just delivered; dropped.
    Duplicate,
    /// Arrived after the window moved past it; dropped.
    Late,
}

impl InsertOutcome {
    /// True if the block will reach the application.
    pub fn is_accepted(self) -> bool {
        matches!(self, InsertOutcome::Buffered | InsertOutcome::Delivered)
    }
}

/// Counters kept over the buffer's lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReorderingStats {
    /// Blocks moved to the delivery queue.
    pub delivered: u64,
    /// Blocks dropped as duplicates.
    pub duplicates: u64,
    /// Blocks dropped for arriving behind the delivery horizon.
    pub late: u64,
    /// Sequence restarts detected.
    pub resyncs: u64,
}

/// Position of a block in the working window: distance from the base, then stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Slot {
    offset: u32,
    stream_id: StreamId,
}

impl Slot {
    fn new(key: ChunkKey, base: GlobalIndex) -> Self {
        Self { offset: key.global_idx.wrapping_sub(base), stream_id: key.stream_id }
    }
}

/// Reorders decoded blocks within a bounded window and queues them for delivery.
#[derive(Debug)]
pub struct ReorderingBuffer {
    window_size: usize,
    resync_distance: u32,
    base: GlobalIndex,
    pending: BTreeMap<Slot, Chunk>,
    delivery: VecDeque<Chunk>,
    horizon: Option<ChunkKey>,
    stats: ReorderingStats,
}

impl ReorderingBuffer {
    /// Creates a buffer holding at most `window_size` pending blocks.
    pub fn new(window_size: usize) -> Result<Self> {
        Self::with_resync_distance(window_size, Config::default().resync_distance)
    }

    /// Creates a buffer from the window settings in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_resync_distance(config.window_size, config.resync_distance)
    }

    /// Creates a buffer with an explicit restart threshold.
    pub fn with_resync_distance(window_size: usize, resync_distance: u32) -> Result<Self> {
        if window_size == 0 {
            return Err(ErrorKind::InvalidConfig("window_size must be at least 1".into()));
        }
        Ok(Self {
            window_size,
            resync_distance,
            base: 0,
            pending: BTreeMap::new(),
            delivery: VecDeque::with_capacity(window_size),
            horizon: None,
            stats: ReorderingStats::default(),
        })
    }

    /// Offers a decoded block to the working window.
    ///
    /// If the window is full, the lowest pending entry is delivered first to
    /// make room, unless the new block sorts before it, in which case the new
    /// block itself is delivered. Late and duplicate blocks are dropped and
    /// reported through the returned outcome; this never fails.
    pub fn add_block(
        &mut self,
        stream_id: StreamId,
        global_idx: GlobalIndex,
        payload: impl Into<SharedBytes>,
    ) -> InsertOutcome {
        let key = ChunkKey::new(stream_id, global_idx);

        if self.horizon == Some(key) || self.pending.contains_key(&Slot::new(key, self.base)) {
            self.stats.duplicates += 1;
            debug!(stream_id, global_idx, "dropping duplicate block");
            return InsertOutcome::Duplicate;
        }

        if let Some(horizon) = self.horizon {
            if is_behind(key, horizon) {
                let distance = horizon.global_idx.wrapping_sub(global_idx);
                if distance > self.resync_distance {
                    self.resync(key, distance);
                } else {
                    return self.drop_late(key);
                }
            }
        }

        if self.pending.is_empty() {
            self.base = match self.horizon {
                Some(horizon) => horizon.global_idx,
                None => global_idx.wrapping_sub(INITIAL_SLACK),
            };
        }

        let slot = Slot::new(key, self.base);
        let chunk = Chunk::new(stream_id, global_idx, payload);

        if self.pending.len() >= self.window_size {
            if self.pending.first_key_value().is_some_and(|(head, _)| slot < *head) {
                self.deliver(chunk);
                return InsertOutcome::Delivered;
            }
            while self.pending.len() >= self.window_size {
                self.evict_head();
            }
        }

        // Eviction may have rebased the window.
        self.pending.insert(Slot::new(key, self.base), chunk);
        trace!(
            window = ?self.pending.values().map(Chunk::global_idx).collect::<Vec<_>>(),
            "reordering window"
        );
        InsertOutcome::Buffered
    }

    /// Returns true if a delivered chunk is waiting to be popped.
    pub fn available(&self) -> bool {
        !self.delivery.is_empty()
    }

    /// Removes and returns the oldest delivered chunk, or None if nothing is ready.
    pub fn pop(&mut self) -> Option<Chunk> {
        self.delivery.pop_front()
    }

    /// Delivers every pending block in order. Returns how many were moved.
    pub fn flush(&mut self) -> usize {
        let count = self.pending.len();
        while !self.pending.is_empty() {
            self.evict_head();
        }
        count
    }

    /// Returns the number of pending blocks in the working window.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns true if the working window is empty.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Returns the pending keys in window order.
    pub fn pending_keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.pending.values().map(Chunk::key)
    }

    /// Returns the number of delivered chunks not yet popped.
    pub fn delivered_len(&self) -> usize {
        self.delivery.len()
    }

    /// Returns the configured window size.
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Returns the key of the most recently delivered block.
    pub fn horizon(&self) -> Option<ChunkKey> {
        self.horizon
    }

    /// Returns lifetime counters.
    pub fn stats(&self) -> ReorderingStats {
        self.stats
    }

    fn evict_head(&mut self) {
        if let Some((_, chunk)) = self.pending.pop_first() {
            self.deliver(chunk);
        }
    }

    fn deliver(&mut self, chunk: Chunk) {
        let key = chunk.key();
        trace!(stream_id = key.stream_id, global_idx = key.global_idx, "delivering block");
        self.horizon = Some(key);
        self.delivery.push_back(chunk);
        self.stats.delivered += 1;

        if key.global_idx.wrapping_sub(self.base) >= HALF_RANGE {
            self.rebase(key.global_idx);
        }
    }

    /// Re-keys the window against `base`. Every pending entry is ahead of the
    /// horizon by less than half the range, so the order is preserved.
    fn rebase(&mut self, base: GlobalIndex) {
        trace!(from = self.base, to = base, pending = self.pending.len(), "rebasing window");
        self.base = base;
        self.pending = std::mem::take(&mut self.pending)
            .into_values()
            .map(|chunk| (Slot::new(chunk.key(), base), chunk))
            .collect();
    }

    fn drop_late(&mut self, key: ChunkKey) -> InsertOutcome {
        self.stats.late += 1;
        debug!(
            stream_id = key.stream_id,
            global_idx = key.global_idx,
            horizon = ?self.horizon.map(|h| h.global_idx),
            "dropping late block"
        );
        InsertOutcome::Late
    }

    fn resync(&mut self, key: ChunkKey, distance: u32) {
        warn!(
            global_idx = key.global_idx,
            distance,
            pending = self.pending.len(),
            "sequence restart detected, flushing reordering window"
        );
        self.flush();
        self.horizon = None;
        self.stats.resyncs += 1;
    }
}

/// True if `key` sorts at or before `horizon`, treating the index as wrapping.
fn is_behind(key: ChunkKey, horizon: ChunkKey) -> bool {
    if key.global_idx == horizon.global_idx {
        key.stream_id <= horizon.stream_id
    } else {
        sequence_less_than(key.global_idx, horizon.global_idx)
    }
}
