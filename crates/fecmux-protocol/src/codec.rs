//! Per-stream codec interfaces.
//!
//! The erasure-coding mathematics lives outside this workspace. A codec only
//! has to turn application payloads into opaque blocks on the way out, and
//! received blocks back into decoded payloads on the way in. The multiplexer
//! and demultiplexer own one codec instance per stream.
//!
//! [`PassthroughEncoder`] and [`PassthroughDecoder`] are the identity codec:
//! they split payloads into block-sized pieces and hand every received block
//! straight back. They are what the relays use when no real codec is plugged in.

use std::collections::VecDeque;

use fecmux_core::{config::Config, error::Result, shared::SharedBytes, GlobalIndex};

/// Send-side codec for a single stream.
pub trait StreamEncoder: Send {
    /// Feeds a payload and returns the wire-ready blocks it produced (possibly none).
    fn encode(&mut self, payload: SharedBytes) -> Result<Vec<SharedBytes>>;

    /// Number of blocks the encoder may spread redundancy across.
    ///
    /// The receiving window has to be strictly larger than this.
    fn redundancy_window(&self) -> usize {
        0
    }
}

/// Receive-side codec for a single stream.
pub trait StreamDecoder: Send {
    /// Feeds one received block.
    fn decode(&mut self, global_idx: GlobalIndex, block: SharedBytes) -> Result<()>;

    /// Returns the next decoded payload, tagged with its global index.
    fn poll_decoded(&mut self) -> Option<(GlobalIndex, SharedBytes)>;
}

/// Identity encoder that only splits payloads into blocks.
#[derive(Debug, Clone)]
pub struct PassthroughEncoder {
    max_block_size: usize,
}

impl PassthroughEncoder {
    /// Creates an encoder producing blocks of at most `max_block_size` bytes.
    pub fn new(max_block_size: usize) -> Self {
        Self { max_block_size: max_block_size.max(1) }
    }

    /// Creates an encoder sized from the configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_block_size)
    }

    /// Returns the largest block this encoder emits.
    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }
}

impl StreamEncoder for PassthroughEncoder {
    fn encode(&mut self, payload: SharedBytes) -> Result<Vec<SharedBytes>> {
        if payload.len() <= self.max_block_size {
            if payload.is_empty() {
                return Ok(Vec::new());
            }
            return Ok(vec![payload]);
        }
        Ok(payload.pieces(self.max_block_size).collect())
    }
}

/// Identity decoder: every received block is immediately decoded.
#[derive(Debug, Default)]
pub struct PassthroughDecoder {
    decoded: VecDeque<(GlobalIndex, SharedBytes)>,
}

impl PassthroughDecoder {
    /// Creates an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StreamDecoder for PassthroughDecoder {
    fn decode(&mut self, global_idx: GlobalIndex, block: SharedBytes) -> Result<()> {
        self.decoded.push_back((global_idx, block));
        Ok(())
    }

    fn poll_decoded(&mut self) -> Option<(GlobalIndex, SharedBytes)> {
        self.decoded.pop_front()
    }
}
