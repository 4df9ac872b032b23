#![warn(missing_docs)]

//! fecmux-protocol: chunk types, wire block format, and codec interfaces.

/// Wire block serialization and deserialization.
pub mod block_codec;
/// Chunk type carried through the pipeline.
pub mod chunk;
/// Per-stream codec interfaces and the pass-through codec.
pub mod codec;
/// Wrapping comparisons and the global sequence counter.
pub mod sequence;

pub use block_codec::{BlockDecoder, BlockEncoder};
pub use chunk::{Chunk, ChunkKey};
pub use codec::{PassthroughDecoder, PassthroughEncoder, StreamDecoder, StreamEncoder};
pub use sequence::GlobalSequence;
