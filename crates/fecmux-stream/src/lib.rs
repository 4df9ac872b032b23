#![warn(missing_docs)]

//! fecmux-stream: send-side stream multiplexing and receive-side reordering.
//!
//! Data flow:
//!
//! ```text
//! payload -> StreamEncoder -> Multiplexer (global sequencing) -> wire
//! wire -> Demultiplexer -> StreamDecoder -> ReorderingBuffer -> pop()
//! ```

/// Merged FIFO of wire-ready blocks.
pub mod block_queue;
/// Receive-side per-stream decoders feeding the reordering buffer.
pub mod demultiplexer;
/// Send-side stream registry and global sequencing.
pub mod multiplexer;
/// Window-bounded in-order delivery.
pub mod reordering_buffer;

pub use block_queue::{BlockQueue, QueuedBlock};
pub use demultiplexer::Demultiplexer;
pub use multiplexer::Multiplexer;
pub use reordering_buffer::{InsertOutcome, ReorderingBuffer, ReorderingStats};
