#![warn(missing_docs)]

//! fecmux: stream multiplexing and in-order delivery over lossy datagram links.
//!
//! This crate re-exports the commonly used types of the workspace:
//!
//! - Configuration and errors (`Config`, `ErrorKind`)
//! - Send side (`Multiplexer`, `StreamEncoder`) and receive side
//!   (`Demultiplexer`, `ReorderingBuffer`, `StreamDecoder`)
//! - Wire blocks (`Chunk`, `BlockEncoder`, `BlockDecoder`)
//! - Transports and relays (`UdpTransport`, `SimulatedLink`, `EncodeRelay`, `DecodeRelay`)
//!
//! Example
//! ```
//! use fecmux::prelude::*;
//!
//! let config = Config::default();
//! let mut mux = Multiplexer::new();
//! mux.add_stream(0, Box::new(PassthroughEncoder::from_config(&config))).unwrap();
//!
//! let mut demux = Demultiplexer::new(&config).unwrap();
//! demux.add_stream(0, Box::new(PassthroughDecoder::new())).unwrap();
//!
//! mux.add_data(0, b"hello".to_vec()).unwrap();
//! let block = mux.get_encoded_block().unwrap();
//! let datagram = BlockEncoder::encode(&block, config.use_checksums).unwrap();
//!
//! demux.decode(&datagram).unwrap();
//! demux.flush();
//! assert_eq!(demux.pop().unwrap().payload(), b"hello");
//! ```

// Core config, errors and shared types
pub use fecmux_core::{
    config::Config,
    error::{DecodingErrorKind, ErrorKind, Result},
    shared::SharedBytes,
    transport::Transport,
    GlobalIndex, StreamId,
};
// Host: transports and relay loops
pub use fecmux_host::{
    DecodeRelay, DecodeStats, EncodeRelay, LinkConditions, SimulatedEndpoint, SimulatedLink,
    UdpTransport,
};
// Protocol: chunks, wire blocks and codecs
pub use fecmux_protocol::{
    BlockDecoder, BlockEncoder, Chunk, ChunkKey, PassthroughDecoder, PassthroughEncoder,
    StreamDecoder, StreamEncoder,
};
// Stream: multiplexing and reordering
pub use fecmux_stream::{Demultiplexer, InsertOutcome, Multiplexer, ReorderingBuffer};

/// Convenience prelude with the most commonly used items.
pub mod prelude {
    pub use crate::{
        BlockDecoder, BlockEncoder, Chunk, Config, DecodeRelay, Demultiplexer, EncodeRelay,
        ErrorKind, InsertOutcome, Multiplexer, PassthroughDecoder, PassthroughEncoder,
        ReorderingBuffer, SharedBytes, StreamDecoder, StreamEncoder, Transport, UdpTransport,
    };
}
