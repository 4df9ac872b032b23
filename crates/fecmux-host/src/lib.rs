#![warn(missing_docs)]

//! fecmux-host: transports and relay loops around the stream multiplexer.

/// Encode and decode relay loops.
pub mod relay;
/// In-memory lossy link for tests and demos.
pub mod simulator;
/// Decode timing and drop counters.
pub mod stats;
/// UDP socket transport.
pub mod udp;

pub use relay::{DecodeRelay, EncodeRelay};
pub use simulator::{LinkConditions, LinkStats, SimulatedEndpoint, SimulatedLink};
pub use stats::DecodeStats;
pub use udp::UdpTransport;
