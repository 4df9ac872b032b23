//! Transport abstraction for pluggable datagram I/O.

use std::io::Result;

/// Whole-datagram send/receive, one wire block per datagram.
///
/// This trait allows various transports (UDP, in-memory link simulator, etc.)
/// to be plugged into the relays without coupling to a concrete implementation.
pub trait Transport {
    /// Sends a single datagram to the transport's destination.
    fn send(&mut self, datagram: &[u8]) -> Result<usize>;

    /// Receives a single datagram into `buffer`.
    ///
    /// Returns `Ok(None)` when nothing is available right now. Datagrams longer
    /// than `buffer` are truncated.
    fn receive(&mut self, buffer: &mut [u8]) -> Result<Option<usize>>;

    /// Returns whether the transport operates in blocking or non-blocking mode.
    fn is_blocking_mode(&self) -> bool;
}
