use std::{default::Default, net::Ipv4Addr, time::Duration};

use crate::{
    constants::{
        BLOCK_HEADER_SIZE, CHECKSUM_SIZE, DEFAULT_BLOCK_SIZE, DEFAULT_MAX_DATAGRAM_SIZE,
        DEFAULT_RESYNC_DISTANCE, DEFAULT_WINDOW_SIZE,
    },
    error::{ErrorKind, Result},
};

#[derive(Clone, Debug)]
/// Configuration options to tune stream buffering and host behavior.
pub struct Config {
    /// Max number of decoded blocks held for reordering before the oldest is delivered.
    /// Must exceed the encode-side redundancy window, or reordering looks like loss.
    pub window_size: usize,
    /// A block this far behind the delivery horizon is taken as a sender restart.
    pub resync_distance: u32,
    /// Max payload bytes carried by a single wire block.
    pub max_block_size: usize,
    /// Max size of a received datagram in bytes.
    pub max_datagram_size: usize,
    /// Append a CRC32 trailer to every wire block (default: false).
    pub use_checksums: bool,
    /// Make the underlying UDP socket block when true, otherwise non-blocking.
    pub blocking_mode: bool,
    /// Socket receive buffer size in bytes (None = use system default).
    /// Corresponds to SO_RCVBUF socket option.
    pub socket_recv_buffer_size: Option<usize>,
    /// Socket send buffer size in bytes (None = use system default).
    /// Corresponds to SO_SNDBUF socket option.
    pub socket_send_buffer_size: Option<usize>,
    /// Time-to-live for outgoing packets (None = use system default).
    pub socket_ttl: Option<u32>,
    /// IPv4 multicast group to join after binding (None = unicast only).
    pub multicast_group: Option<Ipv4Addr>,
    /// Local interface for the multicast join and for sends to a multicast destination.
    pub multicast_interface: Ipv4Addr,
    /// Number of relay iterations between decode timing reports.
    pub stats_interval: u32,
    /// Sleep between relay polls. None yields instead of sleeping.
    pub polling_interval: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            resync_distance: DEFAULT_RESYNC_DISTANCE,
            max_block_size: DEFAULT_BLOCK_SIZE,
            max_datagram_size: DEFAULT_MAX_DATAGRAM_SIZE,
            use_checksums: false,
            blocking_mode: false,
            socket_recv_buffer_size: None, // Use system default
            socket_send_buffer_size: None, // Use system default
            socket_ttl: None,              // Use system default
            multicast_group: None,
            multicast_interface: Ipv4Addr::UNSPECIFIED,
            stats_interval: 1000,
            polling_interval: Some(Duration::from_millis(1)),
        }
    }
}

impl Config {
    /// Checks that the configuration describes a usable pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            return Err(ErrorKind::InvalidConfig("window_size must be at least 1".into()));
        }
        if self.max_block_size == 0 || self.max_block_size > u16::MAX as usize {
            return Err(ErrorKind::InvalidConfig(format!(
                "max_block_size must be in 1..={}, got {}",
                u16::MAX,
                self.max_block_size
            )));
        }
        if self.max_block_size + self.block_overhead() > self.max_datagram_size {
            return Err(ErrorKind::InvalidConfig(format!(
                "a {} byte block needs {} bytes on the wire but max_datagram_size is {}",
                self.max_block_size,
                self.max_block_size + self.block_overhead(),
                self.max_datagram_size
            )));
        }
        Ok(())
    }

    /// Checks that the decode window can absorb the encoder's redundancy window.
    pub fn validate_against_redundancy(&self, redundancy: usize) -> Result<()> {
        if self.window_size <= redundancy {
            return Err(ErrorKind::WindowTooSmall { window: self.window_size, redundancy });
        }
        Ok(())
    }

    /// Bytes added around each payload on the wire.
    pub fn block_overhead(&self) -> usize {
        BLOCK_HEADER_SIZE + if self.use_checksums { CHECKSUM_SIZE } else { 0 }
    }
}
