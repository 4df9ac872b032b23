//! UDP datagram transport.
//!
//! One [`UdpTransport`] per direction: the receiving side binds a port (and
//! optionally joins a multicast group), the sending side binds an ephemeral
//! port and sends everything to a fixed destination.

use std::{
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4, ToSocketAddrs, UdpSocket},
};

use fecmux_core::{
    config::Config,
    error::{ErrorKind, Result},
    transport::Transport,
};
use socket2::{Domain, Protocol, SockRef, Socket as Socket2, Type};
use tracing::{debug, info};

/// Creates a UDP socket with the configured options applied before binding.
fn bind_socket(address: SocketAddr, config: &Config) -> io::Result<UdpSocket> {
    let socket2 = Socket2::new(Domain::for_address(address), Type::DGRAM, Some(Protocol::UDP))?;

    // Allow several receivers on one multicast port
    socket2.set_reuse_address(true)?;

    // Apply receive buffer size
    if let Some(size) = config.socket_recv_buffer_size {
        socket2.set_recv_buffer_size(size)?;
    }

    // Apply send buffer size
    if let Some(size) = config.socket_send_buffer_size {
        socket2.set_send_buffer_size(size)?;
    }

    socket2.bind(&address.into())?;
    let socket = UdpSocket::from(socket2);

    // Apply TTL
    if let Some(ttl) = config.socket_ttl {
        socket.set_ttl(ttl)?;
    }

    Ok(socket)
}

/// Transport over a single UDP socket.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    destination: Option<SocketAddr>,
    multicast_interface: Ipv4Addr,
    is_blocking_mode: bool,
}

impl UdpTransport {
    /// Binds to the given address with options from `config`.
    pub fn bind<A: ToSocketAddrs>(addresses: A, config: &Config) -> Result<Self> {
        let address = addresses.to_socket_addrs()?.next().ok_or_else(|| {
            ErrorKind::InvalidConfig("bind address did not resolve".into())
        })?;
        let socket = bind_socket(address, config)?;
        Self::from_socket(socket, config)
    }

    /// Binds to any available port on localhost.
    pub fn bind_any(config: &Config) -> Result<Self> {
        let loopback = Ipv4Addr::new(127, 0, 0, 1);
        Self::bind(SocketAddrV4::new(loopback, 0), config)
    }

    /// Wraps an already bound socket, applying blocking mode and multicast membership.
    pub fn from_socket(socket: UdpSocket, config: &Config) -> Result<Self> {
        socket.set_nonblocking(!config.blocking_mode)?;

        if let Some(group) = config.multicast_group {
            if !group.is_multicast() {
                return Err(ErrorKind::InvalidConfig(format!("{} is not a multicast group", group)));
            }
            socket.join_multicast_v4(&group, &config.multicast_interface)?;
            info!(%group, interface = %config.multicast_interface, "joined multicast group");
        }

        debug!(local = ?socket.local_addr().ok(), blocking = config.blocking_mode, "udp transport ready");
        Ok(Self {
            socket,
            destination: None,
            multicast_interface: config.multicast_interface,
            is_blocking_mode: config.blocking_mode,
        })
    }

    /// Sets the address every `send` goes to.
    pub fn with_destination(mut self, destination: SocketAddr) -> Result<Self> {
        self.set_destination(destination)?;
        Ok(self)
    }

    /// Changes the address every `send` goes to.
    ///
    /// A multicast destination is sent through the configured multicast interface.
    pub fn set_destination(&mut self, destination: SocketAddr) -> Result<()> {
        if let IpAddr::V4(group) = destination.ip() {
            if group.is_multicast() {
                SockRef::from(&self.socket).set_multicast_if_v4(&self.multicast_interface)?;
                info!(%group, interface = %self.multicast_interface, "sending to multicast group");
            }
        }
        self.destination = Some(destination);
        Ok(())
    }

    /// Returns the current destination.
    pub fn destination(&self) -> Option<SocketAddr> {
        self.destination
    }

    /// Returns the local socket address this transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, datagram: &[u8]) -> io::Result<usize> {
        let destination = self.destination.ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotConnected, "udp transport has no destination")
        })?;
        self.socket.send_to(datagram, destination)
    }

    fn receive(&mut self, buffer: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.recv_from(buffer) {
            Ok((len, _)) => Ok(Some(len)),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn is_blocking_mode(&self) -> bool {
        self.is_blocking_mode
    }
}

#[cfg(test)]
mod tests {
    use std::{thread, time::Duration};

    use super::*;

    fn receive_with_retry(transport: &mut UdpTransport, buffer: &mut [u8]) -> Option<usize> {
        for _ in 0..200 {
            if let Some(len) = transport.receive(buffer).unwrap() {
                return Some(len);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn test_loopback_send_receive() {
        let config = Config::default();
        let mut receiver = UdpTransport::bind_any(&config).unwrap();
        let destination = receiver.local_addr().unwrap();
        let mut sender = UdpTransport::bind_any(&config).unwrap().with_destination(destination).unwrap();

        assert_eq!(sender.send(b"block").unwrap(), 5);

        let mut buffer = [0u8; 64];
        let len = receive_with_retry(&mut receiver, &mut buffer).unwrap();
        assert_eq!(&buffer[..len], b"block");
    }

    #[test]
    fn test_receive_nothing_available() {
        let mut receiver = UdpTransport::bind_any(&Config::default()).unwrap();
        let mut buffer = [0u8; 16];
        assert_eq!(receiver.receive(&mut buffer).unwrap(), None);
        assert!(!receiver.is_blocking_mode());
    }

    #[test]
    fn test_send_without_destination() {
        let mut sender = UdpTransport::bind_any(&Config::default()).unwrap();
        let err = sender.send(b"x").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }

    #[test]
    fn test_multicast_destination_uses_interface() {
        let config =
            Config { multicast_interface: Ipv4Addr::new(127, 0, 0, 1), ..Config::default() };
        let group = SocketAddr::from((Ipv4Addr::new(239, 1, 2, 3), 5001));
        let sender = UdpTransport::bind_any(&config).unwrap().with_destination(group).unwrap();

        assert_eq!(sender.destination(), Some(group));
        let interface = SockRef::from(&sender.socket).multicast_if_v4().unwrap();
        assert_eq!(interface, Ipv4Addr::new(127, 0, 0, 1));
    }

    #[test]
    fn test_socket_options_applied() {
        let config = Config {
            socket_recv_buffer_size: Some(131072),
            socket_send_buffer_size: Some(65536),
            socket_ttl: Some(32),
            ..Config::default()
        };
        let transport = UdpTransport::bind_any(&config).unwrap();
        assert_eq!(transport.socket.ttl().unwrap(), 32);
    }

    #[test]
    fn test_non_multicast_group_rejected() {
        let config =
            Config { multicast_group: Some(Ipv4Addr::new(10, 0, 0, 1)), ..Config::default() };
        assert!(matches!(UdpTransport::bind_any(&config), Err(ErrorKind::InvalidConfig(_))));
    }
}
