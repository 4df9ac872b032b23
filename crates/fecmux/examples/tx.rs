//! Reads raw datagrams from a UDP port, wraps them in fecmux blocks and sends them on.
//!
//! - cargo run -p fecmux --example tx -- 5002 127.0.0.1:5001
//!   (reads raw data on 5002, sends encoded blocks to the rx example on 5001)
//! - cargo run -p fecmux --example tx -- 5002 239.1.2.3:5001 1
//!   (sends on stream 1 to a multicast group)

use std::{
    env,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
};

use fecmux::{Config, EncodeRelay, UdpTransport};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Args: [input_port] [output_addr] [stream_id]
    let mut args = env::args().skip(1);
    let input_port: u16 = args.next().unwrap_or_else(|| "5002".into()).parse()?;
    let output_addr: SocketAddr =
        args.next().unwrap_or_else(|| "127.0.0.1:5001".into()).parse()?;
    let stream_id: u8 = args.next().unwrap_or_else(|| "0".into()).parse()?;

    let config = Config { blocking_mode: true, socket_ttl: Some(8), ..Config::default() };

    let input = UdpTransport::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, input_port), &config)?;
    let output = UdpTransport::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0), &config)?
        .with_destination(output_addr)?;

    println!(
        "fecmux tx: raw input on {} -> encoded output to {} (stream {})",
        input.local_addr()?,
        output_addr,
        stream_id
    );

    let mut relay = EncodeRelay::new(input, output, &config, stream_id)?;
    relay.start_polling()?;
    Ok(())
}
