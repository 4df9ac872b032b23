//! Decodes fecmux blocks arriving on a UDP port and forwards the payloads, in order.
//!
//! - cargo run -p fecmux --example rx -- 5001 127.0.0.1:5000 64
//!   (listens for encoded blocks on 5001, forwards decoded data to 127.0.0.1:5000,
//!   decode window of 64 blocks)
//!
//! Set `RUST_LOG=debug` to see dropped and ignored blocks.

use std::{
    env,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4},
};

use fecmux::{Config, DecodeRelay, UdpTransport};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // Args: [input_port] [output_addr] [window_size]
    let mut args = env::args().skip(1);
    let input_port: u16 = args.next().unwrap_or_else(|| "5001".into()).parse()?;
    let output_addr: SocketAddr =
        args.next().unwrap_or_else(|| "127.0.0.1:5000".into()).parse()?;
    let window_size: usize = args.next().unwrap_or_else(|| "64".into()).parse()?;

    let config = Config { window_size, blocking_mode: true, ..Config::default() };

    let input = UdpTransport::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, input_port), &config)?;
    let output = UdpTransport::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0), &config)?
        .with_destination(output_addr)?;

    println!(
        "fecmux rx: encoded input on {} -> decoded output to {} (window {})",
        input.local_addr()?,
        output_addr,
        window_size
    );

    let mut relay = DecodeRelay::new(input, output, &config, 0)?;
    relay.start_polling()?;
    Ok(())
}
