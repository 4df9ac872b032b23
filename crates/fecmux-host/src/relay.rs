//! Polling loops that move datagrams between transports through the
//! multiplexer (send side) or the demultiplexer (receive side).

use std::{
    thread::{sleep, yield_now},
    time::{Duration, Instant},
};

use fecmux_core::{
    config::Config,
    error::{ErrorKind, Result},
    transport::Transport,
    StreamId,
};
use fecmux_protocol::{
    block_codec::BlockEncoder,
    codec::{PassthroughDecoder, PassthroughEncoder, StreamDecoder, StreamEncoder},
};
use fecmux_stream::{Demultiplexer, Multiplexer};
use tracing::{debug, error, trace, warn};

use crate::stats::DecodeStats;

fn pause(polling_interval: Option<Duration>) {
    match polling_interval {
        None => yield_now(),
        Some(duration) => sleep(duration),
    }
}

/// Reads raw datagrams from `input`, encodes them on one stream and writes
/// wire blocks to `output`.
#[derive(Debug)]
pub struct EncodeRelay<I, O> {
    input: I,
    output: O,
    multiplexer: Multiplexer,
    stream_id: StreamId,
    use_checksums: bool,
    polling_interval: Option<Duration>,
    receive_buffer: Vec<u8>,
    wire_buffer: Vec<u8>,
}

impl<I: Transport, O: Transport> EncodeRelay<I, O> {
    /// Creates a relay that passes payloads through unchanged on `stream_id`.
    pub fn new(input: I, output: O, config: &Config, stream_id: StreamId) -> Result<Self> {
        let encoder = PassthroughEncoder::from_config(config);
        Self::with_encoder(input, output, config, stream_id, Box::new(encoder))
    }

    /// Creates a relay around a custom encoder.
    ///
    /// Fails if the configured decode window cannot cover the encoder's redundancy window.
    pub fn with_encoder(
        input: I,
        output: O,
        config: &Config,
        stream_id: StreamId,
        encoder: Box<dyn StreamEncoder>,
    ) -> Result<Self> {
        config.validate()?;
        config.validate_against_redundancy(encoder.redundancy_window())?;

        let mut multiplexer = Multiplexer::new();
        multiplexer.add_stream(stream_id, encoder)?;

        Ok(Self {
            input,
            output,
            multiplexer,
            stream_id,
            use_checksums: config.use_checksums,
            polling_interval: config.polling_interval,
            receive_buffer: vec![0; config.max_datagram_size],
            wire_buffer: Vec::with_capacity(config.max_datagram_size),
        })
    }

    /// Encodes everything currently readable from the input and sends the resulting blocks.
    ///
    /// Returns the number of blocks sent.
    pub fn manual_poll(&mut self) -> Result<usize> {
        loop {
            let len = match self.input.receive(&mut self.receive_buffer)? {
                Some(len) => len,
                None => break,
            };
            match self.multiplexer.add_data(self.stream_id, &self.receive_buffer[..len]) {
                Ok(blocks) => trace!(len, blocks, "payload encoded"),
                Err(ErrorKind::Codec(reason)) => warn!(len, %reason, "encoder rejected payload"),
                Err(e) => return Err(e),
            }
            if self.input.is_blocking_mode() {
                break;
            }
        }
        self.send_pending()
    }

    /// Sends every queued block to the output. Returns the number sent.
    pub fn send_pending(&mut self) -> Result<usize> {
        let mut sent = 0;
        while let Some(chunk) = self.multiplexer.next_encoded_block() {
            self.wire_buffer.clear();
            BlockEncoder::encode_into(&mut self.wire_buffer, &chunk, self.use_checksums)?;
            self.output.send(&self.wire_buffer)?;
            sent += 1;
        }
        Ok(sent)
    }

    /// Polls until the input or output fails (blocking call).
    pub fn start_polling(&mut self) -> Result<()> {
        loop {
            if let Err(e) = self.manual_poll() {
                error!("Encode relay stopped: {:?}", e);
                return Err(e);
            }
            pause(self.polling_interval);
        }
    }

    /// Returns the multiplexer, for registering more streams or inspecting the queue.
    pub fn multiplexer(&self) -> &Multiplexer {
        &self.multiplexer
    }

    /// Returns the multiplexer mutably.
    pub fn multiplexer_mut(&mut self) -> &mut Multiplexer {
        &mut self.multiplexer
    }

    /// Returns the input transport.
    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Returns the output transport.
    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }
}

/// Reads wire blocks from `input`, decodes and reorders them, and writes
/// delivered payloads to `output`.
#[derive(Debug)]
pub struct DecodeRelay<I, O> {
    input: I,
    output: O,
    demultiplexer: Demultiplexer,
    stats: DecodeStats,
    polling_interval: Option<Duration>,
    receive_buffer: Vec<u8>,
}

impl<I: Transport, O: Transport> DecodeRelay<I, O> {
    /// Creates a relay that accepts pass-through blocks on `stream_id`.
    pub fn new(input: I, output: O, config: &Config, stream_id: StreamId) -> Result<Self> {
        Self::with_decoder(input, output, config, stream_id, Box::new(PassthroughDecoder::new()))
    }

    /// Creates a relay around a custom decoder.
    pub fn with_decoder(
        input: I,
        output: O,
        config: &Config,
        stream_id: StreamId,
        decoder: Box<dyn StreamDecoder>,
    ) -> Result<Self> {
        config.validate()?;

        let mut demultiplexer = Demultiplexer::new(config)?;
        demultiplexer.add_stream(stream_id, decoder)?;

        Ok(Self {
            input,
            output,
            demultiplexer,
            stats: DecodeStats::new(config.stats_interval),
            polling_interval: config.polling_interval,
            receive_buffer: vec![0; config.max_datagram_size],
        })
    }

    /// Decodes everything currently readable from the input and forwards delivered payloads.
    ///
    /// Blocks for unregistered streams and malformed datagrams are skipped.
    /// Returns the number of payloads forwarded.
    pub fn manual_poll(&mut self) -> Result<usize> {
        let mut forwarded = 0;
        loop {
            let len = match self.input.receive(&mut self.receive_buffer)? {
                Some(len) => len,
                None => break,
            };

            let started = Instant::now();
            let outcome = self.demultiplexer.decode(&self.receive_buffer[..len]);
            self.stats.record_decode(started.elapsed());

            match outcome {
                Ok(buffered) => trace!(len, buffered, "datagram decoded"),
                Err(ErrorKind::UnknownStream(stream_id)) => {
                    debug!(stream_id, "ignoring block for unregistered stream");
                    self.stats.record_ignored();
                }
                Err(e @ (ErrorKind::DecodingError(_) | ErrorKind::Codec(_))) => {
                    warn!(len, error = %e, "dropping malformed datagram");
                    self.stats.record_malformed();
                }
                Err(e) => return Err(e),
            }

            forwarded += self.forward_delivered()?;
            if self.input.is_blocking_mode() {
                break;
            }
        }
        Ok(forwarded)
    }

    /// Delivers everything still pending in the window, for end of input.
    ///
    /// Returns the number of payloads forwarded.
    pub fn finish(&mut self) -> Result<usize> {
        let flushed = self.demultiplexer.flush();
        debug!(flushed, "decode window flushed");
        self.forward_delivered()
    }

    /// Polls until the input or output fails (blocking call).
    pub fn start_polling(&mut self) -> Result<()> {
        loop {
            if let Err(e) = self.manual_poll() {
                error!("Decode relay stopped: {:?}", e);
                return Err(e);
            }
            pause(self.polling_interval);
        }
    }

    /// Returns the decode counters.
    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Returns the demultiplexer, for inspecting the reordering window.
    pub fn demultiplexer(&self) -> &Demultiplexer {
        &self.demultiplexer
    }

    /// Returns the demultiplexer mutably.
    pub fn demultiplexer_mut(&mut self) -> &mut Demultiplexer {
        &mut self.demultiplexer
    }

    /// Returns the input transport.
    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    /// Returns the output transport.
    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    fn forward_delivered(&mut self) -> Result<usize> {
        let mut forwarded = 0;
        while let Some(chunk) = self.demultiplexer.pop() {
            self.output.send(chunk.payload())?;
            self.stats.record_forwarded();
            forwarded += 1;
        }
        Ok(forwarded)
    }
}
