//! In-memory datagram link with injected loss, duplication and reordering.

use std::io;

use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use fecmux_core::{
    error::{ErrorKind, Result},
    transport::Transport,
};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::trace;

/// Impairments applied to every datagram crossing a [`SimulatedLink`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkConditions {
    /// Probability in `[0, 1]` that a datagram is dropped.
    pub loss_rate: f64,
    /// Probability in `[0, 1]` that a datagram is delivered twice.
    pub duplicate_rate: f64,
    /// Probability in `[0, 1]` that a datagram is held back and sent after the next one.
    pub reorder_rate: f64,
    /// Seed for the impairment generator, so runs are reproducible.
    pub seed: u64,
}

impl Default for LinkConditions {
    fn default() -> Self {
        Self { loss_rate: 0.0, duplicate_rate: 0.0, reorder_rate: 0.0, seed: 0 }
    }
}

impl LinkConditions {
    /// A link that delivers everything once and in order.
    pub fn perfect() -> Self {
        Self::default()
    }

    /// Checks that every rate is a probability.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("loss_rate", self.loss_rate),
            ("duplicate_rate", self.duplicate_rate),
            ("reorder_rate", self.reorder_rate),
        ];
        for (name, rate) in rates {
            if !(0.0..=1.0).contains(&rate) {
                return Err(ErrorKind::InvalidConfig(format!(
                    "{} must be in [0, 1], got {}",
                    name, rate
                )));
            }
        }
        Ok(())
    }
}

/// Counters kept by the sending end of a simulated link.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Datagrams handed to `send`.
    pub sent: usize,
    /// Datagrams dropped.
    pub dropped: usize,
    /// Extra copies injected.
    pub duplicated: usize,
    /// Datagrams delivered after their successor.
    pub reordered: usize,
}

/// Factory for connected pairs of [`SimulatedEndpoint`]s.
#[derive(Debug)]
pub struct SimulatedLink;

impl SimulatedLink {
    /// Creates a connected pair with perfect conditions in both directions.
    pub fn pair() -> (SimulatedEndpoint, SimulatedEndpoint) {
        Self::connect(LinkConditions::perfect())
    }

    /// Creates a connected pair; `conditions` apply to datagrams sent by either end.
    ///
    /// Fails if a rate is outside `[0, 1]` or NaN.
    pub fn pair_with_conditions(
        conditions: LinkConditions,
    ) -> Result<(SimulatedEndpoint, SimulatedEndpoint)> {
        conditions.validate()?;
        Ok(Self::connect(conditions))
    }

    fn connect(conditions: LinkConditions) -> (SimulatedEndpoint, SimulatedEndpoint) {
        let (a_tx, b_rx) = unbounded();
        let (b_tx, a_rx) = unbounded();
        let reverse = LinkConditions { seed: conditions.seed.wrapping_add(1), ..conditions };
        (SimulatedEndpoint::new(a_tx, a_rx, conditions), SimulatedEndpoint::new(b_tx, b_rx, reverse))
    }
}

/// One end of a simulated link, usable wherever a [`Transport`] is expected.
#[derive(Debug)]
pub struct SimulatedEndpoint {
    sender: Sender<Vec<u8>>,
    receiver: Receiver<Vec<u8>>,
    conditions: LinkConditions,
    rng: StdRng,
    held_back: Option<Vec<u8>>,
    stats: LinkStats,
}

impl SimulatedEndpoint {
    fn new(sender: Sender<Vec<u8>>, receiver: Receiver<Vec<u8>>, conditions: LinkConditions) -> Self {
        Self {
            sender,
            receiver,
            rng: StdRng::seed_from_u64(conditions.seed),
            conditions,
            held_back: None,
            stats: LinkStats::default(),
        }
    }

    /// Returns the sending statistics of this end.
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Releases a datagram still held back for reordering.
    pub fn flush(&mut self) -> io::Result<()> {
        if let Some(datagram) = self.held_back.take() {
            self.push(datagram)?;
        }
        Ok(())
    }

    fn roll(&mut self, probability: f64) -> bool {
        self.rng.random_bool(probability)
    }

    fn push(&self, datagram: Vec<u8>) -> io::Result<()> {
        self.sender
            .send(datagram)
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "simulated link closed"))
    }
}

impl Transport for SimulatedEndpoint {
    fn send(&mut self, datagram: &[u8]) -> io::Result<usize> {
        self.stats.sent += 1;

        if self.roll(self.conditions.loss_rate) {
            self.stats.dropped += 1;
            trace!(len = datagram.len(), "simulated loss");
            return Ok(datagram.len());
        }

        let copies = if self.roll(self.conditions.duplicate_rate) {
            self.stats.duplicated += 1;
            2
        } else {
            1
        };

        if self.held_back.is_none() && self.roll(self.conditions.reorder_rate) {
            self.stats.reordered += 1;
            self.held_back = Some(datagram.to_vec());
            for _ in 1..copies {
                self.push(datagram.to_vec())?;
            }
            return Ok(datagram.len());
        }

        for _ in 0..copies {
            self.push(datagram.to_vec())?;
        }
        if let Some(held) = self.held_back.take() {
            self.push(held)?;
        }
        Ok(datagram.len())
    }

    fn receive(&mut self, buffer: &mut [u8]) -> io::Result<Option<usize>> {
        match self.receiver.try_recv() {
            Ok(datagram) => {
                // Truncate like a UDP socket would
                let len = datagram.len().min(buffer.len());
                buffer[..len].copy_from_slice(&datagram[..len]);
                Ok(Some(len))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "simulated link closed"))
            }
        }
    }

    fn is_blocking_mode(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(endpoint: &mut SimulatedEndpoint) -> Vec<Vec<u8>> {
        let mut buffer = [0u8; 64];
        let mut received = Vec::new();
        while let Some(len) = endpoint.receive(&mut buffer).unwrap() {
            received.push(buffer[..len].to_vec());
        }
        received
    }

    #[test]
    fn test_perfect_link_preserves_order() {
        let (mut a, mut b) = SimulatedLink::pair();
        for i in 0..10u8 {
            a.send(&[i]).unwrap();
        }
        let received = drain(&mut b);
        assert_eq!(received, (0..10u8).map(|i| vec![i]).collect::<Vec<_>>());
        assert_eq!(a.stats().sent, 10);
    }

    #[test]
    fn test_both_directions() {
        let (mut a, mut b) = SimulatedLink::pair();
        b.send(b"pong").unwrap();
        a.send(b"ping").unwrap();
        assert_eq!(drain(&mut a), vec![b"pong".to_vec()]);
        assert_eq!(drain(&mut b), vec![b"ping".to_vec()]);
    }

    #[test]
    fn test_full_loss() {
        let conditions = LinkConditions { loss_rate: 1.0, ..LinkConditions::default() };
        let (mut a, mut b) = SimulatedLink::pair_with_conditions(conditions).unwrap();
        for _ in 0..5 {
            a.send(b"gone").unwrap();
        }
        assert!(drain(&mut b).is_empty());
        assert_eq!(a.stats().dropped, 5);
    }

    #[test]
    fn test_full_duplication() {
        let conditions = LinkConditions { duplicate_rate: 1.0, ..LinkConditions::default() };
        let (mut a, mut b) = SimulatedLink::pair_with_conditions(conditions).unwrap();
        a.send(b"twice").unwrap();
        assert_eq!(drain(&mut b).len(), 2);
    }

    #[test]
    fn test_reorder_swaps_neighbours() {
        let conditions = LinkConditions { reorder_rate: 1.0, ..LinkConditions::default() };
        let (mut a, mut b) = SimulatedLink::pair_with_conditions(conditions).unwrap();
        a.send(&[1]).unwrap();
        a.send(&[2]).unwrap();
        assert_eq!(drain(&mut b), vec![vec![2], vec![1]]);
    }

    #[test]
    fn test_flush_releases_held_back() {
        let conditions = LinkConditions { reorder_rate: 1.0, ..LinkConditions::default() };
        let (mut a, mut b) = SimulatedLink::pair_with_conditions(conditions).unwrap();
        a.send(&[7]).unwrap();
        assert!(drain(&mut b).is_empty());
        a.flush().unwrap();
        assert_eq!(drain(&mut b), vec![vec![7]]);
    }

    #[test]
    fn test_same_seed_same_pattern() {
        let conditions = LinkConditions { loss_rate: 0.5, seed: 42, ..LinkConditions::default() };
        let run = || {
            let (mut a, mut b) = SimulatedLink::pair_with_conditions(conditions).unwrap();
            for i in 0..32u8 {
                a.send(&[i]).unwrap();
            }
            drain(&mut b)
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_invalid_rates_rejected() {
        for rate in [f64::NAN, -0.1, 1.5] {
            let conditions = LinkConditions { loss_rate: rate, ..LinkConditions::default() };
            assert!(matches!(
                SimulatedLink::pair_with_conditions(conditions),
                Err(ErrorKind::InvalidConfig(_))
            ));
        }
        let conditions = LinkConditions { reorder_rate: f64::NAN, ..LinkConditions::default() };
        assert!(conditions.validate().is_err());
    }

    #[test]
    fn test_closed_link() {
        let (mut a, b) = SimulatedLink::pair();
        drop(b);
        assert_eq!(a.send(b"x").unwrap_err().kind(), io::ErrorKind::BrokenPipe);
    }
}
