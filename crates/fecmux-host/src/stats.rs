use std::{
    fmt::{self, Debug, Display},
    time::Duration,
};

use tracing::info;

/// Running counters for a decode relay.
///
/// Decode durations are averaged over fixed windows of `interval` datagrams;
/// each completed window is logged at info level.
#[derive(Clone, Default)]
pub struct DecodeStats {
    interval: u32,
    window_datagrams: u32,
    window_elapsed: Duration,
    last_average: Option<Duration>,
    datagrams: u64,
    forwarded: u64,
    ignored: u64,
    malformed: u64,
}

impl DecodeStats {
    /// Creates counters that report every `interval` datagrams. Zero disables reporting.
    pub fn new(interval: u32) -> DecodeStats {
        DecodeStats { interval, ..DecodeStats::default() }
    }

    /// Records the time spent decoding one datagram. Returns true if a window completed.
    pub fn record_decode(&mut self, elapsed: Duration) -> bool {
        self.datagrams += 1;
        self.window_datagrams += 1;
        self.window_elapsed += elapsed;

        if self.interval == 0 || self.window_datagrams < self.interval {
            return false;
        }

        let average = self.window_elapsed / self.window_datagrams;
        info!(
            datagrams = self.window_datagrams,
            average_us = average.as_micros() as u64,
            "average decode time"
        );
        self.last_average = Some(average);
        self.window_datagrams = 0;
        self.window_elapsed = Duration::ZERO;
        true
    }

    /// Counts a payload written to the output.
    pub fn record_forwarded(&mut self) {
        self.forwarded += 1;
    }

    /// Counts a block for a stream with no decoder.
    pub fn record_ignored(&mut self) {
        self.ignored += 1;
    }

    /// Counts a datagram that failed to parse or decode.
    pub fn record_malformed(&mut self) {
        self.malformed += 1;
    }

    /// Average decode time of the most recent completed window.
    pub fn last_average(&self) -> Option<Duration> {
        self.last_average
    }

    /// Datagrams decoded so far.
    pub fn datagrams(&self) -> u64 {
        self.datagrams
    }

    /// Payloads forwarded so far.
    pub fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Blocks ignored for unknown streams.
    pub fn ignored(&self) -> u64 {
        self.ignored
    }

    /// Datagrams rejected as malformed.
    pub fn malformed(&self) -> u64 {
        self.malformed
    }
}

impl Debug for DecodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "Datagrams: {}, Forwarded: {}, Ignored: {}, Malformed: {}, Average Decode: {:#?}",
            self.datagrams, self.forwarded, self.ignored, self.malformed, self.last_average
        )
    }
}

impl Display for DecodeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "Datagrams: {}, Forwarded: {}, Ignored: {}, Malformed: {}",
            self.datagrams, self.forwarded, self.ignored, self.malformed
        )?;
        if let Some(average) = self.last_average {
            write!(f, ", Average Decode: {}us", average.as_micros())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_average() {
        let mut stats = DecodeStats::new(4);
        assert!(!stats.record_decode(Duration::from_micros(10)));
        assert!(!stats.record_decode(Duration::from_micros(20)));
        assert!(!stats.record_decode(Duration::from_micros(30)));
        assert!(stats.record_decode(Duration::from_micros(40)));
        assert_eq!(stats.last_average(), Some(Duration::from_micros(25)));

        // next window starts from zero
        assert!(!stats.record_decode(Duration::from_micros(100)));
        assert_eq!(stats.last_average(), Some(Duration::from_micros(25)));
        assert_eq!(stats.datagrams(), 5);
    }

    #[test]
    fn test_zero_interval_never_reports() {
        let mut stats = DecodeStats::new(0);
        for _ in 0..100 {
            assert!(!stats.record_decode(Duration::from_micros(1)));
        }
        assert_eq!(stats.last_average(), None);
    }

    #[test]
    fn test_counters_and_display() {
        let mut stats = DecodeStats::new(10);
        stats.record_forwarded();
        stats.record_forwarded();
        stats.record_ignored();
        stats.record_malformed();
        assert_eq!((stats.forwarded(), stats.ignored(), stats.malformed()), (2, 1, 1));
        assert_eq!(stats.to_string(), "Datagrams: 0, Forwarded: 2, Ignored: 1, Malformed: 1");
    }
}
