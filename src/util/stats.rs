//! Rates and simple statistics
// (c) 2024 Ross Younger

use human_repr::HumanThroughput;
use std::{fmt::Display, time::Duration};

/// Human friendly output helper
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataRate {
    /// Bytes per second; if None, we were unable to compute a rate.
    rate: Option<f64>,
}

impl DataRate {
    /// Computes a rate from a byte count over a time span
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(bytes: u64, time: Option<Duration>) -> Self {
        match time {
            None => Self { rate: None },
            Some(time) if time.is_zero() => Self { rate: None }, // divide by zero is not meaningful
            Some(time) => Self {
                rate: Some((bytes as f64) / time.as_secs_f64()),
            },
        }
    }

    /// Computes a rate from a byte count over a span of milliseconds, as found in qlog traces.
    ///
    /// Negative or non-finite spans yield an unknown rate.
    #[must_use]
    pub fn over_millis(bytes: u64, span_ms: f64) -> Self {
        Self::new(bytes, Duration::try_from_secs_f64(span_ms / 1000.).ok())
    }

    /// Wraps an already-computed bit rate (qperf reports rates in bit/s)
    #[must_use]
    pub fn from_bits_per_second(bits: f64) -> Self {
        Self {
            rate: bits.is_finite().then_some(bits / 8.),
        }
    }

    /// Bytes per second
    #[must_use]
    pub fn byte_rate(&self) -> Option<f64> {
        self.rate
    }

    /// Bits per second
    #[must_use]
    pub fn bit_rate(&self) -> Option<f64> {
        self.rate.map(|r| r * 8.)
    }
}

impl Display for DataRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.bit_rate() {
            None => f.write_str("unknown"),
            Some(rate) => rate.human_throughput("bit").fmt(f),
        }
    }
}

/// Arithmetic mean. `None` for an empty input.
#[allow(clippy::cast_precision_loss)]
pub fn mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let (sum, n) = values
        .into_iter()
        .fold((0., 0_usize), |(sum, n), v| (sum + v, n + 1));
    (n > 0).then(|| sum / n as f64)
}
