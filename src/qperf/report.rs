//! qperf report records and line classification
// (c) 2024 Ross Younger

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::error::ParseError;

/// One throughput sample
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Report {
    /// Seconds since the start of the run
    pub time: f64,
    /// Instantaneous download rate, bit/s
    pub download_rate: f64,
    /// Bytes received since the previous report (not cumulative)
    pub bytes_received: u64,
    /// Packets received since the previous report
    pub packets_received: u64,
}

impl Report {
    /// Constructor
    #[must_use]
    pub fn new(time: f64, download_rate: f64, bytes_received: u64, packets_received: u64) -> Self {
        Self {
            time,
            download_rate,
            bytes_received,
            packets_received,
        }
    }

    /// An all-zero report at the given time
    #[must_use]
    pub fn zero(time: f64) -> Self {
        Self {
            time,
            ..Self::default()
        }
    }
}

lazy_static! {
    static ref REPORT: Regex = Regex::new(
        r"^[^\d\.]*(?P<time>\d+\.?\d*)[^\d\.]+(?P<rate>\d+\.?\d*)[^\d\.]+(?P<bytes>\d+)[^\d\.]+(?P<packets>\d+)$"
    )
    .expect("static regex pattern should always compile");
    static ref TIME_TO_FIRST_BYTE: Regex =
        Regex::new(r"^[^\d\.]*time to first byte[^\d\.]*(?P<time>\d+\.?\d*)[^\d\.]*s$")
            .expect("static regex pattern should always compile");
    static ref ESTABLISHMENT_TIME: Regex = Regex::new(
        r"^[^\d\.]*connection establishment time[^\d\.]*(?P<time>\d+\.?\d*)[^\d\.]*s$"
    )
    .expect("static regex pattern should always compile");
    static ref INTERNAL_ERROR: Regex =
        Regex::new(r"^.*INTERNAL_ERROR: (?P<text>.*)$").expect("static regex pattern should always compile");
}

/// What a single line of qperf output says
#[derive(Debug, Clone, PartialEq)]
pub enum QperfLine {
    /// A periodic report. Its `time` is still relative to the first byte.
    PeriodicReport(Report),
    /// Time to first byte, seconds
    Ttfb(f64),
    /// Connection establishment time, seconds
    Establishment(f64),
    /// The probe hit an internal error
    InternalError(String),
    /// Anything else
    Unrecognized,
}

fn number<T: std::str::FromStr>(caps: &Captures<'_>, name: &str, line: usize) -> Result<T, ParseError> {
    let text = caps.name(name).map_or("", |m| m.as_str());
    text.parse().map_err(|_| ParseError::Number {
        line,
        value: text.to_owned(),
    })
}

impl QperfLine {
    /// Classifies one line of output.
    ///
    /// `line_number` is only used for error reporting. A line that matches a known shape but
    /// carries an unparseable number (e.g. a byte count overflowing u64) is an error.
    pub fn parse(line: &str, line_number: usize) -> Result<Self, ParseError> {
        let line = line.trim_end();
        if let Some(caps) = REPORT.captures(line) {
            return Ok(Self::PeriodicReport(Report::new(
                number(&caps, "time", line_number)?,
                number(&caps, "rate", line_number)?,
                number(&caps, "bytes", line_number)?,
                number(&caps, "packets", line_number)?,
            )));
        }
        if let Some(caps) = ESTABLISHMENT_TIME.captures(line) {
            return Ok(Self::Establishment(number(&caps, "time", line_number)?));
        }
        if let Some(caps) = TIME_TO_FIRST_BYTE.captures(line) {
            return Ok(Self::Ttfb(number(&caps, "time", line_number)?));
        }
        if let Some(caps) = INTERNAL_ERROR.captures(line) {
            return Ok(Self::InternalError(
                caps.name("text").map_or("", |m| m.as_str()).to_owned(),
            ));
        }
        Ok(Self::Unrecognized)
    }
}
