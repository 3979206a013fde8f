//! One qperf run
// (c) 2024 Ross Younger

use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    time::Instant,
};

use human_repr::HumanDuration as _;
use tracing::{debug, trace, warn};

use super::{
    aggregate::AggregatedReport,
    interception::{self, Interception},
    QperfLine, Report,
};
use crate::{error::ParseError, series::Sample, util::stats::mean};

/// Parse-time options for qperf output
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QperfOptions {
    /// Reports later than this (seconds, absolute) are dropped
    pub max_s: f64,
    /// Insert an all-zero report at the time to first byte
    pub add_zero_report: bool,
}

impl Default for QperfOptions {
    fn default() -> Self {
        Self {
            max_s: f64::INFINITY,
            add_zero_report: true,
        }
    }
}

/// The reports of one qperf run, with its summary values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QperfConnection {
    label: String,
    establishment_time: Option<f64>,
    time_to_first_byte: Option<f64>,
    reports: Vec<Report>,
    internal_error: Option<String>,
}

/// Reads one qperf output file. The connection is labelled with the file name.
pub fn read_qperf<P: AsRef<Path>>(path: P, options: QperfOptions) -> Result<QperfConnection, ParseError> {
    let path = path.as_ref();
    let start = Instant::now();
    let file = File::open(path).map_err(|source| ParseError::Io {
        path: path.to_owned(),
        source,
    })?;
    let label = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let conn = parse_qperf(&label, BufReader::new(file), options)?;
    debug!(
        "loaded {} ({} reports) in {}",
        path.display(),
        conn.reports.len(),
        start.elapsed().human_duration()
    );
    Ok(conn)
}

/// Parses qperf output.
///
/// Line order does not matter: report times are relative to the first byte and are
/// resolved once the whole input has been read. Report lines without any
/// time-to-first-byte line are an error. If there are several time-to-first-byte
/// lines, the last one wins and every report is anchored to it.
pub fn parse_qperf<R: BufRead>(
    label: &str,
    reader: R,
    options: QperfOptions,
) -> Result<QperfConnection, ParseError> {
    let mut relative = Vec::new();
    let mut conn = QperfConnection {
        label: label.to_owned(),
        ..QperfConnection::default()
    };
    for (n, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ParseError::Read { line: n + 1, source })?;
        match QperfLine::parse(&line, n + 1)? {
            QperfLine::PeriodicReport(r) => relative.push(r),
            QperfLine::Ttfb(t) => {
                if let Some(previous) = conn.time_to_first_byte.replace(t) {
                    warn!("{label}:{}: time to first byte {t}s replaces {previous}s", n + 1);
                }
            }
            QperfLine::Establishment(t) => conn.establishment_time = Some(t),
            QperfLine::InternalError(text) => conn.internal_error = Some(text),
            QperfLine::Unrecognized => trace!("{label}:{}: ignored", n + 1),
        }
    }

    let Some(ttfb) = conn.time_to_first_byte else {
        if relative.is_empty() {
            return Ok(conn);
        }
        return Err(ParseError::MissingTimeToFirstByte(relative.len()));
    };
    if options.add_zero_report {
        conn.reports.push(Report::zero(ttfb));
    }
    conn.reports.extend(
        relative
            .into_iter()
            .map(|r| Report {
                time: r.time + ttfb,
                ..r
            })
            .filter(|r| r.time <= options.max_s),
    );
    Ok(conn)
}

impl QperfConnection {
    /// Builds a connection directly from absolute-time reports
    #[must_use]
    pub fn from_reports(label: &str, time_to_first_byte: Option<f64>, reports: Vec<Report>) -> Self {
        Self {
            label: label.to_owned(),
            time_to_first_byte,
            reports,
            ..Self::default()
        }
    }

    pub(crate) fn with_summary(
        label: &str,
        time_to_first_byte: Option<f64>,
        establishment_time: Option<f64>,
        reports: Vec<Report>,
    ) -> Self {
        Self {
            label: label.to_owned(),
            establishment_time,
            time_to_first_byte,
            reports,
            internal_error: None,
        }
    }

    /// Identifies the run (the file name when read from disk)
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Reports in time order
    #[must_use]
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// Seconds
    #[must_use]
    pub fn time_to_first_byte(&self) -> Option<f64> {
        self.time_to_first_byte
    }

    /// Seconds
    #[must_use]
    pub fn establishment_time(&self) -> Option<f64> {
        self.establishment_time
    }

    /// Set if the probe reported an internal error
    #[must_use]
    pub fn internal_error(&self) -> Option<&str> {
        self.internal_error.as_deref()
    }

    /// Mean download rate (bit/s) of the reports at or after `start_time` (seconds).
    ///
    /// With `exclude_zero_report`, a first report carrying no bytes is left out.
    /// `None` if no report qualifies.
    #[must_use]
    pub fn mean_rate(&self, exclude_zero_report: bool, start_time: f64) -> Option<f64> {
        mean(
            self.reports
                .iter()
                .enumerate()
                .filter(|(i, r)| *i != 0 || !exclude_zero_report || r.bytes_received != 0)
                .map(|(_, r)| r)
                .filter(|r| r.time >= start_time)
                .map(|r| r.download_rate),
        )
    }

    /// Time (seconds) of the report just before the rate first drops.
    ///
    /// This is a coarse heuristic: one noisy sample ends the ramp-up.
    #[must_use]
    pub fn ramp_up_time_from_start(&self) -> Option<f64> {
        let ttfb = self.time_to_first_byte?;
        let (first, rest) = self.reports.split_first()?;
        let mut max = first;
        for r in rest {
            if r.time < ttfb {
                continue;
            }
            if r.download_rate < max.download_rate {
                return Some(max.time);
            }
            max = r;
        }
        None
    }

    /// Ramp-up time measured from the first byte (seconds)
    #[must_use]
    pub fn ramp_up_time_from_ttfb(&self) -> Option<f64> {
        Some(self.ramp_up_time_from_start()? - self.time_to_first_byte?)
    }

    /// Mean rate (bit/s) from the end of ramp-up
    #[must_use]
    pub fn mean_rate_after_ramp_up(&self) -> Option<f64> {
        self.mean_rate(true, self.ramp_up_time_from_start()?)
    }

    /// Time of the last report (seconds)
    #[must_use]
    pub fn max_time(&self) -> Option<f64> {
        self.reports.last().map(|r| r.time)
    }

    /// Reports with `start <= time < end`
    pub fn reports_in_interval(&self, start: f64, end: f64) -> impl Iterator<Item = &Report> + '_ {
        self.reports
            .iter()
            .take_while(move |r| r.time < end)
            .filter(move |r| r.time >= start)
    }

    /// Cumulative bytes received up to and including `time` (seconds)
    #[must_use]
    pub fn total_received_bytes_at(&self, time: f64) -> u64 {
        self.reports
            .iter()
            .take_while(|r| r.time <= time)
            .map(|r| r.bytes_received)
            .sum()
    }

    /// Time (seconds) of the first report by which `bytes` had been received in total
    #[must_use]
    pub fn time_to_received_bytes(&self, bytes: u64) -> Option<f64> {
        self.cumulative_bytes()
            .find(|&(_, total)| total >= bytes)
            .map(|(t, _)| t)
    }

    /// `(time, cumulative bytes received)` after each report
    pub fn cumulative_bytes(&self) -> impl Iterator<Item = Sample<u64>> + '_ {
        self.reports.iter().scan(0_u64, |total, r| {
            *total += r.bytes_received;
            Some((r.time, *total))
        })
    }

    /// Every crossing of the cumulative bytes curves of `self` and `other`
    #[must_use]
    pub fn intersections(&self, other: &QperfConnection) -> Vec<Interception> {
        interception::intersections(self, other)
    }

    /// Re-bins into windows of `n` reports.
    ///
    /// Each new report has the window's last time, mean rate and summed bytes and packets.
    /// With `keep_zero` the first report is carried over on its own.
    #[must_use]
    pub fn reduce_steps(&self, n: usize, keep_zero: bool) -> Self {
        let n = n.max(1);
        let (head, rest) = match self.reports.split_first() {
            Some((first, rest)) if keep_zero => (Some(*first), rest),
            _ => (None, self.reports.as_slice()),
        };
        let reports = head
            .into_iter()
            .chain(
                rest.chunks(n)
                    .filter_map(|c| AggregatedReport::new(c.to_vec()).ok())
                    .map(|a| a.to_sum_report()),
            )
            .collect();
        Self {
            reports,
            ..self.clone()
        }
    }
}

/// Loads every file with the given extension in `dir`, in name order
pub fn load_all_connections<P: AsRef<Path>>(
    dir: P,
    extension: &str,
    options: QperfOptions,
) -> Result<Vec<QperfConnection>, ParseError> {
    let dir = dir.as_ref();
    let pattern = format!(
        "{}/*.{}",
        glob::Pattern::escape(&dir.to_string_lossy()),
        glob::Pattern::escape(extension.trim_start_matches('.'))
    );
    let mut result = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry.map_err(|e| ParseError::Io {
            path: e.path().to_owned(),
            source: e.into_error(),
        })?;
        if path.is_file() {
            result.push(read_qperf(&path, options)?);
        }
    }
    debug!("{}: {} runs", dir.display(), result.len());
    Ok(result)
}

/// [`QperfConnection::reduce_steps`] over a list, keeping the first report of each
#[must_use]
pub fn reduce_steps(connections: &[QperfConnection], n: usize) -> Vec<QperfConnection> {
    connections.iter().map(|c| c.reduce_steps(n, true)).collect()
}
