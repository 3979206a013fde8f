//! Combining repeated runs of one experiment
// (c) 2024 Ross Younger

use tracing::warn;

use super::{Interception, QperfConnection, Report};
use crate::{error::AggregateError, util::stats::mean};

/// The reports of several runs at one aligned index
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedReport {
    reports: Vec<Report>,
}

#[allow(clippy::cast_precision_loss)]
fn mean_u64(values: impl Iterator<Item = u64>) -> f64 {
    mean(values.map(|v| v as f64)).unwrap_or_default()
}

impl AggregatedReport {
    /// Wraps a non-empty set of parallel reports
    pub fn new(reports: Vec<Report>) -> Result<Self, AggregateError> {
        if reports.is_empty() {
            return Err(AggregateError::EmptyGroup);
        }
        Ok(Self { reports })
    }

    /// The underlying reports
    #[must_use]
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// Number of runs contributing
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    /// Always false; an aggregate is never empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Mean time (seconds)
    #[must_use]
    pub fn time(&self) -> f64 {
        mean(self.reports.iter().map(|r| r.time)).unwrap_or_default()
    }

    /// The whole second every report rounds to
    #[allow(clippy::cast_possible_truncation)]
    pub fn whole_second(&self) -> Result<i64, AggregateError> {
        let mut times = self.reports.iter().map(|r| r.time.round() as i64);
        let expected = times.next().ok_or(AggregateError::EmptyGroup)?;
        match times.find(|&t| t != expected) {
            Some(found) => Err(AggregateError::TimeMismatch { expected, found }),
            None => Ok(expected),
        }
    }

    /// bit/s
    #[must_use]
    pub fn mean_download_rate(&self) -> f64 {
        mean(self.reports.iter().map(|r| r.download_rate)).unwrap_or_default()
    }

    /// Mean bytes received
    #[must_use]
    pub fn mean_bytes_received(&self) -> f64 {
        mean_u64(self.reports.iter().map(|r| r.bytes_received))
    }

    /// Total bytes received
    #[must_use]
    pub fn sum_bytes_received(&self) -> u64 {
        self.reports.iter().map(|r| r.bytes_received).sum()
    }

    /// Mean packets received
    #[must_use]
    pub fn mean_packets_received(&self) -> f64 {
        mean_u64(self.reports.iter().map(|r| r.packets_received))
    }

    /// Total packets received
    #[must_use]
    pub fn sum_packets_received(&self) -> u64 {
        self.reports.iter().map(|r| r.packets_received).sum()
    }

    /// One report of per-run means. Counts are rounded to the nearest whole number.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_avg_report(&self) -> Report {
        Report::new(
            self.time(),
            self.mean_download_rate(),
            self.mean_bytes_received().round() as u64,
            self.mean_packets_received().round() as u64,
        )
    }

    /// One report covering a window of consecutive reports: the last time, the mean rate,
    /// and summed counts.
    #[must_use]
    pub fn to_sum_report(&self) -> Report {
        Report::new(
            self.reports.last().map_or(0., |r| r.time),
            self.mean_download_rate(),
            self.sum_bytes_received(),
            self.sum_packets_received(),
        )
    }
}

/// Repeated runs believed to measure the same scenario
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedConnection {
    label: String,
    connections: Vec<QperfConnection>,
}

impl AggregatedConnection {
    /// Groups a non-empty set of runs
    pub fn new(label: &str, connections: Vec<QperfConnection>) -> Result<Self, AggregateError> {
        if connections.is_empty() {
            return Err(AggregateError::EmptyGroup);
        }
        Ok(Self {
            label: label.to_owned(),
            connections,
        })
    }

    /// Names the group (typically the directory the runs were loaded from)
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The member runs
    #[must_use]
    pub fn connections(&self) -> &[QperfConnection] {
        &self.connections
    }

    /// Number of runs
    #[must_use]
    pub fn runs(&self) -> usize {
        self.connections.len()
    }

    /// Number of runs that hit an internal error
    #[must_use]
    pub fn internal_error_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|c| c.internal_error().is_some())
            .count()
    }

    fn mean_of<F: Fn(&QperfConnection) -> Option<f64>>(&self, f: F) -> Option<f64> {
        mean(self.connections.iter().filter_map(f))
    }

    /// Mean time to first byte (seconds) of the runs that have one
    #[must_use]
    pub fn time_to_first_byte(&self) -> Option<f64> {
        self.mean_of(QperfConnection::time_to_first_byte)
    }

    /// Mean establishment time (seconds) of the runs that have one
    #[must_use]
    pub fn establishment_time(&self) -> Option<f64> {
        self.mean_of(QperfConnection::establishment_time)
    }

    /// Mean cumulative bytes received at `time` (seconds)
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_bytes_at(&self, time: f64) -> f64 {
        self.mean_of(|c| Some(c.total_received_bytes_at(time) as f64))
            .unwrap_or_default()
    }

    /// Mean of the runs' mean rates (bit/s)
    #[must_use]
    pub fn mean_rate(&self, exclude_zero_report: bool, start_time: f64) -> Option<f64> {
        self.mean_of(|c| c.mean_rate(exclude_zero_report, start_time))
    }

    /// Mean ramp-up time from start (seconds); coarse, see [`QperfConnection::ramp_up_time_from_start`]
    #[must_use]
    pub fn ramp_up_time_from_start(&self) -> Option<f64> {
        self.mean_of(QperfConnection::ramp_up_time_from_start)
    }

    /// Mean ramp-up time from first byte (seconds)
    #[must_use]
    pub fn ramp_up_time_from_ttfb(&self) -> Option<f64> {
        self.mean_of(QperfConnection::ramp_up_time_from_ttfb)
    }

    /// Mean of the runs' post-ramp-up rates (bit/s)
    #[must_use]
    pub fn mean_rate_after_ramp_up(&self) -> Option<f64> {
        self.mean_of(QperfConnection::mean_rate_after_ramp_up)
    }

    /// Per-index aggregates, out to the longest run.
    ///
    /// A run with no report at some index is left out of that index, with a warning.
    pub fn reports(&self) -> impl Iterator<Item = AggregatedReport> + '_ {
        let longest = self
            .connections
            .iter()
            .map(|c| c.reports().len())
            .max()
            .unwrap_or(0);
        (0..longest).filter_map(move |index| {
            let reports = self
                .connections
                .iter()
                .filter_map(|c| {
                    let r = c.reports().get(index).copied();
                    if r.is_none() {
                        warn!("{}: {}: no report at index {index}", self.label, c.label());
                    }
                    r
                })
                .collect();
            AggregatedReport::new(reports).ok()
        })
    }

    /// A synthetic run whose reports are the per-index means.
    ///
    /// Per-run identity is lost; use it where a single curve is needed.
    #[must_use]
    pub fn to_avg_connection(&self) -> QperfConnection {
        QperfConnection::with_summary(
            &self.label,
            self.time_to_first_byte(),
            self.establishment_time(),
            self.reports().map(|r| r.to_avg_report()).collect(),
        )
    }

    /// Crossings between the averaged curves of two aggregates
    #[must_use]
    pub fn interceptions(&self, other: &AggregatedConnection) -> Vec<Interception> {
        self.to_avg_connection()
            .intersections(&other.to_avg_connection())
    }

    /// Re-bins every run, keeping each run's first report
    #[must_use]
    pub fn reduce_steps(&self, n: usize) -> Self {
        Self {
            label: self.label.clone(),
            connections: super::reduce_steps(&self.connections, n),
        }
    }
}

#[cfg(test)]
mod test {
    use assertables::assert_in_delta;

    use super::{AggregatedConnection, AggregatedReport};
    use crate::{
        error::AggregateError,
        qperf::{QperfConnection, Report},
    };

    fn run(label: &str, bytes: u64) -> QperfConnection {
        QperfConnection::from_reports(
            label,
            Some(0.),
            vec![Report::zero(0.), Report::new(1., 8000., bytes, 5)],
        )
    }

    #[test]
    fn mean_and_sum_at_index() {
        let agg = AggregatedConnection::new(
            "three",
            vec![run("a", 100), run("b", 200), run("c", 300)],
        )
        .unwrap();
        let reports: Vec<_> = agg.reports().collect();
        assert_eq!(reports.len(), 2);
        assert_in_delta!(reports[1].mean_bytes_received(), 200., 1e-9);
        assert_eq!(reports[1].sum_bytes_received(), 600);
        assert_eq!(reports[1].sum_packets_received(), 15);
        assert_in_delta!(reports[1].mean_packets_received(), 5., 1e-9);
        assert_eq!(reports[1].whole_second(), Ok(1));
        assert_eq!(agg.runs(), 3);
    }

    #[test]
    fn empty() {
        assert_eq!(
            AggregatedConnection::new("none", vec![]).unwrap_err(),
            AggregateError::EmptyGroup
        );
        assert_eq!(
            AggregatedReport::new(vec![]).unwrap_err(),
            AggregateError::EmptyGroup
        );
    }

    #[test]
    fn short_run_is_skipped() {
        let short = QperfConnection::from_reports("short", Some(0.), vec![Report::zero(0.)]);
        let agg = AggregatedConnection::new("mixed", vec![run("a", 100), short, run("b", 300)])
            .unwrap();
        let reports: Vec<_> = agg.reports().collect();
        assert_eq!(reports[0].len(), 3);
        assert_eq!(reports[1].len(), 2);
        assert_in_delta!(reports[1].mean_bytes_received(), 200., 1e-9);

        // the longest run decides the length, whichever position it is in
        let short = QperfConnection::from_reports("short", Some(0.), vec![Report::zero(0.)]);
        let agg = AggregatedConnection::new("mixed", vec![short, run("a", 100)]).unwrap();
        assert_eq!(agg.reports().count(), 2);
    }

    #[test]
    fn time_mismatch() {
        let r = AggregatedReport::new(vec![Report::zero(1.2), Report::zero(1.4), Report::zero(2.6)])
            .unwrap();
        assert_eq!(
            r.whole_second(),
            Err(AggregateError::TimeMismatch {
                expected: 1,
                found: 3
            })
        );
        assert_in_delta!(r.time(), 1.7333, 1e-3);
    }

    #[test]
    fn avg_and_sum_reports() {
        let r = AggregatedReport::new(vec![
            Report::new(1., 1000., 10, 1),
            Report::new(2., 3000., 21, 2),
        ])
        .unwrap();
        let avg = r.to_avg_report();
        assert_in_delta!(avg.time, 1.5, 1e-9);
        assert_in_delta!(avg.download_rate, 2000., 1e-9);
        assert_eq!(avg.bytes_received, 16); // 15.5 rounds up
        assert_eq!(avg.packets_received, 2); // 1.5 rounds up

        let sum = r.to_sum_report();
        assert_eq!(sum, Report::new(2., 2000., 31, 3));
    }

    #[test]
    fn scalars_and_avg_connection() {
        let a = QperfConnection::from_reports("a", Some(0.4), run("a", 100).reports().to_vec());
        let b = QperfConnection::from_reports("b", Some(0.6), run("b", 300).reports().to_vec());
        let agg = AggregatedConnection::new("g", vec![a, b]).unwrap();
        assert_in_delta!(agg.time_to_first_byte().unwrap(), 0.5, 1e-9);
        assert_eq!(agg.establishment_time(), None);
        assert_in_delta!(agg.total_bytes_at(1.), 200., 1e-9);
        assert_in_delta!(agg.total_bytes_at(0.5), 0., 1e-9);
        assert_eq!(agg.mean_rate(true, 0.), Some(8000.));
        assert_eq!(agg.internal_error_count(), 0);

        let avg = agg.to_avg_connection();
        assert_eq!(avg.label(), "g");
        assert_eq!(avg.reports(), &[Report::zero(0.), Report::new(1., 8000., 200, 5)]);
        assert_eq!(avg.time_to_received_bytes(200), Some(1.));

        let reduced = agg.reduce_steps(10);
        assert_eq!(reduced.runs(), 2);
        assert_eq!(reduced.connections()[0].reports().len(), 2);
    }
}
