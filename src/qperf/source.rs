//! A uniform handle over single runs, aggregates and plain groups of runs
// (c) 2024 Ross Younger

use std::borrow::Cow;

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use super::{AggregatedConnection, Interception, QperfConnection, Report};
use crate::{error::AggregateError, util::stats::mean};

/// Scalar metrics every source can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum Metric {
    /// Seconds
    TimeToFirstByte,
    /// Seconds
    EstablishmentTime,
    /// bit/s, excluding the synthetic zero report
    MeanRate,
    /// Seconds
    RampUpTimeFromStart,
    /// Seconds
    RampUpTimeFromTtfb,
    /// bit/s
    MeanRateAfterRampUp,
}

/// What the crossing and summary code needs from a source of reports
pub trait ReportSource {
    /// Display name
    fn label(&self) -> &str;
    /// Number of runs behind this source
    fn runs(&self) -> usize;
    /// Value of one scalar metric, `None` if unavailable
    fn scalar(&self, metric: Metric) -> Option<f64>;
    /// Mean cumulative bytes received at `time` (seconds)
    fn total_bytes_at(&self, time: f64) -> f64;
    /// A single connection standing for the whole source
    fn representative(&self) -> Cow<'_, QperfConnection>;

    /// The reports of the representative connection
    fn reports(&self) -> Vec<Report> {
        self.representative().reports().to_vec()
    }
}

impl ReportSource for QperfConnection {
    fn label(&self) -> &str {
        QperfConnection::label(self)
    }

    fn runs(&self) -> usize {
        1
    }

    fn scalar(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::TimeToFirstByte => self.time_to_first_byte(),
            Metric::EstablishmentTime => self.establishment_time(),
            Metric::MeanRate => self.mean_rate(true, 0.),
            Metric::RampUpTimeFromStart => self.ramp_up_time_from_start(),
            Metric::RampUpTimeFromTtfb => self.ramp_up_time_from_ttfb(),
            Metric::MeanRateAfterRampUp => self.mean_rate_after_ramp_up(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn total_bytes_at(&self, time: f64) -> f64 {
        self.total_received_bytes_at(time) as f64
    }

    fn representative(&self) -> Cow<'_, QperfConnection> {
        Cow::Borrowed(self)
    }
}

impl ReportSource for AggregatedConnection {
    fn label(&self) -> &str {
        AggregatedConnection::label(self)
    }

    fn runs(&self) -> usize {
        AggregatedConnection::runs(self)
    }

    fn scalar(&self, metric: Metric) -> Option<f64> {
        mean(self.connections().iter().filter_map(|c| c.scalar(metric)))
    }

    fn total_bytes_at(&self, time: f64) -> f64 {
        AggregatedConnection::total_bytes_at(self, time)
    }

    fn representative(&self) -> Cow<'_, QperfConnection> {
        Cow::Owned(self.to_avg_connection())
    }
}

/// Tagged variant over the shapes of report source
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// One run
    Single(QperfConnection),
    /// Repeated runs, treated as one averaged curve
    Aggregate(AggregatedConnection),
    /// Repeated runs, each kept as its own curve
    Group(AggregatedConnection),
}

impl Source {
    /// A group of individually-treated runs. Fails if `connections` is empty.
    pub fn group(label: &str, connections: Vec<QperfConnection>) -> Result<Self, AggregateError> {
        Ok(Self::Group(AggregatedConnection::new(label, connections)?))
    }

    /// Averaged runs. Fails if `connections` is empty.
    pub fn aggregate(label: &str, connections: Vec<QperfConnection>) -> Result<Self, AggregateError> {
        Ok(Self::Aggregate(AggregatedConnection::new(label, connections)?))
    }

    fn inner(&self) -> &dyn ReportSource {
        match self {
            Source::Single(c) => c,
            Source::Aggregate(a) | Source::Group(a) => a,
        }
    }

    /// The individual curves: one for a single run or an aggregate, one per run for a group
    #[must_use]
    pub fn curves(&self) -> Vec<Cow<'_, QperfConnection>> {
        match self {
            Source::Group(g) => g.connections().iter().map(Cow::Borrowed).collect(),
            _ => vec![self.representative()],
        }
    }

    /// Crossings between the curves of two sources
    #[must_use]
    pub fn interceptions(&self, other: &Source) -> Vec<Interception> {
        let ours = self.curves();
        let theirs = other.curves();
        ours.iter()
            .flat_map(|a| theirs.iter().flat_map(move |b| a.intersections(b)))
            .collect()
    }

    /// Crossings among the curves of this source (a group's runs against each other)
    #[must_use]
    pub fn internal_interceptions(&self) -> Vec<Interception> {
        match self {
            Source::Group(g) => super::all_intersections(g.connections()),
            _ => Vec::new(),
        }
    }

    /// Re-bins the reports of every run
    #[must_use]
    pub fn reduce_steps(&self, n: usize) -> Self {
        match self {
            Source::Single(c) => Source::Single(c.reduce_steps(n, true)),
            Source::Aggregate(a) => Source::Aggregate(a.reduce_steps(n)),
            Source::Group(g) => Source::Group(g.reduce_steps(n)),
        }
    }
}

impl ReportSource for Source {
    fn label(&self) -> &str {
        self.inner().label()
    }

    fn runs(&self) -> usize {
        self.inner().runs()
    }

    fn scalar(&self, metric: Metric) -> Option<f64> {
        self.inner().scalar(metric)
    }

    fn total_bytes_at(&self, time: f64) -> f64 {
        self.inner().total_bytes_at(time)
    }

    fn representative(&self) -> Cow<'_, QperfConnection> {
        self.inner().representative()
    }
}

impl From<QperfConnection> for Source {
    fn from(value: QperfConnection) -> Self {
        Self::Single(value)
    }
}

impl From<AggregatedConnection> for Source {
    fn from(value: AggregatedConnection) -> Self {
        Self::Aggregate(value)
    }
}
