//! Analysis of qlog traces and qperf reports from QUIC performance-enhancing-proxy experiments
// (c) 2024 Ross Younger
//!
//! Two kinds of log are supported:
//! * [qlog] traces: one endpoint's events for one QUIC connection, from which flow-control,
//!   congestion-control and stream progress series are derived.
//! * [qperf] periodic reports: throughput samples from repeated runs of one scenario, which
//!   are aggregated across runs and compared for crossing points.
//!
//! The [series] combinators build composite metrics from the sparse update streams.

mod cli;
pub use cli::cli;

pub mod config;
pub mod error;
pub mod geometry;
pub mod qlog;
pub mod qperf;
pub mod ranges;
pub mod series;
/// Utilities
pub mod util;
