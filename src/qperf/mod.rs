//! qperf periodic report logs: parsing, aggregation across runs, crossing detection
// (c) 2024 Ross Younger

mod aggregate;
mod connection;
mod interception;
mod report;
mod source;

pub use aggregate::{AggregatedConnection, AggregatedReport};
pub use connection::{
    load_all_connections, parse_qperf, read_qperf, reduce_steps, QperfConnection, QperfOptions,
};
pub use interception::{all_intersections, intersections, Interception};
pub use report::{QperfLine, Report};
pub use source::{Metric, ReportSource, Source};
