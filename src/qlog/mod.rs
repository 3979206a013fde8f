//! qlog trace model
// (c) 2024 Ross Younger
//!
//! A qlog trace is newline-delimited JSON: one metadata line followed by one event per line.
//! [`parse_qlog`] reads a whole trace into a [`QlogConnection`]; the packet and frame types
//! here are borrowed views over its events, built on demand.

mod connection;
pub use connection::{parse_qlog, read_qlog, QlogConnection, QlogOptions};

mod event;
pub use event::{names, Event, MetricsUpdated, XseRecord};

mod frame;
pub use frame::{frame_types, AckFrame, Frame, MaxDataFrame, MaxStreamDataFrame, StreamFrame};

mod packet;
pub use packet::Packet;

pub mod metrics;
