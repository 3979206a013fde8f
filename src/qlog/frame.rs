//! Views over the frames carried by a packet event
// (c) 2024 Ross Younger

use serde_json::{Map, Value};

use super::{event::get_u64, Packet};
use crate::ranges::RangeSet;

/// Frame type names understood by this crate
pub mod frame_types {
    /// STREAM
    pub const STREAM: &str = "stream";
    /// ACK
    pub const ACK: &str = "ack";
    /// `MAX_STREAM_DATA`
    pub const MAX_STREAM_DATA: &str = "max_stream_data";
    /// `MAX_DATA`
    pub const MAX_DATA: &str = "max_data";
}

/// One entry of a packet's `frames` list.
///
/// A frame has no time of its own; it shares its packet's.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    inner: &'a Map<String, Value>,
    packet: Packet<'a>,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(inner: &'a Map<String, Value>, packet: Packet<'a>) -> Self {
        Self { inner, packet }
    }

    /// The `frame_type` field
    #[must_use]
    pub fn frame_type(&self) -> Option<&'a str> {
        self.inner.get("frame_type").and_then(Value::as_str)
    }

    /// Is this frame of the given type?
    #[must_use]
    pub fn is(&self, frame_type: &str) -> bool {
        self.frame_type() == Some(frame_type)
    }

    /// Time of the owning packet (ms)
    #[must_use]
    pub fn time(&self) -> f64 {
        self.packet.time()
    }

    /// The owning packet
    #[must_use]
    pub fn packet(&self) -> Packet<'a> {
        self.packet
    }

    /// The raw frame mapping
    #[must_use]
    pub fn raw(&self) -> &'a Map<String, Value> {
        self.inner
    }

    fn field(&self, key: &str) -> Option<u64> {
        get_u64(self.inner, key)
    }

    /// Projects as a STREAM frame
    #[must_use]
    pub fn as_stream(&self) -> Option<StreamFrame<'a>> {
        if !self.is(frame_types::STREAM) {
            return None;
        }
        Some(StreamFrame {
            frame: *self,
            stream_id: self.field("stream_id")?,
            // loggers may leave out zero values
            offset: self.field("offset").unwrap_or(0),
            length: self.field("length").unwrap_or(0),
        })
    }

    /// Projects as an ACK frame
    #[must_use]
    pub fn as_ack(&self) -> Option<AckFrame<'a>> {
        self.is(frame_types::ACK).then_some(AckFrame(*self))
    }

    /// Projects as a `MAX_STREAM_DATA` frame
    #[must_use]
    pub fn as_max_stream_data(&self) -> Option<MaxStreamDataFrame<'a>> {
        if !self.is(frame_types::MAX_STREAM_DATA) {
            return None;
        }
        Some(MaxStreamDataFrame {
            frame: *self,
            stream_id: self.field("stream_id")?,
            maximum: self.field("maximum")?,
        })
    }

    /// Projects as a `MAX_DATA` frame
    #[must_use]
    pub fn as_max_data(&self) -> Option<MaxDataFrame<'a>> {
        if !self.is(frame_types::MAX_DATA) {
            return None;
        }
        Some(MaxDataFrame {
            frame: *self,
            maximum: self.field("maximum")?,
        })
    }
}

/// STREAM frame projection
#[derive(Debug, Clone, Copy)]
pub struct StreamFrame<'a> {
    frame: Frame<'a>,
    /// Stream ID
    pub stream_id: u64,
    /// Byte offset of this chunk within the stream
    pub offset: u64,
    /// Number of bytes carried
    pub length: u64,
}

impl<'a> StreamFrame<'a> {
    /// Time of the owning packet (ms)
    #[must_use]
    pub fn time(&self) -> f64 {
        self.frame.time()
    }

    /// Cumulative stream position after this frame (`offset + length`)
    #[must_use]
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// The underlying frame
    #[must_use]
    pub fn frame(&self) -> Frame<'a> {
        self.frame
    }
}

/// ACK frame projection
#[derive(Debug, Clone, Copy)]
pub struct AckFrame<'a>(Frame<'a>);

impl<'a> AckFrame<'a> {
    /// Time of the owning packet (ms)
    #[must_use]
    pub fn time(&self) -> f64 {
        self.0.time()
    }

    /// The underlying frame
    #[must_use]
    pub fn frame(&self) -> Frame<'a> {
        self.0
    }

    /// Acknowledged packet numbers.
    ///
    /// `acked_ranges` holds inclusive pairs `[start, end]` or single numbers `[n]`.
    /// Returns `None` if the field is absent or malformed.
    #[must_use]
    pub fn acked_ranges(&self) -> Option<RangeSet> {
        let ranges = self.0.raw().get("acked_ranges")?.as_array()?;
        let pairs = ranges
            .iter()
            .map(|r| {
                r.as_array()?
                    .iter()
                    .map(Value::as_u64)
                    .collect::<Option<Vec<u64>>>()
            })
            .collect::<Option<Vec<_>>>()?;
        RangeSet::from_inclusive_pairs(pairs.iter().map(Vec::as_slice))
    }
}

/// `MAX_STREAM_DATA` frame projection
#[derive(Debug, Clone, Copy)]
pub struct MaxStreamDataFrame<'a> {
    frame: Frame<'a>,
    /// Stream ID
    pub stream_id: u64,
    /// New flow-control limit for the stream
    pub maximum: u64,
}

impl MaxStreamDataFrame<'_> {
    /// Time of the owning packet (ms)
    #[must_use]
    pub fn time(&self) -> f64 {
        self.frame.time()
    }
}

/// `MAX_DATA` frame projection
#[derive(Debug, Clone, Copy)]
pub struct MaxDataFrame<'a> {
    frame: Frame<'a>,
    /// New connection-level flow-control limit
    pub maximum: u64,
}

impl MaxDataFrame<'_> {
    /// Time of the owning packet (ms)
    #[must_use]
    pub fn time(&self) -> f64 {
        self.frame.time()
    }
}
