//! View over `packet_sent` / `packet_received` events
// (c) 2024 Ross Younger

use serde_json::Value;

use super::{
    event::{get_u64, names},
    Event, Frame, StreamFrame,
};

/// A packet event.
///
/// This borrows the underlying [`Event`]; frames are produced on demand.
#[derive(Debug, Clone, Copy)]
pub struct Packet<'a>(&'a Event);

impl<'a> Packet<'a> {
    /// Wraps the event if it is a packet sent or received event
    #[must_use]
    pub fn new(event: &'a Event) -> Option<Self> {
        matches!(
            event.name(),
            names::TRANSPORT_PACKET_SENT | names::TRANSPORT_PACKET_RECEIVED
        )
        .then_some(Self(event))
    }

    /// The underlying event
    #[must_use]
    pub fn event(&self) -> &'a Event {
        self.0
    }

    /// Packet time (ms)
    #[must_use]
    pub fn time(&self) -> f64 {
        self.0.time()
    }

    /// Packet number. Retry packets do not have one.
    #[must_use]
    pub fn packet_number(&self) -> Option<u64> {
        let header = self.0.data()?.get("header")?.as_object()?;
        get_u64(header, "packet_number")
    }

    /// Size on the wire, bytes
    #[must_use]
    pub fn raw_length(&self) -> Option<u64> {
        let raw = self.0.data()?.get("raw")?.as_object()?;
        get_u64(raw, "length")
    }

    /// The frames in this packet, in order
    pub fn frames(&self) -> impl Iterator<Item = Frame<'a>> + 'a {
        let packet = *self;
        self.0
            .data()
            .and_then(|d| d.get("frames"))
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .map(move |f| Frame::new(f, packet))
    }

    /// Frames of one type
    pub fn frames_of_type<'t>(&self, frame_type: &'t str) -> impl Iterator<Item = Frame<'a>> + 't
    where
        'a: 't,
    {
        self.frames().filter(move |f| f.is(frame_type))
    }

    /// All STREAM frames
    pub fn stream_frames(&self) -> impl Iterator<Item = StreamFrame<'a>> + 'a {
        self.frames().filter_map(|f| f.as_stream())
    }

    /// STREAM frames belonging to one stream
    pub fn stream_frames_of_stream(
        &self,
        stream_id: u64,
    ) -> impl Iterator<Item = StreamFrame<'a>> + 'a {
        self.stream_frames().filter(move |f| f.stream_id == stream_id)
    }
}

#[cfg(test)]
mod test {
    use super::Packet;
    use crate::qlog::Event;

    #[test]
    fn fields() {
        let e: Event = serde_json::from_str(
            r#"{"time": 2, "name": "transport:packet_sent", "data": {"header": {"packet_number": 17}, "raw": {"length": 1252},
                "frames": [{"frame_type": "padding"}, {"frame_type": "stream", "stream_id": 0, "offset": 0, "length": 1200}, {"frame_type": "stream", "stream_id": 4, "offset": 0, "length": 10}]}}"#,
        )
        .unwrap();
        let p = Packet::new(&e).unwrap();
        assert_eq!(p.packet_number(), Some(17));
        assert_eq!(p.raw_length(), Some(1252));
        assert_eq!(p.frames().count(), 3);
        assert_eq!(p.frames_of_type("padding").count(), 1);
        assert_eq!(p.stream_frames().count(), 2);
        let s: Vec<_> = p.stream_frames_of_stream(4).collect();
        assert_eq!(s.len(), 1);
        assert_eq!(s[0].length, 10);
    }

    #[test]
    fn retry_has_no_number() {
        let e: Event = serde_json::from_str(
            r#"{"time": 2, "name": "transport:packet_received", "data": {"header": {"packet_type": "retry"}}}"#,
        )
        .unwrap();
        let p = Packet::new(&e).unwrap();
        assert_eq!(p.packet_number(), None);
        assert_eq!(p.raw_length(), None);
        assert_eq!(p.frames().count(), 0);
    }

    #[test]
    fn not_a_packet() {
        let e: Event =
            serde_json::from_str(r#"{"time": 2, "name": "recovery:metrics_updated"}"#).unwrap();
        assert!(Packet::new(&e).is_none());
    }
}
