//! qlog trace ingestion and per-connection derived series
// (c) 2024 Ross Younger

use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    time::Instant,
};

use human_repr::HumanDuration as _;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{
    event::{get_u64, names, MetricsUpdated, XseRecord},
    frame_types, AckFrame, Event, Frame, Packet, StreamFrame,
};
use crate::error::ParseError;

/// Parse-time options for a qlog trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QlogOptions {
    /// Added to every event time before the cutoff comparison (ms)
    pub shift_ms: f64,
    /// Parsing stops at the first event whose shifted time exceeds this (ms)
    pub max_ms: f64,
}

impl Default for QlogOptions {
    fn default() -> Self {
        Self {
            shift_ms: 0.,
            max_ms: f64::INFINITY,
        }
    }
}

/// Reads a qlog trace from a file
pub fn read_qlog<P: AsRef<Path>>(path: P, options: QlogOptions) -> Result<QlogConnection, ParseError> {
    let path = path.as_ref();
    let start = Instant::now();
    let file = File::open(path).map_err(|source| ParseError::Io {
        path: path.to_owned(),
        source,
    })?;
    let conn = parse_qlog(BufReader::new(file), options)?;
    debug!(
        "loaded {} ({} events) in {}",
        path.display(),
        conn.events.len(),
        start.elapsed().human_duration()
    );
    Ok(conn)
}

/// Parses a qlog trace.
///
/// The first line is the connection metadata; every following non-blank line is one event.
/// Any undecodable line is fatal.
pub fn parse_qlog<R: BufRead>(reader: R, options: QlogOptions) -> Result<QlogConnection, ParseError> {
    let mut lines = reader.lines().enumerate();
    let qlog_info = loop {
        let Some((n, line)) = lines.next() else {
            return Err(ParseError::MissingHeader);
        };
        let line = line.map_err(|source| ParseError::Read { line: n + 1, source })?;
        if line.trim().is_empty() {
            continue;
        }
        break serde_json::from_str::<Value>(&line)
            .map_err(|source| ParseError::Json { line: n + 1, source })?;
    };

    let mut conn = QlogConnection {
        qlog_info,
        ..QlogConnection::default()
    };

    for (n, line) in lines {
        let line = line.map_err(|source| ParseError::Read { line: n + 1, source })?;
        if line.trim().is_empty() {
            continue;
        }
        let mut event: Event =
            serde_json::from_str(&line).map_err(|source| ParseError::Json { line: n + 1, source })?;
        if options.shift_ms != 0. {
            event.shift(options.shift_ms);
        }
        if event.time() > options.max_ms {
            // truncate, don't filter
            break;
        }
        conn.index(event);
    }
    Ok(conn)
}

/// One endpoint's view of one QUIC connection, as recorded in a qlog trace.
///
/// Built once by [`parse_qlog`], immutable afterwards. Every accessor returning a series
/// yields `(time_ms, value)` pairs in event order.
#[derive(Debug, Default, Clone)]
pub struct QlogConnection {
    qlog_info: Value,
    events: Vec<Event>,
    sent_packets: Vec<usize>,
    received_packets: Vec<usize>,
    sent_packet_numbers: HashMap<u64, usize>,
    received_packet_numbers: HashMap<u64, usize>,
    local_parameters: Option<usize>,
    remote_parameters: Option<usize>,
    restored_parameters: Option<usize>,
}

impl QlogConnection {
    fn index(&mut self, event: Event) {
        let idx = self.events.len();
        match event.name() {
            names::TRANSPORT_PACKET_SENT => {
                if let Some(pn) = Packet::new(&event).and_then(|p| p.packet_number()) {
                    let _ = self.sent_packet_numbers.insert(pn, idx);
                }
                self.sent_packets.push(idx);
            }
            names::TRANSPORT_PACKET_RECEIVED => {
                // retry packets have no number
                if let Some(pn) = Packet::new(&event).and_then(|p| p.packet_number()) {
                    let _ = self.received_packet_numbers.insert(pn, idx);
                }
                self.received_packets.push(idx);
            }
            names::TRANSPORT_PARAMETERS_SET => {
                let owner = event
                    .data()
                    .and_then(|d| d.get("owner"))
                    .and_then(Value::as_str);
                match owner {
                    Some("local") if self.local_parameters.is_none() => {
                        self.local_parameters = Some(idx);
                    }
                    Some("remote") if self.remote_parameters.is_none() => {
                        self.remote_parameters = Some(idx);
                    }
                    _ => (),
                }
            }
            names::TRANSPORT_PARAMETERS_RESTORED if self.restored_parameters.is_none() => {
                self.restored_parameters = Some(idx);
            }
            _ => (),
        }
        self.events.push(event);
    }

    /// The metadata header line
    #[must_use]
    pub fn qlog_info(&self) -> &Value {
        &self.qlog_info
    }

    /// All retained events, in file order
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events with the given name
    pub fn events_of_type<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter(move |e| e.name() == name)
    }

    /// Time of the last retained event (ms). `None` for a trace with no events.
    #[must_use]
    pub fn max_time(&self) -> Option<f64> {
        self.events.last().map(Event::time)
    }

    fn packets_at<'a>(&'a self, indices: &'a [usize]) -> impl Iterator<Item = Packet<'a>> + 'a {
        indices
            .iter()
            .filter_map(|&i| self.events.get(i))
            .filter_map(Packet::new)
    }

    /// Packets sent by this endpoint
    pub fn sent_packets(&self) -> impl Iterator<Item = Packet<'_>> + '_ {
        self.packets_at(&self.sent_packets)
    }

    /// Packets received by this endpoint
    pub fn received_packets(&self) -> impl Iterator<Item = Packet<'_>> + '_ {
        self.packets_at(&self.received_packets)
    }

    /// Every frame of every sent packet
    pub fn sent_frames(&self) -> impl Iterator<Item = Frame<'_>> + '_ {
        self.sent_packets().flat_map(|p| p.frames())
    }

    /// Every frame of every received packet
    pub fn received_frames(&self) -> impl Iterator<Item = Frame<'_>> + '_ {
        self.received_packets().flat_map(|p| p.frames())
    }

    /// Sent frames of one type
    pub fn sent_frames_of_type<'a>(&'a self, frame_type: &'a str) -> impl Iterator<Item = Frame<'a>> + 'a {
        self.sent_frames().filter(move |f| f.is(frame_type))
    }

    /// Received frames of one type
    pub fn received_frames_of_type<'a>(
        &'a self,
        frame_type: &'a str,
    ) -> impl Iterator<Item = Frame<'a>> + 'a {
        self.received_frames().filter(move |f| f.is(frame_type))
    }

    /// Sent STREAM frames
    pub fn sent_stream_frames(&self) -> impl Iterator<Item = StreamFrame<'_>> + '_ {
        self.sent_frames().filter_map(|f| f.as_stream())
    }

    /// Received STREAM frames
    pub fn received_stream_frames(&self) -> impl Iterator<Item = StreamFrame<'_>> + '_ {
        self.received_frames().filter_map(|f| f.as_stream())
    }

    /// Sent STREAM frames of one stream
    pub fn sent_stream_frames_of_stream(
        &self,
        stream_id: u64,
    ) -> impl Iterator<Item = StreamFrame<'_>> + '_ {
        self.sent_stream_frames()
            .filter(move |f| f.stream_id == stream_id)
    }

    /// Received STREAM frames of one stream
    pub fn received_stream_frames_of_stream(
        &self,
        stream_id: u64,
    ) -> impl Iterator<Item = StreamFrame<'_>> + '_ {
        self.received_stream_frames()
            .filter(move |f| f.stream_id == stream_id)
    }

    /// O(1) lookup of a sent packet by number
    #[must_use]
    pub fn sent_packet_by_number(&self, packet_number: u64) -> Option<Packet<'_>> {
        let idx = *self.sent_packet_numbers.get(&packet_number)?;
        self.events.get(idx).and_then(Packet::new)
    }

    /// O(1) lookup of a received packet by number
    #[must_use]
    pub fn received_packet_by_number(&self, packet_number: u64) -> Option<Packet<'_>> {
        let idx = *self.received_packet_numbers.get(&packet_number)?;
        self.events.get(idx).and_then(Packet::new)
    }

    fn data_at(&self, idx: Option<usize>) -> Option<&Map<String, Value>> {
        self.events.get(idx?)?.data()
    }

    /// Our own transport parameters (first `parameters_set` with `owner: local`)
    #[must_use]
    pub fn local_parameters(&self) -> Option<&Map<String, Value>> {
        self.data_at(self.local_parameters)
    }

    /// The peer's transport parameters (first `parameters_set` with `owner: remote`)
    #[must_use]
    pub fn remote_parameters(&self) -> Option<&Map<String, Value>> {
        self.data_at(self.remote_parameters)
    }

    /// Parameters restored from an earlier session (first `parameters_restored`)
    #[must_use]
    pub fn restored_parameters(&self) -> Option<&Map<String, Value>> {
        self.data_at(self.restored_parameters)
    }

    /// Restored parameters take precedence over the remote ones when present
    fn effective_remote_parameter(&self, key: &str) -> Option<u64> {
        match self.restored_parameters() {
            Some(restored) => get_u64(restored, key),
            None => get_u64(self.remote_parameters()?, key),
        }
    }

    /// Connection-level limit offered by the peer (bytes)
    #[must_use]
    pub fn remote_initial_max_data(&self) -> Option<u64> {
        self.effective_remote_parameter("initial_max_data")
    }

    /// Per-stream limit offered by the peer for streams we open (bytes)
    #[must_use]
    pub fn remote_initial_max_stream_data_bidi_remote(&self) -> Option<u64> {
        self.effective_remote_parameter("initial_max_stream_data_bidi_remote")
    }

    /// Connection-level limit we offered (bytes)
    #[must_use]
    pub fn local_initial_max_data(&self) -> Option<u64> {
        get_u64(self.local_parameters()?, "initial_max_data")
    }

    /// Per-stream limit we offered for streams we open (bytes)
    #[must_use]
    pub fn local_initial_max_stream_data_bidi_local(&self) -> Option<u64> {
        get_u64(self.local_parameters()?, "initial_max_stream_data_bidi_local")
    }

    /// Flow-control limit for one stream imposed by the peer (limits our sending).
    ///
    /// Seeded at time 0 with the peer's initial offer (0 if unknown).
    pub fn remote_stream_flow_limit_updates(
        &self,
        stream_id: u64,
    ) -> impl Iterator<Item = (f64, u64)> + '_ {
        let initial = self.remote_initial_max_stream_data_bidi_remote().unwrap_or(0);
        std::iter::once((0., initial)).chain(
            self.received_frames()
                .filter_map(|f| f.as_max_stream_data())
                .filter(move |f| f.stream_id == stream_id)
                .map(|f| (f.time(), f.maximum)),
        )
    }

    /// Flow-control limit for one stream we impose on the peer (limits our receiving).
    ///
    /// Seeded at time 0 with our initial offer (0 if unknown).
    pub fn local_stream_flow_limit_updates(
        &self,
        stream_id: u64,
    ) -> impl Iterator<Item = (f64, u64)> + '_ {
        let initial = self.local_initial_max_stream_data_bidi_local().unwrap_or(0);
        std::iter::once((0., initial)).chain(
            self.sent_frames()
                .filter_map(|f| f.as_max_stream_data())
                .filter(move |f| f.stream_id == stream_id)
                .map(|f| (f.time(), f.maximum)),
        )
    }

    /// Sum of the peer's current per-stream limits over every stream seen so far.
    ///
    /// The sum saturates at `u64::MAX`.
    pub fn stream_flow_limit_sum_updates(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        let initial = self.remote_initial_max_stream_data_bidi_remote().unwrap_or(0);
        let mut limits = HashMap::<u64, u64>::new();
        let mut total = 0_u128;
        std::iter::once((0., initial)).chain(
            self.received_frames()
                .filter_map(|f| f.as_max_stream_data())
                .map(move |f| {
                    let previous = limits.insert(f.stream_id, f.maximum).unwrap_or(0);
                    total = total - u128::from(previous) + u128::from(f.maximum);
                    (f.time(), u64::try_from(total).unwrap_or(u64::MAX))
                }),
        )
    }

    /// Connection-level limit imposed by the peer; one update per received `MAX_DATA`
    pub fn remote_connection_flow_limit_updates(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.received_frames()
            .filter_map(|f| f.as_max_data())
            .map(|f| (f.time(), f.maximum))
    }

    /// Connection-level limit we impose; one update per sent `MAX_DATA`
    pub fn local_connection_flow_limit_updates(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.sent_frames()
            .filter_map(|f| f.as_max_data())
            .map(|f| (f.time(), f.maximum))
    }

    fn metrics_updates(&self) -> impl Iterator<Item = MetricsUpdated<'_>> + '_ {
        self.events.iter().filter_map(MetricsUpdated::new)
    }

    /// Congestion window (bytes)
    pub fn congestion_window_updates(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.metrics_updates()
            .filter_map(|m| Some((m.time(), m.congestion_window()?)))
    }

    /// Bytes in flight
    pub fn bytes_in_flight_updates(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        self.metrics_updates()
            .filter_map(|m| Some((m.time(), m.bytes_in_flight()?)))
    }

    /// Latest RTT samples (ms)
    pub fn rtt_updates(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.metrics_updates()
            .filter_map(|m| Some((m.time(), m.latest_rtt()?)))
    }

    /// Time (ms) of the first received STREAM frame on the stream that carries data.
    ///
    /// `None` means no data was transferred on the stream.
    #[must_use]
    pub fn time_to_first_byte(&self, stream_id: u64) -> Option<f64> {
        self.received_stream_frames_of_stream(stream_id)
            .find(|f| f.length > 0)
            .map(|f| f.time())
    }

    /// Correlates each received ACK with the most recently sent STREAM frame it covers.
    ///
    /// Acknowledged packet numbers are walked highest first; the first sent packet that
    /// carries a frame of `stream_id` wins. ACKs that cover no such packet produce nothing.
    pub fn highest_acked_stream_updates(
        &self,
        stream_id: u64,
    ) -> impl Iterator<Item = (AckFrame<'_>, StreamFrame<'_>)> + '_ {
        self.received_frames_of_type(frame_types::ACK)
            .filter_map(|f| f.as_ack())
            .filter_map(move |ack| {
                let Some(ranges) = ack.acked_ranges() else {
                    warn!("skipping ACK with malformed ranges at {}ms", ack.time());
                    return None;
                };
                let stream_frame = ranges
                    .elements_rev()
                    .filter_map(|pn| self.sent_packet_by_number(pn))
                    .find_map(|p| p.stream_frames_of_stream(stream_id).next())?;
                Some((ack, stream_frame))
            })
    }

    /// XSE extension records
    pub fn xse_records(&self) -> impl Iterator<Item = XseRecord<'_>> + '_ {
        self.events.iter().filter_map(XseRecord::new)
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use assertables::assert_in_delta;

    use super::{parse_qlog, read_qlog, QlogOptions};
    use crate::{error::ParseError, util::make_test_tempfile};

    const HEADER: &str = r#"{"qlog_version": "draft-02", "title": "client"}"#;

    fn parse(lines: &[&str], options: QlogOptions) -> Result<super::QlogConnection, ParseError> {
        let mut text = String::from(HEADER);
        for l in lines {
            text.push('\n');
            text.push_str(l);
        }
        parse_qlog(Cursor::new(text), options)
    }

    const TRACE: &[&str] = &[
        r#"{"time": 0, "name": "transport:parameters_set", "data": {"owner": "local", "initial_max_data": 1000000, "initial_max_stream_data_bidi_local": 50000}}"#,
        r#"{"time": 1, "name": "transport:parameters_set", "data": {"owner": "remote", "initial_max_data": 2000000, "initial_max_stream_data_bidi_remote": 60000}}"#,
        r#"{"time": 10, "name": "transport:packet_sent", "data": {"header": {"packet_number": 0}, "raw": {"length": 1200}, "frames": [{"frame_type": "stream", "stream_id": 0, "offset": 0, "length": 1000}]}}"#,
        r#"{"time": 11, "name": "recovery:metrics_updated", "data": {"congestion_window": 12000, "bytes_in_flight": 1200}}"#,
        r#"{"time": 20, "name": "transport:packet_sent", "data": {"header": {"packet_number": 1}, "raw": {"length": 1200}, "frames": [{"frame_type": "stream", "stream_id": 0, "offset": 1000, "length": 1000}]}}"#,
        r#"{"time": 21, "name": "transport:packet_sent", "data": {"header": {"packet_number": 2}, "raw": {"length": 60}, "frames": [{"frame_type": "ping"}]}}"#,
        r#"{"time": 30, "name": "transport:packet_received", "data": {"header": {"packet_number": 0}, "raw": {"length": 50}, "frames": [{"frame_type": "ack", "acked_ranges": [[0, 2]]}, {"frame_type": "max_stream_data", "stream_id": 0, "maximum": 80000}]}}"#,
        r#"{"time": 31, "name": "recovery:metrics_updated", "data": {"latest_rtt": 20.5, "bytes_in_flight": 0}}"#,
        r#"{"time": 40, "name": "transport:packet_received", "data": {"header": {"packet_number": 1}, "raw": {"length": 1252}, "frames": [{"frame_type": "stream", "stream_id": 0, "offset": 0, "length": 0}, {"frame_type": "max_data", "maximum": 3000000}, {"frame_type": "max_stream_data", "stream_id": 4, "maximum": 70000}]}}"#,
        r#"{"time": 50, "name": "transport:packet_received", "data": {"header": {"packet_number": 2}, "raw": {"length": 1252}, "frames": [{"frame_type": "stream", "stream_id": 0, "offset": 0, "length": 500}]}}"#,
        r#"{"time": 60, "name": "transport:packet_received", "data": {"header": {"packet_number": 3}, "raw": {"length": 50}, "frames": [{"frame_type": "ack", "acked_ranges": [[2]]}]}}"#,
    ];

    #[test]
    fn basic_accessors() {
        let conn = parse(TRACE, QlogOptions::default()).unwrap();
        assert_eq!(conn.events().len(), TRACE.len());
        assert_eq!(conn.max_time(), Some(60.));
        assert_eq!(conn.qlog_info()["title"], "client");
        assert_eq!(conn.sent_packets().count(), 3);
        assert_eq!(conn.received_packets().count(), 4);
        assert_eq!(conn.events_of_type("recovery:metrics_updated").count(), 2);
        assert_eq!(conn.sent_stream_frames_of_stream(0).count(), 2);
        assert_eq!(
            conn.sent_packet_by_number(1).unwrap().raw_length(),
            Some(1200)
        );
        assert!(conn.sent_packet_by_number(99).is_none());
        assert_in_delta!(conn.received_packet_by_number(2).unwrap().time(), 50., 1e-9);
    }

    #[test]
    fn parameters() {
        let conn = parse(TRACE, QlogOptions::default()).unwrap();
        assert_eq!(conn.local_initial_max_data(), Some(1_000_000));
        assert_eq!(conn.local_initial_max_stream_data_bidi_local(), Some(50000));
        assert_eq!(conn.remote_initial_max_data(), Some(2_000_000));
        assert_eq!(conn.remote_initial_max_stream_data_bidi_remote(), Some(60000));
        assert!(conn.restored_parameters().is_none());
    }

    #[test]
    fn restored_parameters_win() {
        let mut lines = TRACE.to_vec();
        lines.insert(
            0,
            r#"{"time": 0, "name": "transport:parameters_restored", "data": {"initial_max_data": 5, "initial_max_stream_data_bidi_remote": 6}}"#,
        );
        let conn = parse(&lines, QlogOptions::default()).unwrap();
        assert_eq!(conn.remote_initial_max_data(), Some(5));
        assert_eq!(conn.remote_initial_max_stream_data_bidi_remote(), Some(6));
        // local side is unaffected
        assert_eq!(conn.local_initial_max_data(), Some(1_000_000));
    }

    #[test]
    fn missing_parameters_are_absent() {
        let conn = parse(&TRACE[2..], QlogOptions::default()).unwrap();
        assert_eq!(conn.remote_initial_max_data(), None);
        assert_eq!(conn.local_initial_max_data(), None);
        // seeded with 0 instead
        assert_eq!(
            conn.remote_stream_flow_limit_updates(0).next(),
            Some((0., 0))
        );
    }

    #[test]
    fn flow_limits() {
        let conn = parse(TRACE, QlogOptions::default()).unwrap();
        assert_eq!(
            conn.remote_stream_flow_limit_updates(0).collect::<Vec<_>>(),
            vec![(0., 60000), (30., 80000)]
        );
        assert_eq!(
            conn.local_stream_flow_limit_updates(0).collect::<Vec<_>>(),
            vec![(0., 50000)]
        );
        assert_eq!(
            conn.stream_flow_limit_sum_updates().collect::<Vec<_>>(),
            vec![(0., 60000), (30., 80000), (40., 150_000)]
        );
        assert_eq!(
            conn.remote_connection_flow_limit_updates()
                .collect::<Vec<_>>(),
            vec![(40., 3_000_000)]
        );
        assert_eq!(conn.local_connection_flow_limit_updates().count(), 0);
    }

    #[test]
    fn flow_limit_sum_saturates() {
        // 2^62 - 1 is the largest limit QUIC can encode
        const MAX: u64 = 4_611_686_018_427_387_903;
        let lines: Vec<String> = (0..5_u64)
            .map(|i| {
                format!(
                    r#"{{"time": {}, "name": "transport:packet_received", "data": {{"header": {{"packet_number": {i}}}, "frames": [{{"frame_type": "max_stream_data", "stream_id": {}, "maximum": {MAX}}}]}}}}"#,
                    i + 1,
                    i * 4
                )
            })
            .collect();
        let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
        let conn = parse(&lines, QlogOptions::default()).unwrap();
        let sums: Vec<_> = conn
            .stream_flow_limit_sum_updates()
            .map(|(_, sum)| sum)
            .collect();
        assert_eq!(sums, vec![0, MAX, 2 * MAX, 3 * MAX, 4 * MAX, u64::MAX]);
    }

    #[test]
    fn repeated_packet_number_last_wins() {
        let lines = [
            r#"{"time": 0, "name": "transport:parameters_set", "data": {"owner": "local", "initial_max_stream_data_bidi_local": 50000}}"#,
            r#"{"time": 10, "name": "transport:packet_sent", "data": {"header": {"packet_number": 7}, "raw": {"length": 100}}}"#,
            r#"{"time": 20, "name": "transport:packet_sent", "data": {"header": {"packet_number": 7}, "raw": {"length": 200}, "frames": [{"frame_type": "max_stream_data", "stream_id": 0, "maximum": 90000}, {"frame_type": "max_stream_data", "stream_id": 4, "maximum": 1}]}}"#,
        ];
        let conn = parse(&lines, QlogOptions::default()).unwrap();
        let p = conn.sent_packet_by_number(7).unwrap();
        assert_in_delta!(p.time(), 20., 1e-9);
        assert_eq!(p.raw_length(), Some(200));
        // both packets are still listed
        assert_eq!(conn.sent_packets().count(), 2);
        assert_eq!(
            conn.local_stream_flow_limit_updates(0).collect::<Vec<_>>(),
            vec![(0., 50000), (20., 90000)]
        );
    }

    #[test]
    fn recovery_metrics() {
        let conn = parse(TRACE, QlogOptions::default()).unwrap();
        assert_eq!(
            conn.congestion_window_updates().collect::<Vec<_>>(),
            vec![(11., 12000)]
        );
        assert_eq!(
            conn.bytes_in_flight_updates().collect::<Vec<_>>(),
            vec![(11., 1200), (31., 0)]
        );
        assert_eq!(conn.rtt_updates().collect::<Vec<_>>(), vec![(31., 20.5)]);
    }

    #[test]
    fn ttfb_skips_empty_frames() {
        let conn = parse(TRACE, QlogOptions::default()).unwrap();
        assert_eq!(conn.time_to_first_byte(0), Some(50.));
        assert_eq!(conn.time_to_first_byte(4), None);
    }

    #[test]
    fn acked_stream_data() {
        let conn = parse(TRACE, QlogOptions::default()).unwrap();
        let acked: Vec<_> = conn
            .highest_acked_stream_updates(0)
            .map(|(ack, sf)| (ack.time(), sf.end()))
            .collect();
        // first ACK covers 0..=2; packet 2 has no stream data so packet 1 wins.
        // second ACK only covers packet 2 and yields nothing.
        assert_eq!(acked, vec![(30., 2000)]);
    }

    #[test]
    fn shift_and_cutoff() {
        let lines = [
            r#"{"time": 1000, "name": "a"}"#,
            r#"{"time": 2500, "name": "b"}"#,
            r#"{"time": 3000, "name": "c"}"#,
            r#"{"time": 3001, "name": "d"}"#,
            r#"{"time": 100, "name": "e"}"#,
        ];
        let conn = parse(
            &lines,
            QlogOptions {
                shift_ms: 2000.,
                max_ms: 5000.,
            },
        )
        .unwrap();
        // truncated at "d"; "e" is never seen despite its early time
        assert_eq!(conn.events().len(), 3);
        assert_eq!(conn.max_time(), Some(5000.));
        assert!(conn.events().iter().all(|e| e.time() <= 5000.));
    }

    #[test]
    fn blank_lines_are_skipped() {
        let text = format!("\n{HEADER}\n\n{}\n\n", r#"{"time": 3, "name": "x", "data": null}"#);
        let conn = parse_qlog(Cursor::new(text), QlogOptions::default()).unwrap();
        assert_eq!(conn.events().len(), 1);
    }

    #[test]
    fn errors() {
        assert!(matches!(
            parse_qlog(Cursor::new(""), QlogOptions::default()),
            Err(ParseError::MissingHeader)
        ));
        let err = parse(&[r#"{"time": 1, "name": "a"}"#, "{not json"], QlogOptions::default())
            .unwrap_err();
        assert!(matches!(err, ParseError::Json { line: 3, .. }), "{err:?}");
        let err = parse(&[r#"{"name": "no time"}"#], QlogOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::Json { line: 2, .. }));
    }

    #[test]
    fn empty_trace() {
        let conn = parse(&[], QlogOptions::default()).unwrap();
        assert_eq!(conn.max_time(), None);
        assert_eq!(conn.time_to_first_byte(0), None);
    }

    #[test]
    fn from_file() {
        let mut text = String::from(HEADER);
        for l in TRACE {
            text.push('\n');
            text.push_str(l);
        }
        let (path, _dir) = make_test_tempfile(&text, "client.qlog");
        let conn = read_qlog(&path, QlogOptions::default()).unwrap();
        assert_eq!(conn.events().len(), TRACE.len());
        let err = read_qlog(path.with_extension("nope"), QlogOptions::default()).unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
