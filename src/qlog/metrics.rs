//! Composite metrics derived from a [`QlogConnection`]
// (c) 2024 Ross Younger

use super::QlogConnection;
use crate::{
    series::{Sample, SeriesExt as _},
    util::stats::DataRate,
};

/// Cumulative bytes on the wire over every sent packet, retransmissions included
pub fn raw_data_sent(conn: &QlogConnection) -> impl Iterator<Item = Sample<u64>> + '_ {
    conn.sent_packets().scan(0_u64, |total, p| {
        *total += p.raw_length().unwrap_or(0);
        Some((p.time(), *total))
    })
}

/// Stream position (`offset + length`) of every STREAM frame sent on the stream
pub fn stream_data_sent(conn: &QlogConnection, stream_id: u64) -> impl Iterator<Item = Sample<u64>> + '_ {
    conn.sent_stream_frames_of_stream(stream_id)
        .map(|f| (f.time(), f.end()))
}

/// Stream position of every STREAM frame received on the stream
pub fn stream_data_received(
    conn: &QlogConnection,
    stream_id: u64,
) -> impl Iterator<Item = Sample<u64>> + '_ {
    conn.received_stream_frames_of_stream(stream_id)
        .map(|f| (f.time(), f.end()))
}

/// Highest acknowledged stream position, at the time of each ACK
pub fn stream_data_acked(conn: &QlogConnection, stream_id: u64) -> impl Iterator<Item = Sample<u64>> + '_ {
    conn.highest_acked_stream_updates(stream_id)
        .map(|(ack, sf)| (ack.time(), sf.end()))
}

#[allow(clippy::cast_possible_wrap)]
fn signed(s: Sample<u64>) -> Sample<i64> {
    (s.0, s.1 as i64)
}

/// How far the stream could have progressed given the congestion controller state:
/// `increasing_only(stream sent) + (extend_to_end(cwnd) - bytes_in_flight)`.
///
/// Values are signed; bytes in flight can briefly exceed the window.
pub fn available_congestion_window(
    conn: &QlogConnection,
    stream_id: u64,
) -> impl Iterator<Item = Sample<i64>> + '_ {
    let end = conn.max_time().unwrap_or(0.);
    let stream = stream_data_sent(conn, stream_id).map(signed).increasing_only();
    let cwnd = conn.congestion_window_updates().map(signed).extend_to_end(end);
    let in_flight = conn.bytes_in_flight_updates().map(signed);
    stream.add_series(cwnd.subtract_series(in_flight))
}

/// Average receive rate of a stream: the highest received position over the span from the
/// first byte to the last STREAM frame seen.
#[must_use]
pub fn avg_stream_receive_rate(conn: &QlogConnection, stream_id: u64) -> DataRate {
    let Some(first) = conn.time_to_first_byte(stream_id) else {
        return DataRate::new(0, None);
    };
    let (last, bytes) = stream_data_received(conn, stream_id)
        .fold((first, 0), |(t, b), (ft, fb)| (t.max(ft), b.max(fb)));
    DataRate::over_millis(bytes, last - first)
}

/// Payload carried by XSE records of the stream, cumulative
pub fn xse_data_received(conn: &QlogConnection, stream_id: u64) -> impl Iterator<Item = Sample<u64>> + '_ {
    conn.xse_records()
        .filter(move |r| r.stream_id() == Some(stream_id))
        .scan(0_u64, |total, r| {
            *total += r.data_length().unwrap_or(0);
            Some((r.time(), *total))
        })
}

/// Per-record overhead ratio `(raw - payload) / payload` of the stream's XSE records
pub fn xse_overhead_ratios(conn: &QlogConnection, stream_id: u64) -> impl Iterator<Item = Sample<f64>> + '_ {
    conn.xse_records()
        .filter(move |r| r.stream_id() == Some(stream_id))
        .filter_map(|r| Some((r.time(), overhead_ratio(r.raw_length()?, r.data_length()?)?)))
}

fn xse_totals(conn: &QlogConnection, stream_id: u64) -> Option<(f64, f64, u64, u64)> {
    let first = conn.time_to_first_byte(stream_id)?;
    Some(
        conn.xse_records()
            .filter(|r| r.stream_id() == Some(stream_id))
            .fold((first, first, 0, 0), |(t0, t1, raw, data), r| {
                (
                    t0.min(r.time()),
                    t1.max(r.time()),
                    raw + r.raw_length().unwrap_or(0),
                    data + r.data_length().unwrap_or(0),
                )
            }),
    )
}

/// Average XSE payload rate of the stream, from the first byte to the last record
#[must_use]
pub fn avg_xse_stream_receive_rate(conn: &QlogConnection, stream_id: u64) -> DataRate {
    match xse_totals(conn, stream_id) {
        Some((t0, t1, _, data)) => DataRate::over_millis(data, t1 - t0),
        None => DataRate::new(0, None),
    }
}

/// Average XSE on-the-wire rate of the stream (payload plus record framing)
#[must_use]
pub fn avg_raw_xse_stream_receive_rate(conn: &QlogConnection, stream_id: u64) -> DataRate {
    match xse_totals(conn, stream_id) {
        Some((t0, t1, raw, _)) => DataRate::over_millis(raw, t1 - t0),
        None => DataRate::new(0, None),
    }
}

/// Overall XSE overhead of the stream, `(raw - payload) / payload`
#[must_use]
pub fn xse_overhead_ratio(conn: &QlogConnection, stream_id: u64) -> Option<f64> {
    let (_, _, raw, data) = xse_totals(conn, stream_id)?;
    overhead_ratio(raw, data)
}

#[allow(clippy::cast_precision_loss)]
fn overhead_ratio(raw: u64, data: u64) -> Option<f64> {
    (data > 0).then(|| (raw as f64 - data as f64) / data as f64)
}
