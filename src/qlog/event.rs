//! qlog event records and event-level views
// (c) 2024 Ross Younger

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event names understood by this crate
pub mod names {
    /// A packet left this endpoint
    pub const TRANSPORT_PACKET_SENT: &str = "transport:packet_sent";
    /// A packet arrived at this endpoint
    pub const TRANSPORT_PACKET_RECEIVED: &str = "transport:packet_received";
    /// Transport parameters were set (`data.owner` is `local` or `remote`)
    pub const TRANSPORT_PARAMETERS_SET: &str = "transport:parameters_set";
    /// Transport parameters were restored from a previous session (0-RTT)
    pub const TRANSPORT_PARAMETERS_RESTORED: &str = "transport:parameters_restored";
    /// Congestion controller / RTT estimator update
    pub const RECOVERY_METRICS_UPDATED: &str = "recovery:metrics_updated";
    /// XSE-QUIC extension record
    pub const TRANSPORT_XSE_RECORD_RECEIVED: &str = "transport:xse_record_received";
}

/// One decoded line of a qlog trace.
///
/// Immutable once parsed; owned by the [`QlogConnection`](super::QlogConnection) that read it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Event {
    /// milliseconds
    time: f64,
    name: String,
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

impl Event {
    /// Constructor
    #[must_use]
    pub fn new(time: f64, name: &str, data: Option<Map<String, Value>>) -> Self {
        Self {
            time,
            name: name.to_owned(),
            data,
        }
    }

    /// Event time in milliseconds
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Namespaced event type, e.g. `transport:packet_sent`
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Event-specific payload, if any
    #[must_use]
    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }

    pub(crate) fn shift(&mut self, shift_ms: f64) {
        self.time += shift_ms;
    }

    /// Reads an unsigned integer field from the payload
    pub(crate) fn data_u64(&self, key: &str) -> Option<u64> {
        self.data().and_then(|d| get_u64(d, key))
    }

    /// Reads a numeric field from the payload
    pub(crate) fn data_f64(&self, key: &str) -> Option<f64> {
        self.data().and_then(|d| d.get(key)).and_then(Value::as_f64)
    }
}

/// Reads an unsigned integer from a JSON object.
///
/// Some loggers write integral quantities as floats (`1200.0`); those are accepted.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn get_u64(map: &Map<String, Value>, key: &str) -> Option<u64> {
    let v = map.get(key)?;
    v.as_u64().or_else(|| {
        v.as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0)
            .map(|f| f as u64)
    })
}

/// View over a `recovery:metrics_updated` event.
///
/// Every field is optional; an absent field means "unchanged".
#[derive(Debug, Clone, Copy)]
pub struct MetricsUpdated<'a>(&'a Event);

impl<'a> MetricsUpdated<'a> {
    /// Wraps the event if it is a metrics update
    #[must_use]
    pub fn new(event: &'a Event) -> Option<Self> {
        (event.name() == names::RECOVERY_METRICS_UPDATED).then_some(Self(event))
    }

    /// Event time (ms)
    #[must_use]
    pub fn time(&self) -> f64 {
        self.0.time()
    }

    /// Congestion window, bytes
    #[must_use]
    pub fn congestion_window(&self) -> Option<u64> {
        self.0.data_u64("congestion_window")
    }

    /// Bytes in flight
    #[must_use]
    pub fn bytes_in_flight(&self) -> Option<u64> {
        self.0.data_u64("bytes_in_flight")
    }

    /// Latest RTT sample, ms
    #[must_use]
    pub fn latest_rtt(&self) -> Option<f64> {
        self.0.data_f64("latest_rtt")
    }
}

/// View over a `transport:xse_record_received` event (XSE-QUIC extension)
#[derive(Debug, Clone, Copy)]
pub struct XseRecord<'a>(&'a Event);

impl<'a> XseRecord<'a> {
    /// Wraps the event if it is an XSE record
    #[must_use]
    pub fn new(event: &'a Event) -> Option<Self> {
        (event.name() == names::TRANSPORT_XSE_RECORD_RECEIVED).then_some(Self(event))
    }

    /// Event time (ms)
    #[must_use]
    pub fn time(&self) -> f64 {
        self.0.time()
    }

    /// Stream the record belongs to
    #[must_use]
    pub fn stream_id(&self) -> Option<u64> {
        self.0.data_u64("stream_id")
    }

    /// Record size on the wire, including XSE framing
    #[must_use]
    pub fn raw_length(&self) -> Option<u64> {
        self.0.data_u64("raw_length")
    }

    /// Payload carried by the record
    #[must_use]
    pub fn data_length(&self) -> Option<u64> {
        self.0.data_u64("data_length")
    }
}

#[cfg(test)]
mod test {
    use super::{names, Event, MetricsUpdated, XseRecord};

    fn event(json: &str) -> Event {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn decode() {
        let e = event(r#"{"time": 12.5, "name": "transport:packet_sent", "data": {"x": 1}}"#);
        assert!((e.time() - 12.5).abs() < f64::EPSILON);
        assert_eq!(e.name(), names::TRANSPORT_PACKET_SENT);
        assert_eq!(e.data_u64("x"), Some(1));
        assert_eq!(e.data_u64("y"), None);
    }

    #[test]
    fn null_or_absent_data() {
        let e = event(r#"{"time": 1, "name": "a", "data": null}"#);
        assert!(e.data().is_none());
        let e = event(r#"{"time": 1, "name": "a"}"#);
        assert!(e.data().is_none());
    }

    #[test]
    fn integral_float() {
        let e = event(r#"{"time": 1, "name": "a", "data": {"n": 1200.0, "f": 1.5, "neg": -3}}"#);
        assert_eq!(e.data_u64("n"), Some(1200));
        assert_eq!(e.data_u64("f"), None);
        assert_eq!(e.data_u64("neg"), None);
    }

    #[test]
    fn metrics() {
        let e = event(
            r#"{"time": 3, "name": "recovery:metrics_updated", "data": {"congestion_window": 14720, "latest_rtt": 72.5}}"#,
        );
        let m = MetricsUpdated::new(&e).unwrap();
        assert_eq!(m.congestion_window(), Some(14720));
        assert_eq!(m.bytes_in_flight(), None);
        assert_eq!(m.latest_rtt(), Some(72.5));

        let other = event(r#"{"time": 3, "name": "transport:packet_sent"}"#);
        assert!(MetricsUpdated::new(&other).is_none());
    }

    #[test]
    fn xse() {
        let e = event(
            r#"{"time": 3, "name": "transport:xse_record_received", "data": {"stream_id": 0, "raw_length": 16405, "data_length": 16384}}"#,
        );
        let x = XseRecord::new(&e).unwrap();
        assert_eq!(x.stream_id(), Some(0));
        assert_eq!(x.raw_length(), Some(16405));
        assert_eq!(x.data_length(), Some(16384));
    }
}
