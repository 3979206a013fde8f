//! Crossing points between cumulative bytes-received curves
// (c) 2024 Ross Younger

use std::fmt::Display;

use human_repr::HumanCount as _;
use serde::Serialize;

use super::QperfConnection;
use crate::geometry::{polyline, segments_intersection, Point};

/// One curve overtaking another
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Interception {
    /// Seconds
    pub time: f64,
    /// Cumulative bytes received at the crossing (truncated)
    pub bytes_received: u64,
    /// Label of the connection that is ahead after the crossing
    pub upper: String,
    /// Label of the connection that fell behind
    pub lower: String,
}

impl Display for Interception {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.3}s {} overtakes {} at {}",
            self.time,
            self.upper,
            self.lower,
            self.bytes_received.human_count_bytes()
        )
    }
}

#[allow(clippy::cast_precision_loss)]
fn cumulative_points(conn: &QperfConnection) -> Vec<Point> {
    conn.cumulative_bytes()
        .map(|(t, b)| Point::new(t, b as f64))
        .collect()
}

/// Every crossing between the cumulative bytes-received curves of two connections.
///
/// Each curve joins consecutive `(time, cumulative bytes)` points with straight segments.
/// Every segment of one is tested against every segment of the other, so this is
/// quadratic in the report count.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn intersections(a: &QperfConnection, b: &QperfConnection) -> Vec<Interception> {
    let pa = cumulative_points(a);
    let pb = cumulative_points(b);
    let mut result = Vec::new();
    for sa in polyline(&pa) {
        for sb in polyline(&pb) {
            let Some(crossing) = segments_intersection(&sa, &sb) else {
                continue;
            };
            let (upper, lower) = if crossing.first_is_upper {
                (a, b)
            } else {
                (b, a)
            };
            result.push(Interception {
                time: crossing.point.x,
                bytes_received: crossing.point.y as u64,
                upper: upper.label().to_owned(),
                lower: lower.label().to_owned(),
            });
        }
    }
    result
}

/// Crossings among every unordered pair of connections
#[must_use]
pub fn all_intersections(connections: &[QperfConnection]) -> Vec<Interception> {
    connections
        .iter()
        .enumerate()
        .flat_map(|(i, a)| connections[i + 1..].iter().map(move |b| (a, b)))
        .flat_map(|(a, b)| intersections(a, b))
        .collect()
}
