//! Plane geometry for crossing detection between piecewise-linear series
// (c) 2024 Ross Younger

/// A point in the plane
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// abscissa (time)
    pub x: f64,
    /// ordinate (value)
    pub y: f64,
}

impl Point {
    /// Constructor
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// A finite line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    /// start
    pub p1: Point,
    /// end
    pub p2: Point,
}

impl Segment {
    /// Constructor
    #[must_use]
    pub fn new(p1: Point, p2: Point) -> Self {
        Self { p1, p2 }
    }
}

/// Where two segments cross
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// The intersection point
    pub point: Point,
    /// True if the first segment is the upper one after the crossing
    pub first_is_upper: bool,
}

/// Strict counter-clockwise test for the turn a → b → c. Collinear points are not ccw.
fn ccw(a: Point, b: Point, c: Point) -> bool {
    (c.y - a.y) * (b.x - a.x) > (b.y - a.y) * (c.x - a.x)
}

/// Do the two finite segments properly cross?
///
/// Touching at an endpoint or overlapping collinearly does not count.
#[must_use]
pub fn segments_intersect(s1: &Segment, s2: &Segment) -> bool {
    ccw(s1.p1, s2.p1, s2.p2) != ccw(s1.p2, s2.p1, s2.p2)
        && ccw(s1.p1, s1.p2, s2.p1) != ccw(s1.p1, s1.p2, s2.p2)
}

fn det(a: f64, b: f64, c: f64, d: f64) -> f64 {
    a * d - b * c
}

/// Intersection of the two infinite lines through the segments.
///
/// Parallel or collinear lines have a zero determinant and yield `None`.
#[must_use]
pub fn line_intersection(s1: &Segment, s2: &Segment) -> Option<Crossing> {
    let xd1 = s1.p1.x - s1.p2.x;
    let xd2 = s2.p1.x - s2.p2.x;
    let yd1 = s1.p1.y - s1.p2.y;
    let yd2 = s2.p1.y - s2.p2.y;
    let div = det(xd1, xd2, yd1, yd2);
    if div == 0. {
        return None;
    }
    let d1 = det(s1.p1.x, s1.p1.y, s1.p2.x, s1.p2.y);
    let d2 = det(s2.p1.x, s2.p1.y, s2.p2.x, s2.p2.y);
    Some(Crossing {
        point: Point::new(det(d1, d2, xd1, xd2) / div, det(d1, d2, yd1, yd2) / div),
        // both segments run left to right; a negative determinant means s1 has the steeper slope
        first_is_upper: div < 0.,
    })
}

/// Crossing point of two finite segments, if they properly cross
#[must_use]
pub fn segments_intersection(s1: &Segment, s2: &Segment) -> Option<Crossing> {
    if !segments_intersect(s1, s2) {
        return None;
    }
    line_intersection(s1, s2)
}

/// Consecutive-point segments of a polyline
pub fn polyline(points: &[Point]) -> impl Iterator<Item = Segment> + '_ {
    points.windows(2).map(|w| Segment::new(w[0], w[1]))
}
