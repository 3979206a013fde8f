//! Streaming combinators over sparse `(time, value)` series
// (c) 2024 Ross Younger
//!
//! The derived accessors on a connection produce irregularly-timed update streams:
//! one pair per relevant event, in time order. Between updates a series holds its last
//! value (step semantics). The adaptors here build composite metrics from such streams
//! without materialising them.

use std::{
    iter::Peekable,
    ops::{Add, Sub},
};

/// A `(time, value)` pair. Time units are whatever the producer uses (ms for qlog).
pub type Sample<V> = (f64, V);

/// Iterator returned by [`extend_to_end`]
#[derive(Debug, Clone)]
pub struct ExtendToEnd<I, V> {
    inner: I,
    end: f64,
    last: Option<V>,
}

impl<I, V> Iterator for ExtendToEnd<I, V>
where
    I: Iterator<Item = Sample<V>>,
    V: Clone,
{
    type Item = Sample<V>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some((time, value)) = self.inner.next() {
            self.last = Some(value.clone());
            return Some((time, value));
        }
        // emitted once; take() leaves None behind
        self.last.take().map(|v| (self.end, v))
    }
}

/// Re-emits every pair, then one final pair at `end` carrying the last value forward.
///
/// An empty series stays empty.
pub fn extend_to_end<I, V>(series: I, end: f64) -> ExtendToEnd<I::IntoIter, V>
where
    I: IntoIterator<Item = Sample<V>>,
    V: Clone,
{
    ExtendToEnd {
        inner: series.into_iter(),
        end,
        last: None,
    }
}

/// Iterator returned by [`increasing_only`]
#[derive(Debug, Clone)]
pub struct IncreasingOnly<I, V> {
    inner: I,
    max: V,
}

impl<I, V> Iterator for IncreasingOnly<I, V>
where
    I: Iterator<Item = Sample<V>>,
    V: PartialOrd + Clone,
{
    type Item = Sample<V>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (time, value) = self.inner.next()?;
            if value > self.max {
                self.max = value.clone();
                return Some((time, value));
            }
        }
    }
}

/// Drops every update that does not exceed the running maximum.
///
/// The running maximum starts at `V::default()`, so non-positive values never pass.
pub fn increasing_only<I, V>(series: I) -> IncreasingOnly<I::IntoIter, V>
where
    I: IntoIterator<Item = Sample<V>>,
    V: PartialOrd + Clone + Default,
{
    IncreasingOnly {
        inner: series.into_iter(),
        max: V::default(),
    }
}

/// Two-cursor merge of two series. See [`combine`].
#[derive(Debug)]
pub struct Combine<A, B, V, F>
where
    A: Iterator<Item = Sample<V>>,
    B: Iterator<Item = Sample<V>>,
{
    a: Peekable<A>,
    b: Peekable<B>,
    held_a: V,
    held_b: V,
    op: F,
}

impl<A, B, V, F> Combine<A, B, V, F>
where
    A: Iterator<Item = Sample<V>>,
    B: Iterator<Item = Sample<V>>,
{
    fn advance_a(&mut self) -> Option<f64> {
        let (time, value) = self.a.next()?;
        self.held_a = value;
        Some(time)
    }

    fn advance_b(&mut self) -> Option<f64> {
        let (time, value) = self.b.next()?;
        self.held_b = value;
        Some(time)
    }
}

impl<A, B, V, F> Iterator for Combine<A, B, V, F>
where
    A: Iterator<Item = Sample<V>>,
    B: Iterator<Item = Sample<V>>,
    V: Clone,
    F: FnMut(V, V) -> V,
{
    type Item = Sample<V>;

    fn next(&mut self) -> Option<Self::Item> {
        let next_a = self.a.peek().map(|s| s.0);
        let next_b = self.b.peek().map(|s| s.0);
        let time = match (next_a, next_b) {
            (None, None) => return None,
            (Some(_), None) => self.advance_a()?,
            (None, Some(_)) => self.advance_b()?,
            (Some(ta), Some(tb)) if ta < tb => self.advance_a()?,
            (Some(ta), Some(tb)) if tb < ta => self.advance_b()?,
            (Some(_), Some(_)) => {
                // equal timestamps: both move, one output
                let _ = self.advance_b();
                self.advance_a()?
            }
        };
        Some((time, (self.op)(self.held_a.clone(), self.held_b.clone())))
    }
}

/// Merges two series with step/hold semantics.
///
/// One pair is produced at every timestamp present in either input. Each input holds its
/// last value between its own updates; an input that has not started yet (or is empty)
/// holds `V::default()`. When both inputs update at the same timestamp, both are advanced
/// and a single pair is produced.
pub fn combine<A, B, V, F>(op: F, a: A, b: B) -> Combine<A::IntoIter, B::IntoIter, V, F>
where
    A: IntoIterator<Item = Sample<V>>,
    B: IntoIterator<Item = Sample<V>>,
    V: Clone + Default,
    F: FnMut(V, V) -> V,
{
    Combine {
        a: a.into_iter().peekable(),
        b: b.into_iter().peekable(),
        held_a: V::default(),
        held_b: V::default(),
        op,
    }
}

/// Type of an `add`/`subtract` combinator
pub type CombineFn<A, B, V> = Combine<A, B, V, fn(V, V) -> V>;

/// `a + b`, see [`combine`]
pub fn add<A, B, V>(a: A, b: B) -> CombineFn<A::IntoIter, B::IntoIter, V>
where
    A: IntoIterator<Item = Sample<V>>,
    B: IntoIterator<Item = Sample<V>>,
    V: Clone + Default + Add<Output = V>,
{
    combine::<_, _, V, fn(V, V) -> V>(|x, y| x + y, a, b)
}

/// `a - b`, see [`combine`]
pub fn subtract<A, B, V>(a: A, b: B) -> CombineFn<A::IntoIter, B::IntoIter, V>
where
    A: IntoIterator<Item = Sample<V>>,
    B: IntoIterator<Item = Sample<V>>,
    V: Clone + Default + Sub<Output = V>,
{
    combine::<_, _, V, fn(V, V) -> V>(|x, y| x - y, a, b)
}

/// Method-call sugar for the free functions in this module
pub trait SeriesExt<V>: Iterator<Item = Sample<V>> + Sized {
    /// See [`extend_to_end`]
    fn extend_to_end(self, end: f64) -> ExtendToEnd<Self, V>
    where
        V: Clone,
    {
        extend_to_end(self, end)
    }

    /// See [`increasing_only`]
    fn increasing_only(self) -> IncreasingOnly<Self, V>
    where
        V: PartialOrd + Clone + Default,
    {
        increasing_only(self)
    }

    /// See [`add`]
    fn add_series<B>(self, other: B) -> CombineFn<Self, B::IntoIter, V>
    where
        B: IntoIterator<Item = Sample<V>>,
        V: Clone + Default + Add<Output = V>,
    {
        add(self, other)
    }

    /// See [`subtract`]
    fn subtract_series<B>(self, other: B) -> CombineFn<Self, B::IntoIter, V>
    where
        B: IntoIterator<Item = Sample<V>>,
        V: Clone + Default + Sub<Output = V>,
    {
        subtract(self, other)
    }
}

impl<I, V> SeriesExt<V> for I where I: Iterator<Item = Sample<V>> {}
