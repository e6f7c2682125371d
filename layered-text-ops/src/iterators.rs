//! Relations between spans of one sorted sequence.
//!
//! Every function takes spans sorted by `(start, end)`, as stored in a
//! [`Layer`](layered_text::Layer), and yields pairs `(a, b)` lazily in one
//! forward sweep. Enveloping spans take part through their outer
//! `(start, end)` boundaries.
//!
//! ## Successor relations
//!
//! The successors of `a` are the spans that start at or after `a.end`,
//! restricted to those sharing the smallest such start. Pairs where one span
//! is nested in the other (only possible with zero-length spans) are not
//! reported.
//!
//! ```text
//! "A B  C"
//!  ╰A                 touching:     none
//!    ╰B               hovering:     (A, B) gap 1, (B, C) gap 2
//!       ╰C            consecutive:  (A, B), (B, C) unless filtered
//! ```
//!
//! - touching: successor pairs with gap 0
//! - hovering: successor pairs with gap >= max(1, min_gap)
//! - consecutive: successor pairs within `max_gap` whose gap text passes a
//!   validator

use layered_text::Located;
use regex::Regex;

fn successor_pairs<'a, S: Located + 'a>(
    spans: &'a [S],
) -> impl Iterator<Item = (&'a S, &'a S)> + 'a {
    spans.iter().enumerate().flat_map(move |(i, a)| {
        let rest = &spans[i + 1..];
        let first = rest.partition_point(|b| b.start() < a.end());
        let successors = &rest[first..];
        let next_start = successors.first().map(|b| b.start());
        successors
            .iter()
            .take_while(move |b| Some(b.start()) == next_start)
            .filter(move |b| !nested_at_boundary(a, *b))
            .map(move |b| (a, b))
    })
}

/// `a` ends where `b` starts and one of them has zero length.
fn nested_at_boundary<S: Located>(a: &S, b: &S) -> bool {
    (a.start() == a.end() && a.end() == b.start())
        || (b.start() == b.end() && b.start() == a.end())
}

fn gap<S: Located>(a: &S, b: &S) -> usize {
    b.start() - a.end()
}

/// Pairs where `b` starts exactly where `a` ends.
pub fn iterate_touching_spans<'a, S: Located + 'a>(
    spans: &'a [S],
) -> impl Iterator<Item = (&'a S, &'a S)> + 'a {
    successor_pairs(spans).filter(|(a, b)| gap(*a, *b) == 0)
}

/// Pairs where `b` is the next span after `a` and at least
/// `max(1, min_gap)` positions separate them.
pub fn iterate_hovering_spans<'a, S: Located + 'a>(
    spans: &'a [S],
    min_gap: usize,
) -> impl Iterator<Item = (&'a S, &'a S)> + 'a {
    let min_gap = min_gap.max(1);
    successor_pairs(spans).filter(move |(a, b)| gap(*a, *b) >= min_gap)
}

/// Pairs where `b` is the next span after `a`, the gap is at most `max_gap`
/// (if given) and `gap_validator` accepts `text[a.end..b.start]`.
pub fn iterate_consecutive_spans<'a, S, F>(
    text: &'a str,
    spans: &'a [S],
    max_gap: Option<usize>,
    gap_validator: F,
) -> impl Iterator<Item = (&'a S, &'a S)> + 'a
where
    S: Located + 'a,
    F: Fn(&str) -> bool + 'a,
{
    successor_pairs(spans).filter(move |(a, b)| {
        let within = max_gap.map_or(true, |max| gap(*a, *b) <= max);
        within && gap_validator(text.get(a.end()..b.start()).unwrap_or(""))
    })
}

/// Strict partial overlaps: `a.start < b.start < a.end < b.end`.
pub fn iterate_overlapping_spans<'a, S: Located + 'a>(
    spans: &'a [S],
) -> impl Iterator<Item = (&'a S, &'a S)> + 'a {
    iterate_intersecting_spans(spans).filter(|(a, b)| a.start() < b.start() && a.end() < b.end())
}

/// Pairs where one span lies within the other, in sorted order: the outer
/// span comes first unless both start together. Spans with identical
/// boundaries are not reported.
pub fn iterate_nested_spans<'a, S: Located + 'a>(
    spans: &'a [S],
) -> impl Iterator<Item = (&'a S, &'a S)> + 'a {
    spans.iter().enumerate().flat_map(move |(i, a)| {
        spans[i + 1..]
            .iter()
            .take_while(move |b| b.start() <= a.end())
            .filter(move |b| {
                (a.start(), a.end()) != (b.start(), b.end())
                    && (b.end() <= a.end() || b.start() == a.start())
            })
            .map(move |b| (a, b))
    })
}

/// Any positional overlap: `a.start <= b.start < a.end`.
pub fn iterate_intersecting_spans<'a, S: Located + 'a>(
    spans: &'a [S],
) -> impl Iterator<Item = (&'a S, &'a S)> + 'a {
    spans.iter().enumerate().flat_map(move |(i, a)| {
        spans[i + 1..]
            .iter()
            .take_while(move |b| b.start() < a.end())
            .map(move |b| (a, b))
    })
}

/// The two spans overlap in the sense of [`iterate_intersecting_spans`],
/// whichever comes first.
pub fn spans_intersect<A: Located, B: Located>(a: &A, b: &B) -> bool {
    if (a.start(), a.end()) <= (b.start(), b.end()) {
        a.start() <= b.start() && b.start() < a.end()
    } else {
        b.start() <= a.start() && a.start() < b.end()
    }
}

/// For each span of `outer`, the spans of `inner` lying within it.
pub fn iterate_enclosed_spans<'a, O, I>(
    outer: &'a [O],
    inner: &'a [I],
) -> impl Iterator<Item = (&'a O, &'a I)> + 'a
where
    O: Located + 'a,
    I: Located + 'a,
{
    outer.iter().flat_map(move |o| {
        let first = inner.partition_point(|i| i.start() < o.start());
        inner[first..]
            .iter()
            .take_while(move |i| i.start() <= o.end())
            .filter(move |i| i.end() <= o.end())
            .map(move |i| (o, i))
    })
}

/// Intersecting pairs `(l, r)` across two sorted sequences.
pub fn iterate_intersecting_pairs<'a, L, R>(
    left: &'a [L],
    right: &'a [R],
) -> impl Iterator<Item = (&'a L, &'a R)> + 'a
where
    L: Located + 'a,
    R: Located + 'a,
{
    left.iter().flat_map(move |l| {
        let last = right.partition_point(|r| r.start() < l.end());
        right[..last]
            .iter()
            .filter(move |r| spans_intersect(l, *r))
            .map(move |r| (l, r))
    })
}

/// Gap validator accepting whitespace-only gaps.
pub fn whitespace_gap(gap: &str) -> bool {
    gap.chars().all(char::is_whitespace)
}

/// Gap validator accepting gaps that `pattern` matches completely.
pub fn pattern_gap(pattern: &str) -> Result<impl Fn(&str) -> bool, regex::Error> {
    let anchored = Regex::new(&format!("^(?:{})$", pattern))?;
    Ok(move |gap: &str| anchored.is_match(gap))
}
