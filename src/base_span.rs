//! Text locations.
//!
//! A [`BaseSpan`] is either a single `[start, end)` interval or an ordered
//! tuple of lower-level base spans. Offsets are byte offsets into the text.
//!
//! ```text
//! "Hello world."
//!  ╰───╯                 Elementary(0, 5)           level 0
//!        ╰───╯           Elementary(6, 11)          level 0
//!  ╰─────────╯           Enveloping[(0,5),(6,11)]   level 1
//! ```

use crate::errors::{LayerError, LayerResult};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// A single `[start, end)` interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementaryBaseSpan {
    start: usize,
    end: usize,
}

impl ElementaryBaseSpan {
    pub fn new(start: usize, end: usize) -> LayerResult<Self> {
        if start > end {
            return Err(LayerError::invalid_span(format!(
                "start {} is after end {}",
                start, end
            )));
        }
        Ok(ElementaryBaseSpan { start, end })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }
}

/// An ordered, non-empty tuple of base spans of one level.
///
/// `start`, `end` and `level` are computed once when the span is built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnvelopingBaseSpan {
    spans: Vec<BaseSpan>,
    start: usize,
    end: usize,
    level: usize,
}

impl EnvelopingBaseSpan {
    pub fn new(spans: Vec<BaseSpan>) -> LayerResult<Self> {
        let (first, last) = match (spans.first(), spans.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(LayerError::invalid_span("enveloping span has no children")),
        };

        let child_level = first.level();
        for pair in spans.windows(2) {
            if pair[1].level() != child_level {
                return Err(LayerError::invalid_span(format!(
                    "children of an enveloping span must share one level, got {} and {}",
                    child_level,
                    pair[1].level()
                )));
            }
            if (pair[0].start(), pair[0].end()) > (pair[1].start(), pair[1].end()) {
                return Err(LayerError::invalid_span(format!(
                    "children are not sorted: ({}, {}) before ({}, {})",
                    pair[0].start(),
                    pair[0].end(),
                    pair[1].start(),
                    pair[1].end()
                )));
            }
        }

        let start = first.start();
        let end = last.end();
        if start > end {
            return Err(LayerError::invalid_span(format!(
                "enveloping span starts at {} but ends at {}",
                start, end
            )));
        }

        Ok(EnvelopingBaseSpan {
            start,
            end,
            level: child_level + 1,
            spans,
        })
    }

    pub fn spans(&self) -> &[BaseSpan] {
        &self.spans
    }
}

/// Location descriptor of a span.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BaseSpan {
    Elementary(ElementaryBaseSpan),
    Enveloping(EnvelopingBaseSpan),
}

impl BaseSpan {
    /// Elementary `[start, end)` span.
    pub fn elementary(start: usize, end: usize) -> LayerResult<Self> {
        ElementaryBaseSpan::new(start, end).map(BaseSpan::Elementary)
    }

    /// Enveloping span over `children`, one level above them.
    pub fn enveloping(children: Vec<BaseSpan>) -> LayerResult<Self> {
        EnvelopingBaseSpan::new(children).map(BaseSpan::Enveloping)
    }

    /// Level-1 enveloping span over elementary `(start, end)` pairs.
    pub fn from_ranges(ranges: &[(usize, usize)]) -> LayerResult<Self> {
        let children = ranges
            .iter()
            .map(|&(start, end)| BaseSpan::elementary(start, end))
            .collect::<LayerResult<Vec<_>>>()?;
        BaseSpan::enveloping(children)
    }

    pub fn start(&self) -> usize {
        match self {
            BaseSpan::Elementary(span) => span.start,
            BaseSpan::Enveloping(span) => span.start,
        }
    }

    pub fn end(&self) -> usize {
        match self {
            BaseSpan::Elementary(span) => span.end,
            BaseSpan::Enveloping(span) => span.end,
        }
    }

    /// Nesting depth; 0 for elementary spans.
    pub fn level(&self) -> usize {
        match self {
            BaseSpan::Elementary(_) => 0,
            BaseSpan::Enveloping(span) => span.level,
        }
    }

    /// Length of the enclosing interval.
    pub fn len(&self) -> usize {
        self.end() - self.start()
    }

    pub fn is_empty(&self) -> bool {
        self.start() == self.end()
    }

    /// Direct children; empty for elementary spans.
    pub fn children(&self) -> &[BaseSpan] {
        match self {
            BaseSpan::Elementary(_) => &[],
            BaseSpan::Enveloping(span) => &span.spans,
        }
    }

    /// All elementary intervals covered, left to right.
    pub fn flatten(&self) -> Vec<ElementaryBaseSpan> {
        let mut out = Vec::new();
        self.flatten_into(&mut out);
        out
    }

    fn flatten_into(&self, out: &mut Vec<ElementaryBaseSpan>) {
        match self {
            BaseSpan::Elementary(span) => out.push(*span),
            BaseSpan::Enveloping(span) => {
                for child in &span.spans {
                    child.flatten_into(out);
                }
            }
        }
    }

    /// Copy moved by `delta` positions. Fails if a position would become negative.
    pub fn shift(&self, delta: isize) -> LayerResult<Self> {
        match self {
            BaseSpan::Elementary(span) => {
                BaseSpan::elementary(shift_pos(span.start, delta)?, shift_pos(span.end, delta)?)
            }
            BaseSpan::Enveloping(span) => {
                let children = span
                    .spans
                    .iter()
                    .map(|child| child.shift(delta))
                    .collect::<LayerResult<Vec<_>>>()?;
                BaseSpan::enveloping(children)
            }
        }
    }

    /// `self` lies within `other`.
    pub fn is_within(&self, other: &BaseSpan) -> bool {
        other.start() <= self.start() && self.end() <= other.end()
    }
}

fn shift_pos(pos: usize, delta: isize) -> LayerResult<usize> {
    let shifted = pos as isize + delta;
    if shifted < 0 {
        return Err(LayerError::invalid_span(format!(
            "shifting position {} by {} is negative",
            pos, delta
        )));
    }
    Ok(shifted as usize)
}

impl Ord for BaseSpan {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.start(), self.end())
            .cmp(&(other.start(), other.end()))
            .then_with(|| self.level().cmp(&other.level()))
            .then_with(|| match (self, other) {
                (BaseSpan::Enveloping(a), BaseSpan::Enveloping(b)) => a.spans.cmp(&b.spans),
                _ => Ordering::Equal,
            })
    }
}

impl PartialOrd for BaseSpan {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<ElementaryBaseSpan> for BaseSpan {
    fn from(span: ElementaryBaseSpan) -> Self {
        BaseSpan::Elementary(span)
    }
}

impl fmt::Display for BaseSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BaseSpan::Elementary(span) => write!(f, "({}, {})", span.start, span.end),
            BaseSpan::Enveloping(span) => {
                f.write_str("[")?;
                for (i, child) in span.spans.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// Anything with a position in the text.
pub trait Located {
    fn base_span(&self) -> &BaseSpan;

    fn start(&self) -> usize {
        self.base_span().start()
    }

    fn end(&self) -> usize {
        self.base_span().end()
    }
}

impl Located for BaseSpan {
    fn base_span(&self) -> &BaseSpan {
        self
    }
}

impl<T: Located + ?Sized> Located for &T {
    fn base_span(&self) -> &BaseSpan {
        (**self).base_span()
    }
}

// ======== serde ========

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BaseSpanRepr {
    Pair(usize, usize),
    Nested(Vec<BaseSpanRepr>),
}

impl BaseSpanRepr {
    fn from_span(span: &BaseSpan) -> Self {
        match span {
            BaseSpan::Elementary(span) => BaseSpanRepr::Pair(span.start, span.end),
            BaseSpan::Enveloping(span) => {
                BaseSpanRepr::Nested(span.spans.iter().map(BaseSpanRepr::from_span).collect())
            }
        }
    }

    fn into_span(self) -> LayerResult<BaseSpan> {
        match self {
            BaseSpanRepr::Pair(start, end) => BaseSpan::elementary(start, end),
            BaseSpanRepr::Nested(children) => BaseSpan::enveloping(
                children
                    .into_iter()
                    .map(BaseSpanRepr::into_span)
                    .collect::<LayerResult<Vec<_>>>()?,
            ),
        }
    }
}

impl Serialize for BaseSpan {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BaseSpanRepr::from_span(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for BaseSpan {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BaseSpanRepr::deserialize(deserializer)?
            .into_span()
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elementary_rejects_reversed_interval() {
        assert!(BaseSpan::elementary(3, 2).is_err());
        assert!(BaseSpan::elementary(2, 2).unwrap().is_empty());
    }

    #[test]
    fn test_enveloping_levels() {
        let words = BaseSpan::from_ranges(&[(0, 5), (6, 11)]).unwrap();
        assert_eq!(words.level(), 1);
        assert_eq!((words.start(), words.end()), (0, 11));

        let clauses = BaseSpan::enveloping(vec![words.clone()]).unwrap();
        assert_eq!(clauses.level(), 2);
        assert_eq!(clauses.flatten().len(), 2);

        let mixed = BaseSpan::enveloping(vec![BaseSpan::elementary(0, 1).unwrap(), words]);
        assert!(mixed.is_err());
        assert!(BaseSpan::enveloping(Vec::new()).is_err());
        assert!(BaseSpan::from_ranges(&[(6, 11), (0, 5)]).is_err());
    }

    #[test]
    fn test_ordering_is_positional_first() {
        let mut spans = vec![
            BaseSpan::elementary(2, 4).unwrap(),
            BaseSpan::from_ranges(&[(0, 1), (2, 4)]).unwrap(),
            BaseSpan::elementary(0, 4).unwrap(),
            BaseSpan::from_ranges(&[(0, 4)]).unwrap(),
        ];
        spans.sort();
        let rendered: Vec<String> = spans.iter().map(|s| s.to_string()).collect();
        assert_eq!(rendered, vec!["(0, 4)", "[(0, 1), (2, 4)]", "[(0, 4)]", "(2, 4)"]);
    }

    #[test]
    fn test_shift() {
        let span = BaseSpan::from_ranges(&[(3, 5), (6, 8)]).unwrap();
        assert_eq!(span.shift(-3).unwrap(), BaseSpan::from_ranges(&[(0, 2), (3, 5)]).unwrap());
        assert!(span.shift(-4).is_err());
    }

    #[test]
    fn test_serde_shape() {
        let nested = BaseSpan::enveloping(vec![BaseSpan::from_ranges(&[(0, 1), (2, 3)]).unwrap()])
            .unwrap();
        let json = serde_json::to_string(&nested).unwrap();
        assert_eq!(json, "[[[0,1],[2,3]]]");
        let back: BaseSpan = serde_json::from_str(&json).unwrap();
        assert_eq!(back, nested);
        assert!(serde_json::from_str::<BaseSpan>("[5,1]").is_err());
    }
}
