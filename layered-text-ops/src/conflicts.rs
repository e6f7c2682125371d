//! Choosing among overlapping candidate spans.
//!
//! Two families live here. The free functions ([`resolve_max_coverage`],
//! [`keep_maximal`], [`keep_minimal`]) work on any sorted or unsorted slice of
//! [`Located`] candidates and return the survivors. The layer-level resolvers
//! ([`resolve_conflicts`], [`resolve_annotation_groups`]) edit a [`Layer`] in
//! place, optionally ranking annotations by a priority attribute where a
//! lower value wins.

use crate::iterators::{iterate_intersecting_spans, spans_intersect};
use layered_text::{AttributeValue, Layer, LayerError, LayerResult, Located};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Sorts candidate positions by `(start, end)`, keeping input order for ties.
fn sorted_indices<S: Located>(candidates: &[S]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by_key(|&i| (candidates[i].start(), candidates[i].end()));
    order
}

/// Picks a pairwise non-intersecting subset of `candidates` covering as many
/// positions as possible.
///
/// Weighted interval scheduling over the candidates sorted by
/// `(start, end)`. Among subsets of equal coverage the one reached through
/// the earlier candidates wins, so spans adding no coverage are left out. The
/// result is sorted and applying the function to it returns it unchanged.
pub fn resolve_max_coverage<S: Located>(candidates: &[S]) -> Vec<&S> {
    let order = sorted_indices(candidates);
    let spans: Vec<&S> = order.iter().map(|&i| &candidates[i]).collect();

    // best[i]: positions covered by the best chain ending with spans[i]
    let mut best: Vec<usize> = Vec::with_capacity(spans.len());
    let mut previous: Vec<Option<usize>> = Vec::with_capacity(spans.len());
    for (i, span) in spans.iter().enumerate() {
        let mut chosen: Option<usize> = None;
        for j in 0..i {
            if spans[j].end() <= span.start() && best[j] > chosen.map_or(0, |c| best[c]) {
                chosen = Some(j);
            }
        }
        let covered = chosen.map_or(0, |c| best[c]);
        best.push(covered + (span.end() - span.start()));
        previous.push(chosen);
    }

    let mut last: Option<usize> = None;
    for i in 0..spans.len() {
        if last.map_or(true, |l| best[i] > best[l]) {
            last = Some(i);
        }
    }

    let mut kept = Vec::new();
    while let Some(i) = last {
        kept.push(spans[i]);
        last = previous[i];
    }
    kept.reverse();
    kept
}

/// Drops every candidate lying within another candidate. Of identical
/// candidates the first one stays.
pub fn keep_maximal<S: Located>(candidates: &[S]) -> Vec<&S> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (&candidates[a], &candidates[b]);
        a.start().cmp(&b.start()).then(b.end().cmp(&a.end()))
    });

    let mut kept = Vec::new();
    let mut reach: Option<usize> = None;
    for i in order {
        let span = &candidates[i];
        if reach.map_or(true, |end| span.end() > end) {
            reach = Some(span.end());
            kept.push(span);
        }
    }
    kept
}

/// Drops every candidate that contains another candidate. Of identical
/// candidates the first one stays.
pub fn keep_minimal<S: Located>(candidates: &[S]) -> Vec<&S> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| {
        let (a, b) = (&candidates[a], &candidates[b]);
        a.end().cmp(&b.end()).then(b.start().cmp(&a.start()))
    });

    let mut kept = Vec::new();
    let mut latest_start: Option<usize> = None;
    for i in order {
        let span = &candidates[i];
        if latest_start.map_or(true, |start| start < span.start()) {
            kept.push(span);
        }
        latest_start = Some(latest_start.map_or(span.start(), |start| start.max(span.start())));
    }
    kept.sort_by_key(|span| (span.start(), span.end()));
    kept
}

/// Span-level filter applied after the priority pass of
/// [`resolve_conflicts`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictStrategy {
    /// No span filtering.
    KeepAll,
    /// Spans lying within another span are removed.
    KeepMaximal,
    /// Sweeping left to right, a span replaces the span it lies in and is
    /// dropped when it only partially overlaps the previous survivor.
    KeepMinimal,
}

impl Default for ConflictStrategy {
    fn default() -> Self {
        ConflictStrategy::KeepMaximal
    }
}

impl FromStr for ConflictStrategy {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALL" => Ok(ConflictStrategy::KeepAll),
            "MAX" => Ok(ConflictStrategy::KeepMaximal),
            "MIN" => Ok(ConflictStrategy::KeepMinimal),
            _ => Err(LayerError::invalid_argument(format!(
                "unknown conflict resolving strategy {:?}, expected ALL, MAX or MIN",
                s
            ))),
        }
    }
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictStrategy::KeepAll => "ALL",
            ConflictStrategy::KeepMaximal => "MAX",
            ConflictStrategy::KeepMinimal => "MIN",
        })
    }
}

/// What [`resolve_conflicts`] found before removing anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictStatus {
    /// Number of intersecting span pairs in the input layer.
    pub number_of_conflicts: usize,
}

fn compare_priority(a: &AttributeValue, b: &AttributeValue) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

fn require_attribute(layer: &Layer, attribute: &str) -> LayerResult<()> {
    if layer.has_attribute(attribute) {
        Ok(())
    } else {
        Err(LayerError::UnknownAttribute {
            layer: layer.name().to_string(),
            attribute: attribute.to_string(),
        })
    }
}

/// For each span, which annotations carry the extremal priority.
fn extremal_annotations(
    layer: &Layer,
    attribute: &str,
    wanted: Ordering,
    keep_equal: bool,
) -> Vec<bool> {
    let null = AttributeValue::Null;
    let mut decisions = Vec::with_capacity(layer.annotation_count());
    for span in layer {
        let values: Vec<&AttributeValue> = span
            .annotations()
            .iter()
            .map(|annotation| annotation.get(attribute).unwrap_or(&null))
            .collect();
        let extremum = values
            .iter()
            .copied()
            .fold(None, |acc: Option<&AttributeValue>, value| match acc {
                Some(current) if compare_priority(value, current) != wanted => Some(current),
                _ => Some(value),
            });
        let mut taken = false;
        for value in values {
            let hit = extremum.map_or(false, |e| compare_priority(value, e) == Ordering::Equal);
            decisions.push(hit && (keep_equal || !taken));
            taken |= hit;
        }
    }
    decisions
}

fn retain_by_flags(layer: &mut Layer, annotation_flags: Vec<bool>) {
    let mut flags = annotation_flags.into_iter();
    layer.retain_annotations(|_, _| flags.next().unwrap_or(false));
}

fn retain_spans_by_flags(layer: &mut Layer, span_flags: Vec<bool>) {
    let mut flags = span_flags.into_iter();
    layer.retain_spans(|_| flags.next().unwrap_or(false));
}

/// Removes conflicting spans from `layer` in place.
///
/// With a priority attribute, ambiguous spans first keep only their
/// lowest-priority annotations (only the first of them unless
/// `keep_equal`), then spans are visited by ascending priority and a span
/// intersecting an already kept span of strictly lower priority is removed.
/// Spans of equal priority never eliminate each other. `strategy` is
/// applied to what remains.
pub fn resolve_conflicts(
    layer: &mut Layer,
    strategy: ConflictStrategy,
    priority_attribute: Option<&str>,
    keep_equal: bool,
) -> LayerResult<ConflictStatus> {
    let status = ConflictStatus {
        number_of_conflicts: iterate_intersecting_spans(layer.spans()).count(),
    };
    log::debug!(
        "resolving {} conflicts in layer {:?} with {}",
        status.number_of_conflicts,
        layer.name(),
        strategy
    );

    if let Some(attribute) = priority_attribute {
        require_attribute(layer, attribute)?;
        let flags = extremal_annotations(layer, attribute, Ordering::Less, keep_equal);
        retain_by_flags(layer, flags);

        let null = AttributeValue::Null;
        let spans = layer.spans();
        let priorities: Vec<&AttributeValue> = spans
            .iter()
            .map(|span| span.value(attribute).unwrap_or(&null))
            .collect();
        let mut order: Vec<usize> = (0..spans.len()).collect();
        order.sort_by(|&a, &b| compare_priority(priorities[a], priorities[b]));

        let mut keep = vec![false; spans.len()];
        let mut kept: Vec<usize> = Vec::new();
        for i in order {
            let beaten = kept.iter().any(|&k| {
                compare_priority(priorities[k], priorities[i]) == Ordering::Less
                    && spans_intersect(&spans[k], &spans[i])
            });
            if !beaten {
                keep[i] = true;
                kept.push(i);
            }
        }
        retain_spans_by_flags(layer, keep);
    }

    match strategy {
        ConflictStrategy::KeepAll => {}
        ConflictStrategy::KeepMaximal => {
            let spans = layer.spans();
            let mut keep = vec![false; spans.len()];
            for survivor in keep_maximal(spans) {
                if let Some(i) = layer.index_of(survivor.base_span()) {
                    keep[i] = true;
                }
            }
            retain_spans_by_flags(layer, keep);
        }
        ConflictStrategy::KeepMinimal => {
            let keep = innermost_sweep(layer);
            retain_spans_by_flags(layer, keep);
        }
    }

    Ok(status)
}

fn innermost_sweep(layer: &Layer) -> Vec<bool> {
    let spans = layer.spans();
    let mut keep = vec![false; spans.len()];
    let mut last: Option<usize> = None;
    for (i, span) in spans.iter().enumerate() {
        match last {
            Some(l) if span.start() < spans[l].end() => {
                if span.end() <= spans[l].end() {
                    keep[l] = false;
                    keep[i] = true;
                    last = Some(i);
                }
            }
            _ => {
                keep[i] = true;
                last = Some(i);
            }
        }
    }
    keep
}

/// Annotation filter for annotations sharing one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupStrategy {
    All,
    /// Annotations with the greatest priority value.
    Max,
    /// Annotations with the smallest priority value.
    Min,
}

impl FromStr for GroupStrategy {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ALL" => Ok(GroupStrategy::All),
            "MAX" => Ok(GroupStrategy::Max),
            "MIN" => Ok(GroupStrategy::Min),
            _ => Err(LayerError::invalid_argument(format!(
                "unknown group strategy {:?}, expected ALL, MAX or MIN",
                s
            ))),
        }
    }
}

/// Keeps, per location, the annotations whose `priority_attribute` is
/// extremal. Ties survive together when `keep_equal`, otherwise the first
/// one in insertion order is kept.
pub fn resolve_annotation_groups(
    layer: &mut Layer,
    strategy: GroupStrategy,
    priority_attribute: &str,
    keep_equal: bool,
) -> LayerResult<()> {
    require_attribute(layer, priority_attribute)?;
    let wanted = match strategy {
        GroupStrategy::All => return Ok(()),
        GroupStrategy::Max => Ordering::Greater,
        GroupStrategy::Min => Ordering::Less,
    };
    let flags = extremal_annotations(layer, priority_attribute, wanted, keep_equal);
    retain_by_flags(layer, flags);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use layered_text::BaseSpan;

    fn spans(ranges: &[(usize, usize)]) -> Vec<BaseSpan> {
        ranges
            .iter()
            .map(|&(start, end)| BaseSpan::elementary(start, end).unwrap())
            .collect()
    }

    fn ranges<S: Located>(spans: &[&S]) -> Vec<(usize, usize)> {
        spans.iter().map(|s| (s.start(), s.end())).collect()
    }

    #[test]
    fn test_keep_maximal_and_minimal() {
        let candidates = spans(&[(3, 6), (1, 8), (2, 4), (1, 8), (9, 10)]);
        assert_eq!(ranges(&keep_maximal(&candidates)), vec![(1, 8), (9, 10)]);
        assert_eq!(ranges(&keep_minimal(&candidates)), vec![(2, 4), (3, 6), (9, 10)]);
    }

    #[test]
    fn test_strategy_names() {
        assert_eq!("max".parse::<ConflictStrategy>().unwrap(), ConflictStrategy::KeepMaximal);
        assert_eq!(ConflictStrategy::KeepMinimal.to_string(), "MIN");
        assert!("unexpected value".parse::<ConflictStrategy>().is_err());
        assert_eq!("Min".parse::<GroupStrategy>().unwrap(), GroupStrategy::Min);
    }
}
