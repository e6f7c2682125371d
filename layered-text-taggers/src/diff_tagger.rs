//! Differences between two layers of one text.
//!
//! [`DiffTagger`] walks an old and a new layer by location and marks every
//! location where they differ:
//!
//! - `missing` - the location is only in the old layer
//! - `extra` - the location is only in the new layer
//! - `modified` - both layers have the location but the annotations differ;
//!   only the annotations the two sides do not share are reported
//!
//! A missing span intersecting an extra span is a conflict, further split
//! into [`ConflictKind`]s. The counts end up in a [`DiffSummary`] stored in
//! the diff layer's meta. They satisfy:
//!
//! ```text
//! unchanged_spans + modified_spans + missing_spans = spans in old layer
//! unchanged_spans + modified_spans + extra_spans   = spans in new layer
//! unchanged_annotations + missing_annotations      = annotations in old layer
//! unchanged_annotations + extra_annotations        = annotations in new layer
//! overlapped + prolonged + shortened = conflicts  <= missing_spans * extra_spans
//! ```

use crate::errors::{TaggerError, TaggerResult};
use crate::tagger::{InputLayers, Tagger, TaggerDescriptor};
use layered_text::{Annotation, AttributeValue, BaseSpan, Layer, LayerError, Located, Span, Text};
use layered_text_ops::{diff_layer, iterate_intersecting_pairs, iterate_intersecting_spans};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Meta key of the [`DiffSummary`].
pub const DIFF_SUMMARY_KEY: &str = "diff_summary";

/// How a location differs between the two layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpanStatus {
    Modified,
    Missing,
    Extra,
}

impl SpanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpanStatus::Modified => "modified",
            SpanStatus::Missing => "missing",
            SpanStatus::Extra => "extra",
        }
    }
}

impl fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SpanStatus {
    type Err = LayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "modified" => Ok(SpanStatus::Modified),
            "missing" => Ok(SpanStatus::Missing),
            "extra" => Ok(SpanStatus::Extra),
            other => Err(LayerError::invalid_argument(format!("unknown span status {:?}", other))),
        }
    }
}

/// Relation of a missing span to an extra span intersecting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// Partial overlap; neither contains the other.
    Overlapped,
    /// The new span contains the old one.
    Prolonged,
    /// The old span contains the new one.
    Shortened,
}

impl ConflictKind {
    /// Classifies an intersecting `missing`/`extra` pair.
    pub fn classify<A: Located, B: Located>(missing: &A, extra: &B) -> ConflictKind {
        let (a_start, a_end) = (missing.start(), missing.end());
        let (b_start, b_end) = (extra.start(), extra.end());
        if (a_start < b_start && a_end < b_end) || (a_start > b_start && a_end > b_end) {
            ConflictKind::Overlapped
        } else if b_start <= a_start && a_end <= b_end {
            ConflictKind::Prolonged
        } else {
            ConflictKind::Shortened
        }
    }
}

/// Counts of a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub modified_spans: usize,
    pub missing_spans: usize,
    pub extra_spans: usize,
    pub unchanged_spans: usize,
    pub missing_annotations: usize,
    pub extra_annotations: usize,
    pub unchanged_annotations: usize,
    pub overlapped: usize,
    pub prolonged: usize,
    pub shortened: usize,
    pub conflicts: usize,
}

impl DiffSummary {
    fn fields(&self) -> [(&'static str, usize); 11] {
        [
            ("modified_spans", self.modified_spans),
            ("missing_spans", self.missing_spans),
            ("extra_spans", self.extra_spans),
            ("unchanged_spans", self.unchanged_spans),
            ("missing_annotations", self.missing_annotations),
            ("extra_annotations", self.extra_annotations),
            ("unchanged_annotations", self.unchanged_annotations),
            ("overlapped", self.overlapped),
            ("prolonged", self.prolonged),
            ("shortened", self.shortened),
            ("conflicts", self.conflicts),
        ]
    }

    pub fn to_value(&self) -> AttributeValue {
        AttributeValue::Map(
            self.fields()
                .iter()
                .map(|&(name, count)| (name.to_string(), AttributeValue::from(count)))
                .collect(),
        )
    }

    /// Reads the summary a [`DiffTagger`] stored in `layer`'s meta.
    pub fn from_layer(layer: &Layer) -> Option<DiffSummary> {
        let entries = layer.meta().get(DIFF_SUMMARY_KEY)?.as_map()?;
        let count = |name: &str| -> Option<usize> {
            entries
                .get(name)?
                .as_i64()
                .and_then(|count| usize::try_from(count).ok())
        };
        Some(DiffSummary {
            modified_spans: count("modified_spans")?,
            missing_spans: count("missing_spans")?,
            extra_spans: count("extra_spans")?,
            unchanged_spans: count("unchanged_spans")?,
            missing_annotations: count("missing_annotations")?,
            extra_annotations: count("extra_annotations")?,
            unchanged_annotations: count("unchanged_annotations")?,
            overlapped: count("overlapped")?,
            prolonged: count("prolonged")?,
            shortened: count("shortened")?,
            conflicts: count("conflicts")?,
        })
    }

    fn count_conflict(&mut self, kind: ConflictKind) {
        match kind {
            ConflictKind::Overlapped => self.overlapped += 1,
            ConflictKind::Prolonged => self.prolonged += 1,
            ConflictKind::Shortened => self.shortened += 1,
        }
        self.conflicts += 1;
    }
}

type Comparator = Box<dyn Fn(&Span, &Span) -> bool + Send + Sync>;

/// Compares an old and a new layer and produces a diff layer.
///
/// The diff layer is ambiguous, has the structure of the old layer and the
/// attributes `span_status`, `input_layer_name` and any output attributes
/// copied from the compared annotations.
pub struct DiffTagger {
    descriptor: TaggerDescriptor,
    layer_a: String,
    layer_b: String,
    copied_attributes: Vec<String>,
    status_attribute: String,
    input_layer_attribute: String,
    comparator: Comparator,
}

impl DiffTagger {
    pub fn new(
        layer_a: impl Into<String>,
        layer_b: impl Into<String>,
        output_layer: impl Into<String>,
    ) -> Self {
        let layer_a = layer_a.into();
        let layer_b = layer_b.into();
        let descriptor = TaggerDescriptor::new("DiffTagger", output_layer)
            .with_input_layers([layer_a.clone(), layer_b.clone()])
            .with_ambiguous(true);
        let mut tagger = DiffTagger {
            descriptor,
            layer_a,
            layer_b,
            copied_attributes: Vec::new(),
            status_attribute: "span_status".to_string(),
            input_layer_attribute: "input_layer_name".to_string(),
            comparator: Box::new(|a: &Span, b: &Span| a.annotations() == b.annotations()),
        };
        tagger.refresh_attributes();
        tagger
    }

    /// Attributes copied from the compared annotations into the diff layer.
    pub fn with_output_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.copied_attributes = attributes.into_iter().map(Into::into).collect();
        self.refresh_attributes();
        self
    }

    /// Decides whether two spans at the same location are equal. Defaults to
    /// comparing their annotations.
    pub fn with_comparator<F>(mut self, comparator: F) -> Self
    where
        F: Fn(&Span, &Span) -> bool + Send + Sync + 'static,
    {
        self.comparator = Box::new(comparator);
        self
    }

    pub fn with_status_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.status_attribute = attribute.into();
        self.refresh_attributes();
        self
    }

    pub fn with_input_layer_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.input_layer_attribute = attribute.into();
        self.refresh_attributes();
        self
    }

    fn refresh_attributes(&mut self) {
        let mut attributes = Vec::with_capacity(self.copied_attributes.len() + 2);
        for own in [&self.status_attribute, &self.input_layer_attribute] {
            if !self.copied_attributes.contains(own) {
                attributes.push(own.clone());
            }
        }
        attributes.extend(self.copied_attributes.iter().cloned());
        self.descriptor.output_attributes = attributes;
    }

    fn check_comparable(&self, a: &Layer, b: &Layer) -> TaggerResult<()> {
        let incompatible = |message: String| TaggerError::IncompatibleLayers {
            tagger: self.descriptor.name.clone(),
            message,
        };
        if a.mode() != b.mode() {
            return Err(incompatible(format!(
                "{:?} is {:?} but {:?} is {:?}",
                a.name(),
                a.mode(),
                b.name(),
                b.mode()
            )));
        }
        let mut a_attributes = a.attributes().to_vec();
        let mut b_attributes = b.attributes().to_vec();
        a_attributes.sort();
        b_attributes.sort();
        if a_attributes != b_attributes {
            return Err(incompatible(format!(
                "attributes {:?} and {:?} differ",
                a.attributes(),
                b.attributes()
            )));
        }
        Ok(())
    }

    fn add_annotations(
        &self,
        layer: &mut Layer,
        base_span: &BaseSpan,
        status: SpanStatus,
        input_layer: &str,
        annotations: &[&Annotation],
    ) -> TaggerResult<()> {
        for annotation in annotations {
            let mut values: Vec<(String, AttributeValue)> = self
                .copied_attributes
                .iter()
                .filter_map(|attribute| {
                    annotation
                        .get(attribute)
                        .map(|value| (attribute.clone(), value.clone()))
                })
                .collect();
            values.push((self.status_attribute.clone(), AttributeValue::from(status.as_str())));
            values.push((self.input_layer_attribute.clone(), AttributeValue::from(input_layer)));
            layer.add_annotation(base_span.clone(), values)?;
        }
        Ok(())
    }
}

impl fmt::Debug for DiffTagger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiffTagger")
            .field("descriptor", &self.descriptor)
            .field("status_attribute", &self.status_attribute)
            .field("input_layer_attribute", &self.input_layer_attribute)
            .finish()
    }
}

fn only_in<'a>(side: &'a Span, other: &Span) -> Vec<&'a Annotation> {
    side.annotations()
        .iter()
        .filter(|annotation| !other.annotations().contains(*annotation))
        .collect()
}

impl Tagger for DiffTagger {
    fn descriptor(&self) -> &TaggerDescriptor {
        &self.descriptor
    }

    fn make_layer(&self, _text: &Text, inputs: &InputLayers<'_>) -> TaggerResult<Layer> {
        let a = inputs.get(&self.layer_a)?;
        let b = inputs.get(&self.layer_b)?;
        self.check_comparable(a, b)?;

        let mut layer = Layer::builder(self.descriptor.output_layer.clone())
            .attributes(self.descriptor.output_attributes.iter().cloned())
            .null_defaults()
            .mode(a.mode().clone())
            .ambiguous(true)
            .build()?;

        let mut summary = DiffSummary::default();
        let mut missing: Vec<&BaseSpan> = Vec::new();
        let mut extra: Vec<&BaseSpan> = Vec::new();

        for (old, new) in diff_layer(a, b, |x, y| (self.comparator)(x, y)) {
            match (old, new) {
                (Some(old), None) => {
                    summary.missing_spans += 1;
                    summary.missing_annotations += old.annotations().len();
                    missing.push(old.base_span());
                    let annotations: Vec<&Annotation> = old.annotations().iter().collect();
                    self.add_annotations(
                        &mut layer,
                        old.base_span(),
                        SpanStatus::Missing,
                        a.name(),
                        &annotations,
                    )?;
                }
                (None, Some(new)) => {
                    summary.extra_spans += 1;
                    summary.extra_annotations += new.annotations().len();
                    extra.push(new.base_span());
                    let annotations: Vec<&Annotation> = new.annotations().iter().collect();
                    self.add_annotations(
                        &mut layer,
                        new.base_span(),
                        SpanStatus::Extra,
                        b.name(),
                        &annotations,
                    )?;
                }
                (Some(old), Some(new)) => {
                    let old_only = only_in(old, new);
                    let new_only = only_in(new, old);
                    if old_only.is_empty() && new_only.is_empty() {
                        continue;
                    }
                    summary.modified_spans += 1;
                    summary.missing_annotations += old_only.len();
                    summary.extra_annotations += new_only.len();
                    let location = old.base_span();
                    self.add_annotations(
                        &mut layer,
                        location,
                        SpanStatus::Modified,
                        a.name(),
                        &old_only,
                    )?;
                    self.add_annotations(
                        &mut layer,
                        location,
                        SpanStatus::Modified,
                        b.name(),
                        &new_only,
                    )?;
                }
                (None, None) => {}
            }
        }

        for (old, new) in iterate_intersecting_pairs(&missing, &extra) {
            summary.count_conflict(ConflictKind::classify(old, new));
        }
        summary.unchanged_spans = a.len() - summary.modified_spans - summary.missing_spans;
        summary.unchanged_annotations = a.annotation_count() - summary.missing_annotations;

        log::debug!(
            "diff of {:?} and {:?}: {} modified, {} missing, {} extra spans",
            a.name(),
            b.name(),
            summary.modified_spans,
            summary.missing_spans,
            summary.extra_spans
        );
        layer.meta_mut().insert(DIFF_SUMMARY_KEY.to_string(), summary.to_value());
        Ok(layer)
    }
}

fn status_of(span: &Span, status_attribute: &str) -> Option<SpanStatus> {
    span.annotations()
        .first()?
        .get(status_attribute)?
        .as_str()?
        .parse()
        .ok()
}

fn with_status<'a>(
    diff: &'a Layer,
    status_attribute: &'a str,
    status: SpanStatus,
) -> impl Iterator<Item = &'a Span> + 'a {
    diff.iter().filter(move |span| status_of(span, status_attribute) == Some(status))
}

pub fn iterate_modified<'a>(
    diff: &'a Layer,
    status_attribute: &'a str,
) -> impl Iterator<Item = &'a Span> + 'a {
    with_status(diff, status_attribute, SpanStatus::Modified)
}

pub fn iterate_missing<'a>(
    diff: &'a Layer,
    status_attribute: &'a str,
) -> impl Iterator<Item = &'a Span> + 'a {
    with_status(diff, status_attribute, SpanStatus::Missing)
}

pub fn iterate_extra<'a>(
    diff: &'a Layer,
    status_attribute: &'a str,
) -> impl Iterator<Item = &'a Span> + 'a {
    with_status(diff, status_attribute, SpanStatus::Extra)
}

/// Intersecting `(missing, extra)` span pairs of a diff layer.
pub fn iterate_conflicts<'a>(
    diff: &'a Layer,
    status_attribute: &'a str,
) -> impl Iterator<Item = (&'a Span, &'a Span)> + 'a {
    iterate_intersecting_spans(diff.spans()).filter_map(move |(x, y)| {
        match (status_of(x, status_attribute), status_of(y, status_attribute)) {
            (Some(SpanStatus::Missing), Some(SpanStatus::Extra)) => Some((x, y)),
            (Some(SpanStatus::Extra), Some(SpanStatus::Missing)) => Some((y, x)),
            _ => None,
        }
    })
}

fn conflicts_of<'a>(
    diff: &'a Layer,
    status_attribute: &'a str,
    kind: ConflictKind,
) -> impl Iterator<Item = (&'a Span, &'a Span)> + 'a {
    iterate_conflicts(diff, status_attribute)
        .filter(move |(missing, extra)| ConflictKind::classify(*missing, *extra) == kind)
}

pub fn iterate_overlapped<'a>(
    diff: &'a Layer,
    status_attribute: &'a str,
) -> impl Iterator<Item = (&'a Span, &'a Span)> + 'a {
    conflicts_of(diff, status_attribute, ConflictKind::Overlapped)
}

pub fn iterate_prolonged<'a>(
    diff: &'a Layer,
    status_attribute: &'a str,
) -> impl Iterator<Item = (&'a Span, &'a Span)> + 'a {
    conflicts_of(diff, status_attribute, ConflictKind::Prolonged)
}

pub fn iterate_shortened<'a>(
    diff: &'a Layer,
    status_attribute: &'a str,
) -> impl Iterator<Item = (&'a Span, &'a Span)> + 'a {
    conflicts_of(diff, status_attribute, ConflictKind::Shortened)
}

/// Per-location summary of what changed, keyed by location.
pub fn statuses(diff: &Layer, status_attribute: &str) -> BTreeMap<BaseSpan, SpanStatus> {
    diff.iter()
        .filter_map(|span| Some((span.base_span().clone(), status_of(span, status_attribute)?)))
        .collect()
}
