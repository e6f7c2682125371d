use crate::annotation::Annotation;
use crate::base_span::{BaseSpan, Located};
use crate::layer::{Layer, LayerMode};
use crate::text::Text;
use crate::value::AttributeValue;
use serde::Serialize;
use std::fmt;

/// A location plus its annotations.
///
/// Spans are owned by a [`Layer`] and only change through it. Use
/// [`SpanRef`] to reach the owning layer from a span.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    pub(crate) base_span: BaseSpan,
    pub(crate) annotations: Vec<Annotation>,
}

impl Span {
    pub(crate) fn new(base_span: BaseSpan) -> Self {
        Span {
            base_span,
            annotations: Vec::new(),
        }
    }

    pub fn base_span(&self) -> &BaseSpan {
        &self.base_span
    }

    pub fn start(&self) -> usize {
        self.base_span.start()
    }

    pub fn end(&self) -> usize {
        self.base_span.end()
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn annotation(&self, index: usize) -> Option<&Annotation> {
        self.annotations.get(index)
    }

    /// Value of `attribute` in the first annotation.
    pub fn value(&self, attribute: &str) -> Option<&AttributeValue> {
        self.annotations.first()?.get(attribute)
    }

    /// Values of `attribute` across all annotations, in insertion order.
    pub fn values(&self, attribute: &str) -> Vec<&AttributeValue> {
        self.annotations
            .iter()
            .filter_map(|a| a.get(attribute))
            .collect()
    }

    pub fn level(&self) -> usize {
        self.base_span.level()
    }

    /// Appends `annotation` unless an equal one is already present.
    /// Returns `true` if it was added.
    pub(crate) fn push_annotation(&mut self, annotation: Annotation) -> bool {
        if self.annotations.contains(&annotation) {
            return false;
        }
        self.annotations.push(annotation);
        true
    }
}

impl Located for Span {
    fn base_span(&self) -> &BaseSpan {
        &self.base_span
    }
}

/// Handle to a span together with the layer that owns it.
#[derive(Clone, Copy)]
pub struct SpanRef<'a> {
    layer: &'a Layer,
    index: usize,
}

impl<'a> SpanRef<'a> {
    pub(crate) fn new(layer: &'a Layer, index: usize) -> Self {
        SpanRef { layer, index }
    }

    pub fn layer(&self) -> &'a Layer {
        self.layer
    }

    /// Position of the span inside its layer.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn span(&self) -> &'a Span {
        &self.layer.spans()[self.index]
    }

    pub fn base_span(&self) -> &'a BaseSpan {
        &self.span().base_span
    }

    pub fn start(&self) -> usize {
        self.span().start()
    }

    pub fn end(&self) -> usize {
        self.span().end()
    }

    pub fn annotations(&self) -> &'a [Annotation] {
        &self.span().annotations
    }

    pub fn value(&self, attribute: &str) -> Option<&'a AttributeValue> {
        self.span().value(attribute)
    }

    /// Text covered from the first to the last position of the span.
    pub fn enclosing_text<'t>(&self, text: &'t Text) -> &'t str {
        text.slice(self.start(), self.end())
    }

    /// Text of every elementary piece of the span.
    pub fn texts<'t>(&self, text: &'t Text) -> Vec<&'t str> {
        text.span_texts(self.base_span())
    }

    /// Span of the parent layer at the same location.
    pub fn parent<'t>(&self, text: &'t Text) -> Option<SpanRef<'t>> {
        match self.layer.mode() {
            LayerMode::Parent(parent) => text.layer(parent)?.span_ref_at(self.base_span()),
            _ => None,
        }
    }

    /// Spans of the enveloped layer that make up this span.
    pub fn children<'t>(&self, text: &'t Text) -> Vec<SpanRef<'t>> {
        match self.layer.mode() {
            LayerMode::Enveloping(enveloped) => match text.layer(enveloped) {
                Some(inner) => self
                    .base_span()
                    .children()
                    .iter()
                    .filter_map(|child| inner.span_ref_at(child))
                    .collect(),
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

impl<'a> Located for SpanRef<'a> {
    fn base_span(&self) -> &BaseSpan {
        &self.span().base_span
    }
}

impl<'a> fmt::Debug for SpanRef<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpanRef")
            .field("layer", &self.layer.name())
            .field("base_span", &self.span().base_span)
            .field("annotations", &self.span().annotations)
            .finish()
    }
}

impl<'a> PartialEq for SpanRef<'a> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.layer, other.layer) && self.index == other.index
    }
}
