//! Layers: named, sorted collections of annotated spans sharing one schema.
//!
//! ## Invariants
//!
//! - spans are strictly sorted by [`BaseSpan`] order, so no two spans share
//!   a location
//! - every span carries at least one annotation, exactly one if the layer is
//!   not ambiguous
//! - every annotation has a value for each declared attribute and nothing else
//! - all spans share one span level; enveloping layers have level >= 1
//!
//! ## Example
//!
//! ```ignore
//! let mut words = Layer::builder("words")
//!     .attributes(["normalized"])
//!     .default_value("normalized", AttributeValue::Null)
//!     .build()?;
//! words.add_annotation(BaseSpan::elementary(0, 5)?, [("normalized", "hello")])?;
//! ```

use crate::annotation::{Annotation, AnnotationMut};
use crate::base_span::BaseSpan;
use crate::errors::{LayerError, LayerResult};
use crate::span::{Span, SpanRef};
use crate::value::AttributeValue;
use std::collections::{BTreeMap, BTreeSet};

/// Names that spans expose as accessors and so cannot be attributes.
pub const RESERVED_ATTRIBUTES: &[&str] = &[
    "start",
    "end",
    "text",
    "enclosing_text",
    "base_span",
    "layer",
    "annotations",
    "parent",
    "spans",
];

/// How a layer relates to the layer below it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LayerMode {
    /// Independent spans over the raw text.
    Flat,
    /// Spans reuse the locations of the named layer.
    Parent(String),
    /// Spans are tuples of spans of the named layer.
    Enveloping(String),
}

impl LayerMode {
    pub fn parent(&self) -> Option<&str> {
        match self {
            LayerMode::Parent(name) => Some(name),
            _ => None,
        }
    }

    pub fn enveloping(&self) -> Option<&str> {
        match self {
            LayerMode::Enveloping(name) => Some(name),
            _ => None,
        }
    }

    /// The layer this mode refers to, if any.
    pub fn dependency(&self) -> Option<&str> {
        match self {
            LayerMode::Flat => None,
            LayerMode::Parent(name) | LayerMode::Enveloping(name) => Some(name),
        }
    }

    pub(crate) fn from_parts(
        layer: &str,
        parent: Option<String>,
        enveloping: Option<String>,
    ) -> LayerResult<Self> {
        match (parent, enveloping) {
            (None, None) => Ok(LayerMode::Flat),
            (Some(parent), None) => Ok(LayerMode::Parent(parent)),
            (None, Some(enveloping)) => Ok(LayerMode::Enveloping(enveloping)),
            (Some(parent), Some(enveloping)) => Err(LayerError::ConflictingStructure {
                layer: layer.to_string(),
                parent,
                enveloping,
            }),
        }
    }
}

impl Default for LayerMode {
    fn default() -> Self {
        LayerMode::Flat
    }
}

/// Checks that `name` can be used as a layer name.
pub fn validate_layer_name(name: &str) -> LayerResult<()> {
    if name.trim().is_empty() {
        return Err(LayerError::InvalidLayerName {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Checks an attribute schema for duplicates and reserved names.
pub fn validate_attributes(layer: &str, attributes: &[String]) -> LayerResult<()> {
    let mut seen = BTreeSet::new();
    for attribute in attributes {
        if RESERVED_ATTRIBUTES.contains(&attribute.as_str()) {
            return Err(LayerError::ReservedAttribute {
                layer: layer.to_string(),
                attribute: attribute.clone(),
            });
        }
        if !seen.insert(attribute.as_str()) {
            return Err(LayerError::DuplicateAttribute {
                layer: layer.to_string(),
                attribute: attribute.clone(),
            });
        }
    }
    Ok(())
}

/// Builder for [`Layer`]; all checks run in [`build`](LayerBuilder::build).
#[derive(Debug, Clone)]
pub struct LayerBuilder {
    name: String,
    attributes: Vec<String>,
    default_values: BTreeMap<String, AttributeValue>,
    parent: Option<String>,
    enveloping: Option<String>,
    ambiguous: bool,
    meta: BTreeMap<String, AttributeValue>,
}

impl LayerBuilder {
    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_value(
        mut self,
        attribute: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.default_values.insert(attribute.into(), value.into());
        self
    }

    pub fn default_values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        for (attribute, value) in values {
            self.default_values.insert(attribute.into(), value.into());
        }
        self
    }

    /// Uses [`AttributeValue::Null`] as default for every declared attribute
    /// that has no default yet.
    pub fn null_defaults(mut self) -> Self {
        for attribute in &self.attributes {
            self.default_values
                .entry(attribute.clone())
                .or_insert(AttributeValue::Null);
        }
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn enveloping(mut self, enveloping: impl Into<String>) -> Self {
        self.enveloping = Some(enveloping.into());
        self
    }

    pub fn mode(mut self, mode: LayerMode) -> Self {
        match mode {
            LayerMode::Flat => {
                self.parent = None;
                self.enveloping = None;
            }
            LayerMode::Parent(parent) => {
                self.parent = Some(parent);
                self.enveloping = None;
            }
            LayerMode::Enveloping(enveloping) => {
                self.parent = None;
                self.enveloping = Some(enveloping);
            }
        }
        self
    }

    pub fn ambiguous(mut self, ambiguous: bool) -> Self {
        self.ambiguous = ambiguous;
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }

    pub fn build(self) -> LayerResult<Layer> {
        validate_layer_name(&self.name)?;
        validate_attributes(&self.name, &self.attributes)?;
        if let Some(attribute) = self
            .default_values
            .keys()
            .find(|key| !self.attributes.contains(*key))
        {
            return Err(LayerError::UnknownAttribute {
                layer: self.name.clone(),
                attribute: attribute.clone(),
            });
        }
        let mode = LayerMode::from_parts(&self.name, self.parent, self.enveloping)?;
        if mode.dependency() == Some(self.name.as_str()) {
            return Err(LayerError::SelfReference { layer: self.name });
        }
        Ok(Layer {
            name: self.name,
            attributes: self.attributes,
            default_values: self.default_values,
            mode,
            ambiguous: self.ambiguous,
            meta: self.meta,
            spans: Vec::new(),
        })
    }
}

/// A named, sorted collection of spans with a fixed attribute schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    name: String,
    attributes: Vec<String>,
    default_values: BTreeMap<String, AttributeValue>,
    mode: LayerMode,
    ambiguous: bool,
    meta: BTreeMap<String, AttributeValue>,
    spans: Vec<Span>,
}

impl Layer {
    pub fn builder(name: impl Into<String>) -> LayerBuilder {
        LayerBuilder {
            name: name.into(),
            attributes: Vec::new(),
            default_values: BTreeMap::new(),
            parent: None,
            enveloping: None,
            ambiguous: false,
            meta: BTreeMap::new(),
        }
    }

    /// Flat, non-ambiguous layer without defaults.
    pub fn new<I, S>(name: impl Into<String>, attributes: I) -> LayerResult<Layer>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Layer::builder(name).attributes(attributes).build()
    }

    /// Builder preloaded with this layer's schema, mode, ambiguity and meta.
    pub fn to_builder(&self) -> LayerBuilder {
        let mut builder = Layer::builder(self.name.clone())
            .attributes(self.attributes.iter().cloned())
            .default_values(self.default_values.clone())
            .mode(self.mode.clone())
            .ambiguous(self.ambiguous);
        builder.meta = self.meta.clone();
        builder
    }

    /// Same schema and structure, no spans.
    pub fn empty_like(&self) -> Layer {
        Layer {
            name: self.name.clone(),
            attributes: self.attributes.clone(),
            default_values: self.default_values.clone(),
            mode: self.mode.clone(),
            ambiguous: self.ambiguous,
            meta: self.meta.clone(),
            spans: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn has_attribute(&self, attribute: &str) -> bool {
        self.attributes.iter().any(|a| a == attribute)
    }

    pub fn default_values(&self) -> &BTreeMap<String, AttributeValue> {
        &self.default_values
    }

    pub fn mode(&self) -> &LayerMode {
        &self.mode
    }

    pub fn parent(&self) -> Option<&str> {
        self.mode.parent()
    }

    pub fn enveloping(&self) -> Option<&str> {
        self.mode.enveloping()
    }

    pub fn is_ambiguous(&self) -> bool {
        self.ambiguous
    }

    pub fn meta(&self) -> &BTreeMap<String, AttributeValue> {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut BTreeMap<String, AttributeValue> {
        &mut self.meta
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Span> {
        self.spans.iter()
    }

    /// Spans paired with this layer.
    pub fn span_refs(&self) -> impl Iterator<Item = SpanRef<'_>> + '_ {
        (0..self.spans.len()).map(move |index| SpanRef::new(self, index))
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Level shared by all spans, `None` while the layer is empty.
    pub fn span_level(&self) -> Option<usize> {
        self.spans.first().map(Span::level)
    }

    /// Total number of annotations over all spans.
    pub fn annotation_count(&self) -> usize {
        self.spans.iter().map(|s| s.annotations.len()).sum()
    }

    pub fn index_of(&self, base_span: &BaseSpan) -> Option<usize> {
        self.spans
            .binary_search_by(|span| span.base_span.cmp(base_span))
            .ok()
    }

    pub fn get(&self, base_span: &BaseSpan) -> Option<&Span> {
        self.index_of(base_span).map(|i| &self.spans[i])
    }

    pub fn span_ref(&self, index: usize) -> Option<SpanRef<'_>> {
        if index < self.spans.len() {
            Some(SpanRef::new(self, index))
        } else {
            None
        }
    }

    pub fn span_ref_at(&self, base_span: &BaseSpan) -> Option<SpanRef<'_>> {
        self.index_of(base_span).map(|i| SpanRef::new(self, i))
    }

    /// Adds an annotation at `base_span`.
    ///
    /// Attributes not listed take the layer default. A location that is
    /// already present gets the annotation appended when the layer is
    /// ambiguous (an equal annotation is not added twice) and is rejected
    /// otherwise.
    pub fn add_annotation<I, K, V>(
        &mut self,
        base_span: BaseSpan,
        attributes: I,
    ) -> LayerResult<&Span>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        let annotation = self.make_annotation(attributes)?;
        self.check_level(&base_span)?;

        let index = match self
            .spans
            .binary_search_by(|span| span.base_span.cmp(&base_span))
        {
            Ok(index) => {
                if !self.ambiguous {
                    return Err(LayerError::DuplicateLocation {
                        layer: self.name.clone(),
                        start: base_span.start(),
                        end: base_span.end(),
                    });
                }
                self.spans[index].push_annotation(annotation);
                index
            }
            Err(index) => {
                let mut span = Span::new(base_span);
                span.push_annotation(annotation);
                self.spans.insert(index, span);
                index
            }
        };
        Ok(&self.spans[index])
    }

    /// Adds an annotation made only of default values.
    pub fn add_default_annotation(&mut self, base_span: BaseSpan) -> LayerResult<&Span> {
        self.add_annotation(base_span, std::iter::empty::<(String, AttributeValue)>())
    }

    fn make_annotation<I, K, V>(&self, attributes: I) -> LayerResult<Annotation>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttributeValue>,
    {
        let mut values = BTreeMap::new();
        for (attribute, value) in attributes {
            let attribute = attribute.into();
            if !self.has_attribute(&attribute) {
                return Err(LayerError::UnknownAttribute {
                    layer: self.name.clone(),
                    attribute,
                });
            }
            values.insert(attribute, value.into());
        }
        for attribute in &self.attributes {
            if values.contains_key(attribute) {
                continue;
            }
            match self.default_values.get(attribute) {
                Some(default) => {
                    values.insert(attribute.clone(), default.clone());
                }
                None => {
                    return Err(LayerError::MissingAttributeValue {
                        layer: self.name.clone(),
                        attribute: attribute.clone(),
                    })
                }
            }
        }
        Ok(Annotation::from_values(values))
    }

    fn check_level(&self, base_span: &BaseSpan) -> LayerResult<()> {
        let found = base_span.level();
        let expected = match (&self.mode, self.span_level()) {
            (LayerMode::Flat, _) => Some(0),
            (_, Some(level)) => Some(level),
            (LayerMode::Enveloping(_), None) if found == 0 => Some(1),
            _ => None,
        };
        match expected {
            Some(expected) if expected != found => Err(LayerError::SpanLevelMismatch {
                layer: self.name.clone(),
                expected,
                found,
            }),
            _ => Ok(()),
        }
    }

    pub fn remove_span(&mut self, base_span: &BaseSpan) -> Option<Span> {
        self.index_of(base_span).map(|i| self.spans.remove(i))
    }

    /// Keeps the spans for which `keep` returns `true`.
    pub fn retain_spans<F>(&mut self, mut keep: F)
    where
        F: FnMut(&Span) -> bool,
    {
        self.spans.retain(|span| keep(span));
    }

    /// Keeps the annotations for which `keep` returns `true`; spans left
    /// without annotations are removed.
    pub fn retain_annotations<F>(&mut self, mut keep: F)
    where
        F: FnMut(&BaseSpan, &Annotation) -> bool,
    {
        for span in &mut self.spans {
            let base_span = &span.base_span;
            span.annotations.retain(|annotation| keep(base_span, annotation));
        }
        self.spans.retain(|span| !span.annotations.is_empty());
    }

    /// Removes every span.
    pub fn clear(&mut self) {
        self.spans.clear();
    }

    pub fn annotation_mut(
        &mut self,
        span_index: usize,
        annotation_index: usize,
    ) -> Option<AnnotationMut<'_>> {
        let annotation = self
            .spans
            .get_mut(span_index)?
            .annotations
            .get_mut(annotation_index)?;
        Some(AnnotationMut {
            layer: &self.name,
            attributes: &self.attributes,
            annotation,
        })
    }

    /// Visits every annotation mutably, stopping at the first error.
    pub fn for_each_annotation_mut<F>(&mut self, mut f: F) -> LayerResult<()>
    where
        F: FnMut(&BaseSpan, AnnotationMut<'_>) -> LayerResult<()>,
    {
        for span in &mut self.spans {
            for annotation in &mut span.annotations {
                f(
                    &span.base_span,
                    AnnotationMut {
                        layer: &self.name,
                        attributes: &self.attributes,
                        annotation,
                    },
                )?;
            }
        }
        Ok(())
    }

    /// Declares a new attribute and sets it to `default` everywhere.
    pub fn add_attribute(
        &mut self,
        attribute: impl Into<String>,
        default: impl Into<AttributeValue>,
    ) -> LayerResult<()> {
        let attribute = attribute.into();
        let default = default.into();
        let mut attributes = self.attributes.clone();
        attributes.push(attribute.clone());
        validate_attributes(&self.name, &attributes)?;
        self.attributes = attributes;
        self.default_values.insert(attribute.clone(), default.clone());
        for span in &mut self.spans {
            for annotation in &mut span.annotations {
                annotation.insert(attribute.clone(), default.clone());
            }
        }
        Ok(())
    }

    /// Drops an attribute from the schema and from every annotation.
    pub fn remove_attribute(&mut self, attribute: &str) -> LayerResult<()> {
        let position = self
            .attributes
            .iter()
            .position(|a| a == attribute)
            .ok_or_else(|| LayerError::UnknownAttribute {
                layer: self.name.clone(),
                attribute: attribute.to_string(),
            })?;
        self.attributes.remove(position);
        self.default_values.remove(attribute);
        for span in &mut self.spans {
            for annotation in &mut span.annotations {
                annotation.remove(attribute);
            }
        }
        Ok(())
    }

    pub fn set_default_value(
        &mut self,
        attribute: &str,
        value: impl Into<AttributeValue>,
    ) -> LayerResult<()> {
        if !self.has_attribute(attribute) {
            return Err(LayerError::UnknownAttribute {
                layer: self.name.clone(),
                attribute: attribute.to_string(),
            });
        }
        self.default_values.insert(attribute.to_string(), value.into());
        Ok(())
    }

    /// Values of `attribute`, one list per span.
    pub fn attribute_values(&self, attribute: &str) -> LayerResult<Vec<Vec<&AttributeValue>>> {
        if !self.has_attribute(attribute) {
            return Err(LayerError::UnknownAttribute {
                layer: self.name.clone(),
                attribute: attribute.to_string(),
            });
        }
        Ok(self.spans.iter().map(|span| span.values(attribute)).collect())
    }

    /// Re-checks every structural invariant of the layer.
    pub fn check_span_consistency(&self) -> LayerResult<()> {
        for pair in self.spans.windows(2) {
            if pair[0].base_span >= pair[1].base_span {
                return Err(LayerError::inconsistent(
                    &self.name,
                    format!(
                        "spans {} and {} are out of order or duplicated",
                        pair[0].base_span, pair[1].base_span
                    ),
                ));
            }
        }

        let level = self.span_level();
        let schema: BTreeSet<&str> = self.attributes.iter().map(String::as_str).collect();
        for span in &self.spans {
            if Some(span.level()) != level {
                return Err(LayerError::inconsistent(
                    &self.name,
                    format!(
                        "span {} has level {}, expected {:?}",
                        span.base_span,
                        span.level(),
                        level
                    ),
                ));
            }
            if self.enveloping().is_some() && span.level() == 0 {
                return Err(LayerError::inconsistent(
                    &self.name,
                    format!("enveloping layer contains elementary span {}", span.base_span),
                ));
            }
            if self.mode == LayerMode::Flat && span.level() != 0 {
                return Err(LayerError::inconsistent(
                    &self.name,
                    format!("flat layer contains enveloping span {}", span.base_span),
                ));
            }
            if span.annotations.is_empty() {
                return Err(LayerError::inconsistent(
                    &self.name,
                    format!("span {} has no annotations", span.base_span),
                ));
            }
            if !self.ambiguous && span.annotations.len() > 1 {
                return Err(LayerError::inconsistent(
                    &self.name,
                    format!(
                        "span {} has {} annotations but the layer is not ambiguous",
                        span.base_span,
                        span.annotations.len()
                    ),
                ));
            }
            for (i, annotation) in span.annotations.iter().enumerate() {
                if span.annotations[..i].contains(annotation) {
                    return Err(LayerError::inconsistent(
                        &self.name,
                        format!("span {} carries equal annotations", span.base_span),
                    ));
                }
                let keys: BTreeSet<&str> = annotation.keys().collect();
                if keys != schema {
                    return Err(LayerError::inconsistent(
                        &self.name,
                        format!(
                            "annotation of span {} has attributes {:?}, expected {:?}",
                            span.base_span, keys, schema
                        ),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Describes the first difference to `other`, `None` if the layers are equal.
    pub fn diff(&self, other: &Layer) -> Option<String> {
        if self.name != other.name {
            return Some(format!("layer names differ: {:?} != {:?}", self.name, other.name));
        }
        if self.attributes != other.attributes {
            return Some(format!(
                "{} layer attributes differ: {:?} != {:?}",
                self.name, self.attributes, other.attributes
            ));
        }
        if self.ambiguous != other.ambiguous {
            return Some(format!(
                "{} layer ambiguous differs: {} != {}",
                self.name, self.ambiguous, other.ambiguous
            ));
        }
        if self.mode != other.mode {
            return Some(format!(
                "{} layer structure differs: {:?} != {:?}",
                self.name, self.mode, other.mode
            ));
        }
        if self.default_values != other.default_values {
            return Some(format!("{} layer default values differ", self.name));
        }
        if self.meta != other.meta {
            return Some(format!("{} layer meta differs", self.name));
        }
        if self.spans.len() != other.spans.len() {
            return Some(format!(
                "{} layer has {} spans, other has {}",
                self.name,
                self.spans.len(),
                other.spans.len()
            ));
        }
        for (a, b) in self.spans.iter().zip(&other.spans) {
            if a.base_span != b.base_span {
                return Some(format!(
                    "{} layer spans differ: {} != {}",
                    self.name, a.base_span, b.base_span
                ));
            }
            if a.annotations != b.annotations {
                return Some(format!("{} layer annotations differ at {}", self.name, a.base_span));
            }
        }
        None
    }
}

impl<'a> IntoIterator for &'a Layer {
    type Item = &'a Span;
    type IntoIter = std::slice::Iter<'a, Span>;

    fn into_iter(self) -> Self::IntoIter {
        self.spans.iter()
    }
}
