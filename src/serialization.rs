//! Structural serialization of layers and texts.
//!
//! A layer is written as
//!
//! ```text
//! { name, attributes, parent, enveloping, ambiguous, default_values, meta,
//!   spans: [ { base_span, annotations: [ { attr: value, .. }, .. ] }, .. ] }
//! ```
//!
//! and a text as `{ text, meta, layers }` with layers in
//! [`Text::sorted_layers`] order. Reading goes back through
//! [`LayerBuilder`](crate::LayerBuilder), [`Layer::add_annotation`] and
//! [`Text::add_layer`], so every invariant is checked again.

use crate::annotation::Annotation;
use crate::base_span::BaseSpan;
use crate::errors::{LayerError, LayerResult};
use crate::layer::{Layer, LayerMode};
use crate::text::Text;
use crate::value::AttributeValue;
use serde::de::Error as _;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

impl Serialize for Layer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Layer", 8)?;
        state.serialize_field("name", self.name())?;
        state.serialize_field("attributes", self.attributes())?;
        state.serialize_field("parent", &self.parent())?;
        state.serialize_field("enveloping", &self.enveloping())?;
        state.serialize_field("ambiguous", &self.is_ambiguous())?;
        state.serialize_field("default_values", self.default_values())?;
        state.serialize_field("meta", self.meta())?;
        state.serialize_field("spans", self.spans())?;
        state.end()
    }
}

#[derive(Deserialize)]
struct LayerRecord {
    name: String,
    attributes: Vec<String>,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    enveloping: Option<String>,
    #[serde(default)]
    ambiguous: bool,
    #[serde(default)]
    default_values: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    meta: BTreeMap<String, AttributeValue>,
    spans: Vec<SpanRecord>,
}

#[derive(Deserialize)]
struct SpanRecord {
    base_span: BaseSpan,
    annotations: Vec<Annotation>,
}

impl LayerRecord {
    fn into_layer(self) -> LayerResult<Layer> {
        let mode = LayerMode::from_parts(&self.name, self.parent, self.enveloping)?;
        let mut builder = Layer::builder(self.name)
            .attributes(self.attributes)
            .default_values(self.default_values)
            .mode(mode)
            .ambiguous(self.ambiguous);
        for (key, value) in self.meta {
            builder = builder.meta(key, value);
        }
        let mut layer = builder.build()?;

        for span in self.spans {
            if span.annotations.is_empty() {
                return Err(LayerError::inconsistent(
                    layer.name(),
                    format!("serialized span {} has no annotations", span.base_span),
                ));
            }
            for annotation in span.annotations {
                layer.add_annotation(span.base_span.clone(), annotation.to_map())?;
            }
        }
        Ok(layer)
    }
}

impl<'de> Deserialize<'de> for Layer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        LayerRecord::deserialize(deserializer)?
            .into_layer()
            .map_err(D::Error::custom)
    }
}

impl Serialize for Text {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Text", 3)?;
        state.serialize_field("text", self.text())?;
        state.serialize_field("meta", self.meta())?;
        state.serialize_field("layers", &self.sorted_layers())?;
        state.end()
    }
}

#[derive(Deserialize)]
struct TextRecord {
    text: String,
    #[serde(default)]
    meta: BTreeMap<String, AttributeValue>,
    #[serde(default)]
    layers: Vec<Layer>,
}

impl TextRecord {
    fn into_text(self) -> LayerResult<Text> {
        let mut text = Text::new(self.text);
        *text.meta_mut() = self.meta;
        for layer in self.layers {
            text.add_layer(layer)?;
        }
        Ok(text)
    }
}

impl<'de> Deserialize<'de> for Text {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        TextRecord::deserialize(deserializer)?
            .into_text()
            .map_err(D::Error::custom)
    }
}

fn serialization_error(error: impl std::fmt::Display) -> LayerError {
    LayerError::Serialization {
        message: error.to_string(),
    }
}

fn ron_config() -> ron::ser::PrettyConfig {
    ron::ser::PrettyConfig::new()
        .depth_limit(10)
        .separate_tuple_members(true)
        .enumerate_arrays(false)
}

pub fn text_to_json(text: &Text) -> LayerResult<String> {
    serde_json::to_string_pretty(text).map_err(serialization_error)
}

pub fn text_from_json(json: &str) -> LayerResult<Text> {
    serde_json::from_str(json).map_err(serialization_error)
}

pub fn layer_to_json(layer: &Layer) -> LayerResult<String> {
    serde_json::to_string_pretty(layer).map_err(serialization_error)
}

pub fn layer_from_json(json: &str) -> LayerResult<Layer> {
    serde_json::from_str(json).map_err(serialization_error)
}

pub fn text_to_ron_string(text: &Text) -> LayerResult<String> {
    ron::ser::to_string_pretty(text, ron_config()).map_err(serialization_error)
}

pub fn text_from_ron_str(s: &str) -> LayerResult<Text> {
    ron::from_str(s).map_err(serialization_error)
}
