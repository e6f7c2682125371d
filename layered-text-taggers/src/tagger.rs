//! The tagger contract.
//!
//! A [`Tagger`] creates exactly one layer, a [`Retagger`] changes an existing
//! one. Both declare their inputs and output up front in a
//! [`TaggerDescriptor`], which is checked once at registration and again
//! against every layer a tagger produces.

use crate::errors::{TaggerError, TaggerResult};
use layered_text::{validate_attributes, validate_layer_name, Layer, LayerMode, Text};
use std::collections::BTreeMap;
use std::fmt::Debug;

/// Declared inputs and output of a tagger or retagger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggerDescriptor {
    /// Name used in errors and logs.
    pub name: String,
    pub input_layers: Vec<String>,
    pub output_layer: String,
    pub output_attributes: Vec<String>,
    /// Required structure of the output; `None` accepts any.
    pub output_mode: Option<LayerMode>,
    /// Required ambiguity of the output; `None` accepts either.
    pub ambiguous: Option<bool>,
}

impl TaggerDescriptor {
    pub fn new(name: impl Into<String>, output_layer: impl Into<String>) -> Self {
        TaggerDescriptor {
            name: name.into(),
            input_layers: Vec::new(),
            output_layer: output_layer.into(),
            output_attributes: Vec::new(),
            output_mode: None,
            ambiguous: None,
        }
    }

    pub fn with_input_layers<I, S>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input_layers = layers.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_attributes = attributes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output_mode(mut self, mode: LayerMode) -> Self {
        self.output_mode = Some(mode);
        self
    }

    pub fn with_ambiguous(mut self, ambiguous: bool) -> Self {
        self.ambiguous = Some(ambiguous);
        self
    }

    /// Checks the declaration itself: layer names, the attribute schema and
    /// that a parent or enveloped layer is among the inputs.
    pub fn validate(&self) -> TaggerResult<()> {
        validate_layer_name(&self.output_layer)?;
        validate_attributes(&self.output_layer, &self.output_attributes)?;
        for input in &self.input_layers {
            validate_layer_name(input)?;
        }
        if let Some(dependency) = self.output_mode.as_ref().and_then(LayerMode::dependency) {
            if dependency == self.output_layer {
                return Err(TaggerError::declaration(
                    &self.name,
                    format!("layer {:?} cannot be built on itself", dependency),
                ));
            }
            if !self.input_layers.iter().any(|input| input == dependency) {
                return Err(TaggerError::declaration(
                    &self.name,
                    format!(
                        "layer {:?} is built on {:?}, which is not an input layer",
                        self.output_layer, dependency
                    ),
                ));
            }
        }
        Ok(())
    }

    /// Checks a produced layer against the declaration.
    pub fn check_output(&self, layer: &Layer) -> TaggerResult<()> {
        if layer.name() != self.output_layer {
            return Err(TaggerError::mismatch(
                &self.name,
                format!("expected layer {:?}, got {:?}", self.output_layer, layer.name()),
            ));
        }
        if layer.attributes() != self.output_attributes.as_slice() {
            return Err(TaggerError::mismatch(
                &self.name,
                format!(
                    "expected attributes {:?}, got {:?}",
                    self.output_attributes,
                    layer.attributes()
                ),
            ));
        }
        if let Some(mode) = &self.output_mode {
            if layer.mode() != mode {
                return Err(TaggerError::mismatch(
                    &self.name,
                    format!("expected structure {:?}, got {:?}", mode, layer.mode()),
                ));
            }
        }
        if let Some(ambiguous) = self.ambiguous {
            if layer.is_ambiguous() != ambiguous {
                return Err(TaggerError::mismatch(
                    &self.name,
                    format!("expected ambiguous = {}, got {}", ambiguous, layer.is_ambiguous()),
                ));
            }
        }
        Ok(())
    }
}

/// Input layers visible to a running tagger.
///
/// Detached layers shadow the layers attached to the text.
#[derive(Debug, Clone, Copy)]
pub struct InputLayers<'a> {
    text: &'a Text,
    detached: &'a BTreeMap<String, Layer>,
    descriptor: &'a TaggerDescriptor,
}

impl<'a> InputLayers<'a> {
    pub fn new(
        text: &'a Text,
        detached: &'a BTreeMap<String, Layer>,
        descriptor: &'a TaggerDescriptor,
    ) -> Self {
        InputLayers {
            text,
            detached,
            descriptor,
        }
    }

    pub fn text(&self) -> &'a Text {
        self.text
    }

    /// The declared input layer `name`.
    pub fn get(&self, name: &str) -> TaggerResult<&'a Layer> {
        if !self.descriptor.input_layers.iter().any(|input| input == name) {
            return Err(TaggerError::declaration(
                &self.descriptor.name,
                format!("reads undeclared input layer {:?}", name),
            ));
        }
        self.detached
            .get(name)
            .or_else(|| self.text.layer(name))
            .ok_or_else(|| TaggerError::MissingInputLayer {
                tagger: self.descriptor.name.clone(),
                layer: name.to_string(),
            })
    }

    fn check_available<'n, I>(&self, names: I) -> TaggerResult<()>
    where
        I: IntoIterator<Item = &'n String>,
    {
        for name in names {
            self.get(name)?;
        }
        Ok(())
    }
}

/// Creates one layer from its input layers.
pub trait Tagger: Debug + Send + Sync {
    fn descriptor(&self) -> &TaggerDescriptor;

    /// Builds the output layer. Implementations read inputs through `inputs`.
    fn make_layer(&self, text: &Text, inputs: &InputLayers<'_>) -> TaggerResult<Layer>;

    /// Builds the output layer without attaching it.
    ///
    /// Every input must be available, either in `detached` or on `text`, and
    /// the result must match the declaration.
    fn create(&self, text: &Text, detached: &BTreeMap<String, Layer>) -> TaggerResult<Layer> {
        let descriptor = self.descriptor();
        let inputs = InputLayers::new(text, detached, descriptor);
        inputs.check_available(&descriptor.input_layers)?;
        let layer = self.make_layer(text, &inputs)?;
        descriptor.check_output(&layer)?;
        Ok(layer)
    }

    /// Builds the output layer and attaches it to `text`.
    fn tag(&self, text: &mut Text) -> TaggerResult<()> {
        let layer = self.create(text, &BTreeMap::new())?;
        text.add_layer(layer)?;
        Ok(())
    }
}

/// Changes an existing layer in place.
///
/// The declared input layers may include the output layer itself.
pub trait Retagger: Debug + Send + Sync {
    fn descriptor(&self) -> &TaggerDescriptor;

    /// Whether [`retag`](Retagger::retag) re-checks the layer invariants afterwards.
    fn check_output_consistency(&self) -> bool {
        true
    }

    fn change_layer(
        &self,
        text: &Text,
        inputs: &InputLayers<'_>,
        layer: &mut Layer,
    ) -> TaggerResult<()>;

    /// Runs [`change_layer`](Retagger::change_layer) on the attached output layer.
    fn retag(&self, text: &mut Text) -> TaggerResult<()> {
        let descriptor = self.descriptor();
        if !text.has_layer(&descriptor.output_layer) {
            return Err(TaggerError::MissingOutputLayer {
                tagger: descriptor.name.clone(),
                layer: descriptor.output_layer.clone(),
            });
        }
        let detached = BTreeMap::new();
        text.update_layer(
            &descriptor.output_layer,
            self.check_output_consistency(),
            |text, layer| {
                let inputs = InputLayers::new(text, &detached, descriptor);
                inputs.check_available(
                    descriptor
                        .input_layers
                        .iter()
                        .filter(|input| **input != descriptor.output_layer),
                )?;
                self.change_layer(text, &inputs, layer)
            },
        )
    }
}
