//! The text container that owns layers.

use crate::base_span::BaseSpan;
use crate::errors::{LayerError, LayerResult};
use crate::layer::{Layer, LayerMode};
use crate::value::AttributeValue;
use std::collections::{BTreeMap, BTreeSet};

/// A text and the layers annotating it.
///
/// A layer can only be attached after the layer it refers to (parent or
/// enveloped), which keeps the dependency graph of attached layers acyclic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Text {
    text: String,
    meta: BTreeMap<String, AttributeValue>,
    layers: BTreeMap<String, Layer>,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Text {
            text: text.into(),
            meta: BTreeMap::new(),
            layers: BTreeMap::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn meta(&self) -> &BTreeMap<String, AttributeValue> {
        &self.meta
    }

    pub fn meta_mut(&mut self) -> &mut BTreeMap<String, AttributeValue> {
        &mut self.meta
    }

    pub fn layer(&self, name: &str) -> Option<&Layer> {
        self.layers.get(name)
    }

    /// Like [`layer`](Self::layer) but reports a missing layer as an error.
    pub fn get_layer(&self, name: &str) -> LayerResult<&Layer> {
        self.layers.get(name).ok_or_else(|| LayerError::MissingLayer {
            name: name.to_string(),
        })
    }

    pub fn has_layer(&self, name: &str) -> bool {
        self.layers.contains_key(name)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.values()
    }

    /// `text[start..end]`, or `""` when the range is not valid for this text.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        self.text.get(start..end).unwrap_or("")
    }

    pub fn enclosing_text(&self, base_span: &BaseSpan) -> &str {
        self.slice(base_span.start(), base_span.end())
    }

    /// Text of each elementary piece of `base_span`.
    pub fn span_texts(&self, base_span: &BaseSpan) -> Vec<&str> {
        base_span
            .flatten()
            .into_iter()
            .map(|span| self.slice(span.start(), span.end()))
            .collect()
    }

    /// Attaches `layer`.
    ///
    /// Fails if the name is taken, the referenced layer is missing, a span
    /// falls outside the text or between the bytes of a character, the layer
    /// is internally inconsistent, or its span level does not fit the layer
    /// it refers to.
    pub fn add_layer(&mut self, layer: Layer) -> LayerResult<()> {
        if self.layers.contains_key(layer.name()) {
            return Err(LayerError::DuplicateLayer {
                name: layer.name().to_string(),
            });
        }
        self.check_attachable(&layer)?;
        log::trace!("attaching layer {:?} with {} spans", layer.name(), layer.len());
        self.layers.insert(layer.name().to_string(), layer);
        Ok(())
    }

    fn check_attachable(&self, layer: &Layer) -> LayerResult<()> {
        if let Some(dependency) = layer.mode().dependency() {
            let target = self.get_layer(dependency)?;
            if let (Some(level), Some(target_level)) = (layer.span_level(), target.span_level()) {
                let expected = match layer.mode() {
                    LayerMode::Enveloping(_) => target_level + 1,
                    _ => target_level,
                };
                if level != expected {
                    return Err(LayerError::SpanLevelMismatch {
                        layer: layer.name().to_string(),
                        expected,
                        found: level,
                    });
                }
            }
        }

        layer.check_span_consistency()?;

        let len = self.text.len();
        for span in layer.spans() {
            for piece in span.base_span().flatten() {
                if piece.end() > len {
                    return Err(LayerError::SpanOutOfBounds {
                        layer: layer.name().to_string(),
                        start: piece.start(),
                        end: piece.end(),
                        len,
                    });
                }
                if !self.text.is_char_boundary(piece.start())
                    || !self.text.is_char_boundary(piece.end())
                {
                    return Err(LayerError::NotCharBoundary {
                        layer: layer.name().to_string(),
                        start: piece.start(),
                        end: piece.end(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Names of every layer that depends on `name`, directly or transitively.
    pub fn dependent_layers(&self, name: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut queue = vec![name.to_string()];
        while let Some(current) = queue.pop() {
            for layer in self.layers.values() {
                if layer.mode().dependency() == Some(current.as_str())
                    && found.insert(layer.name().to_string())
                {
                    queue.push(layer.name().to_string());
                }
            }
        }
        found
    }

    /// Detaches `name`.
    ///
    /// With `cascading`, layers depending on it are detached too and
    /// returned after it. Without, a layer that others depend on is kept and
    /// an error is returned.
    pub fn pop_layer(&mut self, name: &str, cascading: bool) -> LayerResult<Vec<Layer>> {
        if !self.layers.contains_key(name) {
            return Err(LayerError::MissingLayer {
                name: name.to_string(),
            });
        }
        let dependents = self.dependent_layers(name);
        if !cascading && !dependents.is_empty() {
            return Err(LayerError::LayerHasDependents {
                name: name.to_string(),
                dependents: dependents.into_iter().collect(),
            });
        }
        if !dependents.is_empty() {
            log::debug!("detaching {:?} together with dependents {:?}", name, dependents);
        }
        let mut removed = Vec::with_capacity(dependents.len() + 1);
        removed.extend(self.layers.remove(name));
        for dependent in dependents {
            removed.extend(self.layers.remove(&dependent));
        }
        Ok(removed)
    }

    /// Lends the layer `name` mutably together with the rest of the text.
    ///
    /// The layer is detached for the duration of `f`. Name and structure
    /// must stay as they were; with `check_consistency` the layer must also
    /// pass the checks of [`Text::add_layer`] afterwards. When `f` or a check
    /// fails, the layer is restored to its state before the call.
    pub fn update_layer<F, R, E>(
        &mut self,
        name: &str,
        check_consistency: bool,
        f: F,
    ) -> Result<R, E>
    where
        F: FnOnce(&Text, &mut Layer) -> Result<R, E>,
        E: From<LayerError>,
    {
        let previous = self.layers.remove(name).ok_or_else(|| LayerError::MissingLayer {
            name: name.to_string(),
        })?;
        let mut layer = previous.clone();

        let outcome = f(self, &mut layer).and_then(|value| {
            if (layer.name(), layer.mode()) != (previous.name(), previous.mode()) {
                return Err(LayerError::inconsistent(
                    previous.name(),
                    "name or structure changed during update",
                )
                .into());
            }
            if check_consistency {
                self.check_attachable(&layer)?;
            }
            Ok(value)
        });

        match outcome {
            Ok(value) => {
                self.layers.insert(previous.name().to_string(), layer);
                Ok(value)
            }
            Err(err) => {
                log::debug!("restoring layer {:?} after a failed update", previous.name());
                self.layers.insert(previous.name().to_string(), previous);
                Err(err)
            }
        }
    }

    /// Layers ordered so that every layer comes after the layer it refers
    /// to; otherwise by name.
    pub fn sorted_layers(&self) -> Vec<&Layer> {
        let mut visited = BTreeSet::new();
        let mut ordered = Vec::with_capacity(self.layers.len());
        for name in self.layers.keys() {
            self.visit_sorted(name, &mut visited, &mut ordered);
        }
        ordered
    }

    fn visit_sorted<'a>(
        &'a self,
        name: &str,
        visited: &mut BTreeSet<String>,
        ordered: &mut Vec<&'a Layer>,
    ) {
        if visited.contains(name) {
            return;
        }
        let layer = match self.layers.get(name) {
            Some(layer) => layer,
            None => return,
        };
        visited.insert(name.to_string());
        if let Some(dependency) = layer.mode().dependency() {
            self.visit_sorted(dependency, visited, ordered);
        }
        ordered.push(layer);
    }

    /// Describes the first difference to `other`, `None` if the texts are equal.
    pub fn diff(&self, other: &Text) -> Option<String> {
        if self.text != other.text {
            return Some("texts differ".to_string());
        }
        if self.meta != other.meta {
            return Some("metas differ".to_string());
        }
        let names: Vec<&String> = self.layers.keys().collect();
        let other_names: Vec<&String> = other.layers.keys().collect();
        if names != other_names {
            return Some(format!("layer names differ: {:?} != {:?}", names, other_names));
        }
        self.layers
            .values()
            .zip(other.layers.values())
            .find_map(|(a, b)| a.diff(b))
    }
}
