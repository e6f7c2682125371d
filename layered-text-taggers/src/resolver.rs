//! Dependency-driven layer creation.

use crate::config::PipelineConfig;
use crate::errors::{TaggerError, TaggerResult};
use crate::registry::TaggersRegistry;
use layered_text::{LayerError, Text};

/// Creates requested layers together with everything they need.
///
/// Layers created before a failing tagger stay attached.
#[derive(Debug, Default)]
pub struct LayerResolver {
    registry: TaggersRegistry,
}

impl LayerResolver {
    pub fn new(registry: TaggersRegistry) -> Self {
        LayerResolver { registry }
    }

    pub fn registry(&self) -> &TaggersRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TaggersRegistry {
        &mut self.registry
    }

    /// Creatable layers, each after all of its prerequisites.
    pub fn list_layers(&self) -> Vec<String> {
        self.registry.list_layers()
    }

    /// Makes sure `text` has `layer`.
    ///
    /// A present layer is left alone. Otherwise the prerequisites are applied
    /// first, then the tagger and its retaggers run.
    pub fn apply(&self, text: &mut Text, layer: &str) -> TaggerResult<()> {
        if text.has_layer(layer) {
            log::debug!("layer {:?} is already present", layer);
            return Ok(());
        }
        if !self.registry.contains(layer) {
            return Err(TaggerError::NoTagger {
                layer: layer.to_string(),
            });
        }
        for prerequisite in self.registry.graph().predecessors(layer) {
            self.apply(text, prerequisite)?;
        }
        self.registry.create_layer_for_text(layer, text)
    }

    pub fn apply_many<I, S>(&self, text: &mut Text, layers: I) -> TaggerResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for layer in layers {
            self.apply(text, layer.as_ref())?;
        }
        Ok(())
    }

    /// Applies the layers listed in `config`, in order.
    pub fn apply_pipeline(&self, text: &mut Text, config: &PipelineConfig) -> TaggerResult<()> {
        if !config.skip_present {
            if let Some(present) = config.layers.iter().find(|layer| text.has_layer(layer)) {
                return Err(LayerError::DuplicateLayer {
                    name: present.clone(),
                }
                .into());
            }
        }
        self.apply_many(text, &config.layers)
    }
}
