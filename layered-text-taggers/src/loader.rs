//! Lazily constructed taggers.

use crate::errors::{TaggerError, TaggerResult};
use crate::tagger::{InputLayers, Tagger, TaggerDescriptor};
use layered_text::{Layer, Text};
use once_cell::sync::OnceCell;
use std::fmt;

type Factory = Box<dyn Fn() -> TaggerResult<Box<dyn Tagger>> + Send + Sync>;

/// Stands in for a tagger that is expensive to construct.
///
/// The descriptor is known up front, so the loader can be registered and
/// scheduled without building the tagger. The real tagger is built on first
/// use and must declare the same inputs and output.
pub struct TaggerLoader {
    descriptor: TaggerDescriptor,
    factory: Factory,
    tagger: OnceCell<Box<dyn Tagger>>,
}

impl TaggerLoader {
    pub fn new<F>(descriptor: TaggerDescriptor, factory: F) -> Self
    where
        F: Fn() -> TaggerResult<Box<dyn Tagger>> + Send + Sync + 'static,
    {
        TaggerLoader {
            descriptor,
            factory: Box::new(factory),
            tagger: OnceCell::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.tagger.get().is_some()
    }

    /// The loaded tagger, building it if needed.
    pub fn load(&self) -> TaggerResult<&dyn Tagger> {
        let tagger = self.tagger.get_or_try_init(|| {
            log::debug!("loading tagger {:?}", self.descriptor.name);
            let tagger = (self.factory)()?;
            self.check_loaded(tagger.descriptor())?;
            Ok::<_, TaggerError>(tagger)
        })?;
        Ok(tagger.as_ref())
    }

    fn check_loaded(&self, loaded: &TaggerDescriptor) -> TaggerResult<()> {
        let expected = &self.descriptor;
        let problem = if loaded.output_layer != expected.output_layer {
            Some(format!(
                "output layer {:?} differs from the declared {:?}",
                loaded.output_layer, expected.output_layer
            ))
        } else if loaded.input_layers != expected.input_layers {
            Some(format!(
                "input layers {:?} differ from the declared {:?}",
                loaded.input_layers, expected.input_layers
            ))
        } else if loaded.output_attributes != expected.output_attributes {
            Some(format!(
                "output attributes {:?} differ from the declared {:?}",
                loaded.output_attributes, expected.output_attributes
            ))
        } else {
            None
        };
        match problem {
            Some(message) => Err(TaggerError::Load {
                tagger: expected.name.clone(),
                message,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for TaggerLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggerLoader")
            .field("descriptor", &self.descriptor)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl Tagger for TaggerLoader {
    fn descriptor(&self) -> &TaggerDescriptor {
        &self.descriptor
    }

    fn make_layer(&self, text: &Text, inputs: &InputLayers<'_>) -> TaggerResult<Layer> {
        self.load()?.make_layer(text, inputs)
    }
}
