#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/layered-nlp/main/assets/layered-nlp.svg",
    issue_tracker_base_url = "https://github.com/storyscript/layered-nlp/issues/"
)]

//! Layered span/annotation data model.
//!
//! A [`Text`] owns named [`Layer`]s. Each layer is a sorted collection of
//! [`Span`]s, and each span pairs a [`BaseSpan`] location with one or more
//! [`Annotation`]s whose attributes follow the layer schema.
//!
//! ## Layer structure
//!
//! - flat layers annotate the raw text
//! - parent layers ([`LayerMode::Parent`]) annotate the locations of another layer
//! - enveloping layers ([`LayerMode::Enveloping`]) group spans of another layer
//!   into higher-level spans (words into sentences, sentences into paragraphs)
//!
//! Ambiguous layers keep several annotations per location.
//!
//! ## Example
//!
//! ```ignore
//! use layered_text::{BaseSpan, Layer, Text};
//!
//! let mut text = Text::new("Hello world.");
//! let mut words = Layer::new("words", ["normalized"])?;
//! words.add_annotation(BaseSpan::elementary(0, 5)?, [("normalized", "hello")])?;
//! words.add_annotation(BaseSpan::elementary(6, 11)?, [("normalized", "world")])?;
//! text.add_layer(words)?;
//!
//! let json = layered_text::text_to_json(&text)?;
//! assert_eq!(layered_text::text_from_json(&json)?, text);
//! ```

mod annotation;
mod base_span;
mod display;
mod errors;
mod layer;
mod serialization;
mod span;
mod text;
mod value;

// Locations
pub use base_span::{BaseSpan, ElementaryBaseSpan, EnvelopingBaseSpan, Located};

// Annotated data
pub use annotation::{Annotation, AnnotationMut};
pub use layer::{
    validate_attributes, validate_layer_name, Layer, LayerBuilder, LayerMode, RESERVED_ATTRIBUTES,
};
pub use span::{Span, SpanRef};
pub use text::Text;
pub use value::AttributeValue;

// Errors
pub use errors::{ErrorKind, LayerError, LayerResult};

// Serialization and display
pub use display::TextDisplay;
pub use serialization::{
    layer_from_json, layer_to_json, text_from_json, text_from_ron_str, text_to_json,
    text_to_ron_string,
};

#[cfg(test)]
mod tests {
    mod display;
    mod layer;
    mod serialization;
    mod text;
}
