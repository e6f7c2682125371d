//! Error types for the layer data model.
//!
//! Every failure is reported at the point of violation. Variants fall into
//! the [`ErrorKind`] categories so callers can tell a misconfigured layer
//! apart from bad data.

use thiserror::Error;

/// Broad category of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed declarations: names, attribute schemas, tagger contracts, cycles.
    Configuration,
    /// Data that violates a layer or text invariant.
    Data,
    /// A requested layer cannot be produced.
    Resolver,
}

/// Errors raised by [`BaseSpan`](crate::BaseSpan), [`Layer`](crate::Layer)
/// and [`Text`](crate::Text) operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayerError {
    #[error("invalid layer name {name:?}: must be non-empty and not only whitespace")]
    InvalidLayerName { name: String },

    #[error("attribute {attribute:?} of layer {layer:?} collides with a reserved span accessor")]
    ReservedAttribute { layer: String, attribute: String },

    #[error("attribute {attribute:?} is declared more than once in layer {layer:?}")]
    DuplicateAttribute { layer: String, attribute: String },

    #[error("layer {layer:?} declares both parent {parent:?} and enveloping {enveloping:?}")]
    ConflictingStructure {
        layer: String,
        parent: String,
        enveloping: String,
    },

    #[error("layer {layer:?} cannot reference itself as parent or enveloped layer")]
    SelfReference { layer: String },

    #[error("attribute {attribute:?} is not declared in layer {layer:?}")]
    UnknownAttribute { layer: String, attribute: String },

    #[error("attribute {attribute:?} of layer {layer:?} has no value and no default")]
    MissingAttributeValue { layer: String, attribute: String },

    #[error("layer {layer:?} is not ambiguous and already contains a span at ({start}, {end})")]
    DuplicateLocation {
        layer: String,
        start: usize,
        end: usize,
    },

    #[error("layer {layer:?} expects spans of level {expected}, got level {found}")]
    SpanLevelMismatch {
        layer: String,
        expected: usize,
        found: usize,
    },

    #[error("invalid base span: {message}")]
    InvalidBaseSpan { message: String },

    #[error("span ({start}, {end}) of layer {layer:?} is outside of text bounds 0..{len}")]
    SpanOutOfBounds {
        layer: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("span ({start}, {end}) of layer {layer:?} does not fall on character boundaries")]
    NotCharBoundary {
        layer: String,
        start: usize,
        end: usize,
    },

    #[error("layer {layer:?} is inconsistent: {message}")]
    Inconsistent { layer: String, message: String },

    #[error("text already has a layer named {name:?}")]
    DuplicateLayer { name: String },

    #[error("layer {name:?} is not attached to the text")]
    MissingLayer { name: String },

    #[error("layer {name:?} is required by {dependents:?}")]
    LayerHasDependents {
        name: String,
        dependents: Vec<String>,
    },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("serialization failed: {message}")]
    Serialization { message: String },
}

impl LayerError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            LayerError::InvalidLayerName { .. }
            | LayerError::ReservedAttribute { .. }
            | LayerError::DuplicateAttribute { .. }
            | LayerError::ConflictingStructure { .. }
            | LayerError::SelfReference { .. } => ErrorKind::Configuration,
            LayerError::UnknownAttribute { .. }
            | LayerError::MissingAttributeValue { .. }
            | LayerError::DuplicateLocation { .. }
            | LayerError::SpanLevelMismatch { .. }
            | LayerError::InvalidBaseSpan { .. }
            | LayerError::SpanOutOfBounds { .. }
            | LayerError::NotCharBoundary { .. }
            | LayerError::Inconsistent { .. }
            | LayerError::DuplicateLayer { .. }
            | LayerError::MissingLayer { .. }
            | LayerError::LayerHasDependents { .. }
            | LayerError::InvalidArgument { .. }
            | LayerError::Serialization { .. } => ErrorKind::Data,
        }
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        LayerError::InvalidArgument {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_span(message: impl Into<String>) -> Self {
        LayerError::InvalidBaseSpan {
            message: message.into(),
        }
    }

    pub fn inconsistent(layer: &str, message: impl Into<String>) -> Self {
        LayerError::Inconsistent {
            layer: layer.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for layer operations.
pub type LayerResult<T> = Result<T, LayerError>;
