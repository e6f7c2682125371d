//! Error types for taggers, the registry and the resolver.

use layered_text::{ErrorKind, LayerError};
use thiserror::Error;

/// Errors raised while declaring, registering or running taggers.
#[derive(Debug, Error)]
pub enum TaggerError {
    /// A model-level error raised by a layer or text operation.
    #[error(transparent)]
    Layer(#[from] LayerError),

    /// A tagger declaration that cannot be honoured.
    #[error("tagger {tagger:?} is misdeclared: {message}")]
    InvalidDeclaration { tagger: String, message: String },

    /// A tagger produced a layer that differs from its declaration.
    #[error("tagger {tagger:?} produced a layer that does not match its declaration: {message}")]
    OutputMismatch { tagger: String, message: String },

    #[error("tagger {tagger:?} needs input layer {layer:?}, which is not available")]
    MissingInputLayer { tagger: String, layer: String },

    #[error("retagger {tagger:?} needs layer {layer:?} to exist before it runs")]
    MissingOutputLayer { tagger: String, layer: String },

    #[error("tagger {tagger:?} cannot compare these layers: {message}")]
    IncompatibleLayers { tagger: String, message: String },

    /// No tagger is registered for a requested or prerequisite layer.
    #[error("no tagger is registered for layer {layer:?}")]
    NoTagger { layer: String },

    #[error("layer dependencies form a cycle through {layer:?}")]
    Cycle { layer: String },

    #[error("failed to load tagger {tagger:?}: {message}")]
    Load { tagger: String, message: String },

    #[error("invalid pipeline configuration {path}: {message}")]
    Config { path: String, message: String },

    #[error("invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl TaggerError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TaggerError::Layer(err) => err.kind(),
            TaggerError::InvalidDeclaration { .. }
            | TaggerError::OutputMismatch { .. }
            | TaggerError::Cycle { .. }
            | TaggerError::Load { .. }
            | TaggerError::Config { .. }
            | TaggerError::InvalidPattern { .. } => ErrorKind::Configuration,
            TaggerError::MissingInputLayer { .. }
            | TaggerError::MissingOutputLayer { .. }
            | TaggerError::IncompatibleLayers { .. } => ErrorKind::Data,
            TaggerError::NoTagger { .. } => ErrorKind::Resolver,
        }
    }

    pub(crate) fn declaration(tagger: &str, message: impl Into<String>) -> Self {
        TaggerError::InvalidDeclaration {
            tagger: tagger.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn mismatch(tagger: &str, message: impl Into<String>) -> Self {
        TaggerError::OutputMismatch {
            tagger: tagger.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for tagger operations.
pub type TaggerResult<T> = Result<T, TaggerError>;
