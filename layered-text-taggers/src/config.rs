//! Pipeline configuration.
//!
//! ```toml
//! layers = ["words", "sentences"]
//! skip_present = true
//! ```

use crate::errors::{TaggerError, TaggerResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Layers a [`LayerResolver`](crate::LayerResolver) materialises, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Layers to create.
    pub layers: Vec<String>,
    /// Accept listed layers that the text already has. When `false` such a
    /// layer is an error.
    pub skip_present: bool,
}

impl PipelineConfig {
    /// No layers; present layers are skipped.
    pub fn standard() -> Self {
        Self {
            layers: Vec::new(),
            skip_present: true,
        }
    }

    /// Create with specific layers.
    pub fn with_layers<I, S>(layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            layers: layers.into_iter().map(Into::into).collect(),
            ..Self::standard()
        }
    }

    pub fn with_skip_present(mut self, skip_present: bool) -> Self {
        self.skip_present = skip_present;
        self
    }

    /// Load from a TOML file; a missing file gives the default.
    pub fn load(path: &Path) -> TaggerResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| TaggerError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| TaggerError::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_toml_str(content: &str) -> TaggerResult<Self> {
        toml::from_str(content).map_err(|e| TaggerError::Config {
            path: "<string>".to_string(),
            message: e.to_string(),
        })
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::standard()
    }
}
