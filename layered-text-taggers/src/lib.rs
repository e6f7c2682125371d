#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/layered-nlp/main/assets/layered-nlp.svg",
    issue_tracker_base_url = "https://github.com/storyscript/layered-nlp/issues/"
)]

//! Taggers and dependency-driven layer creation for layered-text.
//!
//! ## Contract
//!
//! - [`Tagger`] - creates one layer; its output must match its [`TaggerDescriptor`]
//! - [`Retagger`] - changes an existing layer in place
//! - [`TaggerLoader`] - defers building an expensive tagger until first use
//!
//! ## Scheduling
//!
//! - [`TaggersRegistry`] - taggers and retaggers by output layer, with an
//!   acyclic [`LayerGraph`] of their dependencies
//! - [`LayerResolver`] - creates a requested layer after everything it needs
//! - [`PipelineConfig`] - a TOML-loadable list of layers to create
//!
//! ## Taggers
//!
//! - [`DiffTagger`] - marks missing, extra and modified spans between two layers
//! - [`RegexTagger`] - tags regular expression matches
//!
//! ## Example
//!
//! ```ignore
//! use layered_text_taggers::{LayerResolver, RegexRule, RegexTagger, TaggersRegistry};
//!
//! let mut registry = TaggersRegistry::new();
//! registry.add_tagger(RegexTagger::new("numbers", vec![RegexRule::new(r"\d+")?]))?;
//!
//! let resolver = LayerResolver::new(registry);
//! let mut text = Text::new("3 apples and 12 pears");
//! resolver.apply(&mut text, "numbers")?;
//! ```

mod config;
mod diff_tagger;
mod errors;
mod loader;
mod regex_tagger;
mod registry;
mod resolver;
mod tagger;

// Contract
pub use loader::TaggerLoader;
pub use tagger::{InputLayers, Retagger, Tagger, TaggerDescriptor};

// Scheduling
pub use config::PipelineConfig;
pub use registry::{EntryState, LayerGraph, TaggersRegistry};
pub use resolver::LayerResolver;

// Taggers
pub use diff_tagger::{
    iterate_conflicts, iterate_extra, iterate_missing, iterate_modified, iterate_overlapped,
    iterate_prolonged, iterate_shortened, statuses, ConflictKind, DiffSummary, DiffTagger,
    SpanStatus, DIFF_SUMMARY_KEY,
};
pub use regex_tagger::{RegexRule, RegexTagger};

// Errors
pub use errors::{TaggerError, TaggerResult};
