#![doc(
    html_logo_url = "https://raw.githubusercontent.com/storyscript/layered-nlp/main/assets/layered-nlp.svg",
    issue_tracker_base_url = "https://github.com/storyscript/layered-nlp/issues/"
)]

//! Span algebra and layer operations for layered-text.
//!
//! ## Span relations
//!
//! - [`iterate_touching_spans`], [`iterate_hovering_spans`],
//!   [`iterate_consecutive_spans`] - successor relations with gap rules
//! - [`iterate_overlapping_spans`], [`iterate_nested_spans`],
//!   [`iterate_intersecting_spans`] - positional overlap relations
//! - [`iterate_enclosed_spans`], [`iterate_intersecting_pairs`] - sweeps over
//!   two sorted inputs
//!
//! ## Conflict resolution
//!
//! - [`resolve_max_coverage`] - non-overlapping subset with maximal coverage
//! - [`keep_maximal`] / [`keep_minimal`] - containment filters
//! - [`resolve_conflicts`] - priority-aware filtering of a layer in place
//! - [`resolve_annotation_groups`] - extremal annotations per location
//!
//! ## Layer operations
//!
//! - [`diff_layer`] - location-wise comparison of two layers
//! - [`drop_annotations`] / [`keep_annotations`] - annotation filters
//! - [`join_layers`] / [`join_texts`] - concatenation
//! - [`extract_sections`] / [`split_by`] - cutting a text into pieces
//!
//! ## Example
//!
//! ```ignore
//! use layered_text_ops::{iterate_hovering_spans, resolve_max_coverage};
//!
//! let words = text.get_layer("words")?;
//! for (a, b) in iterate_hovering_spans(words.spans(), 2) {
//!     println!("{} .. {}", a.base_span(), b.base_span());
//! }
//! let kept = resolve_max_coverage(candidates.spans());
//! ```

mod conflicts;
mod iterators;
mod layer_ops;

// Span relations
pub use iterators::{
    iterate_consecutive_spans, iterate_enclosed_spans, iterate_hovering_spans,
    iterate_intersecting_pairs, iterate_intersecting_spans, iterate_nested_spans,
    iterate_overlapping_spans, iterate_touching_spans, pattern_gap, spans_intersect,
    whitespace_gap,
};

// Conflict resolution
pub use conflicts::{
    keep_maximal, keep_minimal, resolve_annotation_groups, resolve_conflicts,
    resolve_max_coverage, ConflictStatus, ConflictStrategy, GroupStrategy,
};

// Layer operations
pub use layer_ops::{
    diff_layer, drop_annotations, extract_sections, join_layers, join_texts, keep_annotations,
    split_by,
};

#[cfg(test)]
mod tests {
    mod conflicts;
    mod layer_ops;
    mod relations;
}
