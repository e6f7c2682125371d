//! Registry of taggers and retaggers and the layer dependency graph.
//!
//! ```text
//!   words ──▶ sentences ──▶ paragraphs
//!     │
//!     └─────▶ morph_analysis
//! ```
//!
//! Edges point from a prerequisite layer to the layer that needs it. The
//! graph is rebuilt after every registration change and must stay acyclic.

use crate::errors::{TaggerError, TaggerResult};
use crate::tagger::{Retagger, Tagger};
use layered_text::{Layer, Text};
use pathfinding::directed::topological_sort::topological_sort;
use std::collections::{BTreeMap, BTreeSet};

/// Registration state of a layer name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryState {
    Unregistered,
    TaggerOnly,
    WithRetaggers,
}

#[derive(Debug)]
struct Entry {
    tagger: Box<dyn Tagger>,
    retaggers: Vec<Box<dyn Retagger>>,
}

impl Entry {
    fn dependencies(&self) -> impl Iterator<Item = &str> + '_ {
        let output = self.tagger.descriptor().output_layer.as_str();
        self.tagger
            .descriptor()
            .input_layers
            .iter()
            .chain(self.retaggers.iter().flat_map(|r| r.descriptor().input_layers.iter()))
            .map(String::as_str)
            .filter(move |dependency| *dependency != output)
    }
}

/// Dependency graph over layer names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerGraph {
    nodes: BTreeSet<String>,
    // prerequisite -> dependents
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl LayerGraph {
    fn add_edge(&mut self, from: &str, to: &str) {
        self.nodes.insert(from.to_string());
        self.nodes.insert(to.to_string());
        self.edges.entry(from.to_string()).or_default().insert(to.to_string());
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    pub fn contains(&self, layer: &str) -> bool {
        self.nodes.contains(layer)
    }

    pub fn has_edge(&self, from: &str, to: &str) -> bool {
        self.edges.get(from).map_or(false, |targets| targets.contains(to))
    }

    /// Layers that directly depend on `layer`.
    pub fn successors(&self, layer: &str) -> Vec<&str> {
        self.edges
            .get(layer)
            .map(|targets| targets.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Direct prerequisites of `layer`.
    pub fn predecessors(&self, layer: &str) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|(_, targets)| targets.contains(layer))
            .map(|(from, _)| from.as_str())
            .collect()
    }

    /// Every node, each after all of its prerequisites.
    ///
    /// Fails with a node on a cycle.
    pub fn topological_order(&self) -> Result<Vec<String>, String> {
        let roots: Vec<String> = self.nodes.iter().cloned().collect();
        topological_sort(&roots, |node: &String| {
            self.edges
                .get(node)
                .map(|targets| targets.iter().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        })
    }
}

/// Taggers and retaggers by output layer.
#[derive(Debug, Default)]
pub struct TaggersRegistry {
    entries: BTreeMap<String, Entry>,
    graph: LayerGraph,
}

impl TaggersRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the tagger creating its output layer.
    ///
    /// Replaces a previously registered tagger for the same layer and keeps
    /// that layer's retaggers. On error the registry is left unchanged.
    pub fn add_tagger<T: Tagger + 'static>(&mut self, tagger: T) -> TaggerResult<()> {
        let descriptor = tagger.descriptor();
        descriptor.validate()?;
        if descriptor.input_layers.contains(&descriptor.output_layer) {
            return Err(TaggerError::declaration(
                &descriptor.name,
                format!("a tagger cannot read its own output layer {:?}", descriptor.output_layer),
            ));
        }
        let layer = descriptor.output_layer.clone();
        let tagger: Box<dyn Tagger> = Box::new(tagger);

        let previous = match self.entries.get_mut(&layer) {
            Some(entry) => Some(std::mem::replace(&mut entry.tagger, tagger)),
            None => {
                self.entries.insert(
                    layer.clone(),
                    Entry {
                        tagger,
                        retaggers: Vec::new(),
                    },
                );
                None
            }
        };

        if let Err(err) = self.rebuild_graph() {
            match previous {
                Some(previous) => {
                    if let Some(entry) = self.entries.get_mut(&layer) {
                        entry.tagger = previous;
                    }
                }
                None => {
                    self.entries.remove(&layer);
                }
            }
            return Err(err);
        }
        Ok(())
    }

    /// Appends a retagger to the layer's retaggers.
    ///
    /// The layer needs a registered tagger. On error the registry is left
    /// unchanged.
    pub fn add_retagger<R: Retagger + 'static>(&mut self, retagger: R) -> TaggerResult<()> {
        let descriptor = retagger.descriptor();
        descriptor.validate()?;
        let layer = descriptor.output_layer.clone();
        let entry = self.entries.get_mut(&layer).ok_or_else(|| {
            TaggerError::declaration(
                &descriptor.name,
                format!("cannot add a retagger for layer {:?} without a tagger creating it", layer),
            )
        })?;
        entry.retaggers.push(Box::new(retagger));

        if let Err(err) = self.rebuild_graph() {
            if let Some(entry) = self.entries.get_mut(&layer) {
                entry.retaggers.pop();
            }
            return Err(err);
        }
        Ok(())
    }

    /// Removes the retaggers of `layer`; its tagger stays.
    pub fn clear_retaggers(&mut self, layer: &str) -> TaggerResult<()> {
        let changed = match self.entries.get_mut(layer) {
            Some(entry) if !entry.retaggers.is_empty() => {
                entry.retaggers.clear();
                true
            }
            _ => false,
        };
        if changed {
            self.rebuild_graph()?;
        }
        Ok(())
    }

    pub fn state(&self, layer: &str) -> EntryState {
        match self.entries.get(layer) {
            None => EntryState::Unregistered,
            Some(entry) if entry.retaggers.is_empty() => EntryState::TaggerOnly,
            Some(_) => EntryState::WithRetaggers,
        }
    }

    pub fn tagger(&self, layer: &str) -> Option<&dyn Tagger> {
        self.entries.get(layer).map(|entry| entry.tagger.as_ref())
    }

    /// Retaggers of `layer` in registration order.
    pub fn retaggers(&self, layer: &str) -> Vec<&dyn Retagger> {
        self.entries
            .get(layer)
            .map(|entry| entry.retaggers.iter().map(|r| r.as_ref()).collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, layer: &str) -> bool {
        self.entries.contains_key(layer)
    }

    pub fn graph(&self) -> &LayerGraph {
        &self.graph
    }

    /// Creatable layers, each after all of its prerequisites.
    pub fn list_layers(&self) -> Vec<String> {
        // the graph is acyclic after every successful registration
        self.graph
            .topological_order()
            .unwrap_or_default()
            .into_iter()
            .filter(|layer| self.entries.contains_key(layer))
            .collect()
    }

    /// Runs the tagger of `layer` and then its retaggers on `text`.
    ///
    /// Prerequisite layers must already be attached; see
    /// [`LayerResolver`](crate::LayerResolver) for resolving them.
    pub fn create_layer_for_text(&self, layer: &str, text: &mut Text) -> TaggerResult<()> {
        let entry = self.entries.get(layer).ok_or_else(|| TaggerError::NoTagger {
            layer: layer.to_string(),
        })?;
        log::debug!(
            "creating layer {:?} with {:?}",
            layer,
            entry.tagger.descriptor().name
        );
        entry.tagger.tag(text)?;
        for retagger in &entry.retaggers {
            log::debug!(
                "retagging layer {:?} with {:?}",
                layer,
                retagger.descriptor().name
            );
            retagger.retag(text)?;
        }
        Ok(())
    }

    /// Builds `layer` from `text` without attaching it.
    pub fn make_detached_layer(&self, layer: &str, text: &Text) -> TaggerResult<Layer> {
        let mut scratch = text.clone();
        self.create_layer_for_text(layer, &mut scratch)?;
        let mut popped = scratch.pop_layer(layer, true)?;
        if popped.is_empty() {
            return Err(TaggerError::NoTagger {
                layer: layer.to_string(),
            });
        }
        Ok(popped.swap_remove(0))
    }

    fn rebuild_graph(&mut self) -> TaggerResult<()> {
        let mut graph = LayerGraph::default();
        for (layer, entry) in &self.entries {
            graph.nodes.insert(layer.clone());
            for dependency in entry.dependencies() {
                graph.add_edge(dependency, layer);
            }
        }
        if let Err(layer) = graph.topological_order() {
            return Err(TaggerError::Cycle { layer });
        }
        for (layer, entry) in &self.entries {
            for dependency in entry.dependencies() {
                if !self.entries.contains_key(dependency) {
                    log::warn!(
                        "input layer {:?} of {:?} has no registered tagger, \
                         layer {:?} cannot be created",
                        dependency,
                        entry.tagger.descriptor().name,
                        layer
                    );
                }
            }
        }
        log::trace!("rebuilt layer graph with {} nodes", graph.nodes.len());
        self.graph = graph;
        Ok(())
    }
}
