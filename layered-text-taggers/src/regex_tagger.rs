//! Tags regular expression matches on the raw text.

use crate::errors::{TaggerError, TaggerResult};
use crate::tagger::{InputLayers, Tagger, TaggerDescriptor};
use layered_text::{AttributeValue, BaseSpan, Layer, Text};
use layered_text_ops::{resolve_conflicts, ConflictStrategy};
use regex::Regex;
use std::collections::BTreeMap;

/// One pattern and the annotation its matches get.
#[derive(Debug, Clone)]
pub struct RegexRule {
    pub pattern: Regex,
    /// Capture group that gives the span; `0` is the whole match.
    pub group: usize,
    /// Lower values win conflicts when the tagger ranks by priority.
    pub priority: i64,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl RegexRule {
    pub fn new(pattern: &str) -> TaggerResult<Self> {
        let pattern = Regex::new(pattern).map_err(|e| TaggerError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(RegexRule {
            pattern,
            group: 0,
            priority: 0,
            attributes: BTreeMap::new(),
        })
    }

    pub fn with_group(mut self, group: usize) -> Self {
        self.group = group;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_attribute(
        mut self,
        attribute: impl Into<String>,
        value: impl Into<AttributeValue>,
    ) -> Self {
        self.attributes.insert(attribute.into(), value.into());
        self
    }
}

/// Creates a flat layer of regex matches.
///
/// Matches of all rules are collected, empty matches skipped, and
/// overlapping matches resolved with a [`ConflictStrategy`]. Several rules
/// matching the same location give an ambiguous span; a non-ambiguous
/// output keeps the first of them.
#[derive(Debug)]
pub struct RegexTagger {
    descriptor: TaggerDescriptor,
    rules: Vec<RegexRule>,
    attributes: Vec<String>,
    strategy: ConflictStrategy,
    priority_attribute: Option<String>,
    match_attribute: Option<String>,
    ambiguous: bool,
}

impl RegexTagger {
    pub fn new(output_layer: impl Into<String>, rules: Vec<RegexRule>) -> Self {
        let mut tagger = RegexTagger {
            descriptor: TaggerDescriptor::new("RegexTagger", output_layer),
            rules,
            attributes: Vec::new(),
            strategy: ConflictStrategy::default(),
            priority_attribute: None,
            match_attribute: None,
            ambiguous: false,
        };
        tagger.refresh_descriptor();
        tagger
    }

    /// Attributes set from the rules; attributes a rule does not set are null.
    pub fn with_output_attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self.refresh_descriptor();
        self
    }

    pub fn with_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Records each rule's priority in `attribute` and lets lower priorities
    /// win conflicts before the strategy applies.
    pub fn with_priority_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.priority_attribute = Some(attribute.into());
        self.refresh_descriptor();
        self
    }

    /// Records the matched text in `attribute`.
    pub fn with_match_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.match_attribute = Some(attribute.into());
        self.refresh_descriptor();
        self
    }

    pub fn with_ambiguous(mut self, ambiguous: bool) -> Self {
        self.ambiguous = ambiguous;
        self.descriptor.ambiguous = Some(ambiguous);
        self
    }

    fn refresh_descriptor(&mut self) {
        let mut attributes = self.attributes.clone();
        for extra in [&self.priority_attribute, &self.match_attribute].into_iter().flatten() {
            if !attributes.contains(extra) {
                attributes.push(extra.clone());
            }
        }
        self.descriptor.output_attributes = attributes;
        self.descriptor.ambiguous = Some(self.ambiguous);
    }

    fn matches<'t>(&'t self, raw: &'t str) -> Vec<(BaseSpan, &'t str, &'t RegexRule)> {
        let mut found = Vec::new();
        for rule in &self.rules {
            for captures in rule.pattern.captures_iter(raw) {
                let group = match captures.get(rule.group) {
                    Some(group) if !group.as_str().is_empty() => group,
                    _ => continue,
                };
                if let Ok(base_span) = BaseSpan::elementary(group.start(), group.end()) {
                    found.push((base_span, group.as_str(), rule));
                }
            }
        }
        // stable: rules keep their order at one location
        found.sort_by(|a, b| a.0.cmp(&b.0));
        found
    }

    fn annotation(&self, matched: &str, rule: &RegexRule) -> Vec<(String, AttributeValue)> {
        let mut values: Vec<(String, AttributeValue)> = rule
            .attributes
            .iter()
            .map(|(attribute, value)| (attribute.clone(), value.clone()))
            .collect();
        if let Some(attribute) = &self.priority_attribute {
            values.push((attribute.clone(), AttributeValue::from(rule.priority)));
        }
        if let Some(attribute) = &self.match_attribute {
            values.push((attribute.clone(), AttributeValue::from(matched)));
        }
        values
    }
}

impl Tagger for RegexTagger {
    fn descriptor(&self) -> &TaggerDescriptor {
        &self.descriptor
    }

    fn make_layer(&self, text: &Text, _inputs: &InputLayers<'_>) -> TaggerResult<Layer> {
        let template = Layer::builder(self.descriptor.output_layer.clone())
            .attributes(self.descriptor.output_attributes.iter().cloned())
            .null_defaults();

        let mut candidates = template.clone().ambiguous(true).build()?;
        for (base_span, matched, rule) in self.matches(text.text()) {
            candidates.add_annotation(base_span, self.annotation(matched, rule))?;
        }
        resolve_conflicts(
            &mut candidates,
            self.strategy,
            self.priority_attribute.as_deref(),
            true,
        )?;

        if self.ambiguous {
            return Ok(candidates);
        }
        let mut layer = template.ambiguous(false).build()?;
        for span in candidates.spans() {
            if let Some(first) = span.annotations().first() {
                layer.add_annotation(
                    span.base_span().clone(),
                    first.iter().map(|(attribute, value)| (attribute.to_string(), value.clone())),
                )?;
            }
        }
        Ok(layer)
    }
}
