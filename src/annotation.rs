use crate::errors::{LayerError, LayerResult};
use crate::value::AttributeValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute values of one reading of a span.
///
/// The key set always equals the attribute schema of the owning layer; the
/// layer checks this on insertion. Equality looks at values only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Annotation {
    values: BTreeMap<String, AttributeValue>,
}

impl Annotation {
    pub(crate) fn from_values(values: BTreeMap<String, AttributeValue>) -> Self {
        Annotation { values }
    }

    pub fn get(&self, attribute: &str) -> Option<&AttributeValue> {
        self.values.get(attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Owned copy of the attribute map.
    pub fn to_map(&self) -> BTreeMap<String, AttributeValue> {
        self.values.clone()
    }

    pub(crate) fn insert(&mut self, attribute: String, value: AttributeValue) {
        self.values.insert(attribute, value);
    }

    pub(crate) fn remove(&mut self, attribute: &str) -> Option<AttributeValue> {
        self.values.remove(attribute)
    }
}

/// Mutable view of an annotation that only accepts declared attributes.
#[derive(Debug)]
pub struct AnnotationMut<'a> {
    pub(crate) layer: &'a str,
    pub(crate) attributes: &'a [String],
    pub(crate) annotation: &'a mut Annotation,
}

impl<'a> AnnotationMut<'a> {
    pub fn get(&self, attribute: &str) -> Option<&AttributeValue> {
        self.annotation.get(attribute)
    }

    /// Replace the value of a declared attribute, returning the old value.
    pub fn set(
        &mut self,
        attribute: &str,
        value: impl Into<AttributeValue>,
    ) -> LayerResult<AttributeValue> {
        if !self.attributes.iter().any(|a| a == attribute) {
            return Err(LayerError::UnknownAttribute {
                layer: self.layer.to_string(),
                attribute: attribute.to_string(),
            });
        }
        let old = self
            .annotation
            .values
            .insert(attribute.to_string(), value.into());
        Ok(old.unwrap_or_default())
    }

    pub fn annotation(&self) -> &Annotation {
        self.annotation
    }
}
