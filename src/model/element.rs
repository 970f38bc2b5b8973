use super::property::{null_as_default, PropertySet, PropertyValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A building element record from the metadata scene graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    pub id: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub element_type: String,
    /// Display name, possibly placeholder-encoded.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Id of the containing element; resolved through [`super::SceneGraph`].
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub property_sets: Vec<Option<PropertySet>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub children: Vec<String>,
    /// Direct IFC attributes beyond id/name/type (e.g. `Description`, `Tag`).
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: BTreeMap<String, PropertyValue>,
    /// Id of the model file the element was loaded from.
    #[serde(default)]
    pub model_id: Option<String>,
}

impl Element {
    pub fn new(id: impl Into<String>, element_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            element_type: element_type.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    #[must_use]
    pub fn with_property_set(mut self, property_set: PropertySet) -> Self {
        self.property_sets.push(Some(property_set));
        self
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Entity type comparison, ignoring ASCII case (`IFCWALL` is `IfcWall`).
    #[must_use]
    pub fn is_type(&self, type_name: &str) -> bool {
        self.element_type.eq_ignore_ascii_case(type_name)
    }

    /// Iterates over the property sets present, skipping null entries.
    pub fn property_sets(&self) -> impl Iterator<Item = &PropertySet> {
        self.property_sets.iter().flatten()
    }
}

/// Lightweight `{id, name}` view used by scene queries and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSummary {
    pub id: String,
    pub name: String,
}

/// `{id, name, type}` view recorded in evaluation partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub element_type: String,
}

impl From<&Element> for ElementRef {
    fn from(element: &Element) -> Self {
        Self {
            id: element.id.clone(),
            name: element.name.clone(),
            element_type: element.element_type.clone(),
        }
    }
}
