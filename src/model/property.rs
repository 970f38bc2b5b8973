use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::borrow::Cow;

/// Raw property value as delivered by the metadata graph.
///
/// No type is enforced: values are usually strings, sometimes numbers,
/// booleans or null. Comparators coerce through [`PropertyValue::text`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyValue(pub Value);

impl PropertyValue {
    /// Text form used by string and numeric comparisons. Null is `""`.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        match &self.0 {
            Value::Null => Cow::Borrowed(""),
            Value::String(s) => Cow::Borrowed(s.as_str()),
            Value::Bool(b) => Cow::Borrowed(if *b { "true" } else { "false" }),
            Value::Number(n) => Cow::Owned(n.to_string()),
            other => Cow::Owned(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_json(&self) -> &Value {
        &self.0
    }

    /// True for null and for strings that are empty once trimmed.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match &self.0 {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self(Value::String(value))
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self(serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number))
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// A single name/value pair inside a property set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A named group of properties (an IFC property set or quantity set).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySet {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Null entries are kept so that malformed data round-trips; readers skip them.
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Vec<Option<Property>>,
}

impl PropertySet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.push(Some(Property::new(name, value)));
        self
    }

    /// Iterates over the properties present in the set, skipping null entries.
    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter().flatten()
    }
}

/// Deserializes `null` the same way as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
