use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Comparison operator of a requirement.
///
/// Parsed from the English keys and from the French labels sent by the host
/// UI. Anything else is kept as [`Operator::Unknown`] and compared with
/// equals semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    Existence,
    #[default]
    Equals,
    GreaterThan,
    LessThan,
    Contains,
    Range,
    Enumeration,
    Pattern,
    Unit,
    DataType,
    Unknown(String),
}

impl Operator {
    #[must_use]
    pub fn parse(key: &str) -> Self {
        match key {
            "Existence" => Self::Existence,
            "Equals" | "Value" | "égal à" => Self::Equals,
            "GreaterThan" | "superieur à" | "supérieur à" => Self::GreaterThan,
            "LessThan" | "inferieur à" | "inférieur à" => Self::LessThan,
            "Contains" | "contient" => Self::Contains,
            "Range" | "dans l'intervalle" => Self::Range,
            "Enumeration" | "énumération" => Self::Enumeration,
            "Pattern" | "pattern" => Self::Pattern,
            "Unit" => Self::Unit,
            "DataType" => Self::DataType,
            other => Self::Unknown(other.to_string()),
        }
    }

    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Existence => "Existence",
            Self::Equals => "Equals",
            Self::GreaterThan => "GreaterThan",
            Self::LessThan => "LessThan",
            Self::Contains => "Contains",
            Self::Range => "Range",
            Self::Enumeration => "Enumeration",
            Self::Pattern => "Pattern",
            Self::Unit => "Unit",
            Self::DataType => "DataType",
            Self::Unknown(key) => key,
        }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl From<String> for Operator {
    fn from(key: String) -> Self {
        Self::parse(&key)
    }
}

impl From<Operator> for String {
    fn from(operator: Operator) -> Self {
        operator.key().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Expected value(s) of a comparison.
///
/// Deserializes from a scalar (`Single`), an array of scalars (`List`) or a
/// `{min, max}` object (`Range`). Scalars are kept as text: bounds are only
/// checked for numeric validity when compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Expected {
    Single(String),
    Range { min: String, max: String },
    List(Vec<String>),
}

impl Expected {
    /// Builds an expectation from a JSON value; `None` for null or for
    /// shapes that carry no usable value. An object missing a bound keeps
    /// it empty, which no value satisfies.
    #[must_use]
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Array(items) => Some(Self::List(items.iter().filter_map(scalar_text).collect())),
            Value::Object(map) => {
                let bound = |key: &str| map.get(key).and_then(scalar_text).unwrap_or_default();
                Some(Self::Range {
                    min: bound("min"),
                    max: bound("max"),
                })
            }
            scalar => scalar_text(scalar).map(Self::Single),
        }
    }

    /// The single value, or the first entry of a list.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::List(values) => values.first().map(String::as_str),
            Self::Range { .. } => None,
        }
    }
}

impl<'de> Deserialize<'de> for Expected {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Self::from_json(&value)
            .ok_or_else(|| D::Error::custom("expected a scalar, a list or a {min, max} object"))
    }
}

pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
