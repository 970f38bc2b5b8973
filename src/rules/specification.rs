use super::operator::{Expected, Operator};
use crate::model::property::null_as_default;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether satisfying a requirement is wanted, forbidden or optional.
///
/// Reads any casing; unrecognised values fall back to `Required`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub enum Cardinality {
    #[default]
    Required,
    Prohibited,
    /// Absence passes; a present value must still satisfy the comparison.
    Optional,
}

impl Cardinality {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match text.trim().to_ascii_lowercase().as_str() {
            "required" => Self::Required,
            "prohibited" => Self::Prohibited,
            "optional" => Self::Optional,
            other => {
                tracing::warn!(cardinality = other, "unknown cardinality, using required");
                Self::Required
            }
        }
    }
}

impl From<Value> for Cardinality {
    fn from(value: Value) -> Self {
        value.as_str().map_or_else(Self::default, Self::parse)
    }
}

/// What a requirement looks at.
///
/// Reads any casing; unrecognised values fall back to `Property`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "Value")]
pub enum RequirementKind {
    /// A direct element attribute (`Name`, `GlobalId`, `type`, ...).
    Attribute,
    #[default]
    Property,
}

impl From<Value> for RequirementKind {
    fn from(value: Value) -> Self {
        match value.as_str().map(str::trim) {
            Some(kind) if kind.eq_ignore_ascii_case("attribute") => Self::Attribute,
            Some(kind) if !kind.eq_ignore_ascii_case("property") => {
                tracing::warn!(kind, "unknown requirement kind, using property");
                Self::Property
            }
            _ => Self::Property,
        }
    }
}

/// One attribute or property check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requirement {
    #[serde(default)]
    pub kind: RequirementKind,
    /// Target property set; `None` scans every set.
    #[serde(default, alias = "section")]
    pub property_set: Option<String>,
    /// Property or attribute name; `None` only requires the set to exist.
    #[serde(default, alias = "property")]
    pub name: Option<String>,
    /// Defaults to `Equals` with a value, `Existence` without.
    #[serde(default, alias = "type")]
    pub operator: Option<Operator>,
    #[serde(default)]
    pub value: Option<Expected>,
    /// Extra data-type constraint checked alongside the operator.
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl Requirement {
    pub fn property(property_set: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: RequirementKind::Property,
            property_set: Some(property_set.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn property_set(property_set: impl Into<String>) -> Self {
        Self {
            kind: RequirementKind::Property,
            property_set: Some(property_set.into()),
            ..Self::default()
        }
    }

    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            kind: RequirementKind::Attribute,
            name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with(mut self, operator: Operator, value: Expected) -> Self {
        self.operator = Some(operator);
        self.value = Some(value);
        self
    }

    #[must_use]
    pub fn equals(self, value: impl Into<String>) -> Self {
        self.with(Operator::Equals, Expected::Single(value.into()))
    }

    #[must_use]
    pub fn in_range(self, min: impl Into<String>, max: impl Into<String>) -> Self {
        self.with(
            Operator::Range,
            Expected::Range {
                min: min.into(),
                max: max.into(),
            },
        )
    }

    #[must_use]
    pub fn matching(self, pattern: impl Into<String>) -> Self {
        self.with(Operator::Pattern, Expected::Single(pattern.into()))
    }

    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    #[must_use]
    pub fn with_data_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }

    /// The operator actually applied.
    #[must_use]
    pub fn effective_operator(&self) -> Operator {
        match (&self.operator, &self.value, &self.data_type) {
            (Some(op), _, _) => op.clone(),
            (None, Some(_), _) => Operator::Equals,
            (None, None, Some(_)) => Operator::DataType,
            (None, None, None) => Operator::Existence,
        }
    }

    /// Label used in reports: `Set.Name`, `Name` or `Set`.
    #[must_use]
    pub fn label(&self) -> String {
        match (self.kind, self.property_set.as_deref(), self.name.as_deref()) {
            (RequirementKind::Attribute, _, Some(name)) => name.to_string(),
            (RequirementKind::Property, Some(set), Some(name)) => format!("{set}.{name}"),
            (_, _, Some(name)) => name.to_string(),
            (_, Some(set), None) => set.to_string(),
            (_, None, None) => "<any>".to_string(),
        }
    }
}

/// Gate deciding whether a specification looks at an element at all.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicability {
    /// Required entity type; `None` applies to every element.
    #[serde(default, alias = "ifcClass")]
    pub entity: Option<String>,
    /// Extra constraints, evaluated like requirements.
    #[serde(default, deserialize_with = "null_as_default")]
    pub properties: Vec<Requirement>,
}

/// A rule unit: applicability plus requirements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Specification {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub applicability: Applicability,
    #[serde(default, deserialize_with = "null_as_default")]
    pub requirements: Vec<Requirement>,
    /// `Prohibited` inverts the combined outcome of all requirements.
    #[serde(default)]
    pub cardinality: Cardinality,
}

impl Specification {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_entity(mut self, entity: impl Into<String>) -> Self {
        self.applicability.entity = Some(entity.into());
        self
    }

    #[must_use]
    pub fn applies_when(mut self, constraint: Requirement) -> Self {
        self.applicability.properties.push(constraint);
        self
    }

    #[must_use]
    pub fn require(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    #[must_use]
    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }
}
