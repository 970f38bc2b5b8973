//! Import of IDS documents converted from XML to JSON.
//!
//! The converter renders repeated tags either as an object (one occurrence)
//! or an array, and values as `{"simpleValue": ..}` or an `xs:restriction`.
//! Anything missing maps to a permissive default.

use super::operator::{scalar_text, Expected, Operator};
use super::specification::{Applicability, Cardinality, Requirement, RequirementKind, Specification};
use crate::error::LoadError;
use serde_json::Value;

/// Parses every specification of an IDS document.
///
/// The root may be the `ids` element itself or a wrapper holding it.
pub fn parse_ids_document(document: &Value) -> Result<Vec<Specification>, LoadError> {
    let root = document.get("ids").unwrap_or(document);
    let specifications = root
        .get("specifications")
        .ok_or_else(|| LoadError::InvalidDocument {
            message: "IDS document has no `specifications` element".to_string(),
        })?;

    let parsed: Vec<Specification> = one_or_many(specifications.get("specification"))
        .enumerate()
        .map(|(index, node)| parse_specification(index, node))
        .collect();

    tracing::debug!(count = parsed.len(), "IDS specifications parsed");
    Ok(parsed)
}

fn parse_specification(index: usize, node: &Value) -> Specification {
    let name = attribute(node, "name").unwrap_or_else(|| format!("Specification {}", index + 1));

    let applicability = node.get("applicability").map_or_else(Applicability::default, |app| {
        Applicability {
            entity: app
                .get("entity")
                .and_then(|entity| simple_value(entity.get("name"))),
            properties: one_or_many(app.get("property"))
                .map(parse_property)
                .collect(),
        }
    });

    let mut requirements = Vec::new();
    if let Some(reqs) = node.get("requirements") {
        requirements.extend(one_or_many(reqs.get("attribute")).map(parse_attribute));
        requirements.extend(one_or_many(reqs.get("property")).map(parse_property));
    }

    Specification {
        name,
        description: attribute(node, "description"),
        applicability,
        requirements,
        cardinality: Cardinality::Required,
    }
}

fn parse_attribute(node: &Value) -> Requirement {
    let mut requirement = Requirement {
        kind: RequirementKind::Attribute,
        name: simple_value(node.get("name")),
        cardinality: cardinality(node),
        ..Requirement::default()
    };
    apply_value(&mut requirement, node.get("value"));
    requirement
}

fn parse_property(node: &Value) -> Requirement {
    let mut requirement = Requirement {
        kind: RequirementKind::Property,
        property_set: simple_value(node.get("propertySet")),
        name: simple_value(node.get("baseName").or_else(|| node.get("name"))),
        data_type: attribute(node, "dataType"),
        cardinality: cardinality(node),
        ..Requirement::default()
    };
    apply_value(&mut requirement, node.get("value"));
    requirement
}

/// Translates a value facet into an operator and expectation.
fn apply_value(requirement: &mut Requirement, value: Option<&Value>) {
    let Some(value) = value else {
        return;
    };
    if let Some(simple) = simple_value(Some(value)) {
        requirement.operator = Some(Operator::Equals);
        requirement.value = Some(Expected::Single(simple));
        return;
    }
    let Some(restriction) = value.get("xs:restriction") else {
        return;
    };

    let enumeration: Vec<String> = one_or_many(restriction.get("xs:enumeration"))
        .filter_map(facet_value)
        .collect();
    if !enumeration.is_empty() {
        requirement.operator = Some(Operator::Enumeration);
        requirement.value = Some(Expected::List(enumeration));
        return;
    }

    if let Some(pattern) = one_or_many(restriction.get("xs:pattern")).find_map(facet_value) {
        requirement.operator = Some(Operator::Pattern);
        requirement.value = Some(Expected::Single(pattern));
        return;
    }

    let min = restriction.get("xs:minInclusive").and_then(facet_value);
    let max = restriction.get("xs:maxInclusive").and_then(facet_value);
    match (min, max) {
        (Some(min), Some(max)) => {
            requirement.operator = Some(Operator::Range);
            requirement.value = Some(Expected::Range { min, max });
        }
        (Some(min), None) => {
            tracing::debug!(%min, "open-ended IDS range");
            requirement.operator = Some(Operator::Range);
            requirement.value = Some(Expected::Range {
                min,
                max: f64::MAX.to_string(),
            });
        }
        (None, Some(max)) => {
            requirement.operator = Some(Operator::Range);
            requirement.value = Some(Expected::Range {
                min: f64::MIN.to_string(),
                max,
            });
        }
        (None, None) => {}
    }
}

fn cardinality(node: &Value) -> Cardinality {
    attribute(node, "cardinality").map_or(Cardinality::Required, |c| Cardinality::parse(&c))
}

/// Reads an XML attribute rendered either as `@name` or as `name`.
fn attribute(node: &Value, name: &str) -> Option<String> {
    node.get(format!("@{name}"))
        .or_else(|| node.get(name))
        .and_then(scalar_text)
}

/// `{"simpleValue": x}`, or a bare scalar.
fn simple_value(node: Option<&Value>) -> Option<String> {
    let node = node?;
    match node.get("simpleValue") {
        Some(value) => scalar_text(value),
        None => scalar_text(node),
    }
}

/// A facet such as `{"value": "EI30"}`, `{"@value": "EI30"}` or `"EI30"`.
fn facet_value(node: &Value) -> Option<String> {
    attribute(node, "value").or_else(|| scalar_text(node))
}

fn one_or_many(node: Option<&Value>) -> impl Iterator<Item = &Value> {
    let items: &[Value] = match node {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => &[],
        Some(single) => std::slice::from_ref(single),
    };
    items.iter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn single_specification_as_object() {
        let doc = json!({
            "specifications": {
                "specification": {
                    "@name": "Walls",
                    "applicability": {"entity": {"name": {"simpleValue": "IfcWall"}}},
                    "requirements": {
                        "attribute": {"name": {"simpleValue": "Name"}},
                        "property": [
                            {"propertySet": {"simpleValue": "Pset_WallCommon"},
                             "name": {"simpleValue": "FireRating"},
                             "value": {"xs:restriction": {"xs:enumeration": [{"value": "EI30"}, {"value": "EI60"}]}}},
                            {"propertySet": {"simpleValue": "Qto"},
                             "name": {"simpleValue": "Width"},
                             "@cardinality": "prohibited"}
                        ]
                    }
                }
            }
        });

        let specs = parse_ids_document(&doc).unwrap();
        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.name, "Walls");
        assert_eq!(spec.applicability.entity.as_deref(), Some("IfcWall"));
        assert_eq!(spec.requirements.len(), 3);
        assert_eq!(spec.requirements[0].kind, RequirementKind::Attribute);
        assert_eq!(spec.requirements[0].effective_operator(), Operator::Existence);
        assert_eq!(
            spec.requirements[1].value,
            Some(Expected::List(vec!["EI30".into(), "EI60".into()]))
        );
        assert_eq!(spec.requirements[2].cardinality, Cardinality::Prohibited);
    }

    #[test]
    fn restrictions_map_to_operators() {
        let doc = json!({"ids": {"specifications": {"specification": [
            {"requirements": {"property": [
                {"name": {"simpleValue": "Code"}, "value": {"xs:restriction": {"xs:pattern": {"@value": "^A"}}}},
                {"name": {"simpleValue": "Area"}, "value": {"xs:restriction": {
                    "xs:minInclusive": {"value": 10}, "xs:maxInclusive": {"value": 20}}}},
                {"name": {"simpleValue": "Mat"}, "value": {"simpleValue": "Béton"}}
            ]}},
            {}
        ]}}});

        let specs = parse_ids_document(&doc).unwrap();
        assert_eq!(specs.len(), 2);
        assert_eq!(specs[1].name, "Specification 2");
        assert!(specs[1].requirements.is_empty());

        let ops: Vec<Operator> = specs[0]
            .requirements
            .iter()
            .map(Requirement::effective_operator)
            .collect();
        assert_eq!(ops, vec![Operator::Pattern, Operator::Range, Operator::Equals]);
        assert_eq!(
            specs[0].requirements[1].value,
            Some(Expected::Range {
                min: "10".into(),
                max: "20".into()
            })
        );
    }

    #[test]
    fn missing_specifications_is_an_error() {
        assert!(parse_ids_document(&json!({"info": {}})).is_err());
    }
}
