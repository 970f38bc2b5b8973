//! Loose data-type names mapped to JSON kind checks.

use serde_json::Value;

/// Canonical value kinds recognised by the `DataType` operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Number,
    String,
    Boolean,
    Array,
    Object,
    Function,
    Undefined,
    Null,
}

const TYPE_ALIASES: &[(TypeKind, &[&str])] = &[
    (
        TypeKind::Number,
        &["number", "nombre", "integer", "int", "float", "double", "real", "ifcreal"],
    ),
    (
        TypeKind::String,
        &["string", "texte", "text", "char", "varchar", "ifclabel", "ifctext"],
    ),
    (
        TypeKind::Boolean,
        &["boolean", "bool", "true/false", "vrai/faux", "ifcboolean"],
    ),
    (TypeKind::Array, &["array", "table", "tableau", "liste", "list"]),
    (
        TypeKind::Object,
        &["object", "objet", "json", "dict", "dictionnaire", "map"],
    ),
    (TypeKind::Function, &["function", "func", "fonction", "callable"]),
    (TypeKind::Undefined, &["undefined", "indéfini"]),
    (TypeKind::Null, &["null", "nul", "vide"]),
];

impl TypeKind {
    /// Resolves a case-insensitive alias; unknown names yield `None`.
    #[must_use]
    pub fn from_alias(alias: &str) -> Option<Self> {
        let alias = alias.trim().to_lowercase();
        TYPE_ALIASES
            .iter()
            .find(|(_, names)| names.contains(&alias.as_str()))
            .map(|(kind, _)| *kind)
    }

    /// Kind check against a value; `None` stands for an absent value.
    #[must_use]
    pub fn check(self, value: Option<&Value>) -> bool {
        match (self, value) {
            (TypeKind::Undefined, None) => true,
            (TypeKind::Number, Some(Value::Number(_)))
            | (TypeKind::String, Some(Value::String(_)))
            | (TypeKind::Boolean, Some(Value::Bool(_)))
            | (TypeKind::Array, Some(Value::Array(_)))
            | (TypeKind::Object, Some(Value::Object(_)))
            | (TypeKind::Null, Some(Value::Null)) => true,
            // JSON metadata never carries callables.
            _ => false,
        }
    }
}

/// True when `value` is of the kind named by `type_alias`.
///
/// Unknown type names never match.
#[must_use]
pub fn is_type(value: Option<&Value>, type_alias: &str) -> bool {
    TypeKind::from_alias(type_alias).is_some_and(|kind| kind.check(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aliases_are_case_insensitive() {
        assert_eq!(TypeKind::from_alias("Nombre"), Some(TypeKind::Number));
        assert_eq!(TypeKind::from_alias("VARCHAR"), Some(TypeKind::String));
        assert_eq!(TypeKind::from_alias("INDÉFINI"), Some(TypeKind::Undefined));
        assert_eq!(TypeKind::from_alias("Vrai/Faux"), Some(TypeKind::Boolean));
    }

    #[test]
    fn kinds_follow_json_shape() {
        assert!(is_type(Some(&json!(12.5)), "float"));
        assert!(!is_type(Some(&json!("12.5")), "number"));
        assert!(is_type(Some(&json!("abc")), "texte"));
        assert!(is_type(Some(&json!([1, 2])), "liste"));
        assert!(!is_type(Some(&json!({"a": 1})), "array"));
        assert!(is_type(Some(&json!({"a": 1})), "dict"));
        assert!(is_type(Some(&Value::Null), "null"));
        assert!(!is_type(Some(&json!(0)), "null"));
        assert!(is_type(None, "undefined"));
        assert!(!is_type(Some(&json!("f")), "function"));
    }

    #[test]
    fn unknown_type_names_fail_closed() {
        for value in [json!(1), json!("x"), json!(true), json!([]), json!({}), Value::Null] {
            assert!(!is_type(Some(&value), "bogus-type-name"));
        }
        assert!(!is_type(None, "bogus-type-name"));
    }
}
