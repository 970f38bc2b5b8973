//! JSON loading of scenes and rule documents.

use crate::aggregate::GroupingRules;
use crate::completeness::CompletenessCheck;
use crate::error::LoadError;
use crate::filter::FilterDescriptor;
use crate::model::{Element, Property, PropertySet, SceneGraph};
use crate::rules::{parse_ids_document, Specification};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Loads a scene graph from a JSON file.
///
/// Accepted shapes:
/// - an array of elements, or `{"elements": [...]}`
/// - a metadata model `{"id", "metaObjects": [...], "propertySets": [...]}`
/// - `{"metaModels": [...]}` holding several such models
///
/// # Errors
///
/// Returns [`LoadError::FileRead`] if the file cannot be read,
/// [`LoadError::Json`] if it is not valid JSON and
/// [`LoadError::InvalidDocument`] if it matches none of the shapes.
///
/// # Example
///
/// ```no_run
/// use ifc_verifier::loader::load_scene;
///
/// let scene = load_scene("model.json")?;
/// println!("{} elements", scene.len());
/// # Ok::<(), ifc_verifier::error::LoadError>(())
/// ```
pub fn load_scene<P: AsRef<Path>>(path: P) -> Result<SceneGraph, LoadError> {
    let value: Value = read_json(path.as_ref())?;
    let elements = parse_scene(value)?;
    tracing::info!(path = %path.as_ref().display(), elements = elements.len(), "scene loaded");
    Ok(SceneGraph::new(elements))
}

/// Converts a parsed scene document into elements.
///
/// # Errors
///
/// Returns [`LoadError::InvalidDocument`] for unrecognised shapes or
/// malformed element records.
pub fn parse_scene(value: Value) -> Result<Vec<Element>, LoadError> {
    match value {
        Value::Array(_) => elements_from(value),
        Value::Object(mut map) => {
            if let Some(elements) = map.remove("elements") {
                return elements_from(elements);
            }
            if let Some(models) = map.remove("metaModels") {
                let models: Vec<MetaModel> = from_value(models)?;
                return Ok(models.into_iter().flat_map(MetaModel::into_elements).collect());
            }
            if map.contains_key("metaObjects") {
                let model: MetaModel = from_value(Value::Object(map))?;
                return Ok(model.into_elements());
            }
            Err(LoadError::InvalidDocument {
                message: "expected an element array, `elements`, `metaObjects` or `metaModels`".to_string(),
            })
        }
        _ => Err(LoadError::InvalidDocument {
            message: "scene document must be an array or an object".to_string(),
        }),
    }
}

/// Loads specifications from a native JSON list or an IDS document.
///
/// # Errors
///
/// Same as [`load_scene`].
pub fn load_specifications<P: AsRef<Path>>(path: P) -> Result<Vec<Specification>, LoadError> {
    let value: Value = read_json(path.as_ref())?;
    let specifications = parse_specifications(value)?;
    tracing::info!(
        path = %path.as_ref().display(),
        specifications = specifications.len(),
        "specifications loaded"
    );
    Ok(specifications)
}

/// Native documents are a list of specifications, bare or under
/// `specifications`; anything else is read as IDS. A native entry that
/// cannot be read is skipped with a warning.
///
/// # Errors
///
/// Returns [`LoadError::InvalidDocument`] when neither form applies.
pub fn parse_specifications(value: Value) -> Result<Vec<Specification>, LoadError> {
    match value {
        Value::Array(list) => Ok(native_specifications(list)),
        Value::Object(mut map) => match map.remove("specifications") {
            Some(Value::Array(list)) => Ok(native_specifications(list)),
            Some(other) => {
                map.insert("specifications".to_string(), other);
                parse_ids_document(&Value::Object(map))
            }
            None => parse_ids_document(&Value::Object(map)),
        },
        _ => Err(LoadError::InvalidDocument {
            message: "specification document must be an array or an object".to_string(),
        }),
    }
}

fn native_specifications(list: Vec<Value>) -> Vec<Specification> {
    list.into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(specification) => Some(specification),
            Err(err) => {
                tracing::warn!(index, error = %err, "skipping malformed specification");
                None
            }
        })
        .collect()
}

/// # Errors
///
/// Same as [`load_scene`].
pub fn load_grouping_rules<P: AsRef<Path>>(path: P) -> Result<GroupingRules, LoadError> {
    load_document(path.as_ref())
}

/// # Errors
///
/// Same as [`load_scene`].
pub fn load_filter<P: AsRef<Path>>(path: P) -> Result<FilterDescriptor, LoadError> {
    load_document(path.as_ref())
}

/// Completeness checks as a list, or as a map keyed by check name.
///
/// # Errors
///
/// Same as [`load_scene`].
pub fn load_checks<P: AsRef<Path>>(path: P) -> Result<Vec<CompletenessCheck>, LoadError> {
    let value: Value = read_json(path.as_ref())?;
    match value {
        Value::Object(map) => Ok(map
            .into_iter()
            .filter_map(|(key, check)| match serde_json::from_value(check) {
                Ok(check) => Some(check),
                Err(err) => {
                    tracing::debug!(%key, error = %err, "skipping non-check entry");
                    None
                }
            })
            .collect()),
        other => from_value(other),
    }
}

fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let value: Value = read_json(path)?;
    serde_json::from_value(value).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json(path: &Path) -> Result<Value, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn from_value<T: DeserializeOwned>(value: Value) -> Result<T, LoadError> {
    serde_json::from_value(value).map_err(|err| LoadError::InvalidDocument {
        message: err.to_string(),
    })
}

fn elements_from(value: Value) -> Result<Vec<Element>, LoadError> {
    from_value(value)
}

/// A metadata model as exported by the viewer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaModel {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    meta_objects: Vec<MetaObject>,
    #[serde(default)]
    property_sets: Vec<MetaPropertySet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetaObject {
    id: String,
    #[serde(default, rename = "type")]
    object_type: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    parent: Option<String>,
    #[serde(default)]
    property_set_ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct MetaPropertySet {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    properties: Vec<Option<Property>>,
}

impl MetaModel {
    /// Resolves property set ids into sets. Unknown ids become null
    /// entries, which accessors skip.
    fn into_elements(self) -> Vec<Element> {
        let sets: HashMap<String, PropertySet> = self
            .property_sets
            .into_iter()
            .map(|set| {
                (
                    set.id,
                    PropertySet {
                        name: set.name.unwrap_or_default(),
                        properties: set.properties,
                    },
                )
            })
            .collect();
        let model_id = self.id;

        self.meta_objects
            .into_iter()
            .map(|object| Element {
                property_sets: object
                    .property_set_ids
                    .unwrap_or_default()
                    .iter()
                    .map(|id| sets.get(id).cloned())
                    .collect(),
                id: object.id,
                element_type: object.object_type.unwrap_or_default(),
                name: object.name.unwrap_or_default(),
                parent: object.parent,
                model_id: model_id.clone(),
                ..Element::default()
            })
            .collect()
    }
}
