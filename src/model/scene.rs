use super::{Element, ElementSummary};
use crate::codec::decode;
use serde::Serialize;
use std::collections::HashMap;

pub const BUILDING_TYPE: &str = "IfcBuilding";
pub const STOREY_TYPE: &str = "IfcBuildingStorey";
pub const SPACE_TYPE: &str = "IfcSpace";

/// Read-only element population with parent/child links resolved by id.
///
/// Parent links are plain ids looked up in the index, so the graph never
/// owns a cycle even if the input data contains one.
#[derive(Debug, Default)]
pub struct SceneGraph {
    elements: Vec<Element>,
    index: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
}

/// Objects contained in a space, see [`SceneGraph::contained_objects`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainedObjects {
    pub objects: Vec<ElementSummary>,
    /// Set when the space had no children and its parent's were used.
    pub no_object: bool,
}

impl SceneGraph {
    #[must_use]
    pub fn new(elements: Vec<Element>) -> Self {
        let mut index = HashMap::with_capacity(elements.len());
        for (i, element) in elements.iter().enumerate() {
            if index.contains_key(&element.id) {
                tracing::warn!(id = %element.id, "duplicate element id, keeping first occurrence");
                continue;
            }
            index.insert(element.id.clone(), i);
        }

        let mut children: Vec<Vec<usize>> = vec![Vec::new(); elements.len()];
        for (i, element) in elements.iter().enumerate() {
            for child_id in &element.children {
                if let Some(&child) = index.get(child_id) {
                    if !children[i].contains(&child) {
                        children[i].push(child);
                    }
                }
            }
        }
        for (i, element) in elements.iter().enumerate() {
            let parent = element.parent.as_ref().and_then(|p| index.get(p));
            if let Some(&parent) = parent {
                if parent != i && !children[parent].contains(&i) {
                    children[parent].push(i);
                }
            }
        }

        Self {
            elements,
            index,
            children,
        }
    }

    /// All elements in input order.
    #[must_use]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Element> {
        self.index.get(id).map(|&i| &self.elements[i])
    }

    #[must_use]
    pub fn parent(&self, element: &Element) -> Option<&Element> {
        element.parent.as_deref().and_then(|id| self.get(id))
    }

    /// Direct children, from explicit child lists and parent links.
    pub fn children<'a>(&'a self, element: &Element) -> impl Iterator<Item = &'a Element> + 'a {
        let slots = self
            .index
            .get(&element.id)
            .map_or(&[][..], |&i| self.children[i].as_slice());
        slots.iter().map(move |&i| &self.elements[i])
    }

    /// All elements below `element`, depth first, each visited once.
    #[must_use]
    pub fn descendants(&self, element: &Element) -> Vec<&Element> {
        let Some(&root) = self.index.get(&element.id) else {
            return Vec::new();
        };
        let mut visited = vec![false; self.elements.len()];
        visited[root] = true;
        let mut stack: Vec<usize> = self.children[root].iter().rev().copied().collect();
        let mut result = Vec::new();
        while let Some(i) = stack.pop() {
            if visited[i] {
                continue;
            }
            visited[i] = true;
            result.push(&self.elements[i]);
            stack.extend(self.children[i].iter().rev());
        }
        result
    }

    /// Walks parent links upward, starting at the element's parent.
    ///
    /// Stops at the root, at a dangling parent id, or after visiting as many
    /// elements as the graph holds (guards against cyclic input).
    pub fn ancestors<'a>(&'a self, element: &'a Element) -> impl Iterator<Item = &'a Element> + 'a {
        let mut current = self.parent(element);
        let mut remaining = self.elements.len();
        std::iter::from_fn(move || {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            let next = current?;
            current = self.parent(next);
            Some(next)
        })
    }

    pub fn by_type<'a>(&'a self, element_type: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements
            .iter()
            .filter(move |e| e.is_type(element_type))
    }

    #[must_use]
    pub fn buildings(&self) -> Vec<ElementSummary> {
        self.by_type(BUILDING_TYPE).map(summary).collect()
    }

    /// Storeys, optionally restricted to the direct children of one building.
    #[must_use]
    pub fn storeys(&self, building_id: Option<&str>) -> Vec<ElementSummary> {
        self.by_type(STOREY_TYPE)
            .filter(|s| building_id.map_or(true, |b| s.parent.as_deref() == Some(b)))
            .map(summary)
            .collect()
    }

    /// Spaces, optionally restricted to the direct children of one parent.
    #[must_use]
    pub fn spaces(&self, parent_id: Option<&str>) -> Vec<ElementSummary> {
        self.by_type(SPACE_TYPE)
            .filter(|s| parent_id.map_or(true, |p| s.parent.as_deref() == Some(p)))
            .map(summary)
            .collect()
    }

    /// Non-space objects contained in a space. A space without children
    /// falls back to its parent's children.
    #[must_use]
    pub fn contained_objects(&self, space_id: &str) -> Option<ContainedObjects> {
        let space = self.get(space_id)?;
        let mut source: Vec<&Element> = self.children(space).collect();
        let mut no_object = false;
        if source.is_empty() {
            no_object = true;
            source = self
                .parent(space)
                .map(|p| self.children(p).collect())
                .unwrap_or_default();
        }
        let objects = source
            .into_iter()
            .filter(|e| !e.is_type(SPACE_TYPE))
            .map(summary)
            .collect();
        Some(ContainedObjects { objects, no_object })
    }
}

fn summary(element: &Element) -> ElementSummary {
    ElementSummary {
        id: element.id.clone(),
        name: decode(&element.name),
    }
}
