//! Interactive property filter.
//!
//! A descriptor is turned into a one-requirement [`Specification`] and run
//! through the evaluator over a scoped population. Matched elements are
//! returned by id with their summed measures.

use crate::aggregate::MeasureRule;
use crate::model::{Element, SceneGraph, BUILDING_TYPE, STOREY_TYPE};
use crate::rules::{Evaluator, Expected, Operator, Requirement, Specification};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which part of the scene a filter looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "name")]
pub enum FilterScope {
    #[default]
    All,
    /// Every child of every storey with this name; no property test.
    Storey(String),
    /// Every descendant of the buildings with this name or id.
    Building(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterDescriptor {
    pub section: Option<String>,
    pub property: Option<String>,
    /// Defaults to equals.
    pub operator: Option<Operator>,
    pub value: Option<Expected>,
    pub measure: MeasureRule,
    pub scope: FilterScope,
}

impl FilterDescriptor {
    pub fn equals(section: impl Into<String>, property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            section: Some(section.into()),
            property: Some(property.into()),
            value: Some(Expected::Single(value.into())),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn in_scope(mut self, scope: FilterScope) -> Self {
        self.scope = scope;
        self
    }

    #[must_use]
    pub fn measuring(mut self, measure: MeasureRule) -> Self {
        self.measure = measure;
        self
    }

    /// The specification run over the scoped population.
    #[must_use]
    pub fn to_specification(&self) -> Specification {
        let mut specification = Specification::new("filter");
        if matches!(self.scope, FilterScope::Storey(_)) {
            return specification;
        }
        if self.section.is_none() && self.property.is_none() {
            return specification;
        }
        let operator = self.operator.clone().or_else(|| self.value.as_ref().map(|_| Operator::Equals));
        specification.requirements.push(Requirement {
            property_set: self.section.clone(),
            name: self.property.clone(),
            operator,
            value: self.value.clone(),
            ..Requirement::default()
        });
        specification
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterResult {
    pub ids: Vec<String>,
    pub count: usize,
    pub area: f64,
    pub volume: f64,
    #[serde(default)]
    pub aborted: bool,
}

/// Runs `descriptor` over `scene`.
#[must_use]
pub fn run_filter(scene: &SceneGraph, descriptor: &FilterDescriptor, evaluator: &Evaluator) -> FilterResult {
    let specification = descriptor.to_specification();
    let population = scoped_population(scene, &descriptor.scope, evaluator);
    let evaluation = evaluator.evaluate(&specification, &population);

    let mut seen = HashSet::new();
    let mut result = FilterResult {
        aborted: evaluation.aborted,
        ..FilterResult::default()
    };
    for valid in &evaluation.valid_objects {
        if !seen.insert(valid.id.as_str()) {
            continue;
        }
        let Some(element) = scene.get(&valid.id) else {
            continue;
        };
        let (area, volume) = descriptor.measure.measure(element, evaluator.matcher());
        result.ids.push(valid.id.clone());
        result.area += area;
        result.volume += volume;
    }
    result.count = result.ids.len();

    tracing::debug!(
        scope = ?descriptor.scope,
        population = population.len(),
        matched = result.count,
        "filter applied"
    );
    result
}

fn scoped_population(scene: &SceneGraph, scope: &FilterScope, evaluator: &Evaluator) -> Vec<Element> {
    let matcher = evaluator.matcher();
    let mut seen = HashSet::new();
    let mut population = Vec::new();
    let mut push = |element: &Element| {
        if seen.insert(element.id.clone()) {
            population.push(element.clone());
        }
    };

    match scope {
        FilterScope::All => scene.elements().iter().for_each(&mut push),
        FilterScope::Storey(name) => {
            for storey in scene.by_type(STOREY_TYPE).filter(|s| matcher.matches(&s.name, name)) {
                scene.children(storey).for_each(&mut push);
            }
        }
        FilterScope::Building(key) => {
            let buildings = scene
                .by_type(BUILDING_TYPE)
                .filter(|b| b.id == *key || matcher.matches(&b.name, key));
            for building in buildings {
                scene.descendants(building).into_iter().for_each(&mut push);
            }
        }
    }
    population
}
