//! Evaluates specifications against an element population.
//!
//! Each (specification, element) pair goes through applicability, then
//! requirements, then classification into exactly one of valid, invalid or
//! ignored. Elements are independent, so a pass can run on the rayon pool;
//! partitions keep the input order either way.

use super::comparator::{compare, compare_cached, CompareOptions, PatternCache};
use super::operator::Operator;
use super::specification::{Cardinality, Requirement, RequirementKind, Specification};
use crate::accessor::{properties_in, property_sets_named, TextMatcher};
use crate::config::Config;
use crate::error::EvalError;
use crate::model::{Element, ElementRef, PropertyValue};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Why a requirement failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureReason {
    SetNotFound,
    PropertyNotFound,
    AttributeNotFound,
    ValueMismatch,
    /// A `Prohibited` requirement was satisfied.
    Prohibited,
    /// Operator not recognised and strict operators are enabled.
    UnknownOperator,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::SetNotFound => "property set not found",
            Self::PropertyNotFound => "property not found",
            Self::AttributeNotFound => "attribute not found",
            Self::ValueMismatch => "value does not match",
            Self::Prohibited => "prohibited value present",
            Self::UnknownOperator => "unknown operator",
        };
        f.write_str(text)
    }
}

/// A failing requirement recorded on an invalid element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingElement {
    pub requirement: String,
    pub reason: FailureReason,
}

impl fmt::Display for MissingElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.requirement, self.reason)
    }
}

/// Why an element was not evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum IgnoreReason {
    EntityMismatch { expected: String, actual: String },
    ApplicabilityNotMet { constraint: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidObject {
    #[serde(flatten)]
    pub element: ElementRef,
    pub missing_elements: Vec<MissingElement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoredObject {
    #[serde(flatten)]
    pub element: ElementRef,
    pub reason: IgnoreReason,
}

/// The three partitions produced for one specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub specification: String,
    pub valid_objects: Vec<ElementRef>,
    pub invalid_objects: Vec<InvalidObject>,
    pub ignored_objects: Vec<IgnoredObject>,
    /// Set when the pass was cut short; partitions hold what was done.
    #[serde(default)]
    pub aborted: bool,
}

impl EvaluationResult {
    #[must_use]
    pub fn total(&self) -> usize {
        self.valid_objects.len() + self.invalid_objects.len() + self.ignored_objects.len()
    }

    fn push(&mut self, element: &Element, classification: Classification) {
        let element = ElementRef::from(element);
        match classification {
            Classification::Valid => self.valid_objects.push(element),
            Classification::Invalid(missing_elements) => self.invalid_objects.push(InvalidObject {
                element,
                missing_elements,
            }),
            Classification::Ignored(reason) => {
                self.ignored_objects.push(IgnoredObject { element, reason });
            }
        }
    }
}

/// Final state of one (specification, element) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Valid,
    Invalid(Vec<MissingElement>),
    Ignored(IgnoreReason),
}

/// Population and specifications as handed over by a host.
///
/// Either side being absent is a caller error, not an empty report.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequest {
    #[serde(default)]
    pub elements: Option<Vec<Element>>,
    #[serde(default)]
    pub specifications: Option<Vec<Specification>>,
}

/// Cooperative cancellation shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    cancelled: Arc<AtomicBool>,
}

impl AbortHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Abort state of one running pass.
pub(crate) struct Budget<'a> {
    handle: Option<&'a AbortHandle>,
    deadline: Option<Instant>,
}

impl<'a> Budget<'a> {
    /// Starts the clock for a pass.
    pub(crate) fn start(handle: Option<&'a AbortHandle>, timeout: Option<Duration>) -> Self {
        Self {
            handle,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    pub(crate) fn exhausted(&self) -> bool {
        self.handle.is_some_and(AbortHandle::is_aborted)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }
}

/// Outcome of looking up a requirement target before cardinality applies.
enum Lookup {
    Absent(FailureReason),
    Present { matched: bool },
}

#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    matcher: TextMatcher,
    parallel: bool,
    strict_operators: bool,
    timeout: Option<Duration>,
    abort: Option<AbortHandle>,
    patterns: Arc<PatternCache>,
}

impl Evaluator {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            matcher: TextMatcher::new(config.case_sensitive),
            parallel: config.parallel,
            strict_operators: config.strict_operators,
            timeout: config.timeout(),
            abort: None,
            patterns: Arc::new(PatternCache::new(config.case_sensitive)),
        }
    }

    #[must_use]
    pub fn with_abort(mut self, handle: AbortHandle) -> Self {
        self.abort = Some(handle);
        self
    }

    #[must_use]
    pub fn matcher(&self) -> TextMatcher {
        self.matcher
    }

    fn compare_options(&self) -> CompareOptions {
        CompareOptions {
            case_sensitive: self.matcher.case_sensitive(),
        }
    }

    fn budget(&self) -> Budget<'_> {
        Budget::start(self.abort.as_ref(), self.timeout)
    }

    /// Entry point for host requests.
    pub fn run(&self, request: &EvaluationRequest) -> Result<Vec<EvaluationResult>, EvalError> {
        let elements = request.elements.as_deref().ok_or_else(|| EvalError::InvalidInput {
            message: "no element population supplied".to_string(),
        })?;
        let specifications =
            request
                .specifications
                .as_deref()
                .ok_or_else(|| EvalError::InvalidInput {
                    message: "no specifications supplied".to_string(),
                })?;
        Ok(self.evaluate_all(specifications, elements))
    }

    /// Evaluates every specification in order. Stops after the first one
    /// that was aborted.
    #[must_use]
    pub fn evaluate_all(
        &self,
        specifications: &[Specification],
        elements: &[Element],
    ) -> Vec<EvaluationResult> {
        let budget = self.budget();
        let mut results = Vec::with_capacity(specifications.len());
        for specification in specifications {
            let result = self.evaluate_with(specification, elements, &budget);
            let aborted = result.aborted;
            results.push(result);
            if aborted {
                tracing::warn!(
                    completed = results.len(),
                    total = specifications.len(),
                    "evaluation aborted, returning partial results"
                );
                break;
            }
        }
        results
    }

    #[must_use]
    pub fn evaluate(&self, specification: &Specification, elements: &[Element]) -> EvaluationResult {
        self.evaluate_with(specification, elements, &self.budget())
    }

    fn evaluate_with(
        &self,
        specification: &Specification,
        elements: &[Element],
        budget: &Budget<'_>,
    ) -> EvaluationResult {
        self.warn_unknown_operators(specification);

        let classify = |element: &Element| {
            if budget.exhausted() {
                None
            } else {
                Some(self.classify(specification, element))
            }
        };
        let outcomes: Vec<Option<Classification>> = if self.parallel {
            elements.par_iter().map(classify).collect()
        } else {
            let mut outcomes = Vec::with_capacity(elements.len());
            for element in elements {
                let outcome = classify(element);
                let stop = outcome.is_none();
                outcomes.push(outcome);
                if stop {
                    break;
                }
            }
            outcomes
        };

        let mut result = EvaluationResult {
            specification: specification.name.clone(),
            ..EvaluationResult::default()
        };
        for (element, outcome) in elements.iter().zip(outcomes) {
            match outcome {
                Some(classification) => result.push(element, classification),
                None => {
                    result.aborted = true;
                    break;
                }
            }
        }

        tracing::debug!(
            specification = %specification.name,
            valid = result.valid_objects.len(),
            invalid = result.invalid_objects.len(),
            ignored = result.ignored_objects.len(),
            aborted = result.aborted,
            "specification evaluated"
        );
        result
    }

    fn warn_unknown_operators(&self, specification: &Specification) {
        let all = specification
            .applicability
            .properties
            .iter()
            .chain(&specification.requirements);
        for requirement in all {
            if let Some(Operator::Unknown(key)) = &requirement.operator {
                if self.strict_operators {
                    tracing::warn!(specification = %specification.name, operator = %key, "unknown operator, requirement will fail");
                } else {
                    tracing::warn!(specification = %specification.name, operator = %key, "unknown operator, falling back to equals");
                }
            }
        }
    }

    /// Classifies one element against one specification.
    ///
    /// A specification with no requirements accepts every applicable
    /// element, whatever its cardinality: there is nothing to invert and
    /// no requirement to name as missing.
    #[must_use]
    pub fn classify(&self, specification: &Specification, element: &Element) -> Classification {
        if let Some(reason) = self.check_applicability(specification, element) {
            return Classification::Ignored(reason);
        }

        if specification.requirements.is_empty() {
            return Classification::Valid;
        }

        let failures: Vec<MissingElement> = specification
            .requirements
            .iter()
            .filter_map(|req| {
                self.check_requirement(req, element)
                    .err()
                    .map(|reason| MissingElement {
                        requirement: req.label(),
                        reason,
                    })
            })
            .collect();

        match specification.cardinality {
            Cardinality::Prohibited if failures.is_empty() => Classification::Invalid(
                specification
                    .requirements
                    .iter()
                    .map(|req| MissingElement {
                        requirement: req.label(),
                        reason: FailureReason::Prohibited,
                    })
                    .collect(),
            ),
            Cardinality::Prohibited => Classification::Valid,
            _ if failures.is_empty() => Classification::Valid,
            _ => Classification::Invalid(failures),
        }
    }

    fn check_applicability(&self, specification: &Specification, element: &Element) -> Option<IgnoreReason> {
        let applicability = &specification.applicability;
        if let Some(entity) = applicability.entity.as_deref().filter(|e| !e.is_empty()) {
            if !self.matcher.matches(&element.element_type, entity) {
                return Some(IgnoreReason::EntityMismatch {
                    expected: entity.to_string(),
                    actual: element.element_type.clone(),
                });
            }
        }
        applicability
            .properties
            .iter()
            .find(|constraint| self.check_requirement(constraint, element).is_err())
            .map(|constraint| IgnoreReason::ApplicabilityNotMet {
                constraint: constraint.label(),
            })
    }

    /// Checks one requirement, cardinality included.
    pub fn check_requirement(&self, requirement: &Requirement, element: &Element) -> Result<(), FailureReason> {
        let operator = requirement.effective_operator();
        if self.strict_operators && operator.is_unknown() {
            return Err(FailureReason::UnknownOperator);
        }

        let lookup = match requirement.kind {
            RequirementKind::Property => self.lookup_property(requirement, &operator, element),
            RequirementKind::Attribute => self.lookup_attribute(requirement, &operator, element),
        };

        match (requirement.cardinality, lookup) {
            (Cardinality::Required, Lookup::Absent(reason)) => Err(reason),
            (Cardinality::Required | Cardinality::Optional, Lookup::Present { matched: false }) => {
                Err(FailureReason::ValueMismatch)
            }
            (Cardinality::Prohibited, Lookup::Present { matched: true }) => Err(FailureReason::Prohibited),
            _ => Ok(()),
        }
    }

    fn lookup_property(&self, requirement: &Requirement, operator: &Operator, element: &Element) -> Lookup {
        let section = requirement.property_set.as_deref().filter(|s| !s.is_empty());
        if let Some(section) = section {
            if property_sets_named(element, section, self.matcher).next().is_none() {
                return Lookup::Absent(FailureReason::SetNotFound);
            }
        }

        let Some(name) = requirement.name.as_deref().filter(|n| !n.is_empty()) else {
            return Lookup::Present { matched: true };
        };

        let mut candidates = properties_in(element, section, name, self.matcher).peekable();
        if candidates.peek().is_none() {
            return Lookup::Absent(FailureReason::PropertyNotFound);
        }
        let matched = candidates.any(|p| self.value_matches(requirement, operator, Some(&p.value)));
        Lookup::Present { matched }
    }

    fn lookup_attribute(&self, requirement: &Requirement, operator: &Operator, element: &Element) -> Lookup {
        let Some(name) = requirement.name.as_deref() else {
            return Lookup::Present { matched: true };
        };
        match self.attribute_value(element, name) {
            Some(value) => Lookup::Present {
                matched: self.value_matches(requirement, operator, Some(&*value)),
            },
            None => Lookup::Absent(FailureReason::AttributeNotFound),
        }
    }

    fn attribute_value<'a>(&self, element: &'a Element, name: &str) -> Option<Cow<'a, PropertyValue>> {
        let text = |s: &str| Cow::Owned(PropertyValue::from(s));
        match name.to_ascii_lowercase().as_str() {
            "id" | "globalid" => return Some(text(&element.id)),
            "name" if !element.name.is_empty() => return Some(text(&element.name)),
            "type" | "entity" | "ifcclass" => return Some(text(&element.element_type)),
            _ => {}
        }
        element
            .attributes
            .iter()
            .find(|(key, _)| self.matcher.matches(key, name))
            .map(|(_, value)| Cow::Borrowed(value))
    }

    fn value_matches(&self, requirement: &Requirement, operator: &Operator, value: Option<&PropertyValue>) -> bool {
        let options = self.compare_options();
        let type_ok = requirement.data_type.as_deref().map_or(true, |data_type| {
            compare(
                &Operator::DataType,
                value,
                Some(&super::operator::Expected::Single(data_type.to_string())),
                options,
            )
        });
        if !type_ok {
            return false;
        }
        match operator {
            Operator::Existence => value.is_some(),
            Operator::DataType if requirement.value.is_none() && requirement.data_type.is_some() => true,
            _ => compare_cached(operator, value, requirement.value.as_ref(), options, &self.patterns),
        }
    }
}
