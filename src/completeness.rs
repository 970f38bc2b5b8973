//! Property completeness audit.
//!
//! For each (set, property) check, every element is graded on whether the
//! set exists, whether the property exists in it, and whether the value is
//! filled in.

use crate::accessor::{property_sets_named, TextMatcher};
use crate::aggregate::text_or_value;
use crate::model::{Element, ElementRef};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletenessCheck {
    #[serde(default, deserialize_with = "text_or_value")]
    pub section: String,
    #[serde(default, deserialize_with = "text_or_value")]
    pub property: String,
}

impl CompletenessCheck {
    pub fn new(section: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            property: property.into(),
        }
    }

    /// `section-property`, the key used in reports.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}-{}", self.section, self.property)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "NOK")]
    Missing,
    /// Not checked because an enclosing level is missing.
    #[serde(rename = "NC")]
    NotChecked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStatus {
    #[serde(flatten)]
    pub element: ElementRef,
    pub section: Status,
    pub property: Status,
    pub value: Status,
}

impl ObjectStatus {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.section == Status::Ok && self.property == Status::Ok && self.value == Status::Ok
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub id: String,
    /// Elements with at least one problem, in input order.
    pub objects: Vec<ObjectStatus>,
    /// Percentage of audited elements with a problem, two decimals.
    pub error_rate: f64,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub checks: Vec<CheckReport>,
    /// Elements passing every check.
    pub valid_objects: Vec<ElementRef>,
}

/// Audits `elements` against every check.
#[must_use]
pub fn audit(elements: &[Element], checks: &[CompletenessCheck], matcher: TextMatcher) -> AuditReport {
    let mut all_ok = vec![true; elements.len()];
    let mut report = AuditReport::default();

    for check in checks {
        let mut problems = Vec::new();
        for (element, ok) in elements.iter().zip(all_ok.iter_mut()) {
            let status = grade(element, check, matcher);
            if !status.is_ok() {
                *ok = false;
                problems.push(status);
            }
        }
        let error_rate = error_rate(problems.len(), elements.len());
        tracing::debug!(check = %check.id(), problems = problems.len(), error_rate, "completeness check");
        report.checks.push(CheckReport {
            id: check.id(),
            objects: problems,
            error_rate,
            total: elements.len(),
        });
    }

    if !checks.is_empty() {
        report.valid_objects = elements
            .iter()
            .zip(&all_ok)
            .filter(|(_, ok)| **ok)
            .map(|(element, _)| ElementRef::from(element))
            .collect();
    }
    report
}

fn grade(element: &Element, check: &CompletenessCheck, matcher: TextMatcher) -> ObjectStatus {
    let mut section = Status::Missing;
    let mut property = Status::NotChecked;
    let mut value = Status::NotChecked;

    for set in property_sets_named(element, &check.section, matcher) {
        section = Status::Ok;
        if property != Status::Ok {
            property = Status::Missing;
        }
        for found in set.iter().filter(|p| matcher.matches(&p.name, &check.property)) {
            property = Status::Ok;
            if found.value.is_blank() {
                if value != Status::Ok {
                    value = Status::Missing;
                }
            } else {
                value = Status::Ok;
            }
        }
    }

    ObjectStatus {
        element: ElementRef::from(element),
        section,
        property,
        value,
    }
}

fn error_rate(problems: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let rate = problems as f64 / total as f64 * 100.0;
    (rate * 100.0).round() / 100.0
}
