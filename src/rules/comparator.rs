//! Comparison operators applied to a single property value.

use super::operator::{Expected, Operator};
use crate::accessor::TextMatcher;
use crate::classifier::is_type;
use crate::model::PropertyValue;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Options shared by every comparison of one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompareOptions {
    pub case_sensitive: bool,
}

impl CompareOptions {
    fn matcher(self) -> TextMatcher {
        TextMatcher::new(self.case_sensitive)
    }
}

/// Compiled `Pattern` expectations, keyed by pattern text.
///
/// Each pattern is compiled once per cache, in its literal and decoded
/// forms. An invalid pattern is stored with no forms, so it warns once and
/// then never matches.
#[derive(Debug, Default)]
pub struct PatternCache {
    case_sensitive: bool,
    compiled: RwLock<HashMap<String, Arc<[Regex]>>>,
}

impl PatternCache {
    #[must_use]
    pub fn new(case_sensitive: bool) -> Self {
        Self {
            case_sensitive,
            compiled: RwLock::default(),
        }
    }

    /// Number of distinct patterns compiled so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.compiled.read().map_or(0, |compiled| compiled.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get(&self, pattern: &str) -> Arc<[Regex]> {
        if let Ok(compiled) = self.compiled.read() {
            if let Some(regexes) = compiled.get(pattern) {
                return Arc::clone(regexes);
            }
        }
        let regexes: Arc<[Regex]> = compile_forms(pattern, self.case_sensitive).into();
        if let Ok(mut compiled) = self.compiled.write() {
            compiled
                .entry(pattern.to_string())
                .or_insert_with(|| Arc::clone(&regexes));
        }
        regexes
    }
}

/// Permissive numeric coercion: the trimmed text must parse as a finite
/// number as a whole. Empty text is not a number.
#[must_use]
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Applies `operator` to `actual` (`None` when the property is absent).
///
/// Never panics and never propagates errors: non-numeric inputs to numeric
/// operators, missing expectations and malformed patterns all yield `false`.
#[must_use]
pub fn compare(
    operator: &Operator,
    actual: Option<&PropertyValue>,
    expected: Option<&Expected>,
    options: CompareOptions,
) -> bool {
    compare_cached(operator, actual, expected, options, &PatternCache::new(options.case_sensitive))
}

/// [`compare`] with `Pattern` expectations looked up in `patterns`, whose
/// case rule applies to them.
#[must_use]
pub fn compare_cached(
    operator: &Operator,
    actual: Option<&PropertyValue>,
    expected: Option<&Expected>,
    options: CompareOptions,
    patterns: &PatternCache,
) -> bool {
    match operator {
        Operator::Existence => actual.is_some(),
        Operator::DataType => expected
            .and_then(Expected::first)
            .is_some_and(|alias| is_type(actual.map(PropertyValue::as_json), alias)),
        _ => {
            let (Some(actual), Some(expected)) = (actual, expected) else {
                return false;
            };
            compare_present(operator, &actual.text(), expected, options, patterns)
        }
    }
}

fn compare_present(
    operator: &Operator,
    actual: &str,
    expected: &Expected,
    options: CompareOptions,
    patterns: &PatternCache,
) -> bool {
    let matcher = options.matcher();
    match operator {
        Operator::GreaterThan => numeric_pair(actual, expected).is_some_and(|(a, e)| a > e),
        Operator::LessThan => numeric_pair(actual, expected).is_some_and(|(a, e)| a < e),
        Operator::Contains => expected
            .first()
            .is_some_and(|needle| matcher.contains(actual, needle)),
        Operator::Range => in_range(actual, expected),
        Operator::Enumeration => match expected {
            Expected::List(values) => values.iter().any(|v| equals(matcher, actual, v)),
            Expected::Single(value) => equals(matcher, actual, value),
            Expected::Range { .. } => false,
        },
        Operator::Pattern => expected
            .first()
            .is_some_and(|pattern| matches_pattern(actual, &patterns.get(pattern), options)),
        Operator::Unit => expected.first().is_some_and(|unit| has_unit(actual, unit)),
        // Equals, and unrecognised operators, which fall back to it.
        _ => match expected {
            Expected::Single(value) => equals(matcher, actual, value),
            Expected::List(values) => values.iter().any(|v| equals(matcher, actual, v)),
            Expected::Range { .. } => false,
        },
    }
}

fn equals(matcher: TextMatcher, actual: &str, expected: &str) -> bool {
    if matcher.matches(actual, expected) {
        return true;
    }
    matches!(
        (parse_number(actual), parse_number(expected)),
        (Some(a), Some(e)) if (a - e).abs() <= f64::EPSILON * a.abs().max(e.abs()).max(1.0)
    )
}

fn numeric_pair(actual: &str, expected: &Expected) -> Option<(f64, f64)> {
    let actual = parse_number(actual)?;
    let expected = parse_number(expected.first()?)?;
    Some((actual, expected))
}

fn in_range(actual: &str, expected: &Expected) -> bool {
    let Expected::Range { min, max } = expected else {
        return false;
    };
    match (parse_number(actual), parse_number(min), parse_number(max)) {
        (Some(value), Some(min), Some(max)) => min <= value && value <= max,
        _ => {
            tracing::trace!(actual, %min, %max, "range comparison on a non-numeric value");
            false
        }
    }
}

fn matches_pattern(actual: &str, regexes: &[Regex], options: CompareOptions) -> bool {
    let values = options.matcher().forms(actual);
    regexes
        .iter()
        .any(|regex| values.iter().any(|v| regex.is_match(v)))
}

/// The literal and decoded forms of `pattern`, compiled and deduplicated.
fn compile_forms(pattern: &str, case_sensitive: bool) -> Vec<Regex> {
    let sources = TextMatcher::new(true).forms(pattern);
    let mut regexes: Vec<Regex> = Vec::with_capacity(2);
    for (i, source) in sources.iter().enumerate() {
        if sources[..i].contains(source) {
            continue;
        }
        match RegexBuilder::new(source).case_insensitive(!case_sensitive).build() {
            Ok(regex) => regexes.push(regex),
            Err(err) => {
                tracing::warn!(pattern = %source, error = %err, "invalid pattern, comparison fails");
            }
        }
    }
    regexes
}

fn has_unit(actual: &str, unit: &str) -> bool {
    let fold = TextMatcher::new(false);
    let values = fold.forms(actual.trim());
    let units = fold.forms(unit.trim());
    values
        .iter()
        .any(|v| units.iter().any(|u| v.ends_with(u.as_ref())))
}
