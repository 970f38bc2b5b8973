//! Typed access to property sets, properties and containing elements.
//!
//! All name matching goes through [`TextMatcher`], which tries the literal
//! and decoded forms of both sides.

use crate::codec::decode;
use crate::model::{Element, Property, PropertySet, SceneGraph};
use std::borrow::Cow;

/// Four-way text comparison with an optional case fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextMatcher {
    case_sensitive: bool,
}

impl TextMatcher {
    #[must_use]
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    #[must_use]
    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Equality between `actual` and `target`, each taken literally and decoded.
    #[must_use]
    pub fn matches(&self, actual: &str, target: &str) -> bool {
        let actual = self.forms(actual);
        let target = self.forms(target);
        actual.iter().any(|a| target.iter().any(|t| a == t))
    }

    /// Substring test under the same four-way rule.
    #[must_use]
    pub fn contains(&self, haystack: &str, needle: &str) -> bool {
        let haystack = self.forms(haystack);
        let needle = self.forms(needle);
        haystack
            .iter()
            .any(|h| needle.iter().any(|n| h.contains(n.as_ref())))
    }

    /// The literal and decoded forms of `text`, case-folded when needed.
    #[must_use]
    pub fn forms<'a>(&self, text: &'a str) -> [Cow<'a, str>; 2] {
        let decoded = if text.contains('\\') || text.contains("''") {
            Cow::Owned(decode(text))
        } else {
            Cow::Borrowed(text)
        };
        [self.fold(Cow::Borrowed(text)), self.fold(decoded)]
    }

    fn fold<'a>(&self, text: Cow<'a, str>) -> Cow<'a, str> {
        if self.case_sensitive {
            text
        } else {
            Cow::Owned(text.to_lowercase())
        }
    }
}

impl Default for TextMatcher {
    fn default() -> Self {
        Self::new(false)
    }
}

/// First property set whose name matches `target`.
#[must_use]
pub fn find_property_set<'a>(
    element: &'a Element,
    target: &str,
    matcher: TextMatcher,
) -> Option<&'a PropertySet> {
    element
        .property_sets()
        .find(|set| matcher.matches(&set.name, target))
}

/// Every property set whose name matches `target`; duplicates are all returned.
pub fn property_sets_named<'a>(
    element: &'a Element,
    target: &'a str,
    matcher: TextMatcher,
) -> impl Iterator<Item = &'a PropertySet> + 'a {
    element
        .property_sets()
        .filter(move |set| matcher.matches(&set.name, target))
}

/// First property of `set` whose name matches `target`.
#[must_use]
pub fn find_property<'a>(
    set: &'a PropertySet,
    target: &str,
    matcher: TextMatcher,
) -> Option<&'a Property> {
    set.iter().find(|p| matcher.matches(&p.name, target))
}

/// Every property named `target` across every set named `section`.
///
/// A `None` section scans all sets.
pub fn properties_in<'a>(
    element: &'a Element,
    section: Option<&'a str>,
    target: &'a str,
    matcher: TextMatcher,
) -> impl Iterator<Item = &'a Property> + 'a {
    element
        .property_sets()
        .filter(move |set| section.map_or(true, |s| matcher.matches(&set.name, s)))
        .flat_map(|set| set.iter())
        .filter(move |p| matcher.matches(&p.name, target))
}

/// Nearest ancestor whose type matches `type_name` (case-insensitive).
#[must_use]
pub fn get_ancestor_by_type<'a>(
    scene: &'a SceneGraph,
    element: &'a Element,
    type_name: &str,
) -> Option<&'a Element> {
    scene.ancestors(element).find(|e| e.is_type(type_name))
}

/// The element itself when it has type `type_name`, else its nearest
/// ancestor of that type.
#[must_use]
pub fn get_self_or_ancestor_by_type<'a>(
    scene: &'a SceneGraph,
    element: &'a Element,
    type_name: &str,
) -> Option<&'a Element> {
    if element.is_type(type_name) {
        Some(element)
    } else {
        get_ancestor_by_type(scene, element, type_name)
    }
}
