//! Grouped counts and area/volume totals over a scene.
//!
//! One pass over the elements feeds three outputs: the nested
//! building → storey → code report, the flat value histograms, and the
//! property catalogue.

use crate::accessor::{get_self_or_ancestor_by_type, properties_in, TextMatcher};
use crate::codec::decode;
use crate::config::Config;
use crate::model::{Element, SceneGraph, BUILDING_TYPE, STOREY_TYPE};
use crate::rules::evaluator::Budget;
use crate::rules::{parse_number, AbortHandle};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Key used when a rule resolves through the containment hierarchy, and
/// the code assigned to elements without one.
pub const CLASS_BIM: &str = "classBim";

/// Building or storey key of elements whose container could not be resolved.
pub const UNASSIGNED: &str = "unassigned";

const SPATIAL_TYPES: &[&str] = &["IfcProject", "IfcSite", BUILDING_TYPE, STOREY_TYPE];

/// Where a grouping key comes from: a `section`/`property` pair, or the
/// ancestor walk when `property` is `classBim`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRule {
    #[serde(default, deserialize_with = "text_or_value")]
    pub section: String,
    #[serde(default, deserialize_with = "text_or_value")]
    pub property: String,
}

impl KeyRule {
    pub fn property(section: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            property: property.into(),
        }
    }

    #[must_use]
    pub fn class_bim() -> Self {
        Self::property("", CLASS_BIM)
    }

    #[must_use]
    pub fn is_class_bim(&self) -> bool {
        self.property == CLASS_BIM
    }

    fn is_set(&self) -> bool {
        !self.property.is_empty()
    }
}

/// Section and property names holding an element's area and volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeasureRule {
    #[serde(default)]
    pub section: String,
    #[serde(default, alias = "propertyArea")]
    pub area_property: String,
    #[serde(default, alias = "propertyVolume")]
    pub volume_property: String,
}

impl MeasureRule {
    pub fn new(section: impl Into<String>, area: impl Into<String>, volume: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            area_property: area.into(),
            volume_property: volume.into(),
        }
    }

    /// Area and volume of `element`, 0 when absent or not numeric.
    ///
    /// The first numeric value wins when the section appears more than once.
    #[must_use]
    pub fn measure(&self, element: &Element, matcher: TextMatcher) -> (f64, f64) {
        (
            self.first_number(element, &self.area_property, matcher),
            self.first_number(element, &self.volume_property, matcher),
        )
    }

    fn first_number(&self, element: &Element, property: &str, matcher: TextMatcher) -> f64 {
        if self.section.is_empty() || property.is_empty() {
            return 0.0;
        }
        properties_in(element, Some(self.section.as_str()), property, matcher)
            .find_map(|p| parse_number(&p.value.text()))
            .unwrap_or(0.0)
    }
}

/// Grouping configuration sent by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupingRules {
    pub bat: KeyRule,
    pub niveau: KeyRule,
    pub code: KeyRule,
    /// Named histogram categories.
    pub custom: BTreeMap<String, KeyRule>,
    pub calcul: MeasureRule,
}

/// One object recorded in a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeasure {
    pub guid: String,
    pub name: String,
    pub area: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupTotals {
    pub count: usize,
    pub area: f64,
    pub volume: f64,
    /// Keyed by element id; an id is counted once.
    pub objects: BTreeMap<String, ObjectMeasure>,
}

impl GroupTotals {
    fn add(&mut self, element: &Element, area: f64, volume: f64) {
        if self.objects.contains_key(&element.id) {
            tracing::trace!(id = %element.id, "element already counted in group");
            return;
        }
        self.count += 1;
        self.area += area;
        self.volume += volume;
        self.objects.insert(
            element.id.clone(),
            ObjectMeasure {
                guid: element.id.clone(),
                name: element.name.clone(),
                area,
                volume,
            },
        );
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildingReport {
    /// Model the building was loaded from, when resolved by ancestor walk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    /// storey → code → totals
    pub storeys: BTreeMap<String, BTreeMap<String, GroupTotals>>,
}

/// Flat value → count histograms.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Histograms {
    pub bat: BTreeMap<String, usize>,
    pub niveau: BTreeMap<String, usize>,
    pub code: BTreeMap<String, usize>,
    pub custom: BTreeMap<String, BTreeMap<String, usize>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub buildings: BTreeMap<String, BuildingReport>,
    pub general: Histograms,
    /// Property set name → property names, decoded, in first-seen order.
    pub sections: BTreeMap<String, Vec<String>>,
    /// Entity type → property set → property names.
    pub class_data: BTreeMap<String, BTreeMap<String, Vec<String>>>,
    /// Entity types seen with at least one property set, sorted.
    pub types: Vec<String>,
    #[serde(default)]
    pub aborted: bool,
}

impl AggregateReport {
    /// Totals for one building/storey/code path.
    #[must_use]
    pub fn group(&self, building: &str, storey: &str, code: &str) -> Option<&GroupTotals> {
        self.buildings.get(building)?.storeys.get(storey)?.get(code)
    }

    #[must_use]
    pub fn total_area(&self) -> f64 {
        self.groups().map(|g| g.area).sum()
    }

    #[must_use]
    pub fn total_volume(&self) -> f64 {
        self.groups().map(|g| g.volume).sum()
    }

    pub fn groups(&self) -> impl Iterator<Item = &GroupTotals> {
        self.buildings
            .values()
            .flat_map(|b| b.storeys.values())
            .flat_map(BTreeMap::values)
    }
}

/// Grouping keys of one element.
struct Keys {
    building: Option<String>,
    storey: Option<String>,
    model_id: Option<String>,
    code: String,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    matcher: TextMatcher,
    timeout: Option<std::time::Duration>,
    abort: Option<AbortHandle>,
}

impl Aggregator {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            matcher: TextMatcher::new(config.case_sensitive),
            timeout: config.timeout(),
            abort: None,
        }
    }

    #[must_use]
    pub fn with_abort(mut self, handle: AbortHandle) -> Self {
        self.abort = Some(handle);
        self
    }

    /// Builds the report in element order. On abort the report holds the
    /// elements processed so far.
    #[must_use]
    pub fn aggregate(&self, scene: &SceneGraph, rules: &GroupingRules) -> AggregateReport {
        self.aggregate_into(AggregateReport::default(), scene, rules)
    }

    /// Continues an existing report with the elements of `scene`.
    ///
    /// Group totals stay deduplicated by element id across passes;
    /// histograms keep adding up. On abort the returned report holds
    /// everything accumulated before the abort.
    #[must_use]
    pub fn aggregate_into(
        &self,
        mut report: AggregateReport,
        scene: &SceneGraph,
        rules: &GroupingRules,
    ) -> AggregateReport {
        let budget = Budget::start(self.abort.as_ref(), self.timeout);
        report.aborted = false;

        for element in scene.elements() {
            if budget.exhausted() {
                report.aborted = true;
                tracing::warn!("aggregation aborted, returning partial report");
                break;
            }
            catalogue(&mut report, element);
            self.histograms(&mut report.general, scene, element, rules);
            self.accumulate(&mut report, scene, element, rules);
        }
        report.types.sort();

        tracing::info!(
            buildings = report.buildings.len(),
            types = report.types.len(),
            area = report.total_area(),
            volume = report.total_volume(),
            "aggregation complete"
        );
        report
    }

    fn accumulate(&self, report: &mut AggregateReport, scene: &SceneGraph, element: &Element, rules: &GroupingRules) {
        // Containers are grouping keys, not grouped objects.
        if SPATIAL_TYPES.iter().any(|t| element.is_type(t)) {
            return;
        }
        let keys = self.resolve_keys(scene, element, rules);
        let building = keys.building.unwrap_or_else(|| UNASSIGNED.to_string());
        let storey = keys.storey.unwrap_or_else(|| UNASSIGNED.to_string());
        let (area, volume) = rules.calcul.measure(element, self.matcher);

        let entry = report.buildings.entry(building).or_default();
        if entry.model_id.is_none() {
            entry.model_id = keys.model_id;
        }
        entry
            .storeys
            .entry(storey)
            .or_default()
            .entry(keys.code)
            .or_default()
            .add(element, area, volume);
    }

    fn resolve_keys(&self, scene: &SceneGraph, element: &Element, rules: &GroupingRules) -> Keys {
        let mut keys = Keys {
            building: None,
            storey: None,
            model_id: None,
            code: CLASS_BIM.to_string(),
        };

        if rules.bat.is_class_bim() || rules.niveau.is_class_bim() {
            if let Some(building) = get_self_or_ancestor_by_type(scene, element, BUILDING_TYPE) {
                keys.building = Some(container_key(building, BUILDING_TYPE));
                keys.model_id.clone_from(&building.model_id);
            }
            keys.storey = get_self_or_ancestor_by_type(scene, element, STOREY_TYPE)
                .map(|storey| container_key(storey, STOREY_TYPE));
        }

        if !rules.bat.is_class_bim() {
            keys.building = self.property_key(element, &rules.bat);
        }
        if !rules.niveau.is_class_bim() {
            keys.storey = self.property_key(element, &rules.niveau);
        }
        if !rules.code.is_class_bim() {
            if let Some(code) = self.property_key(element, &rules.code) {
                keys.code = code;
            }
        }
        keys
    }

    fn property_key(&self, element: &Element, rule: &KeyRule) -> Option<String> {
        if !rule.is_set() {
            return None;
        }
        let section = Some(rule.section.as_str()).filter(|s| !s.is_empty());
        properties_in(element, section, &rule.property, self.matcher)
            .map(|p| decode(&p.value.text()))
            .find(|value| !value.is_empty())
    }

    fn histograms(&self, general: &mut Histograms, scene: &SceneGraph, element: &Element, rules: &GroupingRules) {
        if rules.bat.is_class_bim() {
            if element.is_type(BUILDING_TYPE) {
                *general.bat.entry(container_key(element, BUILDING_TYPE)).or_default() +=
                    scene.descendants(element).len();
            }
        } else {
            self.count_values(&mut general.bat, element, &rules.bat);
        }

        if rules.niveau.is_class_bim() {
            if element.is_type(STOREY_TYPE) {
                *general.niveau.entry(container_key(element, STOREY_TYPE)).or_default() +=
                    scene.children(element).count();
            }
        } else {
            self.count_values(&mut general.niveau, element, &rules.niveau);
        }

        if !rules.code.is_class_bim() {
            self.count_values(&mut general.code, element, &rules.code);
        }
        for (category, rule) in &rules.custom {
            let before = general.custom.get(category).map_or(0, BTreeMap::len);
            let bucket = general.custom.entry(category.clone()).or_default();
            self.count_values(bucket, element, rule);
            if bucket.is_empty() && before == 0 {
                general.custom.remove(category);
            }
        }
    }

    /// Every matching property contributes, so an element can land in
    /// several buckets.
    fn count_values(&self, histogram: &mut BTreeMap<String, usize>, element: &Element, rule: &KeyRule) {
        if !rule.is_set() || rule.section.is_empty() {
            return;
        }
        for property in properties_in(element, Some(rule.section.as_str()), &rule.property, self.matcher) {
            *histogram.entry(decode(&property.value.text())).or_default() += 1;
        }
    }
}

fn catalogue(report: &mut AggregateReport, element: &Element) {
    let mut seen = false;
    for set in element.property_sets() {
        seen = true;
        let section = decode(&set.name);
        let names: Vec<String> = set.iter().map(|p| decode(&p.name)).collect();

        push_unique(report.sections.entry(section.clone()).or_default(), &names);
        let by_type = report
            .class_data
            .entry(element.element_type.clone())
            .or_default()
            .entry(section)
            .or_default();
        push_unique(by_type, &names);
    }
    if seen && !report.types.contains(&element.element_type) {
        report.types.push(element.element_type.clone());
    }
}

/// Convenience wrapper with default settings.
#[must_use]
pub fn aggregate(scene: &SceneGraph, rules: &GroupingRules) -> AggregateReport {
    Aggregator::default().aggregate(scene, rules)
}

/// Decoded name of a building or storey; falls back to the id when the
/// name is empty or just the entity type.
fn container_key(element: &Element, type_name: &str) -> String {
    let name = decode(&element.name);
    if name.is_empty() || name.eq_ignore_ascii_case(type_name) {
        decode(&element.id)
    } else {
        name
    }
}

fn push_unique(list: &mut Vec<String>, names: &[String]) {
    for name in names {
        if !list.contains(name) {
            list.push(name.clone());
        }
    }
}

/// Accepts `"text"` or `{"value": "text"}`.
pub(crate) fn text_or_value<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let text = match &value {
        Value::Object(map) => map.get("value").and_then(Value::as_str).unwrap_or_default(),
        Value::String(s) => s.as_str(),
        _ => "",
    };
    Ok(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::model::PropertySet;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn dims(area: &str, volume: &str) -> PropertySet {
        PropertySet::new("Dimensions")
            .with_property("Area", area)
            .with_property("Volume", volume)
    }

    fn property_rules() -> GroupingRules {
        GroupingRules {
            bat: KeyRule::property("Loc", "Bat"),
            niveau: KeyRule::property("Loc", "Niveau"),
            code: KeyRule::property("Classif", "Code"),
            calcul: MeasureRule::new("Dimensions", "Area", "Volume"),
            ..GroupingRules::default()
        }
    }

    fn located(id: &str, code: &str, area: &str) -> Element {
        Element::new(id, "IfcWall")
            .with_property_set(
                PropertySet::new("Loc")
                    .with_property("Bat", "A")
                    .with_property("Niveau", "R+1"),
            )
            .with_property_set(PropertySet::new("Classif").with_property("Code", code))
            .with_property_set(dims(area, "1"))
    }

    #[test]
    fn groups_by_property_keys() {
        let scene = SceneGraph::new(vec![
            located("W1", "MUR", "10"),
            located("W2", "MUR", "5.5"),
            located("W3", "CLO", "2"),
        ]);
        let report = aggregate(&scene, &property_rules());

        let mur = report.group("A", "R+1", "MUR").unwrap();
        assert_eq!(mur.count, 2);
        assert!((mur.area - 15.5).abs() < 1e-9);
        assert!((mur.volume - 2.0).abs() < 1e-9);
        assert_eq!(report.general.code.get("MUR"), Some(&2));
        assert_eq!(report.general.bat.get("A"), Some(&3));
        assert_eq!(report.types, vec!["IfcWall".to_string()]);
    }

    #[test]
    fn duplicate_sections_count_once() {
        let element = located("W1", "MUR", "15.5").with_property_set(dims("15.5", "1"));
        let scene = SceneGraph::new(vec![element]);
        let report = aggregate(&scene, &property_rules());
        let group = report.group("A", "R+1", "MUR").unwrap();
        assert_eq!(group.count, 1);
        assert!((group.area - 15.5).abs() < 1e-9);
    }

    #[test]
    fn non_numeric_measures_default_to_zero() {
        let scene = SceneGraph::new(vec![located("W1", "MUR", "n/a")]);
        let report = aggregate(&scene, &property_rules());
        assert_eq!(report.group("A", "R+1", "MUR").unwrap().area, 0.0);
    }

    #[test]
    fn class_bim_walks_ancestors() {
        let mut building = Element::new("B1", "IfcBuilding").with_name("IfcBuilding");
        building.model_id = Some("model-1".into());
        let scene = SceneGraph::new(vec![
            building,
            Element::new("S1", "IfcBuildingStorey")
                .with_name(encode("Étage 1"))
                .with_parent("B1"),
            Element::new("W1", "IfcWall")
                .with_parent("S1")
                .with_property_set(dims("3", "0.5")),
        ]);
        let rules = GroupingRules {
            bat: KeyRule::class_bim(),
            niveau: KeyRule::class_bim(),
            code: KeyRule::property("Classif", "Code"),
            calcul: MeasureRule::new("Dimensions", "Area", "Volume"),
            ..GroupingRules::default()
        };
        let report = aggregate(&scene, &rules);

        let building = report.buildings.get("B1").unwrap();
        assert_eq!(building.model_id.as_deref(), Some("model-1"));
        let group = report.group("B1", "Étage 1", CLASS_BIM).unwrap();
        assert_eq!(group.count, 1);
        assert!((group.area - 3.0).abs() < 1e-9);

        assert_eq!(report.general.bat.get("B1"), Some(&2));
        assert_eq!(report.general.niveau.get("Étage 1"), Some(&1));
    }

    #[test]
    fn class_bim_ignores_type_case() {
        let scene = SceneGraph::new(vec![
            Element::new("B1", "IFCBUILDING").with_name("Bat A"),
            Element::new("S1", "IFCBUILDINGSTOREY").with_name("IFCBUILDINGSTOREY").with_parent("B1"),
            Element::new("W1", "IfcWall")
                .with_parent("S1")
                .with_property_set(dims("4", "1")),
        ]);
        let rules = GroupingRules {
            bat: KeyRule::class_bim(),
            niveau: KeyRule::class_bim(),
            calcul: MeasureRule::new("Dimensions", "Area", "Volume"),
            ..GroupingRules::default()
        };
        let report = aggregate(&scene, &rules);

        assert_eq!(report.buildings.keys().collect::<Vec<_>>(), vec!["Bat A"]);
        let group = report.group("Bat A", "S1", CLASS_BIM).unwrap();
        assert_eq!(group.objects.keys().collect::<Vec<_>>(), vec!["W1"]);
        assert_eq!(report.general.bat.get("Bat A"), Some(&2));
        assert_eq!(report.general.niveau.get("S1"), Some(&1));
    }

    #[test]
    fn aborted_pass_keeps_what_was_accumulated() {
        let rules = property_rules();
        let first = SceneGraph::new(vec![located("W1", "MUR", "10")]);
        let report = aggregate(&first, &rules);
        assert!(!report.aborted);

        let handle = AbortHandle::new();
        handle.abort();
        let second = SceneGraph::new(vec![located("W2", "MUR", "5"), located("W3", "CLO", "2")]);
        let report = Aggregator::default().with_abort(handle).aggregate_into(report, &second, &rules);

        assert!(report.aborted);
        let mur = report.group("A", "R+1", "MUR").unwrap();
        assert_eq!(mur.objects.keys().collect::<Vec<_>>(), vec!["W1"]);
        assert!((mur.area - 10.0).abs() < 1e-9);
        assert!(report.group("A", "R+1", "CLO").is_none());
    }

    #[test]
    fn expired_timeout_aborts_the_pass() {
        let config = Config {
            timeout_secs: Some(0),
            ..Config::default()
        };
        let scene = SceneGraph::new(vec![located("W1", "MUR", "10")]);
        let report = Aggregator::new(&config).aggregate(&scene, &property_rules());
        assert!(report.aborted);
        assert!(report.buildings.is_empty());
    }

    #[test]
    fn later_passes_do_not_recount_ids() {
        let rules = property_rules();
        let scene = SceneGraph::new(vec![located("W1", "MUR", "10")]);
        let aggregator = Aggregator::default();
        let report = aggregator.aggregate_into(aggregator.aggregate(&scene, &rules), &scene, &rules);
        let mur = report.group("A", "R+1", "MUR").unwrap();
        assert_eq!(mur.count, 1);
        assert!((mur.area - 10.0).abs() < 1e-9);
    }

    #[test]
    fn custom_categories_are_not_exclusive() {
        let element = Element::new("W1", "IfcWall").with_property_set(
            PropertySet::new("Pset")
                .with_property("Material", "Béton")
                .with_property("Finish", "Béton"),
        );
        let scene = SceneGraph::new(vec![element]);
        let rules: GroupingRules = serde_json::from_value(json!({
            "custom": {
                "material": {"section": {"value": "Pset"}, "property": {"value": "Material"}},
                "finish": {"section": "Pset", "property": "Finish"},
                "none": {"section": "Pset", "property": "Colour"}
            }
        }))
        .unwrap();
        let report = aggregate(&scene, &rules);
        assert_eq!(report.general.custom["material"].get("Béton"), Some(&1));
        assert_eq!(report.general.custom["finish"].get("Béton"), Some(&1));
        assert!(!report.general.custom.contains_key("none"));
    }

    #[test]
    fn catalogue_collects_decoded_names() {
        let element = Element::new("W1", "IfcWall")
            .with_property_set(PropertySet::new(encode("Côtes")).with_property(encode("Épaisseur"), "0.2"));
        let scene = SceneGraph::new(vec![element]);
        let report = aggregate(&scene, &GroupingRules::default());
        assert_eq!(report.sections["Côtes"], vec!["Épaisseur".to_string()]);
        assert_eq!(report.class_data["IfcWall"]["Côtes"], vec!["Épaisseur".to_string()]);
        assert_eq!(report.group(UNASSIGNED, UNASSIGNED, CLASS_BIM).unwrap().count, 1);
    }
}
