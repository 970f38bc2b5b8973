//! End-to-end checks through the public API, with scenes built from JSON.

use ifc_verifier::aggregate::{aggregate, GroupingRules, KeyRule, MeasureRule, CLASS_BIM, UNASSIGNED};
use ifc_verifier::codec::{decode, encode};
use ifc_verifier::config::Config;
use ifc_verifier::error::EvalError;
use ifc_verifier::loader::{load_scene, load_specifications, parse_scene};
use ifc_verifier::model::{Element, SceneGraph};
use ifc_verifier::rules::{
    Cardinality, Classification, EvaluationRequest, Evaluator, Expected, FailureReason, IgnoreReason, Operator,
    Requirement, Specification,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;

fn wall_e1() -> Vec<Element> {
    parse_scene(json!([{
        "id": "E1",
        "type": "Wall",
        "propertySets": [{"name": "Dimensions", "properties": [{"name": "Area", "value": "15.5"}]}]
    }]))
    .unwrap()
}

fn area_spec(entity: &str) -> Specification {
    Specification::new("area")
        .for_entity(entity)
        .require(Requirement::property("Dimensions", "Area").in_range("10", "20"))
}

fn evaluator() -> Evaluator {
    Evaluator::new(&Config::default())
}

#[test]
fn scenario_a_valid_wall_and_area_total() {
    let elements = wall_e1();
    let result = evaluator().evaluate(&area_spec("Wall"), &elements);
    assert_eq!(result.valid_objects.len(), 1);
    assert_eq!(result.valid_objects[0].id, "E1");
    assert!(result.invalid_objects.is_empty());
    assert!(result.ignored_objects.is_empty());

    let rules = GroupingRules {
        calcul: MeasureRule::new("Dimensions", "Area", "Volume"),
        ..GroupingRules::default()
    };
    let report = aggregate(&SceneGraph::new(elements), &rules);
    assert!((report.total_area() - 15.5).abs() < 1e-9);
    assert_eq!(report.group(UNASSIGNED, UNASSIGNED, CLASS_BIM).unwrap().count, 1);
}

#[test]
fn scenario_b_entity_mismatch_is_ignored() {
    let result = evaluator().evaluate(&area_spec("Door"), &wall_e1());
    assert!(result.valid_objects.is_empty());
    assert!(result.invalid_objects.is_empty());
    assert_eq!(result.ignored_objects.len(), 1);
    assert_eq!(
        result.ignored_objects[0].reason,
        IgnoreReason::EntityMismatch {
            expected: "Door".into(),
            actual: "Wall".into()
        }
    );
}

#[test]
fn scenario_c_pattern_requirement() {
    let elements = parse_scene(json!([{
        "id": "X1",
        "type": "IfcWall",
        "propertySets": [{"name": "Info", "properties": [{"name": "Code", "value": "ABC-123"}]}]
    }]))
    .unwrap();

    let passing = Specification::new("code").require(Requirement::property("Info", "Code").matching(r"^ABC-\d+$"));
    assert_eq!(evaluator().evaluate(&passing, &elements).valid_objects.len(), 1);

    let failing = Specification::new("code").require(Requirement::property("Info", "Code").matching(r"^XYZ-\d+$"));
    let result = evaluator().evaluate(&failing, &elements);
    assert_eq!(result.invalid_objects.len(), 1);
    let missing = &result.invalid_objects[0].missing_elements;
    assert!(missing.iter().any(|m| m.requirement.contains("Code")));
    assert_eq!(missing[0].reason, FailureReason::ValueMismatch);
}

#[test]
fn encoded_set_names_match_both_ways() {
    let encoded_set = parse_scene(json!([{
        "id": "A",
        "type": "IfcWall",
        "propertySets": [{"name": encode("Côtes"), "properties": [{"name": "H", "value": "3"}]}]
    }]))
    .unwrap();
    let plain_set = parse_scene(json!([{
        "id": "B",
        "type": "IfcWall",
        "propertySets": [{"name": "Côtes", "properties": [{"name": "H", "value": "3"}]}]
    }]))
    .unwrap();

    assert_eq!(decode(&encode("Côtes")), "Côtes");

    let plain_rule = Specification::new("plain").require(Requirement::property("Côtes", "H"));
    let encoded_rule = Specification::new("encoded").require(Requirement::property(encode("Côtes"), "H"));

    let config = Config {
        case_sensitive: true,
        ..Config::default()
    };
    let evaluator = Evaluator::new(&config);
    for (spec, elements) in [
        (&plain_rule, &encoded_set),
        (&encoded_rule, &plain_set),
        (&plain_rule, &plain_set),
        (&encoded_rule, &encoded_set),
    ] {
        let result = evaluator.evaluate(spec, elements);
        assert_eq!(result.valid_objects.len(), 1, "{} on {}", spec.name, elements[0].id);
    }
}

#[test]
fn duplicate_sections_do_not_double_count() {
    let scene = SceneGraph::new(
        parse_scene(json!([{
            "id": "W",
            "type": "IfcWall",
            "propertySets": [
                {"name": "Loc", "properties": [{"name": "Bat", "value": "A"}, {"name": "Niv", "value": "0"}]},
                {"name": "Dimensions", "properties": [{"name": "Area", "value": "4"}, {"name": "Volume", "value": "2"}]},
                {"name": "Dimensions", "properties": [{"name": "Area", "value": "4"}, {"name": "Volume", "value": "2"}]}
            ]
        }]))
        .unwrap(),
    );
    let rules = GroupingRules {
        bat: KeyRule::property("Loc", "Bat"),
        niveau: KeyRule::property("Loc", "Niv"),
        calcul: MeasureRule::new("Dimensions", "Area", "Volume"),
        ..GroupingRules::default()
    };
    let report = aggregate(&scene, &rules);
    let group = report.group("A", "0", CLASS_BIM).unwrap();
    assert_eq!(group.count, 1);
    assert!((group.area - 4.0).abs() < 1e-9);
    assert!((group.volume - 2.0).abs() < 1e-9);
}

#[test]
fn cardinality_inversion_flips_classification() {
    let elements = wall_e1();
    let required = Requirement::property("Dimensions", "Area").in_range("10", "20");
    for (requirement, expect_valid) in [
        (required.clone(), true),
        (required.clone().with_cardinality(Cardinality::Prohibited), false),
        (required.clone().with(Operator::GreaterThan, Expected::Single("100".into())), false),
        (
            required
                .with(Operator::GreaterThan, Expected::Single("100".into()))
                .with_cardinality(Cardinality::Prohibited),
            true,
        ),
    ] {
        let spec = Specification::new("c").require(requirement);
        let classification = evaluator().classify(&spec, &elements[0]);
        assert_eq!(classification == Classification::Valid, expect_valid, "{spec:?}");
    }
}

#[test]
fn every_element_lands_in_exactly_one_partition() {
    let elements = parse_scene(json!([
        {"id": "1", "type": "Wall", "propertySets": [{"name": "Dimensions", "properties": [{"name": "Area", "value": "12"}]}]},
        {"id": "2", "type": "Wall", "propertySets": null},
        {"id": "3", "type": "Door"},
        {"id": "4", "type": "wall", "propertySets": [{"name": "Dimensions", "properties": [{"name": "Area", "value": "x"}]}]}
    ]))
    .unwrap();
    let result = evaluator().evaluate(&area_spec("Wall"), &elements);
    assert_eq!(result.total(), elements.len());

    let mut ids: Vec<&str> = result
        .valid_objects
        .iter()
        .map(|e| e.id.as_str())
        .chain(result.invalid_objects.iter().map(|e| e.element.id.as_str()))
        .chain(result.ignored_objects.iter().map(|e| e.element.id.as_str()))
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
    assert_eq!(result.ignored_objects[0].element.id, "3");
}

#[test]
fn parallel_pass_keeps_input_order() {
    let elements: Vec<Element> = (0..200)
        .map(|i| {
            let area = if i % 3 == 0 { "50" } else { "15" };
            parse_scene(json!([{
                "id": format!("E{i}"),
                "type": "Wall",
                "propertySets": [{"name": "Dimensions", "properties": [{"name": "Area", "value": area}]}]
            }]))
            .unwrap()
            .remove(0)
        })
        .collect();
    let spec = area_spec("Wall");

    let sequential = evaluator().evaluate(&spec, &elements);
    let parallel = Evaluator::new(&Config {
        parallel: true,
        ..Config::default()
    })
    .evaluate(&spec, &elements);
    assert_eq!(sequential, parallel);
    assert_eq!(parallel.invalid_objects.len(), 67);
}

#[test]
fn absent_inputs_are_caller_errors() {
    let request: EvaluationRequest = serde_json::from_value(json!({"elements": []})).unwrap();
    assert!(matches!(
        evaluator().run(&request),
        Err(EvalError::InvalidInput { .. })
    ));

    let request: EvaluationRequest = serde_json::from_value(json!({"elements": [], "specifications": []})).unwrap();
    assert_eq!(evaluator().run(&request).unwrap(), vec![]);
}

#[test]
fn ids_file_checks_a_meta_model() {
    let dir = tempfile::tempdir().unwrap();
    let scene_path = dir.path().join("scene.json");
    let ids_path = dir.path().join("rules.json");

    let scene = json!({
        "id": "m1",
        "metaObjects": [
            {"id": "B", "type": "IfcBuilding", "name": "IfcBuilding"},
            {"id": "S", "type": "IfcBuildingStorey", "name": "RDC", "parent": "B"},
            {"id": "W1", "type": "IfcWall", "name": "Mur", "parent": "S", "propertySetIds": ["P1"]},
            {"id": "W2", "type": "IfcWall", "name": "Mur 2", "parent": "S", "propertySetIds": ["P2"]}
        ],
        "propertySets": [
            {"id": "P1", "name": "Pset_WallCommon", "properties": [{"name": "FireRating", "value": "EI60"}]},
            {"id": "P2", "name": "Pset_WallCommon", "properties": [{"name": "FireRating", "value": "R15"}]}
        ]
    });
    let ids = json!({"ids": {"specifications": {"specification": {
        "@name": "Fire rating",
        "applicability": {"entity": {"name": {"simpleValue": "IfcWall"}}},
        "requirements": {"property": {
            "propertySet": {"simpleValue": "Pset_WallCommon"},
            "baseName": {"simpleValue": "FireRating"},
            "value": {"xs:restriction": {"xs:enumeration": [{"@value": "EI30"}, {"@value": "EI60"}]}}
        }}
    }}}});
    std::fs::File::create(&scene_path)
        .unwrap()
        .write_all(scene.to_string().as_bytes())
        .unwrap();
    std::fs::File::create(&ids_path)
        .unwrap()
        .write_all(ids.to_string().as_bytes())
        .unwrap();

    let scene = load_scene(&scene_path).unwrap();
    let specifications = load_specifications(&ids_path).unwrap();
    let results = evaluator().evaluate_all(&specifications, scene.elements());

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].specification, "Fire rating");
    assert_eq!(results[0].valid_objects[0].id, "W1");
    assert_eq!(results[0].invalid_objects[0].element.id, "W2");
    assert_eq!(results[0].ignored_objects.len(), 2);

    let rules = GroupingRules {
        bat: KeyRule::class_bim(),
        niveau: KeyRule::class_bim(),
        ..GroupingRules::default()
    };
    let report = aggregate(&scene, &rules);
    assert_eq!(report.buildings["B"].model_id.as_deref(), Some("m1"));
    assert_eq!(report.group("B", "RDC", CLASS_BIM).unwrap().count, 2);
    assert_eq!(report.types, vec!["IfcWall".to_string()]);
}
