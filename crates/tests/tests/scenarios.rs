//! End-to-end scenarios.
//!
//! Each test builds a model through the public API only:
//! Construct → Add edges → Wire → Emit → Write/Load or Run.

use bigraph_builder::{Builder, BuilderConfig, Error, ProcessSpec};
use bigraph_schema::{Path, Tree};
use bigraph_tests::{Increase, Sum, TestHarness};
use serde_json::json;

fn increase() -> ProcessSpec {
    ProcessSpec::new(Increase::NAME).config(Tree::from(json!({"rate": 0.1})))
}

/// Adds `p1` and wires it with default stores.
fn wired_harness() -> TestHarness {
    let harness = TestHarness::new();
    let builder = harness.builder();
    builder.add_process("p1", increase()).unwrap();
    builder.connect_all().unwrap();
    harness
}

#[test]
fn test_connect_all_wires_default_stores() {
    let harness = wired_harness();
    let p1 = harness.builder().at("p1");

    assert_eq!(p1.at("inputs.level").value().unwrap(), Some(Tree::from(json!(["level_store"]))));
    assert_eq!(p1.at("outputs.level").value().unwrap(), Some(Tree::from(json!(["level_store"]))));
    assert_eq!(harness.builder().at("level_store").value().unwrap(), Some(Tree::from(0.0)));
    assert_eq!(harness.builder().schema().get_key("level_store"), Some(&Tree::from("float")));
}

#[test]
fn test_emit_port_registers_with_emitter() {
    let harness = wired_harness();
    harness.builder().at("p1").emit(Some("level")).unwrap();

    let emitter = harness.builder().at("emitter");
    assert_eq!(emitter.at("config.emit").value().unwrap(), Some(Tree::from(json!({"level": "float"}))));
    assert_eq!(emitter.at("inputs.level").value().unwrap(), Some(Tree::from(json!(["level_store"]))));
}

#[test]
fn test_set_routes_type_and_value() {
    let harness = TestHarness::new();
    let builder = harness.builder();
    builder
        .set(["down", "here"], Tree::from(json!({"_value": 10, "_type": "integer"})))
        .unwrap();

    assert_eq!(builder.child("down").child("here").value().unwrap(), Some(Tree::from(10)));
    let schema = builder.schema();
    assert_eq!(
        schema.get_key("down").and_then(|down| down.get_key("here")),
        Some(&Tree::from("integer"))
    );
}

#[test]
fn test_document_round_trip_preserves_edges() {
    let harness = wired_harness();
    let builder = harness.builder();
    builder.add_process("p2", increase().with("rate", 0.5).interval(2.0)).unwrap();
    builder.at("p2").connect("level", "other").unwrap();
    builder.at("p1").emit(None).unwrap();

    let dir = tempfile::tempdir().unwrap();
    for name in ["model.json", "model.yaml"] {
        let path = dir.path().join(name);
        builder.write(&path).unwrap();

        let loaded = Builder::load_with(&path, TestHarness::new().options()).unwrap();
        assert_eq!(loaded.edges(), builder.edges());
        for edge in builder.edges() {
            assert_eq!(loaded.at(edge.path.clone()).edge().unwrap(), builder.at(edge.path).edge().unwrap());
        }
        assert_eq!(loaded.document(), builder.document());
    }
}

#[test]
fn test_reloaded_document_is_already_complete() {
    let harness = wired_harness();
    let document = harness.builder().document();
    let (schema, state) = harness
        .builder()
        .types()
        .complete(&document.schema, &document.state)
        .unwrap();
    assert_eq!(schema, document.schema);
    assert_eq!(state, document.state);
}

#[test]
fn test_run_once_applies_updates_and_records() {
    let mut harness = wired_harness();
    harness.builder().at("level_store").update(2.0).unwrap();
    harness.builder().at("p1").emit(Some("level")).unwrap();

    harness.run_once();

    let level = harness.get_float("level_store").unwrap();
    assert!((level - 2.2).abs() < 1e-12, "level was {level}");
    // The emitter was attached first, so it ran before p1.
    assert_eq!(harness.recorded(), vec![Tree::from(json!({"level": 2.0}))]);
    assert!(harness.builder().at("emitter").is_edge().unwrap());
}

#[test]
fn test_nested_step_reads_sibling_stores() {
    let mut harness = TestHarness::new();
    let cell = harness.builder().child("cell");
    cell.set(Path::root(), Tree::from(json!({"a": 1.5, "b": 2.5}))).unwrap();
    cell.child("adder")
        .add_process(ProcessSpec::new(Sum::NAME).input("a", "a").input("b", "b"))
        .unwrap();
    cell.connect_all().unwrap();

    assert_eq!(
        harness.builder().at("cell.adder.outputs.total").value().unwrap(),
        Some(Tree::from(json!(["total_store"])))
    );
    assert_eq!(harness.builder().at("cell.adder.interval").value().unwrap(), None);

    harness.run_once();
    assert_eq!(harness.get_float("cell.total_store"), Some(4.0));
}

#[test]
fn test_config_changes_conventions() {
    let config = BuilderConfig::from_yaml(
        r#"
emitterKey: recorder
wireSuffix: _pool
defaultInterval: 0.25
types:
  concentration:
    _inherit: float
    _default: 1.0
"#,
    )
    .unwrap();
    let harness = TestHarness::with_config(config);
    let builder = harness.builder();
    builder.add_process("p1", increase()).unwrap();
    builder.connect_all().unwrap();
    builder.set("glucose", Tree::from(json!({"_type": "concentration"}))).unwrap();

    assert_eq!(builder.at("p1.inputs.level").value().unwrap(), Some(Tree::from(json!(["level_pool"]))));
    assert_eq!(builder.at("p1.interval").value().unwrap(), Some(Tree::from(0.25)));
    assert_eq!(builder.at("glucose").value().unwrap(), Some(Tree::from(1.0)));
    assert!(builder.at("recorder").is_edge().unwrap());
}

#[test]
fn test_mismatches_are_reported_together() {
    let harness = TestHarness::new();
    let err = harness
        .builder()
        .set(
            Path::root(),
            Tree::from(json!({
                "x": {"_type": "integer", "_value": "one"},
                "y": {"_type": "boolean", "_value": 3},
            })),
        )
        .unwrap_err();

    match err {
        Error::Schema(bigraph_schema::Error::SchemaMismatch(mismatches)) => {
            let paths: Vec<String> = mismatches.paths().iter().map(|path| path.to_string()).collect();
            assert_eq!(paths, vec!["x", "y"]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(harness.builder().at("x").value().unwrap(), None);
}

#[test]
fn test_unknown_implementation_suggests_names() {
    let harness = TestHarness::new();
    let err = harness
        .builder()
        .add_process("p1", ProcessSpec::new("increse"))
        .unwrap_err();
    assert!(err.to_string().contains("increase"), "{err}");
}
