use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use nnrt::attribute::Attributes;
use nnrt::graph::Graph;
use nnrt::model::{Model, ModelSerdeError, MIN_IR_VERSION};
use nnrt::opset::OpSet;
use nnrt::tensor::Tensor;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn addition_model() -> Model {
    let mut rng = StdRng::seed_from_u64(42);
    let weights: Vec<f32> = (0..6).map(|_| rng.gen_range(-1.0..1.0)).collect();

    let mut graph = Graph::new();
    let x = graph.add_value();
    let w = graph.add_value();
    let y = graph.add_value();
    graph
        .set_initializer(w, Tensor::from_f32(vec![2, 3], weights).unwrap())
        .unwrap();
    graph
        .add_node("add0", "Add", "", Attributes::new(), &[x, w], &[y])
        .unwrap();
    graph.set_inputs(vec![x]).unwrap();
    graph.set_outputs(vec![y]).unwrap();
    Model::new(3, vec![OpSet::new("", 7)], graph).expect("model")
}

#[test]
fn json_round_trips_preserve_the_model() {
    let model = addition_model();
    let json = model.to_json_string().expect("serialize");
    let restored = Model::from_json_str(&json).expect("deserialize");
    assert_eq!(model, restored);
}

#[test]
fn bincode_round_trips_preserve_the_model() {
    let model = addition_model();
    let bytes = model.to_bincode_bytes().expect("serialize");
    let restored = Model::from_bincode_slice(&bytes).expect("deserialize");
    assert_eq!(model, restored);
}

#[test]
fn old_ir_versions_are_rejected_at_construction() {
    let err = Model::new(MIN_IR_VERSION - 1, Vec::new(), Graph::new()).unwrap_err();
    assert!(matches!(err, ModelSerdeError::IrVersion { .. }));
    assert!(err.to_string().contains("the minimum is 3"));
}

#[test]
fn old_ir_versions_are_rejected_when_loaded() {
    let json = addition_model().to_json_string().expect("serialize");
    let doctored = json.replace("\"ir_version\": 3", "\"ir_version\": 2");
    assert_ne!(json, doctored);
    let err = Model::from_json_str(&doctored).unwrap_err();
    assert!(err.to_string().contains("IR version 2 is not supported"));
}

#[test]
fn snapshots_round_trip_through_files() -> anyhow::Result<()> {
    let model = addition_model();
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH)?.as_millis();
    let base = std::env::temp_dir();

    let json_path = base.join(format!("nnrt_model_{timestamp}.json"));
    model.save_json(&json_path)?;
    let restored = Model::load_json(&json_path)?;
    fs::remove_file(&json_path)?;
    assert_eq!(model, restored);

    let bin_path = base.join(format!("nnrt_model_{timestamp}.bin"));
    model.save_bincode(&bin_path)?;
    let restored = Model::load_bincode(&bin_path)?;
    fs::remove_file(&bin_path)?;
    assert_eq!(model, restored);
    Ok(())
}

#[test]
fn missing_snapshot_files_surface_as_io_errors() {
    let missing = std::env::temp_dir().join("nnrt_does_not_exist_7781.json");
    let err = Model::load_json(&missing).unwrap_err();
    assert!(err.to_string().contains("i/o error"));
}
