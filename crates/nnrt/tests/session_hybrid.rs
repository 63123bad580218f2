use nnrt::attribute::Attributes;
use nnrt::error::{Error, Result};
use nnrt::graph::Graph;
use nnrt::model::Model;
use nnrt::operator::Operator;
use nnrt::opset::{OpSet, ResolveRule};
use nnrt::session::Session;
use nnrt::tensor::{DataType, Tensor};

struct Scale {
    factor: f32,
}

impl Operator for Scale {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1 && inputs[0].dtype() == DataType::F32
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        self.factor = attrs.get_float_or("factor", 2.0)?;
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let scaled: Vec<f32> = inputs[0]
            .f32_data()?
            .iter()
            .map(|v| v * self.factor)
            .collect();
        Ok(vec![Tensor::from_f32(inputs[0].dims().to_vec(), scaled)?])
    }
}

struct Shift;

impl Operator for Shift {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1 && inputs[0].dtype() == DataType::F32
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let shifted: Vec<f32> = inputs[0].f32_data()?.iter().map(|v| v + 1.0).collect();
        Ok(vec![Tensor::from_f32(inputs[0].dims().to_vec(), shifted)?])
    }
}

struct PairSum;

impl Operator for PairSum {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 2
            && inputs[0].dtype() == DataType::F32
            && inputs[0].dims() == inputs[1].dims()
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        let a = inputs[0].f32_data()?;
        let b = inputs[1].f32_data()?;
        let summed: Vec<f32> = a.iter().zip(b).map(|(x, y)| x + y).collect();
        Ok(vec![Tensor::from_f32(inputs[0].dims().to_vec(), summed)?])
    }
}

struct NeedsSeed;

impl Operator for NeedsSeed {
    fn check_inputs(&self, inputs: &[&Tensor]) -> bool {
        inputs.len() == 1
    }

    fn initialize(&mut self, attrs: &Attributes) -> Result<()> {
        attrs.get_int("seed")?;
        Ok(())
    }

    fn run(&self, inputs: &[&Tensor]) -> Result<Vec<Tensor>> {
        Ok(vec![inputs[0].clone()])
    }
}

fn scale_only() -> Vec<ResolveRule> {
    vec![ResolveRule::new("Scale", "", "1+", || {
        Box::new(Scale { factor: 2.0 })
    })]
}

fn full_table() -> Vec<ResolveRule> {
    vec![
        ResolveRule::new("Scale", "", "1+", || Box::new(Scale { factor: 2.0 })),
        ResolveRule::new("Shift", "", "1+", || Box::new(Shift)),
        ResolveRule::new("PairSum", "", "1+", || Box::new(PairSum)),
        ResolveRule::new("NeedsSeed", "", "1+", || Box::new(NeedsSeed)),
    ]
}

fn two_step_model() -> Model {
    let mut graph = Graph::new();
    let x = graph.add_value();
    let mid = graph.add_value();
    let y = graph.add_value();
    graph
        .add_node("scale0", "Scale", "", Attributes::new(), &[x], &[mid])
        .unwrap();
    graph
        .add_node("shift0", "Shift", "", Attributes::new(), &[mid], &[y])
        .unwrap();
    graph.set_inputs(vec![x]).unwrap();
    graph.set_outputs(vec![y]).unwrap();
    Model::new(3, vec![OpSet::new("", 7)], graph).expect("model")
}

fn single_node_model(op_type: &str, attrs: Attributes) -> Model {
    let mut graph = Graph::new();
    let x = graph.add_value();
    let y = graph.add_value();
    graph.add_node("n0", op_type, "", attrs, &[x], &[y]).unwrap();
    graph.set_inputs(vec![x]).unwrap();
    graph.set_outputs(vec![y]).unwrap();
    Model::new(3, vec![OpSet::new("", 7)], graph).expect("model")
}

#[test]
fn missing_operators_fail_without_a_fallback() {
    let primary = scale_only();
    let err = Session::new(&primary)
        .compile(&two_step_model())
        .unwrap_err();
    assert!(matches!(err, Error::Resolution(_)));
}

#[test]
fn fallback_resolution_covers_the_gaps() {
    let primary = scale_only();
    let fallback = full_table();
    let model = two_step_model();
    let session = Session::with_fallback(&primary, &fallback);
    let plan = session.compile(&model).expect("hybrid compile");

    assert_eq!(plan.on_primary(0), Some(true));
    assert_eq!(plan.on_primary(1), Some(false));
    assert_eq!(plan.partitions().len(), 2);
    assert_eq!(plan.execution_order(), [0, 1]);

    let outputs = plan
        .run(vec![Tensor::from_f32(vec![3], vec![1.0, 2.0, 3.0]).unwrap()])
        .expect("hybrid run");
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].f32_data().unwrap(), [3.0, 5.0, 7.0]);
}

#[test]
fn a_single_backend_keeps_the_graph_whole() {
    let primary = full_table();
    let model = two_step_model();
    let plan = Session::new(&primary).compile(&model).expect("compile");
    assert_eq!(plan.partitions().len(), 1);
    assert_eq!(plan.on_primary(0), Some(true));
    assert_eq!(plan.on_primary(1), Some(true));
}

#[test]
fn operators_missing_from_both_tables_are_fatal() {
    let primary = scale_only();
    let fallback = scale_only();
    let model = single_node_model("Quantize", Attributes::new());
    let err = Session::with_fallback(&primary, &fallback)
        .compile(&model)
        .unwrap_err();
    assert!(matches!(err, Error::Resolution(_)));
}

#[test]
fn configuration_errors_do_not_fall_back() {
    let primary = full_table();
    let fallback = full_table();
    let model = single_node_model("NeedsSeed", Attributes::new());
    let err = Session::with_fallback(&primary, &fallback)
        .compile(&model)
        .unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
    assert!(err.to_string().contains("seed"));
}

#[test]
fn eager_partitioning_isolates_every_node() {
    let primary = full_table();
    let model = two_step_model();
    let plan = Session::new(&primary)
        .eager_partition(true)
        .compile(&model)
        .expect("compile");
    assert_eq!(plan.partitions().len(), 2);
    assert_eq!(plan.partitions()[0].node_ids, [0]);
    assert_eq!(plan.partitions()[1].node_ids, [1]);
}

#[test]
fn attributes_bind_during_compilation() {
    let mut attrs = Attributes::new();
    attrs.set("factor", 5.0f32).unwrap();
    let model = single_node_model("Scale", attrs);

    let primary = full_table();
    let plan = Session::new(&primary).compile(&model).expect("compile");
    let outputs = plan
        .run(vec![Tensor::from_f32(vec![1], vec![2.0]).unwrap()])
        .expect("run");
    assert_eq!(outputs[0].f32_data().unwrap(), [10.0]);
}

#[test]
fn run_counts_its_inputs() {
    let primary = full_table();
    let model = two_step_model();
    let plan = Session::new(&primary).compile(&model).expect("compile");
    let err = plan.run(Vec::new()).unwrap_err();
    assert!(matches!(err, Error::Graph(_)));
    assert!(err.to_string().contains("declares 1 inputs but 0"));
}

#[test]
fn rejected_node_inputs_abort_the_run() {
    let primary = full_table();
    let model = two_step_model();
    let plan = Session::new(&primary).compile(&model).expect("compile");
    let err = plan
        .run(vec![Tensor::from_i32(vec![1], vec![7]).unwrap()])
        .unwrap_err();
    assert!(matches!(err, Error::Shape(_)));
    assert!(err.to_string().contains("rejected its inputs"));
}

#[test]
fn initializers_feed_values_nothing_produces() {
    let mut graph = Graph::new();
    let x = graph.add_value();
    let w = graph.add_value();
    let y = graph.add_value();
    graph
        .set_initializer(w, Tensor::from_f32(vec![2], vec![5.0, 9.0]).unwrap())
        .unwrap();
    graph
        .add_node("sum0", "PairSum", "", Attributes::new(), &[x, w], &[y])
        .unwrap();
    graph.set_inputs(vec![x]).unwrap();
    graph.set_outputs(vec![y]).unwrap();
    let model = Model::new(3, vec![OpSet::new("", 7)], graph).expect("model");

    let table = full_table();
    let plan = Session::new(&table).compile(&model).expect("compile");
    let outputs = plan
        .run(vec![Tensor::from_f32(vec![2], vec![1.0, 2.0]).unwrap()])
        .expect("run");
    assert_eq!(outputs[0].f32_data().unwrap(), [6.0, 11.0]);
}

#[test]
fn fed_inputs_override_initializer_defaults() {
    let mut graph = Graph::new();
    let x = graph.add_value();
    let y = graph.add_value();
    graph
        .set_initializer(x, Tensor::from_f32(vec![1], vec![10.0]).unwrap())
        .unwrap();
    graph
        .add_node("scale0", "Scale", "", Attributes::new(), &[x], &[y])
        .unwrap();
    // x doubles as a declared input; feeding it replaces the stored default
    graph.set_inputs(vec![x]).unwrap();
    graph.set_outputs(vec![y]).unwrap();
    let model = Model::new(3, vec![OpSet::new("", 7)], graph).expect("model");

    let table = full_table();
    let plan = Session::new(&table).compile(&model).expect("compile");
    let outputs = plan
        .run(vec![Tensor::from_f32(vec![1], vec![4.0]).unwrap()])
        .expect("run");
    assert_eq!(outputs[0].f32_data().unwrap(), [8.0]);
}

#[test]
fn opset_versions_gate_the_whole_table() {
    let mut graph = Graph::new();
    let x = graph.add_value();
    let y = graph.add_value();
    graph
        .add_node("scale0", "Scale", "", Attributes::new(), &[x], &[y])
        .unwrap();
    graph.set_inputs(vec![x]).unwrap();
    graph.set_outputs(vec![y]).unwrap();

    let rules = vec![ResolveRule::new("Scale", "", "9+", || {
        Box::new(Scale { factor: 2.0 })
    })];
    let old = Model::new(3, vec![OpSet::new("", 8)], graph.clone()).expect("model");
    assert!(Session::new(&rules).compile(&old).is_err());

    let new = Model::new(3, vec![OpSet::new("", 9)], graph).expect("model");
    assert!(Session::new(&rules).compile(&new).is_ok());
}
