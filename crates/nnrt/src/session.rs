//! Inference sessions: resolve, partition, execute.
//!
//! A [`Session`] pairs a primary resolution table with an optional
//! fallback table. Compiling a model resolves every node eagerly (so
//! missing operators and bad attributes surface before the first run),
//! colors each node by which table supplied it, and partitions the graph
//! into single-backend stages. The resulting [`Plan`] executes nodes in
//! topological order over a value store keyed by value id.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::graph::{DependencyGraph, Graph, Node, NodeId, Partition};
use crate::model::Model;
use crate::operator::Operator;
use crate::opset::{resolve_operator, OpSet, ResolveRule};
use crate::tensor::Tensor;

pub struct Session<'r> {
    primary: &'r [ResolveRule],
    fallback: Option<&'r [ResolveRule]>,
    eager_partition: bool,
}

impl<'r> Session<'r> {
    pub fn new(primary: &'r [ResolveRule]) -> Session<'r> {
        Session {
            primary,
            fallback: None,
            eager_partition: false,
        }
    }

    /// A hybrid session: nodes the primary table cannot resolve run on the
    /// fallback table instead.
    pub fn with_fallback(primary: &'r [ResolveRule], fallback: &'r [ResolveRule]) -> Session<'r> {
        Session {
            primary,
            fallback: Some(fallback),
            eager_partition: false,
        }
    }

    /// Puts every node in its own stage instead of grouping by color.
    pub fn eager_partition(mut self, eager: bool) -> Session<'r> {
        self.eager_partition = eager;
        self
    }

    /// Resolves and initializes every node, then partitions the graph.
    pub fn compile<'g>(&self, model: &'g Model) -> Result<Plan<'g>> {
        let graph = model.graph();
        let opsets = model.opsets();

        let mut operators = Vec::with_capacity(graph.node_count());
        let mut colors = Vec::with_capacity(graph.node_count());
        let mut dependencies = DependencyGraph::new(graph.node_count());
        for (id, node) in graph.nodes().iter().enumerate() {
            let (operator, on_primary) = self.resolve_node(node, opsets)?;
            dependencies.add_node(id, &node.inputs, &node.outputs)?;
            dependencies.set_color(id, on_primary)?;
            operators.push(operator);
            colors.push(on_primary);
        }
        dependencies.identify_input_output_values(graph.inputs(), graph.outputs());

        let order = dependencies.topological_sort()?;
        let partitions = dependencies.partition(self.eager_partition)?;
        debug!(
            nodes = graph.node_count(),
            stages = partitions.len(),
            "model compiled"
        );
        Ok(Plan {
            graph,
            operators,
            colors,
            order,
            partitions,
        })
    }

    /// Primary-table resolution with attribute binding. Only a resolution
    /// failure is retried on the fallback table; configuration errors from
    /// `initialize` always abort the compile.
    fn resolve_node(&self, node: &Node, opsets: &[OpSet]) -> Result<(Box<dyn Operator>, bool)> {
        match resolve_operator(node, opsets, self.primary) {
            Ok(mut operator) => {
                operator.initialize(&node.attributes)?;
                Ok((operator, true))
            }
            Err(Error::Resolution(reason)) => match self.fallback {
                Some(fallback) => {
                    warn!(
                        op_type = %node.op_type,
                        node = %node.name,
                        %reason,
                        "primary backend cannot resolve operator, trying fallback"
                    );
                    let mut operator = resolve_operator(node, opsets, fallback)?;
                    operator.initialize(&node.attributes)?;
                    Ok((operator, false))
                }
                None => Err(Error::Resolution(reason)),
            },
            Err(other) => Err(other),
        }
    }
}

/// A compiled model, ready to run. Holds one initialized operator per
/// graph node.
#[derive(Debug)]
pub struct Plan<'g> {
    graph: &'g Graph,
    operators: Vec<Box<dyn Operator>>,
    colors: Vec<bool>,
    order: Vec<NodeId>,
    partitions: Vec<Partition>,
}

impl<'g> Plan<'g> {
    /// Single-backend stages in execution order.
    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn execution_order(&self) -> &[NodeId] {
        &self.order
    }

    /// Whether the node resolved on the primary table (false means it fell
    /// back).
    pub fn on_primary(&self, node: NodeId) -> Option<bool> {
        self.colors.get(node).copied()
    }

    /// Executes the plan. `inputs` bind positionally to the graph's
    /// declared inputs and the outputs come back in declared order.
    pub fn run(&self, inputs: Vec<Tensor>) -> Result<Vec<Tensor>> {
        let graph = self.graph;
        if inputs.len() != graph.inputs().len() {
            return Err(Error::graph(format!(
                "the graph declares {} inputs but {} were provided",
                graph.inputs().len(),
                inputs.len()
            )));
        }

        let mut store: HashMap<usize, Tensor> = HashMap::new();
        for (id, value) in graph.values().iter().enumerate() {
            if let Some(initializer) = value.initializer() {
                store.insert(id, initializer.clone());
            }
        }
        // Fed inputs override initializer defaults.
        for (&id, tensor) in graph.inputs().iter().zip(inputs) {
            store.insert(id, tensor);
        }

        for &node_id in &self.order {
            let node = &graph.nodes()[node_id];
            let operator = &self.operators[node_id];

            let mut gathered = Vec::with_capacity(node.inputs.len());
            for &value in &node.inputs {
                let tensor = store.get(&value).ok_or_else(|| {
                    Error::graph(format!(
                        "node {node_id} ({}) consumes value {value} which nothing produced",
                        node.op_type
                    ))
                })?;
                gathered.push(tensor);
            }
            if !operator.check_inputs(&gathered) {
                return Err(Error::shape(format!(
                    "node {node_id} ({}) rejected its inputs",
                    node.op_type
                )));
            }

            let outputs = operator.run(&gathered)?;
            if outputs.len() != node.outputs.len() {
                return Err(Error::graph(format!(
                    "node {node_id} ({}) declared {} outputs but produced {}",
                    node.op_type,
                    node.outputs.len(),
                    outputs.len()
                )));
            }
            for (&value, tensor) in node.outputs.iter().zip(outputs) {
                store.insert(value, tensor);
            }
        }

        graph
            .outputs()
            .iter()
            .map(|&value| {
                store.remove(&value).ok_or_else(|| {
                    Error::graph(format!("graph output value {value} was never produced"))
                })
            })
            .collect()
    }
}
