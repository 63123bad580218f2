//! Computation graphs.
//!
//! A [`Graph`] is two flat arenas: nodes (operator invocations) and values
//! (the tensors flowing between them), cross-referenced by plain integer
//! ids. Every value has at most one producing node and any number of
//! consumers; whole-graph inputs and initializer-backed values have none.
//! The arenas are append-only, so ids stay valid for the life of the graph.

pub mod partition;

use serde::{Deserialize, Serialize};

use crate::attribute::Attributes;
use crate::error::{Error, Result};
use crate::tensor::Tensor;

pub use partition::{DependencyGraph, Partition};

pub type NodeId = usize;
pub type ValueId = usize;

/// One operator invocation: an op type plus the value ids it reads and
/// writes. The domain selects the operator set the node was authored
/// against; the empty string is the default domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub op_type: String,
    pub domain: String,
    pub attributes: Attributes,
    pub inputs: Vec<ValueId>,
    pub outputs: Vec<ValueId>,
}

/// One value slot. `producer` is the node writing it, if any; a value with
/// an initializer carries its constant tensor in the model itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Value {
    producer: Option<NodeId>,
    consumers: Vec<NodeId>,
    initializer: Option<Tensor>,
}

impl Value {
    pub fn producer(&self) -> Option<NodeId> {
        self.producer
    }

    pub fn consumers(&self) -> &[NodeId] {
        &self.consumers
    }

    pub fn initializer(&self) -> Option<&Tensor> {
        self.initializer.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    nodes: Vec<Node>,
    values: Vec<Value>,
    inputs: Vec<ValueId>,
    outputs: Vec<ValueId>,
}

impl Graph {
    pub fn new() -> Graph {
        Graph::default()
    }

    /// Appends an empty value slot and returns its id.
    pub fn add_value(&mut self) -> ValueId {
        let id = self.values.len();
        self.values.push(Value {
            producer: None,
            consumers: Vec::new(),
            initializer: None,
        });
        id
    }

    /// Binds a constant tensor to a value. Rejects values a node already
    /// produces; a value is either computed or constant, never both.
    pub fn set_initializer(&mut self, value: ValueId, tensor: Tensor) -> Result<()> {
        let slot = self
            .values
            .get_mut(value)
            .ok_or_else(|| Error::graph(format!("value {value} does not exist")))?;
        if slot.producer.is_some() {
            return Err(Error::graph(format!(
                "value {value} is produced by a node and cannot carry an initializer"
            )));
        }
        slot.initializer = Some(tensor);
        Ok(())
    }

    /// Appends a node and wires it into the value arena: the node becomes a
    /// consumer of each input and the unique producer of each output.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        op_type: impl Into<String>,
        domain: impl Into<String>,
        attributes: Attributes,
        inputs: &[ValueId],
        outputs: &[ValueId],
    ) -> Result<NodeId> {
        let id = self.nodes.len();
        for &value in inputs.iter().chain(outputs) {
            if value >= self.values.len() {
                return Err(Error::graph(format!("value {value} does not exist")));
            }
        }
        for &value in outputs {
            let slot = &self.values[value];
            if let Some(producer) = slot.producer {
                return Err(Error::graph(format!(
                    "value {value} already has producer node {producer}"
                )));
            }
            if slot.initializer.is_some() {
                return Err(Error::graph(format!(
                    "value {value} carries an initializer and cannot be produced by a node"
                )));
            }
        }
        for &value in inputs {
            self.values[value].consumers.push(id);
        }
        for &value in outputs {
            self.values[value].producer = Some(id);
        }
        self.nodes.push(Node {
            name: name.into(),
            op_type: op_type.into(),
            domain: domain.into(),
            attributes,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        });
        Ok(id)
    }

    /// Declares the values fed by the caller at run time, in call order.
    pub fn set_inputs(&mut self, inputs: Vec<ValueId>) -> Result<()> {
        self.check_values(&inputs)?;
        self.inputs = inputs;
        Ok(())
    }

    /// Declares the values returned to the caller, in return order.
    pub fn set_outputs(&mut self, outputs: Vec<ValueId>) -> Result<()> {
        self.check_values(&outputs)?;
        self.outputs = outputs;
        Ok(())
    }

    fn check_values(&self, values: &[ValueId]) -> Result<()> {
        for &value in values {
            if value >= self.values.len() {
                return Err(Error::graph(format!("value {value} does not exist")));
            }
        }
        Ok(())
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn value(&self, id: ValueId) -> Option<&Value> {
        self.values.get(id)
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn inputs(&self) -> &[ValueId] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[ValueId] {
        &self.outputs
    }
}
