//! Topological ordering and two-color partitioning.
//!
//! A [`DependencyGraph`] is a lightweight projection of a [`Graph`]: nodes
//! keyed by id, directed edges labeled with every value id flowing between
//! the pair, and a boolean color per node assigned by the caller (for a
//! hybrid session, "resolved on the primary backend" vs "fell back").
//! Partitioning groups nodes into a minimal sequence of single-color
//! stages such that every stage only depends on earlier stages, and works
//! out which values cross each stage boundary.
//!
//! [`Graph`]: super::Graph

use std::collections::{BTreeSet, HashMap, VecDeque};

use tracing::debug;

use crate::error::{Error, Result};

use super::{NodeId, ValueId};

/// One executable stage: its member nodes plus the value ids it needs from
/// outside and the value ids later stages or the caller read from it. All
/// three lists are sorted ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    pub node_ids: Vec<NodeId>,
    pub input_ids: Vec<ValueId>,
    pub output_ids: Vec<ValueId>,
}

#[derive(Default)]
struct Endpoints {
    from: BTreeSet<NodeId>,
    to: BTreeSet<NodeId>,
}

pub struct DependencyGraph {
    color: Vec<bool>,
    next: Vec<Vec<NodeId>>,
    prev: Vec<Vec<NodeId>>,
    /// Every value id carried on the directed edge between a node pair.
    /// Two nodes may be linked by several values; all of them cross a
    /// partition boundary together.
    edge_values: HashMap<(NodeId, NodeId), Vec<ValueId>>,
    endpoints: HashMap<ValueId, Endpoints>,
    node_graph_inputs: HashMap<NodeId, BTreeSet<ValueId>>,
    node_graph_outputs: HashMap<NodeId, BTreeSet<ValueId>>,
}

impl DependencyGraph {
    pub fn new(node_count: usize) -> DependencyGraph {
        DependencyGraph {
            color: vec![false; node_count],
            next: vec![Vec::new(); node_count],
            prev: vec![Vec::new(); node_count],
            edge_values: HashMap::new(),
            endpoints: HashMap::new(),
            node_graph_inputs: HashMap::new(),
            node_graph_outputs: HashMap::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.color.len()
    }

    pub fn set_color(&mut self, node: NodeId, color: bool) -> Result<()> {
        self.check_node(node)?;
        self.color[node] = color;
        Ok(())
    }

    pub fn color(&self, node: NodeId) -> Option<bool> {
        self.color.get(node).copied()
    }

    /// Registers a node with the values it reads and writes. Nodes may be
    /// added in any order; edges to producers and consumers registered
    /// earlier are wired up on both sides.
    pub fn add_node(
        &mut self,
        node: NodeId,
        inputs: &[ValueId],
        outputs: &[ValueId],
    ) -> Result<()> {
        self.check_node(node)?;
        for &value in inputs {
            let producers: Vec<NodeId> = self
                .endpoints
                .entry(value)
                .or_default()
                .from
                .iter()
                .copied()
                .collect();
            for producer in producers {
                self.add_edge(producer, node, value);
            }
            self.endpoints.entry(value).or_default().to.insert(node);
        }
        for &value in outputs {
            let consumers: Vec<NodeId> = self
                .endpoints
                .entry(value)
                .or_default()
                .to
                .iter()
                .copied()
                .collect();
            for consumer in consumers {
                self.add_edge(node, consumer, value);
            }
            self.endpoints.entry(value).or_default().from.insert(node);
        }
        Ok(())
    }

    /// Marks values the surrounding graph feeds in or reads out, binding
    /// each to the nodes consuming or producing it. Values no registered
    /// node touches are skipped.
    pub fn identify_input_output_values(
        &mut self,
        graph_inputs: &[ValueId],
        graph_outputs: &[ValueId],
    ) {
        for &value in graph_inputs {
            if let Some(endpoints) = self.endpoints.get(&value) {
                for &node in &endpoints.to {
                    self.node_graph_inputs
                        .entry(node)
                        .or_default()
                        .insert(value);
                }
            }
        }
        for &value in graph_outputs {
            if let Some(endpoints) = self.endpoints.get(&value) {
                for &node in &endpoints.from {
                    self.node_graph_outputs
                        .entry(node)
                        .or_default()
                        .insert(value);
                }
            }
        }
    }

    /// Kahn's algorithm with a FIFO frontier. Fails if the graph is not a
    /// DAG.
    pub fn topological_sort(&self) -> Result<Vec<NodeId>> {
        let n = self.node_count();
        let mut indegree: Vec<usize> = self.prev.iter().map(Vec::len).collect();
        let mut frontier: VecDeque<NodeId> = (0..n).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(u) = frontier.pop_front() {
            order.push(u);
            for &v in &self.next[u] {
                indegree[v] -= 1;
                if indegree[v] == 0 {
                    frontier.push_back(v);
                }
            }
        }
        if order.len() != n {
            return Err(Error::graph("the dependency graph contains a cycle"));
        }
        Ok(order)
    }

    /// Topological sort that also groups nodes into levels: a node sits one
    /// level past its deepest predecessor of the other color, and on the
    /// same level as its deepest same-color predecessor. The result is the
    /// shortest stage sequence that keeps every stage single-color and
    /// dependency-closed.
    ///
    /// For a diamond `0 -> {1, 2} -> 3` where only node 0 and 3 share a
    /// color, the levels come out as `[0]`, `[1, 2]`, `[3]`.
    pub fn bi_topological_sort(&self) -> Result<Vec<Vec<NodeId>>> {
        let order = self.topological_sort()?;
        let n = self.node_count();
        let mut level = vec![0usize; n];
        for &u in &order {
            for &v in &self.prev[u] {
                let step = usize::from(self.color[u] != self.color[v]);
                level[u] = level[u].max(level[v] + step);
            }
        }
        let count = match level.iter().max() {
            Some(&deepest) => deepest + 1,
            None => return Ok(Vec::new()),
        };
        let mut groups = vec![Vec::new(); count];
        for node in 0..n {
            groups[level[node]].push(node);
        }
        Ok(groups)
    }

    /// Splits the graph into ordered single-color stages and resolves the
    /// values crossing each boundary. With `eager` set, every node becomes
    /// its own stage in plain topological order instead.
    pub fn partition(&self, eager: bool) -> Result<Vec<Partition>> {
        let groups: Vec<Vec<NodeId>> = if eager {
            self.topological_sort()?
                .into_iter()
                .map(|u| vec![u])
                .collect()
        } else {
            self.bi_topological_sort()?
        };

        // Values each node reads from an earlier stage, filled in while
        // scanning the producing stage.
        let mut carried: Vec<BTreeSet<ValueId>> = vec![BTreeSet::new(); self.node_count()];
        let mut partitions = Vec::with_capacity(groups.len());
        for group in groups {
            let members: BTreeSet<NodeId> = group.iter().copied().collect();
            let mut inputs = BTreeSet::new();
            let mut outputs = BTreeSet::new();
            for &u in &group {
                for &v in &self.next[u] {
                    if !members.contains(&v) {
                        let values = &self.edge_values[&(u, v)];
                        carried[v].extend(values);
                        outputs.extend(values);
                    }
                }
                if let Some(extra) = self.node_graph_outputs.get(&u) {
                    outputs.extend(extra);
                }
            }
            for &u in &group {
                inputs.extend(&carried[u]);
                if let Some(extra) = self.node_graph_inputs.get(&u) {
                    inputs.extend(extra);
                }
            }
            partitions.push(Partition {
                node_ids: group,
                input_ids: inputs.into_iter().collect(),
                output_ids: outputs.into_iter().collect(),
            });
        }
        debug!(stages = partitions.len(), "dependency graph partitioned");
        Ok(partitions)
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId, value: ValueId) {
        let values = self.edge_values.entry((from, to)).or_default();
        if values.is_empty() {
            self.next[from].push(to);
            self.prev[to].push(from);
        }
        if !values.contains(&value) {
            values.push(value);
        }
    }

    fn check_node(&self, node: NodeId) -> Result<()> {
        if node >= self.node_count() {
            return Err(Error::graph(format!(
                "node {node} is out of range for a graph of {} nodes",
                self.node_count()
            )));
        }
        Ok(())
    }
}
