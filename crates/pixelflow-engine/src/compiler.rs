//! Compilation of named sub-graphs into callable local functions.
//!
//! A sub-graph exposes its signature through two virtual nodes: the
//! `inputs` node, whose `inputs` property maps port ids to labels, and the
//! `outputs` node, whose `outputs` property does the same for results.
//! Connections address those ports with dotted ids (`inputs.<port>`,
//! `outputs.<port>`).
//!
//! Compilation keeps only the nodes the `outputs` node depends on and
//! orders them. A call then evaluates every kept node once, without dirty
//! tracking, and collects the outputs.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hasher;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};
use siphasher::sip::SipHasher13;

use crate::document::{Endpoint, Graph, GraphIo, make_node_id};
use crate::error::EngineError;
use crate::order::topological_order;
use crate::processor::{
    Category, Context, Evaluation, Inputs, NodeDefinition, NodeKind, PortDefinition,
};
use crate::value::{Value, ValueKind};

const INPUTS_PREFIX: &str = "inputs";
const OUTPUTS_PREFIX: &str = "outputs";

/// One retained node of a local function.
#[derive(Debug, Clone, PartialEq)]
struct Step {
    id: String,
    node_type: String,
    properties: BTreeMap<String, serde_json::Value>,
    /// First incoming connection per input port.
    sources: BTreeMap<String, Endpoint>,
}

/// A compiled sub-graph.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFunction {
    definition: NodeDefinition,
    steps: Vec<Step>,
    /// Node ids of the graph's `inputs` nodes.
    input_nodes: Vec<String>,
    /// Output port id to the endpoint feeding it.
    results: Vec<(String, Option<Endpoint>)>,
    fingerprint: u64,
}

impl LocalFunction {
    /// Type id under which the function is registered.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.definition.id
    }

    #[must_use]
    pub const fn definition(&self) -> &NodeDefinition {
        &self.definition
    }

    /// Hash of the source graph; changes whenever the graph does.
    #[must_use]
    pub const fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Ids of the retained nodes in evaluation order.
    pub fn evaluation_order(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(|s| s.id.as_str())
    }

    /// Evaluate the function on named inputs.
    ///
    /// Every retained node is recomputed. Calls nested deeper than the
    /// configured limit produce nothing.
    #[must_use]
    pub fn call(&self, inputs: &Inputs, ctx: &mut Context<'_>) -> Evaluation {
        if ctx.depth >= ctx.config.max_call_depth {
            log::warn!(
                "local function '{}' exceeds the call depth limit of {}",
                self.id(),
                ctx.config.max_call_depth
            );
            return Evaluation::empty();
        }

        let registry = ctx.registry;
        let mut values: HashMap<(String, String), Value> = HashMap::new();
        for step in &self.steps {
            let Some(definition) = registry.definition(&step.node_type) else {
                log::warn!("unknown processor '{}' in '{}'", step.node_type, self.id());
                continue;
            };
            let mut node_inputs = Inputs::new();
            for port in definition.inputs() {
                let value = match step.sources.get(&port.id) {
                    Some(source) => self.source_value(source, inputs, &values),
                    None => port.literal(&step.properties),
                };
                if let Some(value) = value {
                    node_inputs.insert(port.id.clone(), value);
                }
            }
            log::debug!("{}: evaluating {} ({})", self.id(), step.id, step.node_type);
            let result = registry.evaluate(&step.node_type, &node_inputs, &mut ctx.nested());
            for (port, value) in result.outputs {
                values.insert((step.id.clone(), port), value);
            }
        }

        let mut evaluation = Evaluation::empty();
        for (port, source) in &self.results {
            if let Some(value) = source
                .as_ref()
                .and_then(|s| self.source_value(s, inputs, &values))
            {
                evaluation.outputs.insert(port.clone(), value);
            }
        }
        evaluation
    }

    fn source_value(
        &self,
        source: &Endpoint,
        inputs: &Inputs,
        values: &HashMap<(String, String), Value>,
    ) -> Option<Value> {
        if self.input_nodes.contains(&source.node) {
            return source
                .sub_property(INPUTS_PREFIX)
                .and_then(|port| inputs.get(port))
                .cloned();
        }
        values
            .get(&(source.node.clone(), source.property.clone()))
            .cloned()
    }
}

/// Port ids and labels declared in a dynamic-port node's property.
fn declared_ports(group: &GraphIo, node_type: NodeKind, property: &str) -> Vec<(String, String)> {
    group
        .nodes
        .iter()
        .filter(|n| n.node_type == node_type.id())
        .filter_map(|n| n.properties.get(property))
        .filter_map(serde_json::Value::as_object)
        .flat_map(|ports| {
            ports.iter().map(|(id, label)| {
                let label = label.as_str().map_or_else(|| id.clone(), str::to_owned);
                (id.clone(), label)
            })
        })
        .collect()
}

fn fingerprint(graph: &Graph) -> u64 {
    let mut hasher = SipHasher13::new();
    hasher.write(graph.name.as_bytes());
    if let Ok(bytes) = serde_json::to_vec(&graph.node_group) {
        hasher.write(&bytes);
    }
    hasher.finish()
}

/// Compile a sub-graph into a [`LocalFunction`].
///
/// Nodes the `outputs` node does not depend on are dropped. A graph
/// without an `outputs` node compiles to a function with no steps.
///
/// # Errors
///
/// Returns [`EngineError::Cycle`] if the retained nodes depend on each
/// other cyclically.
pub fn compile(graph: &Graph) -> Result<LocalFunction, EngineError> {
    let group = &graph.node_group;
    let id = make_node_id(&graph.name);

    let mut dag = DiGraph::<usize, ()>::new();
    let indices: Vec<NodeIndex> = (0..group.nodes.len()).map(|i| dag.add_node(i)).collect();
    let by_id: HashMap<&str, usize> = group
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();
    for connection in &group.connections {
        if let (Some(&from), Some(&to)) = (
            by_id.get(connection.from.node.as_str()),
            by_id.get(connection.to.node.as_str()),
        ) {
            dag.add_edge(indices[from], indices[to], ());
        }
    }

    let outputs_node = group
        .nodes
        .iter()
        .position(|n| n.node_type == NodeKind::Outputs.id());
    let mut reachable = vec![false; group.nodes.len()];
    match outputs_node {
        Some(start) => {
            let reversed = Reversed(&dag);
            let mut dfs = Dfs::new(reversed, indices[start]);
            while let Some(n) = dfs.next(reversed) {
                reachable[dag[n]] = true;
            }
        }
        None => log::warn!("local graph '{}' has no outputs node", graph.name),
    }

    // Order the retained nodes among themselves.
    let kept: Vec<usize> = (0..group.nodes.len()).filter(|&i| reachable[i]).collect();
    let position: HashMap<usize, usize> = kept.iter().enumerate().map(|(k, &i)| (i, k)).collect();
    let predecessors: Vec<Vec<usize>> = kept
        .iter()
        .map(|&i| {
            dag.neighbors_directed(indices[i], petgraph::Direction::Incoming)
                .filter_map(|n| position.get(&dag[n]).copied())
                .collect()
        })
        .collect();
    let order = topological_order(&predecessors).map_err(|members| EngineError::Cycle {
        graph: graph.name.clone(),
        nodes: members.iter().map(|&k| group.nodes[kept[k]].id.clone()).collect(),
    })?;

    let is_virtual = |t: &str| t == NodeKind::Inputs.id() || t == NodeKind::Outputs.id();
    let steps: Vec<Step> = order
        .iter()
        .map(|&k| &group.nodes[kept[k]])
        .filter(|n| !is_virtual(&n.node_type))
        .map(|n| Step {
            id: n.id.clone(),
            node_type: n.node_type.clone(),
            properties: n.properties.clone(),
            sources: group
                .connections
                .iter()
                .filter(|c| c.to.node == n.id)
                .fold(BTreeMap::new(), |mut sources, c| {
                    sources
                        .entry(c.to.property.clone())
                        .or_insert_with(|| c.from.clone());
                    sources
                }),
        })
        .collect();

    let input_ports = declared_ports(group, NodeKind::Inputs, INPUTS_PREFIX);
    let output_ports = declared_ports(group, NodeKind::Outputs, OUTPUTS_PREFIX);
    let outputs_id = outputs_node.map(|i| group.nodes[i].id.as_str());
    let results = output_ports
        .iter()
        .map(|(port, _)| {
            let source = outputs_id.and_then(|node| {
                group
                    .connection_to(node, &format!("{OUTPUTS_PREFIX}.{port}"))
                    .map(|c| c.from.clone())
            });
            (port.clone(), source)
        })
        .collect();

    let ports = input_ports
        .iter()
        .map(|(port, label)| PortDefinition::input(port, label, ValueKind::Any))
        .chain(
            output_ports
                .iter()
                .map(|(port, label)| PortDefinition::output(port, label, ValueKind::Any)),
        )
        .collect();

    let function = LocalFunction {
        definition: NodeDefinition {
            id,
            label: graph.name.clone(),
            category: Category::Local,
            preview: false,
            ports,
        },
        steps,
        input_nodes: group
            .nodes
            .iter()
            .filter(|n| n.node_type == NodeKind::Inputs.id())
            .map(|n| n.id.clone())
            .collect(),
        results,
        fingerprint: fingerprint(graph),
    };
    log::debug!(
        "compiled '{}' as {}: {} of {} nodes retained",
        graph.name,
        function.id(),
        function.steps.len(),
        group.nodes.len()
    );
    Ok(function)
}
