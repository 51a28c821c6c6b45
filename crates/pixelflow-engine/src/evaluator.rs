//! Incremental evaluation of a project's main graph.
//!
//! [`Engine`] keeps one [`NodeInstance`] per node of the main graph across
//! updates. Each update runs four phases:
//!
//! 1. **Sync** instances with the graph's nodes by id.
//! 2. **Link** every input port to its upstream output or literal value.
//! 3. **Order** instances so producers precede consumers.
//! 4. **Evaluate** instances whose inputs changed.
//!
//! An output is dirty when its value changed during this pass. An input is
//! dirty when its binding or literal changed, or when it reads a dirty
//! output. A node is evaluated only if one of its inputs is dirty, so
//! editing one property recomputes that node and its consumers.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::compiler::compile;
use crate::config::EngineConfig;
use crate::document::{Graph, NodeIo, Project};
use crate::error::EngineError;
use crate::globals::{CancelToken, Globals, ProgressMonitor};
use crate::order::topological_order;
use crate::preview::{Preview, Previews};
use crate::processor::{Context, Inputs, Registry};
use crate::value::Value;

// ───────────────────────── Node instances ──────────────────────────

/// The last value a node produced on one output port.
#[derive(Debug, Clone, Default)]
struct OutputValue {
    value: Option<Value>,
    dirty: bool,
}

impl OutputValue {
    fn update(&mut self, value: Option<Value>) {
        if self.value != value {
            self.value = value;
            self.dirty = true;
        }
    }
}

/// Upstream output feeding an input port.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    node: String,
    port: String,
}

#[derive(Debug, Clone)]
struct InputValue {
    port: String,
    binding: Option<Binding>,
    literal: Option<Value>,
    dirty: bool,
}

impl InputValue {
    const fn new(port: String) -> Self {
        Self {
            port,
            binding: None,
            literal: None,
            dirty: true,
        }
    }

    fn link(&mut self, binding: Option<Binding>, literal: Option<Value>) {
        if self.binding != binding {
            self.binding = binding;
            self.dirty = true;
        }
        if self.binding.is_none() && self.literal != literal {
            self.dirty = true;
        }
        self.literal = literal;
    }
}

/// Runtime state of one main-graph node.
#[derive(Debug, Clone)]
struct NodeInstance {
    id: String,
    node_type: String,
    label: String,
    inputs: Vec<InputValue>,
    outputs: BTreeMap<String, OutputValue>,
    preview: Option<Preview>,
    needs_evaluation: bool,
}

impl NodeInstance {
    fn new(node: &NodeIo, registry: &Registry) -> Self {
        let definition = registry.definition(&node.node_type);
        let label = definition
            .as_ref()
            .map_or_else(|| node.node_type.clone(), |d| d.label.clone());
        let (inputs, outputs) = definition.map_or_else(Default::default, |d| {
            (
                d.inputs().map(|p| InputValue::new(p.id.clone())).collect(),
                d.outputs()
                    .map(|p| (p.id.clone(), OutputValue::default()))
                    .collect(),
            )
        });
        Self {
            id: node.id.clone(),
            node_type: node.node_type.clone(),
            label,
            inputs,
            outputs,
            preview: None,
            needs_evaluation: true,
        }
    }
}

// ───────────────────────── Engine ──────────────────────────

/// Incremental evaluator for a project's main graph.
#[derive(Debug, Default)]
pub struct Engine {
    config: EngineConfig,
    registry: Registry,
    instances: Vec<NodeInstance>,
    fingerprints: HashMap<String, u64>,
    last_evaluated: Vec<String>,
}

impl Engine {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub const fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Bring every node of the project's main graph up to date.
    ///
    /// Returns the previews of every node that has one, including nodes
    /// left untouched by this pass.
    ///
    /// # Errors
    ///
    /// - [`EngineError::NoMainGraph`] if no graph is flagged main.
    /// - [`EngineError::Cycle`] if the main graph or a local graph is
    ///   cyclic. Nothing is evaluated.
    /// - [`EngineError::Cancelled`] if `cancel` fired between two nodes.
    ///   Nodes evaluated so far keep their outputs and the dirty state is
    ///   preserved, so the next update resumes the remaining work.
    pub fn update(
        &mut self,
        project: &Project,
        globals: &mut dyn Globals,
        progress: &mut dyn ProgressMonitor,
        cancel: &CancelToken,
    ) -> Result<Previews, EngineError> {
        let main = project.main_graph().ok_or(EngineError::NoMainGraph)?;
        self.compile_locals(project)?;

        let mut instances = self.sync(&main.node_group.nodes);
        self.link(main, &mut instances);
        match order(main, &instances) {
            Ok(order) => {
                let mut slots: Vec<Option<NodeInstance>> =
                    instances.into_iter().map(Some).collect();
                self.instances = order
                    .into_iter()
                    .filter_map(|k| slots[k].take())
                    .collect();
            }
            Err(error) => {
                self.instances = instances;
                return Err(error);
            }
        }

        self.last_evaluated.clear();
        self.evaluate(main, globals, progress, cancel)?;

        for instance in &mut self.instances {
            for output in instance.outputs.values_mut() {
                output.dirty = false;
            }
        }

        Ok(self
            .instances
            .iter()
            .filter_map(|i| i.preview.clone().map(|p| (i.id.clone(), p)))
            .collect())
    }

    /// Node ids in the order of the last update.
    pub fn evaluation_order(&self) -> impl Iterator<Item = &str> {
        self.instances.iter().map(|i| i.id.as_str())
    }

    /// Node ids actually recomputed by the last update.
    #[must_use]
    pub fn last_evaluated(&self) -> &[String] {
        &self.last_evaluated
    }

    /// Whether node `id` is still pending evaluation, `None` if unknown.
    #[must_use]
    pub fn needs_evaluation(&self, id: &str) -> Option<bool> {
        self.instance(id).map(|i| i.needs_evaluation)
    }

    /// Current value of a node's output port.
    #[must_use]
    pub fn output(&self, node: &str, port: &str) -> Option<&Value> {
        self.instance(node)?.outputs.get(port)?.value.as_ref()
    }

    /// Force every instance of `node_type` to re-evaluate on the next
    /// update, e.g. `image-input` nodes after the catalog changed.
    pub fn invalidate(&mut self, node_type: &str) {
        for instance in &mut self.instances {
            if instance.node_type == node_type {
                instance.needs_evaluation = true;
            }
        }
    }

    fn instance(&self, id: &str) -> Option<&NodeInstance> {
        self.instances.iter().find(|i| i.id == id)
    }

    /// Compile every non-main graph and register the results.
    ///
    /// Types whose source graph changed since the last update force their
    /// main-graph instances to re-evaluate.
    fn compile_locals(&mut self, project: &Project) -> Result<(), EngineError> {
        let functions = project
            .local_graphs()
            .map(compile)
            .collect::<Result<Vec<_>, _>>()?;

        let fingerprints: HashMap<String, u64> = functions
            .iter()
            .map(|f| (f.id().to_owned(), f.fingerprint()))
            .collect();
        for instance in &mut self.instances {
            let old = self.fingerprints.get(&instance.node_type);
            let new = fingerprints.get(&instance.node_type);
            if old != new {
                log::debug!("local function {} changed", instance.node_type);
                instance.needs_evaluation = true;
            }
        }
        self.fingerprints = fingerprints;
        self.registry.set_locals(functions);
        Ok(())
    }

    /// Match instances to graph nodes by id, in document order.
    ///
    /// A node whose type changed gets a fresh instance.
    fn sync(&mut self, nodes: &[NodeIo]) -> Vec<NodeInstance> {
        let mut existing: HashMap<String, NodeInstance> = self
            .instances
            .drain(..)
            .map(|i| (i.id.clone(), i))
            .collect();
        nodes
            .iter()
            .map(|node| match existing.remove(&node.id) {
                Some(instance) if instance.node_type == node.node_type => instance,
                _ => NodeInstance::new(node, &self.registry),
            })
            .collect()
    }

    /// Bind inputs to upstream outputs, or to literals when unconnected.
    fn link(&self, graph: &Graph, instances: &mut [NodeInstance]) {
        let group = &graph.node_group;
        let outputs: HashSet<(String, String)> = instances
            .iter()
            .flat_map(|i| i.outputs.keys().map(|port| (i.id.clone(), port.clone())))
            .collect();

        for (instance, node) in instances.iter_mut().zip(&group.nodes) {
            let Some(definition) = self.registry.definition(&node.node_type) else {
                continue;
            };
            for input in &mut instance.inputs {
                let binding = group.connection_to(&node.id, &input.port).and_then(|c| {
                    if outputs.contains(&(c.from.node.clone(), c.from.property.clone())) {
                        Some(Binding {
                            node: c.from.node.clone(),
                            port: c.from.property.clone(),
                        })
                    } else {
                        log::warn!(
                            "{}.{}: no output {}.{} to connect",
                            node.id,
                            input.port,
                            c.from.node,
                            c.from.property
                        );
                        None
                    }
                });
                let literal = definition
                    .port(&input.port)
                    .and_then(|p| p.literal(&node.properties));
                input.link(binding, literal);
            }
        }
    }

    fn evaluate(
        &mut self,
        graph: &Graph,
        globals: &mut dyn Globals,
        progress: &mut dyn ProgressMonitor,
        cancel: &CancelToken,
    ) -> Result<(), EngineError> {
        let position: HashMap<String, usize> = self
            .instances
            .iter()
            .enumerate()
            .map(|(k, i)| (i.id.clone(), k))
            .collect();
        let total = self.instances.len();
        #[allow(clippy::cast_precision_loss)]
        let fraction = |k: usize| k as f64 / total as f64;

        progress.start();
        for k in 0..total {
            if cancel.is_cancelled() {
                log::debug!("update of '{}' cancelled after {k} of {total} nodes", graph.name);
                progress.end();
                return Err(EngineError::Cancelled);
            }

            let (done, rest) = self.instances.split_at_mut(k);
            let done: &[NodeInstance] = done;
            let instance = &mut rest[0];
            progress.progress(fraction(k), &instance.label);

            let upstream = |b: &Binding| {
                position
                    .get(&b.node)
                    .and_then(|&p| done.get(p))
                    .and_then(|i| i.outputs.get(&b.port))
            };
            let dirty = instance.inputs.iter().any(|input| {
                input.dirty || input.binding.as_ref().and_then(upstream).is_some_and(|o| o.dirty)
            });
            instance.needs_evaluation |= dirty;

            if instance.needs_evaluation {
                let inputs: Inputs = instance
                    .inputs
                    .iter()
                    .filter_map(|input| {
                        let value = match &input.binding {
                            Some(b) => upstream(b).and_then(|o| o.value.clone()),
                            None => input.literal.clone(),
                        };
                        value.map(|v| (input.port.clone(), v))
                    })
                    .collect();

                log::debug!("evaluating {} ({})", instance.id, instance.node_type);
                let mut ctx = Context {
                    globals: &mut *globals,
                    registry: &self.registry,
                    config: &self.config,
                    depth: 0,
                };
                let mut result = self.registry.evaluate(&instance.node_type, &inputs, &mut ctx);
                instance.preview = result.preview.take();
                for (port, output) in &mut instance.outputs {
                    output.update(result.outputs.remove(port));
                }
                for input in &mut instance.inputs {
                    input.dirty = false;
                }
                instance.needs_evaluation = false;
                self.last_evaluated.push(instance.id.clone());
            } else {
                log::trace!("{} is up to date", instance.id);
            }

            progress.progress(fraction(k + 1), &instance.label);
        }
        progress.end();
        Ok(())
    }
}

/// Positions of `instances` in an order where every node follows the
/// nodes feeding it.
fn order(graph: &Graph, instances: &[NodeInstance]) -> Result<Vec<usize>, EngineError> {
    let index: HashMap<&str, usize> = instances
        .iter()
        .enumerate()
        .map(|(k, i)| (i.id.as_str(), k))
        .collect();
    let predecessors: Vec<Vec<usize>> = instances
        .iter()
        .map(|i| {
            i.inputs
                .iter()
                .filter_map(|input| input.binding.as_ref())
                .filter_map(|b| index.get(b.node.as_str()).copied())
                .collect()
        })
        .collect();

    topological_order(&predecessors).map_err(|members| EngineError::Cycle {
        graph: graph.name.clone(),
        nodes: members.iter().map(|&k| instances[k].id.clone()).collect(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::globals::{MemoryGlobals, NoProgress};

    fn project(json: &str) -> Project {
        Project::from_json(json).unwrap()
    }

    fn run(engine: &mut Engine, project: &Project) -> Result<Previews, EngineError> {
        engine.update(
            project,
            &mut MemoryGlobals::default(),
            &mut NoProgress,
            &CancelToken::new(),
        )
    }

    #[test]
    fn missing_main_graph() {
        let p = project(r#"{"graphs": [{"name": "Local", "nodeGroup": {"nodes": []}}]}"#);
        assert!(matches!(
            run(&mut Engine::default(), &p),
            Err(EngineError::NoMainGraph)
        ));
    }

    #[test]
    fn literal_change_marks_input_dirty() {
        let mut input = InputValue::new("level".to_owned());
        input.link(None, Some(Value::Int(1)));
        input.dirty = false;
        input.link(None, Some(Value::Int(1)));
        assert!(!input.dirty);
        input.link(None, Some(Value::Int(2)));
        assert!(input.dirty);
    }

    #[test]
    fn binding_change_marks_input_dirty() {
        let mut input = InputValue::new("input".to_owned());
        let binding = Binding {
            node: "a".to_owned(),
            port: "output".to_owned(),
        };
        input.link(Some(binding.clone()), None);
        input.dirty = false;
        input.link(Some(binding), None);
        assert!(!input.dirty);
        input.link(None, None);
        assert!(input.dirty);
    }

    #[test]
    fn output_dirty_only_on_change() {
        let mut output = OutputValue::default();
        output.update(None);
        assert!(!output.dirty);
        output.update(Some(Value::Int(3)));
        assert!(output.dirty);
        output.dirty = false;
        output.update(Some(Value::Int(3)));
        assert!(!output.dirty);
    }

    #[test]
    fn unresolvable_connection_falls_back_to_literal() {
        let p = project(
            r#"{"graphs": [{"name": "Main", "isMain": true, "nodeGroup": {
                "nodes": [
                    {"id": "argmax", "type": "argmax", "properties": {"values": [1, 5, 2]}}
                ],
                "connections": [
                    {"from": {"node": "ghost", "property": "output"}, "to": {"node": "argmax", "property": "values"}}
                ]
            }}]}"#,
        );
        let mut engine = Engine::default();
        run(&mut engine, &p).unwrap();
        assert_eq!(engine.output("argmax", "value"), Some(&Value::Int(1)));
    }

    #[test]
    fn type_change_replaces_instance() {
        let before = project(
            r#"{"graphs": [{"name": "Main", "isMain": true, "nodeGroup": {
                "nodes": [{"id": "n", "type": "argmax", "properties": {"values": [1, 2]}}]
            }}]}"#,
        );
        let after = project(
            r#"{"graphs": [{"name": "Main", "isMain": true, "nodeGroup": {
                "nodes": [{"id": "n", "type": "otsu-levels"}]
            }}]}"#,
        );
        let mut engine = Engine::default();
        run(&mut engine, &before).unwrap();
        assert!(engine.output("n", "value").is_some());
        run(&mut engine, &after).unwrap();
        assert!(engine.output("n", "value").is_none());
        assert_eq!(engine.last_evaluated(), ["n"]);
    }
}
