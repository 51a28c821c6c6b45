//! Lookup of node types by id.
//!
//! Built-in kinds and compiled local functions share one id space, so a
//! graph node refers to a sub-graph exactly like any other type.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::compiler::LocalFunction;
use crate::processor::{Context, Evaluation, Inputs, NodeDefinition, NodeKind};

/// A resolved node type.
#[derive(Debug, Clone, Copy)]
pub enum Processor<'a> {
    Builtin(NodeKind),
    Local(&'a LocalFunction),
}

impl Processor<'_> {
    #[must_use]
    pub fn definition(&self) -> NodeDefinition {
        match self {
            Self::Builtin(kind) => kind.definition(),
            Self::Local(function) => function.definition().clone(),
        }
    }
}

/// Built-in processors plus the local functions of the current project.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    locals: BTreeMap<String, Arc<LocalFunction>>,
}

impl Registry {
    /// Replace the registered local functions.
    pub fn set_locals(&mut self, functions: impl IntoIterator<Item = LocalFunction>) {
        self.locals = functions
            .into_iter()
            .map(|f| (f.id().to_owned(), Arc::new(f)))
            .collect();
    }

    #[must_use]
    pub fn local(&self, id: &str) -> Option<&LocalFunction> {
        self.locals.get(id).map(Arc::as_ref)
    }

    #[must_use]
    pub fn resolve(&self, type_id: &str) -> Option<Processor<'_>> {
        NodeKind::from_id(type_id)
            .map(Processor::Builtin)
            .or_else(|| self.local(type_id).map(Processor::Local))
    }

    #[must_use]
    pub fn definition(&self, type_id: &str) -> Option<NodeDefinition> {
        self.resolve(type_id).map(|p| p.definition())
    }

    /// Definitions of every known type, built-ins first.
    #[must_use]
    pub fn definitions(&self) -> Vec<NodeDefinition> {
        NodeKind::ALL
            .into_iter()
            .map(NodeKind::definition)
            .chain(self.locals.values().map(|f| f.definition().clone()))
            .collect()
    }

    /// Evaluate a node of type `type_id`.
    ///
    /// Unknown types log a warning and produce nothing.
    #[must_use]
    pub fn evaluate(&self, type_id: &str, inputs: &Inputs, ctx: &mut Context<'_>) -> Evaluation {
        match self.resolve(type_id) {
            Some(Processor::Builtin(kind)) => kind.evaluate(inputs, ctx),
            Some(Processor::Local(function)) => function.call(inputs, ctx),
            None => {
                log::warn!("unknown processor '{type_id}'");
                Evaluation::empty()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::globals::MemoryGlobals;
    use crate::value::Value;

    #[test]
    fn unknown_type_evaluates_to_nothing() {
        let registry = Registry::default();
        let config = EngineConfig::default();
        let mut globals = MemoryGlobals::default();
        let mut ctx = Context {
            globals: &mut globals,
            registry: &registry,
            config: &config,
            depth: 0,
        };
        let mut inputs = Inputs::new();
        inputs.insert("input".to_owned(), Value::Int(1));
        assert_eq!(registry.evaluate("no-such-node", &inputs, &mut ctx), Evaluation::empty());
    }

    #[test]
    fn builtins_resolve() {
        let registry = Registry::default();
        assert!(matches!(
            registry.resolve("grayscale"),
            Some(Processor::Builtin(NodeKind::Grayscale))
        ));
        assert!(registry.resolve("app:missing").is_none());
        assert_eq!(registry.definitions().len(), NodeKind::ALL.len());
    }
}
