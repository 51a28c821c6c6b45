//! Node processors: declarations and the uniform evaluate contract.
//!
//! Every node type declares a [`NodeDefinition`], an ordered list of typed
//! ports. Evaluation receives the resolved input values by port id and
//! returns an [`Evaluation`]. An input that has no value is absent from
//! [`Inputs`]; processors missing a required input return no outputs.

pub mod builtin;
pub mod registry;

use std::collections::BTreeMap;

use serde::Serialize;

pub use builtin::NodeKind;
pub use registry::Registry;

use crate::config::EngineConfig;
use crate::globals::Globals;
use crate::preview::Preview;
use crate::value::{Value, ValueKind};

/// Resolved input values by port id.
pub type Inputs = BTreeMap<String, Value>;

/// What one evaluation produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub outputs: BTreeMap<String, Value>,
    pub preview: Option<Preview>,
}

impl Evaluation {
    /// An evaluation producing nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_output(mut self, port: &str, value: Value) -> Self {
        self.outputs.insert(port.to_owned(), value);
        self
    }

    #[must_use]
    pub fn with_preview(mut self, preview: Preview) -> Self {
        self.preview = Some(preview);
        self
    }
}

/// Everything a processor may consult besides its inputs.
pub struct Context<'a> {
    pub globals: &'a mut dyn Globals,
    pub registry: &'a Registry,
    pub config: &'a EngineConfig,
    /// Local-function nesting depth; zero on the main graph.
    pub depth: u32,
}

impl Context<'_> {
    /// A context for nodes one local-function level deeper.
    pub fn nested(&mut self) -> Context<'_> {
        Context {
            globals: &mut *self.globals,
            registry: self.registry,
            config: self.config,
            depth: self.depth + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortDefinition {
    pub id: String,
    pub label: String,
    pub direction: PortDirection,
    pub kind: ValueKind,
    #[serde(skip)]
    pub default: Option<Value>,
    pub range: Option<Range>,
    pub linkable: bool,
    pub editable: bool,
}

impl PortDefinition {
    #[must_use]
    pub fn input(id: &str, label: &str, kind: ValueKind) -> Self {
        Self {
            id: id.to_owned(),
            label: label.to_owned(),
            direction: PortDirection::Input,
            kind,
            default: None,
            range: None,
            linkable: true,
            editable: false,
        }
    }

    #[must_use]
    pub fn output(id: &str, label: &str, kind: ValueKind) -> Self {
        Self {
            direction: PortDirection::Output,
            ..Self::input(id, label, kind)
        }
    }

    /// Make the port editable with a default literal.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self.editable = true;
        self
    }

    #[must_use]
    pub const fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(Range { min, max });
        self
    }

    #[must_use]
    pub const fn unlinkable(mut self) -> Self {
        self.linkable = false;
        self.editable = true;
        self
    }

    /// The literal value for this port given a node's stored properties.
    ///
    /// Falls back to the default when the property is absent or does not
    /// convert to the port's kind.
    #[must_use]
    pub fn literal(&self, properties: &BTreeMap<String, serde_json::Value>) -> Option<Value> {
        properties
            .get(&self.id)
            .and_then(|json| self.kind.literal(json))
            .or_else(|| self.default.clone())
    }
}

/// Editor grouping of node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Io,
    Color,
    Filters,
    Analysis,
    Segmentation,
    Binarize,
    Math,
    Local,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeDefinition {
    pub id: String,
    pub label: String,
    pub category: Category,
    /// Whether the node produces a preview.
    pub preview: bool,
    pub ports: Vec<PortDefinition>,
}

impl NodeDefinition {
    pub fn inputs(&self) -> impl Iterator<Item = &PortDefinition> {
        self.ports.iter().filter(|p| p.direction == PortDirection::Input)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &PortDefinition> {
        self.ports.iter().filter(|p| p.direction == PortDirection::Output)
    }

    #[must_use]
    pub fn port(&self, id: &str) -> Option<&PortDefinition> {
        self.ports.iter().find(|p| p.id == id)
    }
}
