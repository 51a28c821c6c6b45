//! Project and graph documents as exchanged with the editor.
//!
//! The shapes follow the editor's JSON: a project is a list of named
//! graphs, each carrying a node group of nodes and connections. Fields the
//! engine does not use (node sizes, canvas state) are ignored on load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Ordered list of named graphs; one is flagged main.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub graphs: Vec<Graph>,
}

impl Project {
    /// Parse a project document.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Document`] if the JSON does not match the
    /// project shape.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The first graph flagged main.
    #[must_use]
    pub fn main_graph(&self) -> Option<&Graph> {
        self.graphs.iter().find(|g| g.is_main)
    }

    /// Every graph that is not main, in document order.
    pub fn local_graphs(&self) -> impl Iterator<Item = &Graph> {
        self.graphs.iter().filter(|g| !g.is_main)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub name: String,
    pub node_group: GraphIo,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_main: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphIo {
    pub nodes: Vec<NodeIo>,
    #[serde(default)]
    pub connections: Vec<ConnectionIo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canvas: Option<serde_json::Value>,
}

impl GraphIo {
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&NodeIo> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// First connection feeding `node`'s `property`.
    #[must_use]
    pub fn connection_to(&self, node: &str, property: &str) -> Option<&ConnectionIo> {
        self.connections
            .iter()
            .find(|c| c.to.node == node && c.to.property == property)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeIo {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionIo {
    pub from: Endpoint,
    pub to: Endpoint,
}

/// One end of a connection.
///
/// On the dynamic-port `inputs`/`outputs` nodes the property id is dotted,
/// e.g. `inputs.image`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: String,
    pub property: String,
}

impl Endpoint {
    /// The port name after `prefix.`, for dotted property ids.
    #[must_use]
    pub fn sub_property(&self, prefix: &str) -> Option<&str> {
        self.property
            .strip_prefix(prefix)
            .and_then(|rest| rest.strip_prefix('.'))
    }
}

/// Node type id under which a local graph is registered.
///
/// `"Find Lines"` becomes `"app:find-lines"`.
#[must_use]
pub fn make_node_id(name: &str) -> String {
    let words: Vec<String> = name.split(' ').map(str::to_lowercase).collect();
    format!("app:{}", words.join("-"))
}
