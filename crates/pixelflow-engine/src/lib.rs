//! pixelflow-engine: incremental evaluation of image-processing node graphs.
//!
//! A [`Project`] is a list of named graphs. The graph flagged main is
//! evaluated by [`Engine::update`]; every other graph is compiled into a
//! local function ([`compiler`]) that main-graph nodes call like any
//! built-in node type ([`processor`]).
//!
//! The engine never performs I/O on its own. Images reach it through the
//! [`Globals`] catalog, results leave it as [`Previews`] and viewer
//! models, and progress goes to a [`ProgressMonitor`]. [`EngineService`]
//! wraps an engine in a thread with command and event channels for hosts
//! that must stay responsive during long passes.

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod document;
pub mod error;
pub mod evaluator;
pub mod globals;
pub mod order;
pub mod preview;
pub mod processor;
pub mod service;
pub mod value;

pub use catalog::decode_catalog_image;
pub use compiler::{LocalFunction, compile};
pub use config::EngineConfig;
pub use document::{Graph, GraphIo, Project, make_node_id};
pub use error::EngineError;
pub use evaluator::Engine;
pub use globals::{
    CancelToken, CatalogImage, Globals, Layer, MemoryGlobals, NoProgress, ProgressMonitor,
    ViewerModel,
};
pub use preview::{Preview, Previews, render_preview, render_viewer};
pub use processor::{NodeDefinition, NodeKind, Registry};
pub use service::{Command, EngineService, Event};
pub use value::{Value, ValueKind};
