//! Values flowing along graph connections.

use std::sync::Arc;

use pixelflow_compute::geometry::Line;
use pixelflow_compute::{Block, FloatImage, OutlineSet, RgbaImage};
use serde::{Deserialize, Serialize};

/// A value produced by an output port or supplied as a literal.
///
/// Large payloads are shared behind [`Arc`] so outputs can be handed to
/// several consumers without copying.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Real(f64),
    Bool(bool),
    Text(String),
    Image(Arc<RgbaImage>),
    Array(Arc<Vec<f64>>),
    Grid(Arc<FloatImage>),
    Lines(Arc<Vec<Line>>),
    Outlines(Arc<OutlineSet>),
    Block(Arc<Block>),
}

impl Value {
    #[must_use]
    pub fn image(image: RgbaImage) -> Self {
        Self::Image(Arc::new(image))
    }

    #[must_use]
    pub fn array(values: Vec<f64>) -> Self {
        Self::Array(Arc::new(values))
    }

    #[must_use]
    pub fn as_image(&self) -> Option<&Arc<RgbaImage>> {
        match self {
            Self::Image(image) => Some(image),
            _ => None,
        }
    }

    /// Numeric view, accepting integers and reals.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer view; reals are rounded.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Real(v) if v.is_finite() => Some(v.round() as i64),
            _ => None,
        }
    }

    /// Truthiness used by boolean ports: zero, empty text and `false` are
    /// false.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(v) => *v != 0,
            Self::Real(v) => *v != 0.0,
            Self::Text(s) => !s.is_empty(),
            _ => true,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric sequence view: arrays as-is, float grids flattened.
    #[must_use]
    pub fn as_values(&self) -> Option<Vec<f64>> {
        match self {
            Self::Array(values) => Some(values.as_ref().clone()),
            Self::Grid(grid) => Some(grid.as_raw().iter().copied().map(f64::from).collect()),
            _ => None,
        }
    }

    /// Short name of the variant, used in log messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Bool(_) => "bool",
            Self::Text(_) => "text",
            Self::Image(_) => "image",
            Self::Array(_) => "array",
            Self::Grid(_) => "grid",
            Self::Lines(_) => "lines",
            Self::Outlines(_) => "outlines",
            Self::Block(_) => "block",
        }
    }
}

/// Declared type of a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueKind {
    Int,
    Real,
    Bool,
    Text,
    Image,
    Array,
    /// Name of an image in the globals catalog.
    CatalogImage,
    /// Free-form label map on the dynamic-port nodes.
    Label,
    Any,
}

impl ValueKind {
    /// Convert a literal property value from a graph document.
    ///
    /// Scalar kinds and number arrays accept literals; `null` and
    /// mismatched JSON yield `None`.
    #[must_use]
    pub fn literal(self, json: &serde_json::Value) -> Option<Value> {
        use serde_json::Value as Json;
        match (self, json) {
            (Self::Int, Json::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(|f| Value::Real(f).as_i64()))
                .map(Value::Int),
            (Self::Real, Json::Number(n)) => n.as_f64().map(Value::Real),
            (Self::Bool, Json::Bool(b)) => Some(Value::Bool(*b)),
            (Self::Text | Self::CatalogImage, Json::String(s)) => Some(Value::Text(s.clone())),
            (Self::Array, Json::Array(items)) => items
                .iter()
                .map(Json::as_f64)
                .collect::<Option<Vec<_>>>()
                .map(Value::array),
            (Self::Any, Json::Bool(b)) => Some(Value::Bool(*b)),
            (Self::Any, Json::Number(n)) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Real)),
            (Self::Any, Json::String(s)) => Some(Value::Text(s.clone())),
            _ => None,
        }
    }
}
