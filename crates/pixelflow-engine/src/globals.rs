//! Collaborators supplied by the host for each update.
//!
//! The engine reaches outside its node graph only through these seams:
//! the image catalog and viewer sink ([`Globals`]), progress reporting
//! ([`ProgressMonitor`]) and cooperative cancellation ([`CancelToken`]).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use pixelflow_compute::RgbaImage;
use pixelflow_compute::geometry::{Line, Rectangle};
use serde::Serialize;

/// A named image available to `image-input` nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogImage {
    pub name: String,
    pub data: Arc<RgbaImage>,
}

impl CatalogImage {
    #[must_use]
    pub fn new(name: impl Into<String>, data: RgbaImage) -> Self {
        Self {
            name: name.into(),
            data: Arc::new(data),
        }
    }
}

/// A named overlay of rectangles and line segments.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layer {
    pub name: String,
    pub marks: Vec<Rectangle>,
    pub lines: Vec<Line>,
}

/// What the viewer node publishes: an image plus overlays.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerModel {
    pub image: Arc<RgbaImage>,
    pub layers: Vec<Layer>,
}

/// Host context consulted by the side-effecting processors.
pub trait Globals {
    /// The current image catalog.
    fn images(&self) -> &[CatalogImage];

    /// Publish a view model to the host's viewer.
    fn set_viewer(&mut self, model: ViewerModel);
}

/// Receives evaluation progress.
///
/// `progress` is called before and after each node with the completed
/// fraction and the node's label.
pub trait ProgressMonitor {
    fn start(&mut self);
    fn progress(&mut self, amount: f64, message: &str);
    fn end(&mut self);
}

/// A monitor that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressMonitor for NoProgress {
    fn start(&mut self) {}
    fn progress(&mut self, _amount: f64, _message: &str) {}
    fn end(&mut self) {}
}

/// Shared flag checked between node evaluations.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear the flag so the token can guard the next update.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// In-memory globals: a catalog vector and the last published viewer.
#[derive(Debug, Clone, Default)]
pub struct MemoryGlobals {
    pub catalog: Vec<CatalogImage>,
    pub viewer: Option<ViewerModel>,
}

impl MemoryGlobals {
    #[must_use]
    pub const fn new(catalog: Vec<CatalogImage>) -> Self {
        Self {
            catalog,
            viewer: None,
        }
    }
}

impl Globals for MemoryGlobals {
    fn images(&self) -> &[CatalogImage] {
        &self.catalog
    }

    fn set_viewer(&mut self, model: ViewerModel) {
        self.viewer = Some(model);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
        other.reset();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn memory_globals_keeps_last_viewer() {
        let mut globals = MemoryGlobals::new(vec![CatalogImage::new("a", RgbaImage::new(1, 1))]);
        assert_eq!(globals.images().len(), 1);
        globals.set_viewer(ViewerModel {
            image: Arc::new(RgbaImage::new(2, 2)),
            layers: Vec::new(),
        });
        assert_eq!(globals.viewer.as_ref().map(|v| v.image.width()), Some(2));
    }
}
