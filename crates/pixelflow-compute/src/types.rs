//! Shared types for the pixelflow compute library.

use image::{ImageBuffer, Luma};

/// Re-export `RgbaImage` so downstream crates can pass rasters around
/// without depending on `image` directly.
pub use image::RgbaImage;

/// Single-channel `f32` image for data that is not a picture, such as
/// the gradient direction field consumed by the Canny post-process.
pub type FloatImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Errors raised by the compute library.
///
/// Almost every operation here is total: absent or degenerate input
/// yields an empty result rather than an error. The exceptions are
/// constructors that validate buffer shapes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputeError {
    /// A buffer's length does not match its declared dimensions.
    #[error("buffer holds {actual} values but its dimensions require {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
