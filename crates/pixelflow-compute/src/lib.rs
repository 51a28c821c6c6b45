//! pixelflow-compute: raster filters and contour analysis (sans-IO).
//!
//! Every function here is pure: it takes in-memory [`RgbaImage`] or
//! [`FloatImage`] buffers and returns new ones. Gray images store the
//! level in all three color channels with opaque alpha, and filters read
//! the red channel as the gray level.
//!
//! The building blocks are:
//!
//! - point/rectangle arithmetic ([`geometry`])
//! - clamped pixel access ([`raster`])
//! - filters: [`grayscale`], [`blur`], [`edge`], [`canny`], [`hough`],
//!   [`binarize`], [`distance`]
//! - statistics: [`histogram`]
//! - outline tracing and blob classification ([`contour`])

pub mod binarize;
pub mod blur;
pub mod canny;
pub mod contour;
pub mod distance;
pub mod edge;
pub mod geometry;
pub mod grayscale;
pub mod histogram;
pub mod hough;
pub mod raster;
pub mod types;

pub use contour::{Blob, Block, BlockOptions, Outline, OutlineSet, build_block, trace_image};
pub use distance::{DistanceMap, distance_transform};
pub use edge::{SobelOutput, sobel};
pub use geometry::{Line, Offset, Point, Rectangle, point_at};
pub use histogram::{Histogram, argmax, build_histogram, otsu_levels};
pub use hough::{HoughLines, hough_to_lines, hough_transform};
pub use raster::{Raster, float_image};
pub use types::{ComputeError, FloatImage, RgbaImage};
