//! Tunables for blob size classification.

use serde::{Deserialize, Serialize};

/// Size and ratio thresholds used by [`Block::filter_blobs`](super::Block::filter_blobs).
///
/// The defaults follow the text-ordering constants of classic OCR
/// engines: heights are expressed relative to an estimated x-height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockOptions {
    /// Blobs shorter than this (in pixels) are noise.
    pub max_noise_size: i32,
    /// Blobs filling at least this fraction of their bounding box are
    /// set aside as small candidates.
    pub noise_area_ratio: f64,
    /// Height percentile used for the initial x-height guess.
    pub initial_x_ile: f64,
    /// Height percentile used for the ascender-based refinement.
    pub initial_asc_ile: f64,
    /// Maximum blob width as a multiple of the x-height guess.
    pub width_limit: f64,
    /// Multiplier from x-height to line size.
    pub min_linesize: f64,
    /// Multiplier from line size to the largest expected blob.
    pub excess_blobsize: f64,
    pub descender_fraction: f64,
    pub x_height_fraction: f64,
    pub ascender_fraction: f64,
}

impl Default for BlockOptions {
    fn default() -> Self {
        Self {
            max_noise_size: 7,
            noise_area_ratio: 0.7,
            initial_x_ile: 0.75,
            initial_asc_ile: 0.90,
            width_limit: 8.0,
            min_linesize: 1.25,
            excess_blobsize: 1.3,
            descender_fraction: 0.25,
            x_height_fraction: 0.5,
            ascender_fraction: 0.25,
        }
    }
}

impl BlockOptions {
    /// Ratio of x-height to cap height.
    #[must_use]
    pub fn x_height_cap_ratio(&self) -> f64 {
        self.x_height_fraction / (self.x_height_fraction + self.ascender_fraction)
    }

    /// Full line height (descender, x-height and two ascenders) divided
    /// by the x-height.
    #[must_use]
    pub fn line_height_ratio(&self) -> f64 {
        (2.0f64.mul_add(self.ascender_fraction, self.descender_fraction) + self.x_height_fraction)
            / self.x_height_fraction
    }
}
