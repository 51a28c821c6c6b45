//! Contour tracing and blob classification.
//!
//! The flow is: [`trace_outlines`] turns a binary raster into closed
//! [`Outline`]s, [`process_outlines`] nests them into [`Blob`]s inside a
//! [`Block`], and [`Block::filter_blobs`] sorts the blobs by size.

pub mod blob;
pub mod block;
pub mod buckets;
pub mod marching;
pub mod options;
pub mod outline;

use serde::{Deserialize, Serialize};

pub use blob::{Blob, position_outline, process_outlines};
pub use block::Block;
pub use buckets::{BUCKET_SIZE, Buckets};
pub use marching::{MIN_OUTLINE_STEPS, trace_outlines};
pub use options::BlockOptions;
pub use outline::{Direction, Outline, Winding};

use crate::geometry::{Rectangle, point_at};
use crate::types::RgbaImage;

/// Outlines traced from one region, with the region they came from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutlineSet {
    pub bounds: Rectangle,
    pub outlines: Vec<Outline>,
}

/// Trace the whole of `image`.
#[must_use = "returns the traced outline set"]
pub fn trace_image(image: &RgbaImage) -> OutlineSet {
    let bounds = point_at(0, 0).rect(
        i32::try_from(image.width()).unwrap_or(i32::MAX),
        i32::try_from(image.height()).unwrap_or(i32::MAX),
    );
    OutlineSet {
        bounds,
        outlines: trace_outlines(image, bounds),
    }
}

/// Assemble a [`Block`] from a traced outline set.
///
/// With `options`, blobs are size-filtered. With `distance`, every blob
/// gets stroke widths measured on that distance image.
#[must_use = "returns the assembled block"]
pub fn build_block(
    set: &OutlineSet,
    options: Option<&BlockOptions>,
    distance: Option<&RgbaImage>,
) -> Block {
    let mut block = Block::new(set.bounds);
    process_outlines(&mut block, set.outlines.clone());
    if let Some(options) = options {
        block.filter_blobs(options);
    }
    if let Some(distance) = distance {
        block.set_stroke_widths(distance);
    }
    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::gray_from_fn;

    #[test]
    fn ring_image_becomes_one_blob_with_hole() {
        let img = gray_from_fn(12, 12, |x, y| {
            let outer = (1..11).contains(&x) && (1..11).contains(&y);
            let inner = (4..8).contains(&x) && (4..8).contains(&y);
            if outer && !inner { 0 } else { 255 }
        });
        let set = trace_image(&img);
        assert_eq!(set.bounds, point_at(0, 0).rect(12, 12));
        let block = build_block(&set, None, None);
        assert_eq!(block.blobs.len(), 1);
        assert_eq!(block.blobs[0].outlines[0].children.len(), 1);
        assert_eq!(block.blobs[0].area.abs(), 100 - 16);
    }

    #[test]
    fn filtering_moves_short_blobs_to_noise() {
        let img = gray_from_fn(20, 20, |x, y| {
            if (2..5).contains(&x) && (2..5).contains(&y) { 0 } else { 255 }
        });
        let block = build_block(&trace_image(&img), Some(&BlockOptions::default()), None);
        assert!(block.blobs.is_empty());
        assert_eq!(block.noises.len(), 1);
    }
}
