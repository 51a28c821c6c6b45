//! A rectangular analysis region and its blob inventory.

use serde::{Deserialize, Serialize};

use crate::contour::blob::Blob;
use crate::contour::options::BlockOptions;
use crate::geometry::Rectangle;
use crate::histogram::Histogram;
use crate::types::RgbaImage;

/// Blobs found in one region, classified by size.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Block {
    pub bounds: Rectangle,
    pub blobs: Vec<Blob>,
    pub noises: Vec<Blob>,
    pub smalls: Vec<Blob>,
    pub larges: Vec<Blob>,
    pub line_size: f64,
    pub line_spacing: f64,
    pub max_blob_size: f64,
}

impl Block {
    #[must_use]
    pub fn new(bounds: Rectangle) -> Self {
        Self {
            bounds,
            ..Self::default()
        }
    }

    /// Every blob in every class, in class order.
    pub fn all_blobs_mut(&mut self) -> impl Iterator<Item = &mut Blob> {
        self.blobs
            .iter_mut()
            .chain(self.noises.iter_mut())
            .chain(self.smalls.iter_mut())
            .chain(self.larges.iter_mut())
    }

    /// Estimate stroke widths of every blob from a distance image.
    pub fn set_stroke_widths(&mut self, distance: &RgbaImage) {
        for blob in self.all_blobs_mut() {
            blob.set_stroke_width(distance);
        }
    }

    /// Reclassify `blobs` by size and derive line metrics.
    ///
    /// 1. Short blobs become noise; blobs filling most of their box are
    ///    set aside as small candidates.
    /// 2. The x-height is guessed from a percentile of the remaining
    ///    heights, giving bounds `max_y`, `min_y` and `max_x`.
    /// 3. Small candidates tall enough rejoin `blobs` (or become large);
    ///    `blobs` outside the bounds move to `smalls` or `larges`.
    /// 4. Line size, spacing and maximum blob size follow from a second
    ///    percentile pass over the retained heights.
    pub fn filter_blobs(&mut self, options: &BlockOptions) {
        let mut noises = std::mem::take(&mut self.noises);
        let mut smalls = Vec::new();
        let mut larges = Vec::new();
        let mut candidates = Vec::new();
        let mut max_height = 0;

        for blob in std::mem::take(&mut self.blobs) {
            let bbox = blob.bounding_box();
            #[allow(clippy::cast_precision_loss)]
            let (area, box_area) = (blob.area as f64, bbox.area() as f64);
            if bbox.height < options.max_noise_size {
                noises.push(blob);
            } else if area >= box_area * options.noise_area_ratio {
                smalls.push(blob);
            } else {
                max_height = max_height.max(bbox.height);
                candidates.push(blob);
            }
        }
        let mut blobs = candidates;

        let mut size_stats = Histogram::new(0, max_height + 1);
        for blob in &blobs {
            size_stats.add(blob.bounding_box().height, 1);
        }
        let mut initial_x = size_stats.ile(options.initial_x_ile);
        let line_ratio = options.line_height_ratio();
        let max_y = (initial_x * line_ratio).ceil();
        let min_y = (initial_x / 2.0).floor();
        let max_x = (initial_x * options.width_limit).ceil();

        let mut kept_small = Vec::new();
        for blob in smalls {
            let height = f64::from(blob.bounding_box().height);
            if height > max_y {
                larges.push(blob);
            } else if height >= min_y {
                blobs.push(blob);
            } else {
                kept_small.push(blob);
            }
        }
        smalls = kept_small;

        // Promoted smalls can be taller than anything counted so far.
        #[allow(clippy::cast_possible_truncation)]
        let histogram_max = max_height.max(max_y as i32);
        let mut size_stats = Histogram::new(0, histogram_max + 1);
        let mut retained = Vec::new();
        for blob in blobs {
            let bbox = blob.bounding_box();
            let (height, width) = (f64::from(bbox.height), f64::from(bbox.width));
            if height < min_y {
                smalls.push(blob);
            } else if height > max_y || width > max_x {
                larges.push(blob);
            } else {
                size_stats.add(bbox.height, 1);
                retained.push(blob);
            }
        }

        self.blobs = retained;
        self.noises = noises;
        self.smalls = smalls;
        self.larges = larges;

        let cap_height = size_stats.ile(options.initial_asc_ile) * options.x_height_cap_ratio();
        if cap_height > initial_x {
            initial_x = cap_height;
        }
        self.line_size = if initial_x > 0.0 { initial_x } else { 1.0 };
        self.line_spacing = self.line_size * line_ratio;
        self.line_size *= options.min_linesize;
        self.max_blob_size = self.line_size * options.excess_blobsize;
    }
}
