//! Blobs and the outline hierarchy that produces them.
//!
//! [`process_outlines`] groups traced outlines into blobs: an outer
//! outline with its legally nested holes. Outline groups that are too
//! deeply or too widely nested are filed as noise without being
//! assembled.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::contour::block::Block;
use crate::contour::buckets::Buckets;
use crate::contour::outline::Outline;
use crate::geometry::Rectangle;
use crate::histogram::Histogram;
use crate::raster::red_clamped;
use crate::types::RgbaImage;

const MAX_CHILDREN_COUNT: i64 = 45;
const MAX_CHILDREN_LAYERS: i64 = 5;
const MAX_CHILDREN_PER_OUTLINE: i64 = 10;
const CHILDREN_PER_CHILD_FACTOR: i64 = 10;

/// Stroke widths are recorded as `2 * level` (even) or `2 * level - 1`
/// (odd), so the histogram spans twice the 8-bit range.
const STROKE_HISTOGRAM_MAX: i32 = 512;

/// One connected shape: an outer outline plus its nested holes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub outlines: Vec<Outline>,
    /// Signed area, holes included.
    pub area: i64,
    pub horz_stroke_width: f64,
    pub vert_stroke_width: f64,
}

impl Blob {
    #[must_use]
    pub fn new(outline: Outline) -> Self {
        let area = outline.area();
        Self {
            outlines: vec![outline],
            area,
            horz_stroke_width: 0.0,
            vert_stroke_width: 0.0,
        }
    }

    /// Union of the top-level outline bounds.
    #[must_use]
    pub fn bounding_box(&self) -> Rectangle {
        self.outlines
            .iter()
            .map(|o| o.bounds)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_default()
    }

    /// Estimate stroke widths from a distance image.
    ///
    /// Rows are scanned for ridge pixels: higher than the left neighbor and
    /// equal to the pixels above and below. A single-pixel ridge records
    /// an odd width, a two-pixel plateau an even one. Columns are scanned
    /// the same way. The axis with enough votes reports its median.
    pub fn set_stroke_width(&mut self, distance: &RgbaImage) {
        let rect = self.bounding_box();
        let at = |dx: i32, dy: i32| -> i32 {
            i32::from(red_clamped(
                distance,
                i64::from(rect.x + dx),
                i64::from(rect.y + dy),
            ))
        };

        let mut h_stats = Histogram::new(0, STROKE_HISTOGRAM_MAX);
        for y in 0..rect.height {
            let mut prev_pixel = 0;
            let mut pixel = at(0, y);
            for x in 1..rect.width {
                let next_pixel = at(x, y);
                if prev_pixel < pixel
                    && (y == 0 || pixel == at(x - 1, y - 1))
                    && (y == rect.height - 1 || pixel == at(x - 1, y + 1))
                {
                    if pixel > next_pixel {
                        h_stats.add(pixel * 2 - 1, 1);
                    } else if pixel == next_pixel && x + 1 < rect.width && pixel > at(x + 1, y) {
                        h_stats.add(pixel * 2, 1);
                    }
                }
                prev_pixel = pixel;
                pixel = next_pixel;
            }
        }

        let mut v_stats = Histogram::new(0, STROKE_HISTOGRAM_MAX);
        for x in 0..rect.width {
            let mut prev_pixel = 0;
            let mut pixel = at(x, 0);
            for y in 1..rect.height {
                let next_pixel = at(x, y);
                if prev_pixel < pixel
                    && (x == 0 || pixel == at(x - 1, y - 1))
                    && (x == rect.width - 1 || pixel == at(x + 1, y - 1))
                {
                    if pixel > next_pixel {
                        v_stats.add(pixel * 2 - 1, 1);
                    } else if pixel == next_pixel && y + 1 < rect.height && pixel > at(x, y + 1) {
                        v_stats.add(pixel * 2, 1);
                    }
                }
                prev_pixel = pixel;
                pixel = next_pixel;
            }
        }

        self.horz_stroke_width = 0.0;
        self.vert_stroke_width = 0.0;
        let enough = f64::from(rect.width + rect.height) / 4.0;
        let (h_total, v_total) = (f64::from(h_stats.total()), f64::from(v_stats.total()));
        if h_total >= enough {
            self.horz_stroke_width = h_stats.ile(0.5);
            if v_total >= enough {
                self.vert_stroke_width = v_stats.ile(0.5);
            }
        } else if v_total >= enough || v_total > h_total {
            self.vert_stroke_width = v_stats.ile(0.5);
        } else if h_stats.total() > 2 {
            self.horz_stroke_width = h_stats.ile(0.5);
        }
    }
}

/// Build the blob hierarchy of `outlines` into `block`.
///
/// Outlines are bucketed by bounds origin. Within each bucket the
/// outermost remaining outline is taken as a parent; its descendants are
/// counted under depth and branching caps, and if within bounds
/// extracted and nested. Over-complex groups become noise.
pub fn process_outlines(block: &mut Block, outlines: Vec<Outline>) {
    let mut buckets = Buckets::new(block.bounds);
    buckets.fill_with(outlines, |o| o.bounds.origin());

    for cell in 0..buckets.cell_count() {
        loop {
            let Some(parent_index) = outermost(buckets.cell(cell)) else {
                break;
            };
            let Some(parent) = buckets.cell_mut(cell).map(|c| c.remove(parent_index)) else {
                break;
            };
            let mut pending = Vec::new();
            let is_good = capture_children(&mut buckets, &parent, &mut pending);
            pending.insert(0, parent);
            construct_blobs(is_good, pending, block);
        }
    }
}

/// Index of the outline that no later outline of the cell encloses.
fn outermost(outlines: &[Outline]) -> Option<usize> {
    if outlines.is_empty() {
        return None;
    }
    let mut parent = 0;
    for index in 1..outlines.len() {
        if outlines[parent].is_inside(&outlines[index]) {
            parent = index;
        }
    }
    Some(parent)
}

fn capture_children(
    buckets: &mut Buckets<Outline>,
    parent: &Outline,
    pending: &mut Vec<Outline>,
) -> bool {
    if count_children(buckets, parent, MAX_CHILDREN_COUNT, 0) > MAX_CHILDREN_COUNT {
        return false;
    }
    extract_children(buckets, parent, pending);
    true
}

/// Weighted descendant count, cut short once it exceeds `max_count`.
///
/// Grandchildren weigh [`CHILDREN_PER_CHILD_FACTOR`] each, more than
/// [`MAX_CHILDREN_PER_OUTLINE`] direct children stops the scan, and
/// recursion deeper than [`MAX_CHILDREN_LAYERS`] returns a value above
/// `max_count`.
fn count_children(buckets: &Buckets<Outline>, parent: &Outline, max_count: i64, depth: i64) -> i64 {
    let depth = depth + 1;
    if depth > MAX_CHILDREN_LAYERS {
        return max_count + depth;
    }
    let mut child_count = 0;
    let mut grandchild_count = 0;
    buckets.for_each_in(&parent.bounds, |outlines| {
        for outline in outlines {
            if std::ptr::eq(outline, parent) || !outline.is_inside(parent) {
                continue;
            }
            child_count += 1;
            if child_count > MAX_CHILDREN_PER_OUTLINE {
                return false;
            }
            let remaining = max_count - child_count - grandchild_count;
            if remaining > 0 {
                grandchild_count +=
                    CHILDREN_PER_CHILD_FACTOR * count_children(buckets, outline, remaining, depth);
            }
            if child_count + grandchild_count > max_count {
                return false;
            }
        }
        true
    });
    child_count + grandchild_count
}

fn extract_children(buckets: &mut Buckets<Outline>, parent: &Outline, pending: &mut Vec<Outline>) {
    for index in buckets.cells_in(&parent.bounds) {
        let Some(cell) = buckets.cell_mut(index) else {
            continue;
        };
        let mut i = 0;
        while i < cell.len() {
            if cell[i].is_inside(parent) {
                pending.push(cell.remove(i));
            } else {
                i += 1;
            }
        }
    }
}

fn construct_blobs(is_good: bool, outlines: Vec<Outline>, block: &mut Block) {
    let mut roots = Vec::new();
    for outline in outlines {
        position_outline(outline, &mut roots);
    }

    let mut is_good = is_good;
    let mut queue: VecDeque<Outline> = roots.into();
    while let Some(outline) = queue.pop_front() {
        if !outline.is_legally_nested() {
            queue.extend(outline.children.iter().cloned());
            is_good = false;
        }
        let blob = Blob::new(outline);
        if is_good {
            block.blobs.push(blob);
        } else {
            block.noises.push(blob);
        }
    }
}

/// Insert `outline` into the containment forest `roots`.
///
/// Roots enclosed by `outline` become its children; if `outline` is
/// enclosed by a root it descends into that root's children.
pub fn position_outline(outline: Outline, roots: &mut Vec<Outline>) {
    for index in 0..roots.len() {
        if roots[index].is_inside(&outline) {
            let mut outline = outline;
            outline.children.push(roots.remove(index));
            let mut other = index;
            while other < roots.len() {
                if roots[other].is_inside(&outline) {
                    outline.children.push(roots.remove(other));
                } else {
                    other += 1;
                }
            }
            roots.insert(index, outline);
            return;
        }
        if outline.is_inside(&roots[index]) {
            position_outline(outline, &mut roots[index].children);
            return;
        }
    }
    roots.push(outline);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contour::outline::tests::{hole, square};
    use crate::geometry::point_at;
    use crate::raster::gray_from_fn;

    fn block() -> Block {
        Block::new(point_at(0, 0).rect(64, 64))
    }

    #[test]
    fn position_nests_inner_under_outer_in_any_order() {
        let mut roots = Vec::new();
        position_outline(hole(3, 3, 4), &mut roots);
        position_outline(square(0, 0, 10), &mut roots);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].children.len(), 1);

        let mut roots = Vec::new();
        position_outline(square(0, 0, 10), &mut roots);
        position_outline(hole(3, 3, 4), &mut roots);
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].children.len(), 1);
    }

    #[test]
    fn glyph_with_hole_is_one_blob() {
        let mut b = block();
        process_outlines(&mut b, vec![hole(3, 3, 4), square(0, 0, 10)]);
        assert_eq!(b.blobs.len(), 1);
        assert!(b.noises.is_empty());
        assert_eq!(b.blobs[0].area, 100 - 16);
        assert_eq!(b.blobs[0].bounding_box(), point_at(0, 0).rect(10, 10));
    }

    #[test]
    fn separate_glyphs_are_separate_blobs() {
        let mut b = block();
        process_outlines(&mut b, vec![square(0, 0, 5), square(20, 0, 5), square(40, 40, 5)]);
        assert_eq!(b.blobs.len(), 3);
    }

    #[test]
    fn same_orientation_nesting_is_noise() {
        let mut b = block();
        process_outlines(&mut b, vec![square(0, 0, 10), square(3, 3, 4)]);
        assert!(b.blobs.is_empty());
        // The outer outline keeps its child and the child is filed again.
        assert_eq!(b.noises.len(), 2);
    }

    #[test]
    fn deeply_nested_group_is_noise() {
        // Grandchildren weigh ten each, so four concentric rings exceed the
        // cap at the outermost level but not one level down.
        let outlines = vec![square(0, 0, 40), hole(2, 2, 36), square(4, 4, 32), hole(6, 6, 28)];
        let mut b = block();
        process_outlines(&mut b, outlines);
        assert_eq!(b.noises.len(), 1);
        assert_eq!(b.noises[0].bounding_box(), point_at(0, 0).rect(40, 40));
        assert_eq!(b.blobs.len(), 1);
        assert_eq!(b.blobs[0].bounding_box(), point_at(2, 2).rect(36, 36));
    }

    #[test]
    fn direct_children_cap_stops_counting_without_rejecting() {
        let mut outlines = vec![square(0, 0, 60)];
        for i in 0..11 {
            outlines.push(hole(2 + i * 5, 2, 3));
        }
        let mut b = block();
        process_outlines(&mut b, outlines);
        assert_eq!(b.blobs.len(), 1);
        assert_eq!(b.blobs[0].outlines[0].children.len(), 11);
    }

    #[test]
    fn stroke_width_of_vertical_bar() {
        // A 5 px wide ridge: distances 1 2 3 2 1 across every row.
        let distance = gray_from_fn(7, 12, |x, _| [0, 1, 2, 3, 2, 1, 0][x as usize]);
        let mut blob = Blob::new(Outline::from_steps(point_at(0, 12), Vec::new()));
        blob.outlines[0].bounds = point_at(0, 0).rect(7, 12);
        blob.set_stroke_width(&distance);
        assert!((blob.horz_stroke_width - 5.0).abs() < 1.0, "{}", blob.horz_stroke_width);
        assert!(blob.vert_stroke_width.abs() < f64::EPSILON);
    }
}
