//! Canny post-processing of a Sobel gradient.
//!
//! Three stages run over the magnitude image:
//!
//! 1. Non-maximum suppression along the gradient direction quantized to
//!    one of four sectors (0°, 45°, 90°, 135°).
//! 2. Double threshold: `high = 0.09 * max`, `low = 0.05 * high`. Pixels
//!    become strong (255), weak (25) or zero.
//! 3. Hysteresis in raster order, in place. A weak pixel survives when
//!    any pixel of [`HYSTERESIS_OFFSETS`] is strong.

use crate::edge::angle_degrees;
use crate::raster::{Raster, gray_from_fn, red_clamped};
use crate::types::{FloatImage, RgbaImage};

pub const STRONG: u8 = 255;
pub const WEAK: u8 = 25;

const HIGH_RATIO: f64 = 0.09;
const LOW_RATIO: f64 = 0.05;

/// Neighbors consulted by hysteresis.
///
/// The upper row is listed twice and the row below is never consulted.
/// Kept as is so edge maps stay comparable with existing projects.
pub const HYSTERESIS_OFFSETS: [(i64, i64); 6] =
    [(-1, -1), (0, -1), (1, -1), (-1, -1), (0, -1), (1, -1)];

/// Offsets of the two neighbors compared during non-maximum suppression.
fn sector_neighbors(degrees: f32) -> [(i64, i64); 2] {
    if (22.5..67.5).contains(&degrees) {
        [(1, -1), (-1, 1)]
    } else if (67.5..112.5).contains(&degrees) {
        [(0, -1), (0, 1)]
    } else if (112.5..157.5).contains(&degrees) {
        [(-1, -1), (1, 1)]
    } else {
        [(-1, 0), (1, 0)]
    }
}

/// Suppress non-maxima, threshold and link edges.
///
/// `angles` must come from [`crate::edge::sobel`] on the same image;
/// missing angle samples are read with edge clamping.
#[must_use = "returns the edge map"]
pub fn canny_post_process(magnitude: &RgbaImage, angles: &FloatImage) -> RgbaImage {
    let (w, h) = magnitude.dimensions();
    let index = |x: u32, y: u32| y as usize * w as usize + x as usize;

    let mut suppressed = vec![0u8; w as usize * h as usize];
    let mut max = 0u8;
    for y in 0..h {
        for x in 0..w {
            let m = magnitude.get_pixel(x, y).0[0];
            let degrees = angle_degrees(angles.value_clamped(i64::from(x), i64::from(y)));
            let is_max = sector_neighbors(degrees).iter().all(|&(dx, dy)| {
                m >= red_clamped(magnitude, i64::from(x) + dx, i64::from(y) + dy)
            });
            let v = if is_max { m } else { 0 };
            max = max.max(v);
            suppressed[index(x, y)] = v;
        }
    }

    let high = HIGH_RATIO * f64::from(max);
    let low = LOW_RATIO * high;
    for v in &mut suppressed {
        let level = f64::from(*v);
        *v = if level >= high && *v > 0 {
            STRONG
        } else if level >= low && *v > 0 {
            WEAK
        } else {
            0
        };
    }

    for y in 0..h {
        for x in 0..w {
            if suppressed[index(x, y)] != WEAK {
                continue;
            }
            let strong = HYSTERESIS_OFFSETS.iter().any(|&(dx, dy)| {
                let nx = i64::from(x) + dx;
                let ny = i64::from(y) + dy;
                match (u32::try_from(nx), u32::try_from(ny)) {
                    (Ok(nx), Ok(ny)) if nx < w && ny < h => suppressed[index(nx, ny)] == STRONG,
                    _ => false,
                }
            });
            suppressed[index(x, y)] = if strong { STRONG } else { 0 };
        }
    }

    gray_from_fn(w, h, |x, y| suppressed[index(x, y)])
}
