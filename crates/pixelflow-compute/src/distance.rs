//! Two-pass chamfer distance transform.
//!
//! Foreground is black (red channel `== 0`). Each foreground pixel ends up
//! holding its city-block distance to the nearest background pixel or to
//! the outside of the image, capped at 255.

use crate::raster::gray_from_fn;
use crate::types::RgbaImage;

/// Raw distances plus an 8-bit rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMap {
    /// Row-major raw distances.
    pub distances: Vec<u8>,
    /// Largest distance.
    pub max: u8,
    /// Distances scaled by `255 / max` (all zero when `max == 0`).
    pub image: RgbaImage,
}

/// Compute the distance transform of a binary image.
#[must_use = "returns the distance map"]
pub fn distance_transform(image: &RgbaImage) -> DistanceMap {
    let (w, h) = image.dimensions();
    let (wu, hu) = (w as usize, h as usize);
    let mut d: Vec<u8> = image
        .pixels()
        .map(|p| u8::from(p.0[0] == 0))
        .collect();

    // Reads outside the image count as background.
    let read = |d: &[u8], x: usize, y: Option<usize>| -> u8 {
        match y {
            Some(y) if x < wu && y < hu => d[y * wu + x],
            _ => 0,
        }
    };

    for y in 0..hu {
        for x in 0..wu {
            if d[y * wu + x] > 0 {
                let north = read(&d, x, y.checked_sub(1));
                let west = x.checked_sub(1).map_or(0, |wx| read(&d, wx, Some(y)));
                d[y * wu + x] = north.min(west).saturating_add(1);
            }
        }
    }

    for y in (0..hu).rev() {
        for x in (0..wu).rev() {
            let current = d[y * wu + x];
            if current > 0 {
                let south = read(&d, x, Some(y + 1));
                let east = read(&d, x + 1, Some(y));
                d[y * wu + x] = south.min(east).saturating_add(1).min(current);
            }
        }
    }

    let max = d.iter().copied().max().unwrap_or(0);
    let image = gray_from_fn(w, h, |x, y| {
        if max == 0 {
            return 0;
        }
        let v = u32::from(d[y as usize * wu + x as usize]);
        u8::try_from(255 * v / u32::from(max)).unwrap_or(u8::MAX)
    });

    DistanceMap {
        distances: d,
        max,
        image,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A white frame around a 7×7 black square.
    fn square() -> RgbaImage {
        gray_from_fn(9, 9, |x, y| {
            if (1..8).contains(&x) && (1..8).contains(&y) {
                0
            } else {
                255
            }
        })
    }

    #[test]
    fn background_stays_zero() {
        let map = distance_transform(&square());
        assert_eq!(map.distances[0], 0);
        assert_eq!(map.distances[8], 0);
    }

    #[test]
    fn distances_increase_toward_centre() {
        let map = distance_transform(&square());
        let row: Vec<u8> = (0..9).map(|x| map.distances[4 * 9 + x]).collect();
        assert_eq!(row, vec![0, 1, 2, 3, 4, 3, 2, 1, 0]);
        for x in 1..4 {
            assert!(row[x] < row[x + 1]);
        }
        assert_eq!(map.max, 4);
    }

    #[test]
    fn image_is_normalized_by_max() {
        let map = distance_transform(&square());
        assert_eq!(map.image.get_pixel(4, 4).0[0], 255);
        assert_eq!(map.image.get_pixel(1, 4).0[0], 63);
        assert_eq!(map.image.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn foreground_touching_border_counts_outside_as_background() {
        let img = gray_from_fn(3, 1, |_, _| 0);
        let map = distance_transform(&img);
        assert_eq!(map.distances, vec![1, 1, 1]);
    }

    #[test]
    fn all_background_is_black() {
        let img = gray_from_fn(4, 4, |_, _| 255);
        let map = distance_transform(&img);
        assert_eq!(map.max, 0);
        assert!(map.image.pixels().all(|p| p.0[0] == 0));
    }
}
