//! Luma conversion.
//!
//! The output keeps the RGBA layout so every downstream filter can read
//! the gray level from the red channel.

use crate::raster::gray_from_fn;
use crate::types::RgbaImage;

/// sRGB luma weights in ten-thousandths: `Y = 0.2126 R + 0.7152 G + 0.0722 B`.
const WEIGHTS: [u32; 3] = [2126, 7152, 722];

/// Convert to gray using the sRGB luma weights.
///
/// The level is truncated toward zero, so `(0, 1, 0)` maps to 0. Integer
/// weights keep gray inputs exact. Alpha is forced to opaque.
#[must_use = "returns the grayscale image"]
pub fn grayscale(image: &RgbaImage) -> RgbaImage {
    gray_from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        let weighted: u32 = WEIGHTS
            .iter()
            .zip([r, g, b])
            .map(|(w, c)| w * u32::from(c))
            .sum();
        u8::try_from(weighted / 10_000).unwrap_or(u8::MAX)
    })
}

#[cfg(test)]
mod tests {
    use image::Rgba;

    use super::*;

    #[test]
    fn white_maps_to_full_luma() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([255, 255, 255, 255]));
        assert_eq!(grayscale(&img).get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn black_maps_to_zero() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0]));
        assert_eq!(grayscale(&img).get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn green_dominates_luma() {
        let img = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => Rgba([255, 0, 0, 255]),
            1 => Rgba([0, 255, 0, 255]),
            _ => Rgba([0, 0, 255, 255]),
        });
        let gray = grayscale(&img);
        assert_eq!(gray.get_pixel(0, 0).0[0], 54);
        assert_eq!(gray.get_pixel(1, 0).0[0], 182);
        assert_eq!(gray.get_pixel(2, 0).0[0], 18);
    }

    #[test]
    fn fractional_levels_truncate() {
        let img = RgbaImage::from_fn(3, 1, |x, _| match x {
            0 => Rgba([0, 1, 0, 255]),
            1 => Rgba([1, 1, 0, 255]),
            _ => Rgba([10, 20, 30, 255]),
        });
        let gray = grayscale(&img);
        assert_eq!(gray.get_pixel(0, 0).0[0], 0);
        assert_eq!(gray.get_pixel(1, 0).0[0], 0);
        // 2.126 + 14.304 + 2.166 = 18.596
        assert_eq!(gray.get_pixel(2, 0).0[0], 18);
    }

    #[test]
    fn gray_inputs_keep_their_level() {
        let img = gray_from_fn(256, 1, |x, _| u8::try_from(x).unwrap_or(u8::MAX));
        let gray = grayscale(&img);
        assert!(gray.enumerate_pixels().all(|(x, _, p)| u32::from(p.0[0]) == x));
    }

    #[test]
    fn dimensions_preserved() {
        let img = RgbaImage::new(17, 31);
        let gray = grayscale(&img);
        assert_eq!(gray.dimensions(), (17, 31));
    }
}
