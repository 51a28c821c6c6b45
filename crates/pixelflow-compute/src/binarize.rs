//! Global threshold binarization.

use crate::raster::gray_from_fn;
use crate::types::RgbaImage;

/// Map each pixel to 255 when its red channel is strictly above `level`,
/// otherwise to 0.
#[must_use = "returns the binary image"]
pub fn binarize(image: &RgbaImage, level: u8) -> RgbaImage {
    gray_from_fn(image.width(), image.height(), |x, y| {
        if image.get_pixel(x, y).0[0] > level {
            0xFF
        } else {
            0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_strict() {
        let img = gray_from_fn(3, 1, |x, _| [127, 128, 129][x as usize]);
        let out = binarize(&img, 128);
        assert_eq!(out.get_pixel(0, 0).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(1, 0).0, [0, 0, 0, 255]);
        assert_eq!(out.get_pixel(2, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn level_255_blacks_out_everything() {
        let img = gray_from_fn(2, 2, |_, _| 255);
        assert!(binarize(&img, 255).pixels().all(|p| p.0[0] == 0));
    }
}
