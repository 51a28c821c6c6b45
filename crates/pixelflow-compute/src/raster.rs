//! Pixel buffer access with clamped-edge sampling.
//!
//! Filters read 8-bit RGBA rasters through the red channel (every gray
//! image produced here stores the same value in R, G and B) and write
//! either a new gray RGBA raster or a [`FloatImage`]. Reads outside the
//! buffer are clamped to the nearest edge pixel.

use image::{GrayImage, Luma, Rgba};

use crate::types::{ComputeError, FloatImage, RgbaImage};

/// Read access to a two-dimensional scalar field.
pub trait Raster {
    /// `(width, height)` in pixels.
    fn extent(&self) -> (u32, u32);

    /// Value at an in-bounds coordinate.
    fn value(&self, x: u32, y: u32) -> f32;

    /// Value at any coordinate, clamped to the nearest edge pixel.
    ///
    /// Returns `0.0` for an empty buffer.
    fn value_clamped(&self, x: i64, y: i64) -> f32 {
        let (width, height) = self.extent();
        if width == 0 || height == 0 {
            return 0.0;
        }
        self.value(clamp_coord(x, width), clamp_coord(y, height))
    }
}

/// Clamp a signed coordinate into `0..len`. `len` must be non-zero.
#[must_use]
pub fn clamp_coord(v: i64, len: u32) -> u32 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = v.clamp(0, i64::from(len) - 1) as u32;
    clamped
}

impl Raster for RgbaImage {
    fn extent(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn value(&self, x: u32, y: u32) -> f32 {
        f32::from(self.get_pixel(x, y).0[0])
    }
}

/// Red channel at a clamped coordinate.
#[must_use]
pub fn red_clamped(image: &RgbaImage, x: i64, y: i64) -> u8 {
    if image.width() == 0 || image.height() == 0 {
        return 0;
    }
    image
        .get_pixel(clamp_coord(x, image.width()), clamp_coord(y, image.height()))
        .0[0]
}

/// An opaque gray RGBA pixel.
#[must_use]
pub const fn gray(value: u8) -> Rgba<u8> {
    Rgba([value, value, value, 0xFF])
}

/// Build a gray RGBA raster from a per-pixel level function.
pub fn gray_from_fn(width: u32, height: u32, mut level: impl FnMut(u32, u32) -> u8) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| gray(level(x, y)))
}

/// Round and saturate a float level into `0..=255`.
#[must_use]
pub fn to_level(v: f64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let level = v.round().clamp(0.0, 255.0) as u8;
    level
}

/// Wrap row-major `f32` data as a [`FloatImage`].
///
/// # Errors
///
/// Returns [`ComputeError::DimensionMismatch`] if `data.len()` is not
/// `width * height`.
pub fn float_image(width: u32, height: u32, data: Vec<f32>) -> Result<FloatImage, ComputeError> {
    let expected = width as usize * height as usize;
    let actual = data.len();
    FloatImage::from_raw(width, height, data)
        .filter(|_| actual == expected)
        .ok_or(ComputeError::DimensionMismatch { expected, actual })
}

/// The red channel as a single-channel image.
#[must_use]
pub fn red_channel(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y).0[0]])
    })
}

impl Raster for FloatImage {
    fn extent(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn value(&self, x: u32, y: u32) -> f32 {
        self.get_pixel_checked(x, y).map_or(0.0, |p| p.0[0])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn clamped_reads_use_edge_pixels() {
        let img = gray_from_fn(3, 2, |x, y| u8::try_from(x + 10 * y).unwrap());
        assert_eq!(red_clamped(&img, -5, -5), 0);
        assert_eq!(red_clamped(&img, 10, 0), 2);
        assert_eq!(red_clamped(&img, 1, 10), 11);
        assert_eq!(img.value_clamped(-1, 1), 10.0);
    }

    #[test]
    fn empty_image_reads_zero() {
        let img = RgbaImage::new(0, 0);
        assert_eq!(red_clamped(&img, 0, 0), 0);
        assert_eq!(img.value_clamped(3, 3), 0.0);
    }

    #[test]
    fn float_image_rejects_wrong_length() {
        let result = float_image(2, 2, vec![0.0; 3]);
        assert!(matches!(
            result,
            Err(ComputeError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert!(float_image(2, 2, vec![0.0; 5]).is_err());
    }

    #[test]
    fn float_image_reads_clamped() {
        let grid = float_image(2, 2, vec![0.0, 1.0, 2.0, 4.5]).unwrap();
        assert_eq!(grid.value(1, 1), 4.5);
        assert_eq!(grid.value(2, 0), 0.0);
        assert_eq!(grid.value_clamped(9, 9), 4.5);
        assert_eq!(grid.value_clamped(-1, 1), 2.0);
    }

    #[test]
    fn red_channel_drops_green_and_blue() {
        let img = RgbaImage::from_pixel(2, 1, Rgba([7, 200, 100, 255]));
        assert_eq!(red_channel(&img).get_pixel(1, 0).0, [7]);
    }

    #[test]
    fn to_level_rounds_and_saturates() {
        assert_eq!(to_level(254.6), 255);
        assert_eq!(to_level(-3.0), 0);
        assert_eq!(to_level(400.0), 255);
    }
}
