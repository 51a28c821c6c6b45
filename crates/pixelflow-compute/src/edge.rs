//! Sobel gradient estimation.
//!
//! Both 3×3 kernels run through [`imageproc::filter::filter_clamped`]
//! over the red channel.

use image::Luma;
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel::{SOBEL_HORIZONTAL_3X3, SOBEL_VERTICAL_3X3};

use crate::raster::{gray_from_fn, red_channel, to_level};
use crate::types::{FloatImage, RgbaImage};

/// Gradient magnitude and direction produced by [`sobel`].
#[derive(Debug, Clone, PartialEq)]
pub struct SobelOutput {
    /// Gradient magnitude, normalized so the strongest edge is 255.
    pub magnitude: RgbaImage,
    /// Gradient direction in `[0°, 180°)`, scaled to `0..255`.
    ///
    /// Decode with [`angle_degrees`].
    pub angles: FloatImage,
}

/// Convert a stored angle back to degrees.
#[must_use]
pub fn angle_degrees(stored: f32) -> f32 {
    stored * 180.0 / 255.0
}

fn encode_angle(gx: f64, gy: f64) -> f32 {
    let mut degrees = gx.atan2(gy).to_degrees();
    if degrees < 0.0 {
        degrees += 180.0;
    }
    if degrees >= 180.0 {
        degrees -= 180.0;
    }
    #[allow(clippy::cast_possible_truncation)]
    let stored = (degrees * 255.0 / 180.0) as f32;
    stored
}

/// Convolve the red channel with the 3×3 Sobel kernels.
///
/// Direction is `atan2(Gx, Gy)` folded into `[0°, 180°)`. A flat image
/// yields an all-zero magnitude.
#[must_use = "returns the gradient images"]
pub fn sobel(image: &RgbaImage) -> SobelOutput {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return SobelOutput {
            magnitude: RgbaImage::new(w, h),
            angles: FloatImage::new(w, h),
        };
    }

    let red = red_channel(image);
    let gx: Image<Luma<i16>> = filter_clamped::<_, i32, i16>(&red, SOBEL_HORIZONTAL_3X3);
    let gy: Image<Luma<i16>> = filter_clamped::<_, i32, i16>(&red, SOBEL_VERTICAL_3X3);
    let gradient = |x: u32, y: u32| {
        (
            f64::from(gx.get_pixel(x, y).0[0]),
            f64::from(gy.get_pixel(x, y).0[0]),
        )
    };

    let magnitudes: Vec<f64> = gx
        .pixels()
        .zip(gy.pixels())
        .map(|(h, v)| f64::from(h.0[0]).hypot(f64::from(v.0[0])))
        .collect();
    let max = magnitudes.iter().copied().fold(0.0, f64::max);

    let magnitude = gray_from_fn(w, h, |x, y| {
        if max > 0.0 {
            to_level(255.0 * magnitudes[y as usize * w as usize + x as usize] / max)
        } else {
            0
        }
    });
    let angles = FloatImage::from_fn(w, h, |x, y| {
        let (gx, gy) = gradient(x, y);
        Luma([encode_angle(gx, gy)])
    });

    SobelOutput { magnitude, angles }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_image_has_no_gradient() {
        let out = sobel(&gray_from_fn(5, 5, |_, _| 90));
        assert!(out.magnitude.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn vertical_edge_peaks_on_boundary() {
        let img = gray_from_fn(8, 8, |x, _| if x < 4 { 0 } else { 255 });
        let out = sobel(&img);
        assert_eq!(out.magnitude.get_pixel(3, 4).0[0], 255);
        assert_eq!(out.magnitude.get_pixel(4, 4).0[0], 255);
        assert_eq!(out.magnitude.get_pixel(0, 4).0[0], 0);
        assert_eq!(out.magnitude.get_pixel(7, 4).0[0], 0);
    }

    #[test]
    fn empty_image_yields_empty_outputs() {
        let out = sobel(&RgbaImage::new(0, 3));
        assert_eq!(out.magnitude.dimensions(), (0, 3));
        assert_eq!(out.angles.dimensions(), (0, 3));
    }

    #[test]
    fn border_pixels_read_clamped_neighbors() {
        // A ramp has the same gradient everywhere except where clamping
        // repeats the edge column.
        let img = gray_from_fn(5, 3, |x, _| u8::try_from(x * 10).unwrap_or(0));
        let out = sobel(&img);
        assert_eq!(out.magnitude.get_pixel(2, 1).0[0], 255);
        assert_eq!(out.magnitude.get_pixel(0, 1).0[0], 128);
        assert_eq!(out.magnitude.get_pixel(4, 1).0[0], 128);
    }

    #[test]
    fn horizontal_gradient_direction_is_ninety_degrees() {
        let img = gray_from_fn(8, 8, |x, _| if x < 4 { 0 } else { 255 });
        let out = sobel(&img);
        let degrees = angle_degrees(out.angles.get_pixel(3, 4).0[0]);
        assert!((degrees - 90.0).abs() < 0.5, "got {degrees}");
    }

    #[test]
    fn vertical_gradient_direction_is_zero_degrees() {
        let img = gray_from_fn(8, 8, |_, y| if y < 4 { 0 } else { 255 });
        let out = sobel(&img);
        let degrees = angle_degrees(out.angles.get_pixel(4, 3).0[0]);
        assert!(degrees.abs() < 0.5, "got {degrees}");
    }
}
