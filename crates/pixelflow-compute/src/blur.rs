//! Gaussian blur with an explicit square kernel.
//!
//! The kernel spans `(2 * size + 1)` pixels per side and is sampled from
//! the 2D Gaussian, then normalized so its weights sum to one. The
//! convolution runs through [`imageproc::filter::filter_clamped`], which
//! clamps reads to the nearest edge pixel.

use image::Rgba;
use imageproc::definitions::Image;
use imageproc::filter::filter_clamped;
use imageproc::kernel::Kernel;

use crate::raster::to_level;
use crate::types::RgbaImage;

/// Build a normalized `(2 * size + 1)²` Gaussian kernel in row-major order.
#[must_use]
pub fn gaussian_kernel(size: u32, sigma: f64) -> Vec<f64> {
    let radius = i64::from(size);
    let two_sigma_sq = 2.0 * sigma * sigma;
    let mut kernel = Vec::with_capacity((2 * size as usize + 1).pow(2));
    for j in -radius..=radius {
        for i in -radius..=radius {
            #[allow(clippy::cast_precision_loss)]
            let d2 = (i * i + j * j) as f64;
            kernel.push((-d2 / two_sigma_sq).exp());
        }
    }
    let sum: f64 = kernel.iter().sum();
    if sum > 0.0 {
        for w in &mut kernel {
            *w /= sum;
        }
    }
    kernel
}

/// Blur the R, G and B channels independently. Alpha is copied through.
///
/// Non-positive `sigma` returns the image unchanged.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(image: &RgbaImage, size: u32, sigma: f64) -> RgbaImage {
    if sigma <= 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    #[allow(clippy::cast_possible_truncation)]
    let kernel: Vec<f32> = gaussian_kernel(size, sigma)
        .into_iter()
        .map(|w| w as f32)
        .collect();
    let side = 2 * size + 1;
    let blurred: Image<Rgba<f32>> =
        filter_clamped::<_, f32, f32>(image, Kernel::new(&kernel, side, side));

    RgbaImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = blurred.get_pixel(x, y).0;
        let alpha = image.get_pixel(x, y).0[3];
        Rgba([
            to_level(f64::from(r)),
            to_level(f64::from(g)),
            to_level(f64::from(b)),
            alpha,
        ])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::gray_from_fn;

    fn sharp_edge_image() -> RgbaImage {
        gray_from_fn(10, 10, |x, _| if x < 5 { 0 } else { 255 })
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let kernel = gaussian_kernel(2, 1.4);
        assert_eq!(kernel.len(), 25);
        let sum: f64 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((kernel[0] - kernel[24]).abs() < 1e-12);
        assert!(kernel[12] > kernel[11]);
    }

    #[test]
    fn uniform_image_is_unchanged() {
        let img = gray_from_fn(6, 6, |_, _| 77);
        assert_eq!(gaussian_blur(&img, 2, 1.4), img);
    }

    #[test]
    fn zero_sigma_returns_identical_image() {
        let img = sharp_edge_image();
        assert_eq!(gaussian_blur(&img, 2, 0.0), img);
    }

    #[test]
    fn kernel_wider_than_image_clamps_to_edges() {
        let img = gray_from_fn(2, 1, |x, _| if x == 0 { 0 } else { 200 });
        let blurred = gaussian_blur(&img, 3, 2.0);
        let left = blurred.get_pixel(0, 0).0[0];
        let right = blurred.get_pixel(1, 0).0[0];
        assert!(left > 0 && left < 100, "got {left}");
        assert!(right > 100 && right < 200, "got {right}");
        assert_eq!(u16::from(left) + u16::from(right), 200);
    }

    #[test]
    fn blur_smooths_sharp_edge() {
        let blurred = gaussian_blur(&sharp_edge_image(), 2, 1.4);
        let left = blurred.get_pixel(4, 5).0[0];
        let right = blurred.get_pixel(5, 5).0[0];
        assert!(left > 0, "left of edge should brighten, got {left}");
        assert!(right < 255, "right of edge should darken, got {right}");
        assert_eq!(blurred.get_pixel(4, 5).0[3], 255);
    }
}
