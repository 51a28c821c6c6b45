//! Hough line transform and line extraction.
//!
//! The accumulator is stored as a gray image: column = θ in whole degrees
//! (`0..360`), row = ρ in pixels (`0..=ceil(diagonal)`).

use crate::geometry::{Line, Vec2};
use crate::raster::{gray_from_fn, to_level};
use crate::types::RgbaImage;

/// Number of θ columns in the accumulator.
pub const THETA_STEPS: u32 = 360;

/// Half-width in degrees of the window scanned around each histogram peak.
const PEAK_WINDOW: i64 = 10;

/// ρ values closer than this are merged into one line.
const RHO_TOLERANCE: f64 = 10.0;

/// Half-length of emitted segments.
const SEGMENT_EXTENT: f64 = 1000.0;

/// How many histogram peaks are expanded into lines.
const PEAK_COUNT: usize = 2;

/// Vote every foreground pixel (`red > 0`) into a (θ, ρ) accumulator.
///
/// `ρ = floor(x cos θ + y sin θ)`; votes with ρ outside the accumulator
/// are dropped. The result is normalized so the highest cell is 255.
#[must_use = "returns the accumulator image"]
pub fn hough_transform(image: &RgbaImage) -> RgbaImage {
    let (w, h) = image.dimensions();
    let diagonal = f64::from(w).hypot(f64::from(h));
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let rho_steps = diagonal.ceil() as u32 + 1;

    let trig: Vec<(f64, f64)> = (0..THETA_STEPS)
        .map(|t| f64::from(t).to_radians().sin_cos())
        .map(|(sin, cos)| (cos, sin))
        .collect();

    let mut votes = vec![0u32; (THETA_STEPS * rho_steps) as usize];
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel.0[0] == 0 {
            continue;
        }
        for (theta, &(cos, sin)) in trig.iter().enumerate() {
            let rho = f64::from(x).mul_add(cos, f64::from(y) * sin).floor();
            if rho >= 0.0 && rho < f64::from(rho_steps) {
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let row = rho as usize;
                votes[row * THETA_STEPS as usize + theta] += 1;
            }
        }
    }

    let max = votes.iter().copied().max().unwrap_or(0);
    gray_from_fn(THETA_STEPS, rho_steps, |x, y| {
        if max == 0 {
            return 0;
        }
        let v = votes[y as usize * THETA_STEPS as usize + x as usize];
        to_level(255.0 * f64::from(v) / f64::from(max))
    })
}

/// Lines recovered from an accumulator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HoughLines {
    pub lines: Vec<Line>,
    /// Per-θ sum of accumulator cells at or above the threshold.
    pub histo: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    rho: f64,
    theta: f64,
    members: u32,
}

/// Sum of accumulator cells `>= threshold` for every θ column.
#[must_use]
pub fn theta_histogram(hough: &RgbaImage, threshold: u8) -> Vec<f64> {
    (0..hough.width())
        .map(|t| {
            (0..hough.height())
                .map(|r| hough.get_pixel(t, r).0[0])
                .filter(|&v| v >= threshold)
                .map(f64::from)
                .sum()
        })
        .collect()
}

/// Local maxima of the circular histogram `histo` as `(index, mass)`
/// pairs, where mass is the sum of the hill around the peak (rising run
/// plus falling run, up to the next valley).
///
/// The scan starts at the global minimum so a hill straddling 359°/0°
/// is seen as one peak.
#[must_use]
pub fn histogram_peaks(histo: &[f64]) -> Vec<(usize, f64)> {
    let n = histo.len();
    if n == 0 {
        return Vec::new();
    }
    let start = (0..n).fold(0, |best, i| if histo[i] < histo[best] { i } else { best });
    let at = |k: usize| histo[(start + k) % n];
    let hill_mass = |from: usize, to: usize| (from..to).map(at).sum::<f64>();

    let mut peaks = Vec::new();
    let mut rising = false;
    let mut falling_from = None;
    let mut hill_start = 0;
    for k in 1..=n {
        let (prev, cur) = (at(k - 1), at(k));
        if cur > prev {
            if let Some(peak) = falling_from.take() {
                peaks.push(((start + peak) % n, hill_mass(hill_start, k - 1)));
                hill_start = k - 1;
            }
            rising = true;
        } else if cur < prev && rising {
            falling_from = Some(k - 1);
            rising = false;
        }
    }
    if let Some(peak) = falling_from {
        peaks.push(((start + peak) % n, hill_mass(hill_start, n)));
    }
    peaks
}

/// Extract up to `count` lines from an accumulator.
///
/// The two heaviest θ peaks are expanded: every accumulator cell
/// `>= threshold` within ±10° is clustered by ρ (within 10 px, running
/// average on merge). Each creation *and* each merge consumes one unit of
/// `count`, so heavy clusters can exhaust the budget before the second
/// peak is visited.
#[must_use = "returns the extracted lines"]
pub fn hough_to_lines(hough: &RgbaImage, threshold: u8, count: u32) -> HoughLines {
    let histo = theta_histogram(hough, threshold);
    let mut peaks = histogram_peaks(&histo);
    peaks.sort_by(|a, b| b.1.total_cmp(&a.1));
    peaks.truncate(PEAK_COUNT);

    let columns = i64::from(hough.width());
    let mut budget = i64::from(count);
    let mut lines = Vec::new();

    for &(peak, _) in &peaks {
        let mut candidates: Vec<Candidate> = Vec::new();
        'window: for offset in -PEAK_WINDOW..=PEAK_WINDOW {
            #[allow(clippy::cast_possible_wrap)]
            let unwrapped = peak as i64 + offset;
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let column = unwrapped.rem_euclid(columns.max(1)) as u32;
            for row in 0..hough.height() {
                if budget <= 0 {
                    break 'window;
                }
                if hough.get_pixel(column, row).0[0] < threshold {
                    continue;
                }
                let rho = f64::from(row);
                // Averaged unwrapped so clusters across 0° stay near 0°.
                #[allow(clippy::cast_precision_loss)]
                let theta = unwrapped as f64;
                if let Some(c) = candidates
                    .iter_mut()
                    .find(|c| (c.rho - rho).abs() <= RHO_TOLERANCE)
                {
                    let n = f64::from(c.members);
                    c.rho = c.rho.mul_add(n, rho) / (n + 1.0);
                    c.theta = c.theta.mul_add(n, theta) / (n + 1.0);
                    c.members += 1;
                } else {
                    candidates.push(Candidate {
                        rho,
                        theta,
                        members: 1,
                    });
                }
                budget -= 1;
            }
        }
        lines.extend(candidates.iter().map(|c| normal_to_segment(c.rho, c.theta)));
    }

    HoughLines { lines, histo }
}

/// Segment of the normal-form line (ρ, θ°) centred on the foot of the
/// normal and extended 1000 units both ways.
#[must_use]
pub fn normal_to_segment(rho: f64, theta_degrees: f64) -> Line {
    let (sin, cos) = theta_degrees.to_radians().sin_cos();
    let foot = Vec2::new(rho * cos, rho * sin);
    let dir = Vec2::new(-sin, cos);
    Line {
        from: Vec2::new(
            SEGMENT_EXTENT.mul_add(-dir.x, foot.x),
            SEGMENT_EXTENT.mul_add(-dir.y, foot.y),
        ),
        to: Vec2::new(
            SEGMENT_EXTENT.mul_add(dir.x, foot.x),
            SEGMENT_EXTENT.mul_add(dir.y, foot.y),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_line_image() -> RgbaImage {
        gray_from_fn(20, 20, |x, _| if x == 7 { 255 } else { 0 })
    }

    #[test]
    fn accumulator_shape() {
        let acc = hough_transform(&RgbaImage::new(3, 4));
        assert_eq!(acc.width(), THETA_STEPS);
        assert_eq!(acc.height(), 6);
        assert!(acc.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn vertical_line_peaks_at_theta_zero() {
        let acc = hough_transform(&vertical_line_image());
        // Every pixel of x = 7 votes for (θ = 0, ρ = 7).
        assert_eq!(acc.get_pixel(0, 7).0[0], 255);
    }

    #[test]
    fn peaks_are_hilltops() {
        let histo = [0.0, 1.0, 5.0, 2.0, 0.0, 3.0, 9.0, 1.0];
        let peaks = histogram_peaks(&histo);
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks[0].0, 2);
        assert_eq!(peaks[1].0, 6);
        assert!((peaks[0].1 - 8.0).abs() < 1e-9);
        assert!((peaks[1].1 - 13.0).abs() < 1e-9);
    }

    #[test]
    fn flat_histogram_has_no_peaks() {
        assert!(histogram_peaks(&[0.0; 10]).is_empty());
        assert!(histogram_peaks(&[]).is_empty());
    }

    #[test]
    fn segment_is_centred_on_normal_foot() {
        let line = normal_to_segment(5.0, 0.0);
        assert!((line.from.x - 5.0).abs() < 1e-9);
        assert!((line.to.x - 5.0).abs() < 1e-9);
        assert!((line.from.y + 1000.0).abs() < 1e-9);
        assert!((line.to.y - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn vertical_line_is_recovered() {
        let acc = hough_transform(&vertical_line_image());
        let found = hough_to_lines(&acc, 200, 50);
        assert_eq!(found.histo.len(), THETA_STEPS as usize);
        assert!(!found.lines.is_empty());
        assert!(
            found
                .lines
                .iter()
                .any(|l| (l.from.x - 7.0).abs() < 1.0 && (l.to.x - 7.0).abs() < 1.0)
        );
    }

    #[test]
    fn zero_budget_yields_no_lines() {
        let acc = hough_transform(&vertical_line_image());
        assert!(hough_to_lines(&acc, 200, 0).lines.is_empty());
    }
}
