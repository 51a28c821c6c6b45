//! Gray-level histograms, Otsu levels and percentile queries.

use crate::types::RgbaImage;

/// Count of each red-channel level (a proxy for the gray level).
#[must_use]
pub fn build_histogram(image: &RgbaImage) -> Vec<f64> {
    let mut histogram = vec![0.0; 256];
    for pixel in image.pixels() {
        histogram[usize::from(pixel.0[0])] += 1.0;
    }
    histogram
}

/// Between-class variance `wB * wF * (μB - μF)²` for every threshold.
///
/// Entry `t` splits the histogram into `[0, t)` (background) and `[t, n)`
/// (foreground); it is zero whenever either class is empty. Weights and
/// means are normalized by the total count. An all-zero histogram yields
/// all zeros.
#[must_use]
pub fn otsu_levels(histogram: &[f64]) -> Vec<f64> {
    let total: f64 = histogram.iter().sum();
    if total <= 0.0 {
        return vec![0.0; histogram.len()];
    }

    let sum_f: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, h)| level(i) * h / total)
        .sum();

    let mut sum_b = 0.0;
    let mut w_b = 0.0;
    let mut levels = Vec::with_capacity(histogram.len());
    for (i, h) in histogram.iter().enumerate() {
        let w_f = 1.0 - w_b;
        if w_b > 0.0 && w_f > 0.0 {
            let m_f = (sum_f - sum_b) / w_f;
            let m_b = sum_b / w_b;
            levels.push(w_b * w_f * (m_b - m_f).powi(2));
        } else {
            levels.push(0.0);
        }
        w_b += h / total;
        sum_b += level(i) * h / total;
    }
    levels
}

#[allow(clippy::cast_precision_loss)]
fn level(i: usize) -> f64 {
    i as f64
}

/// Index of the maximum value, ties resolved toward the highest index.
///
/// Values are compared against a running maximum seeded at zero, so a
/// slice with no entry `>= 0` yields `None`, as does an empty slice.
#[must_use]
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut max_value = 0.0;
    let mut max_index = None;
    for (i, &v) in values.iter().enumerate() {
        if v >= max_value {
            max_index = Some(i);
            max_value = v;
        }
    }
    max_index
}

/// Integer-bucket counter over `min..max` with interpolated percentiles.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    min: i32,
    values: Vec<u32>,
    total: u32,
}

impl Histogram {
    /// Buckets for `min..max`. A reversed range has no buckets.
    #[must_use]
    pub fn new(min: i32, max: i32) -> Self {
        let len = usize::try_from(max.saturating_sub(min)).unwrap_or(0);
        Self {
            min,
            values: vec![0; len],
            total: 0,
        }
    }

    /// Add `count` samples of `value`. Values outside the range are ignored.
    pub fn add(&mut self, value: i32, count: u32) {
        let Ok(index) = usize::try_from(value.saturating_sub(self.min)) else {
            return;
        };
        if let Some(bucket) = self.values.get_mut(index) {
            *bucket += count;
            self.total += count;
        }
    }

    #[must_use]
    pub const fn total(&self) -> u32 {
        self.total
    }

    /// Interpolated value below which `frac` of the samples fall.
    ///
    /// The target count is clamped to `1..=total`. An empty histogram
    /// returns `min`.
    #[must_use]
    pub fn ile(&self, frac: f64) -> f64 {
        let total = f64::from(self.total);
        if self.total == 0 {
            return f64::from(self.min);
        }
        let target = (frac * total).clamp(1.0, total);
        let mut sum = 0.0;
        let mut index = 0;
        while index < self.values.len() && sum < target {
            sum += f64::from(self.values[index]);
            index += 1;
        }
        if index == 0 {
            return f64::from(self.min);
        }
        f64::from(self.min) + level(index) - (sum - target) / f64::from(self.values[index - 1])
    }
}
