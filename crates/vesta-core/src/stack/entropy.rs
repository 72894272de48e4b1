use crate::consts::{ENTROPY_MAX_BINS, MIN_PIXEL_WEIGHT};
use crate::error::Result;
use crate::frame::ImageBuffer;

use super::reduce::per_pixel_reduce;

/// Entropy-weighted average.
///
/// Per pixel: histogram the N samples into at most 16 bins (fewer when
/// there are fewer distinct values) and derive a consistency score
/// `1 - H/H_max` from the Shannon entropy of the bin probabilities. Each
/// sample is additionally weighted by its closeness to the median,
/// `1 - |s - median| / max_deviation`. The final per-sample weight is the
/// product, floored at 0.001 so the normalization never divides by zero.
pub fn entropy_weighted_stack(buffers: &[ImageBuffer]) -> Result<ImageBuffer> {
    per_pixel_reduce(buffers, |values| {
        let n = values.len();

        let mut sorted: Vec<f32> = values.to_vec();
        sorted.sort_unstable_by(f32::total_cmp);
        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        let min = sorted[0];
        let max = sorted[n - 1];
        let mut distinct = 1usize;
        for pair in sorted.windows(2) {
            if pair[1] != pair[0] {
                distinct += 1;
            }
        }

        if distinct <= 1 {
            // All samples identical: fully consistent pixel.
            return median;
        }

        let bins = distinct.min(ENTROPY_MAX_BINS);
        let mut counts = vec![0u32; bins];
        let span = max - min;
        for &v in sorted.iter() {
            let idx = (((v - min) / span) * bins as f32) as usize;
            counts[idx.min(bins - 1)] += 1;
        }

        let mut entropy = 0.0f32;
        for &c in &counts {
            if c > 0 {
                let p = c as f32 / n as f32;
                entropy -= p * p.ln();
            }
        }
        let max_entropy = (bins as f32).ln();
        let consistency = if max_entropy > f32::EPSILON {
            1.0 - entropy / max_entropy
        } else {
            1.0
        };

        let max_dev = sorted
            .iter()
            .map(|v| (v - median).abs())
            .fold(0.0f32, f32::max);

        let mut weighted_sum = 0.0f32;
        let mut weight_sum = 0.0f32;
        for &v in values.iter() {
            let closeness = if max_dev > f32::EPSILON {
                1.0 - (v - median).abs() / max_dev
            } else {
                1.0
            };
            let weight = (consistency * closeness).max(MIN_PIXEL_WEIGHT);
            weighted_sum += weight * v;
            weight_sum += weight;
        }

        weighted_sum / weight_sum
    })
}
