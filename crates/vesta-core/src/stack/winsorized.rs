use crate::error::Result;
use crate::frame::{median_mut, ImageBuffer};

use super::reduce::{mean_stddev, per_pixel_reduce};

/// Winsorized mean.
///
/// Per pixel: clamp (not discard) every sample into
/// `[median - sigma*std, median + sigma*std]`, then average the clamped
/// values. Clamping keeps the sample count constant, which makes this
/// gentler than sigma clipping on small stacks.
pub fn winsorized_stack(buffers: &[ImageBuffer], sigma: f32) -> Result<ImageBuffer> {
    per_pixel_reduce(buffers, |values| {
        let (_, stddev) = mean_stddev(values);
        // The sample slice is per-pixel scratch; sorting it in place is fine.
        let median = median_mut(values);

        let lo = median - sigma * stddev;
        let hi = median + sigma * stddev;
        let sum: f32 = values.iter().map(|v| v.clamp(lo, hi)).sum();
        sum / values.len() as f32
    })
}
