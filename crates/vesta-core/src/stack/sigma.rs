use crate::error::Result;
use crate::frame::ImageBuffer;

use super::reduce::{mean_stddev, per_pixel_reduce};

/// Sigma-clipped mean.
///
/// Per pixel: discard samples more than `sigma` standard deviations from
/// the per-pixel mean, then average the remainder. If every sample is
/// clipped the unclipped mean is used instead.
pub fn sigma_clip_stack(buffers: &[ImageBuffer], sigma: f32) -> Result<ImageBuffer> {
    per_pixel_reduce(buffers, |values| {
        let (mean, stddev) = mean_stddev(values);
        if stddev <= f32::EPSILON {
            return mean;
        }

        let lo = mean - sigma * stddev;
        let hi = mean + sigma * stddev;
        let mut sum = 0.0f32;
        let mut count = 0u32;
        for &v in values.iter() {
            if v >= lo && v <= hi {
                sum += v;
                count += 1;
            }
        }

        if count > 0 {
            sum / count as f32
        } else {
            mean
        }
    })
}
