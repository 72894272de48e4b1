use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::Result;
use crate::frame::ImageBuffer;

use super::reduce::per_pixel_reduce;

/// Linear-fit rejection mean.
///
/// Per pixel: least-squares fit of sample value against frame index (a
/// stand-in for acquisition time), reject samples whose residual exceeds
/// `sigma * std(residuals)`, and average the surviving *original* values.
/// Pixels where the fit rejects everything fall back to the raw mean.
pub fn linear_fit_stack(
    buffers: &[ImageBuffer],
    sigma: f32,
    warnings: &mut Vec<String>,
) -> Result<ImageBuffer> {
    let n = buffers.len();
    let fallback_pixels = AtomicUsize::new(0);

    let image = per_pixel_reduce(buffers, |values| {
        let raw_mean = values.iter().sum::<f32>() / n as f32;
        if n < 3 {
            // Two points fit exactly; rejection is meaningless.
            return raw_mean;
        }

        let (slope, intercept) = fit_line(values);

        let mut res_sq_sum = 0.0f32;
        for (i, &v) in values.iter().enumerate() {
            let r = v - (intercept + slope * i as f32);
            res_sq_sum += r * r;
        }
        let res_std = (res_sq_sum / n as f32).sqrt();
        if res_std <= f32::EPSILON {
            return raw_mean;
        }

        let limit = sigma * res_std;
        let mut sum = 0.0f32;
        let mut count = 0u32;
        for (i, &v) in values.iter().enumerate() {
            let r = v - (intercept + slope * i as f32);
            if r.abs() <= limit {
                sum += v;
                count += 1;
            }
        }

        if count > 0 {
            sum / count as f32
        } else {
            fallback_pixels.fetch_add(1, Ordering::Relaxed);
            raw_mean
        }
    })?;

    let fallbacks = fallback_pixels.load(Ordering::Relaxed);
    if fallbacks > 0 {
        warnings.push(format!(
            "linear_fit rejected all samples at {fallbacks} pixels, used raw mean there"
        ));
    }

    Ok(image)
}

/// Least-squares line through (i, values[i]). Returns (slope, intercept).
fn fit_line(values: &[f32]) -> (f32, f32) {
    let n = values.len() as f32;
    let x_mean = (values.len() - 1) as f32 / 2.0;
    let y_mean = values.iter().sum::<f32>() / n;

    let mut num = 0.0f32;
    let mut den = 0.0f32;
    for (i, &v) in values.iter().enumerate() {
        let dx = i as f32 - x_mean;
        num += dx * (v - y_mean);
        den += dx * dx;
    }

    let slope = if den > f32::EPSILON { num / den } else { 0.0 };
    (slope, y_mean - slope * x_mean)
}
