use std::sync::atomic::{AtomicUsize, Ordering};

use crate::consts::{PERCENTILE_CLIP_HIGH, PERCENTILE_CLIP_LOW};
use crate::error::Result;
use crate::frame::{median_mut, percentile_mut, ImageBuffer};

use super::reduce::per_pixel_reduce;

/// Percentile-clipped mean.
///
/// Per pixel: keep samples inside the `[low, high]` percentile bounds and
/// average them. Default bounds are `[20, 80]`; a supplied threshold `T`
/// centers a window of width `T` on the median, i.e. bounds
/// `[(100-T)/2, 100-(100-T)/2]`. Pixels where nothing survives fall back
/// to the median.
pub fn percentile_clip_stack(
    buffers: &[ImageBuffer],
    threshold: Option<f32>,
    warnings: &mut Vec<String>,
) -> Result<ImageBuffer> {
    let (low_pct, high_pct) = match threshold {
        Some(t) => {
            let margin = (100.0 - t) / 2.0;
            (margin, 100.0 - margin)
        }
        None => (PERCENTILE_CLIP_LOW, PERCENTILE_CLIP_HIGH),
    };
    let fallback_pixels = AtomicUsize::new(0);

    let image = per_pixel_reduce(buffers, |values| {
        // percentile_mut sorts the scratch slice; bounds and median both
        // read the sorted order.
        let lo = percentile_mut(values, low_pct);
        let hi = percentile_mut(values, high_pct);

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
            fallback_pixels.fetch_add(1, Ordering::Relaxed);
            median_mut(values)
        }
    })?;

    let fallbacks = fallback_pixels.load(Ordering::Relaxed);
    if fallbacks > 0 {
        warnings.push(format!(
            "percentile_clip kept no samples at {fallbacks} pixels, used median there"
        ));
    }

    Ok(image)
}
