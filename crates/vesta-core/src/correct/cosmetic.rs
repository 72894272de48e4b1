//! Post-stack cosmetic correction: defect-map masking and hot/cold pixel
//! repair. Pure transforms; the input buffer is never modified.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, VestaError};
use crate::frame::{median_mut, BadPixelMap, ImageBuffer};
use crate::metadata::CosmicRayDetector;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosmeticMethod {
    /// Statistical hot/cold pixel detection against mean +/- k*std.
    HotPixelMap,
    /// Delegate to an external cosmic-ray detector.
    LaCosmic,
}

/// Apply cosmetic correction to a combined master.
///
/// A supplied bad-pixel map is honored first: every flagged pixel is
/// replaced by the median of its 3x3 neighborhood (reflect-padded at the
/// edges), before the statistical method runs.
pub fn correct(
    image: &ImageBuffer,
    method: CosmeticMethod,
    threshold: f32,
    bad_pixel_map: Option<&BadPixelMap>,
    detector: Option<&dyn CosmicRayDetector>,
) -> Result<(ImageBuffer, Vec<String>)> {
    let mut warnings = Vec::new();
    let mut working = image.clone();

    if let Some(map) = bad_pixel_map {
        let (h, w) = image.dim();
        if map.mask.dim() != (h, w) {
            return Err(VestaError::ShapeMismatch {
                expected_width: w,
                expected_height: h,
                width: map.mask.ncols(),
                height: map.mask.nrows(),
            });
        }
        let flagged = map.flagged_count();
        if flagged > 0 {
            let snapshot = working.clone();
            for ((row, col), bad) in map.mask.indexed_iter() {
                if *bad {
                    working.data[[row, col]] = neighborhood_median(&snapshot, row, col);
                }
            }
            info!(flagged, "Applied bad pixel map");
        }
    }

    match method {
        CosmeticMethod::HotPixelMap => {
            let mean = working.mean();
            let std = working.std();
            let lo = mean - threshold * std;
            let hi = mean + threshold * std;

            let flagged: Vec<(usize, usize)> = working
                .data
                .indexed_iter()
                .filter(|(_, &v)| v < lo || v > hi)
                .map(|(idx, _)| idx)
                .collect();

            if flagged.is_empty() {
                return Ok((working, warnings));
            }

            let snapshot = working.clone();
            for (row, col) in &flagged {
                working.data[[*row, *col]] = neighborhood_median(&snapshot, *row, *col);
            }
            info!(flagged = flagged.len(), threshold, "Repaired hot/cold pixels");
        }
        CosmeticMethod::LaCosmic => {
            let Some(detector) = detector else {
                return Err(VestaError::ExternalTool(
                    "la_cosmic requested but no cosmic-ray detector configured".to_string(),
                ));
            };
            working = detector.clean(&working, threshold)?;
            warnings.push("cosmic-ray cleaning delegated to external detector".to_string());
        }
    }

    Ok((working, warnings))
}

/// Median of the 3x3 neighborhood around (row, col), reflect-padded.
fn neighborhood_median(image: &ImageBuffer, row: usize, col: usize) -> f32 {
    let (h, w) = image.dim();
    let mut values = [0.0f32; 9];
    let mut i = 0;
    for dr in -1i64..=1 {
        for dc in -1i64..=1 {
            let r = reflect(row as i64 + dr, h);
            let c = reflect(col as i64 + dc, w);
            values[i] = image.data[[r, c]];
            i += 1;
        }
    }
    median_mut(&mut values)
}

fn reflect(idx: i64, len: usize) -> usize {
    if len == 1 {
        0
    } else if idx < 0 {
        (-idx) as usize
    } else if idx as usize >= len {
        2 * (len - 1) - idx as usize
    } else {
        idx as usize
    }
}
