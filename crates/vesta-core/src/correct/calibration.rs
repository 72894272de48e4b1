//! Pre-stack corrections for dark frames: bias subtraction, reference
//! matching, and dark-scaling estimation.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::consts::{
    DARK_SCALE_MAX, DARK_SCALE_MIN, EXPOSURE_MATCH_TOLERANCE, MASTER_BIAS_PREFIX,
    TEMP_MATCH_TOLERANCE,
};
use crate::error::{Result, VestaError};
use crate::frame::{median_mut, FrameHeader, FrameRecord, ImageBuffer};
use crate::storage::ObjectStorage;

/// Which reference-matching filters are active.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct MatchingOptions {
    pub temperature: bool,
    pub exposure: bool,
}

/// Subtract a master bias from every dark frame, producing derived
/// records. Any shape mismatch is fatal for the job.
pub fn subtract_bias<F>(
    darks: &[FrameRecord],
    bias: &ImageBuffer,
    mut checkpoint: F,
) -> Result<Vec<FrameRecord>>
where
    F: FnMut() -> Result<()>,
{
    let (bh, bw) = bias.dim();
    let mut out = Vec::with_capacity(darks.len());

    for dark in darks {
        let (h, w) = dark.buffer.dim();
        if (h, w) != (bh, bw) {
            return Err(VestaError::ShapeMismatch {
                expected_width: bw,
                expected_height: bh,
                width: w,
                height: h,
            });
        }
        out.push(dark.derive(ImageBuffer::new(&dark.buffer.data - &bias.data)));
        checkpoint()?;
    }

    info!(frames = out.len(), "Bias subtraction complete");
    Ok(out)
}

/// Pick the master bias under the `master-bias/` prefix with the
/// lexicographically-latest name. Missing master bias is fatal when bias
/// subtraction was requested without an explicit path.
pub fn auto_select_bias(storage: &dyn ObjectStorage, bucket: &str) -> Result<String> {
    let entries = storage.list(bucket, MASTER_BIAS_PREFIX)?;
    entries
        .last()
        .map(|e| e.name.clone())
        .ok_or_else(|| {
            VestaError::Storage(format!(
                "no master bias found under {MASTER_BIAS_PREFIX}"
            ))
        })
}

/// Keep only dark frames whose temperature/exposure matches the first
/// reference light frame's header.
///
/// If the filter would eliminate every dark, the unfiltered set is used
/// instead with a warning; an empty working set is never produced here.
pub fn match_reference(
    darks: Vec<FrameRecord>,
    reference: &FrameHeader,
    options: MatchingOptions,
    warnings: &mut Vec<String>,
) -> Vec<FrameRecord> {
    if !options.temperature && !options.exposure {
        return darks;
    }

    let matches = |dark: &FrameRecord| -> bool {
        if options.temperature {
            match (dark.header.ccd_temp, reference.ccd_temp) {
                (Some(dt), Some(rt)) if (dt - rt).abs() <= TEMP_MATCH_TOLERANCE => {}
                (_, None) => {} // reference has no temperature, criterion is moot
                _ => return false,
            }
        }
        if options.exposure {
            match (dark.header.exposure_secs, reference.exposure_secs) {
                (Some(de), Some(re)) if (de - re).abs() <= EXPOSURE_MATCH_TOLERANCE => {}
                (_, None) => {}
                _ => return false,
            }
        }
        true
    };

    let kept: Vec<FrameRecord> = darks.iter().filter(|d| matches(d)).cloned().collect();
    if kept.is_empty() {
        warn!(
            total = darks.len(),
            "Reference matching rejected every dark, keeping unfiltered set"
        );
        warnings.push(
            "temperature/exposure matching eliminated all darks, using unfiltered set"
                .to_string(),
        );
        return darks;
    }

    info!(kept = kept.len(), total = darks.len(), "Reference matching applied");
    kept
}

/// Dark scaling factor: `median(light set) / median(dark set)`, clamped
/// into `[0.5, 2.0]`. Returns 1.0 when there are no lights or the dark
/// median is zero.
pub fn dark_scale_factor(lights: &[ImageBuffer], darks: &[ImageBuffer]) -> f32 {
    if lights.is_empty() {
        return 1.0;
    }
    let dark_median = set_median(darks);
    if dark_median == 0.0 {
        return 1.0;
    }
    let light_median = set_median(lights);
    (light_median / dark_median).clamp(DARK_SCALE_MIN, DARK_SCALE_MAX)
}

/// Median over every pixel of every buffer in the set.
fn set_median(buffers: &[ImageBuffer]) -> f32 {
    let mut values: Vec<f32> = buffers
        .iter()
        .flat_map(|b| b.data.iter().copied())
        .collect();
    median_mut(&mut values)
}
