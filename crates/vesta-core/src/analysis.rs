//! Per-set statistics and the adaptive method selector.

use ndarray::Array2;
use serde::Serialize;

use crate::consts::{
    DEFAULT_SIGMA_THRESHOLD, LOW_VARIANCE_THRESHOLD, OUTLIER_RATIO_THRESHOLD, OUTLIER_SIGMA,
};
use crate::error::Result;
use crate::frame::{check_shapes, ImageBuffer};
use crate::stack::StackMethod;

/// Cross-frame statistics over one input set.
#[derive(Clone, Debug, Serialize)]
pub struct SetStatistics {
    pub n_frames: usize,
    pub mean: f64,
    pub std: f64,
    pub global_variance: f64,
    /// Fraction of all pixel-samples deviating more than 5 per-pixel
    /// standard deviations from the per-pixel cross-frame mean.
    pub outlier_ratio: f64,
}

/// Compute set statistics used by quality gating and the adaptive selector.
pub fn analyze(buffers: &[ImageBuffer]) -> Result<SetStatistics> {
    let (h, w) = check_shapes(buffers)?;
    let n = buffers.len();
    let samples = (n * h * w) as f64;

    let mut global_sum = 0.0f64;
    let mut global_sq_sum = 0.0f64;
    for buf in buffers {
        for &v in buf.data.iter() {
            global_sum += v as f64;
            global_sq_sum += (v as f64) * (v as f64);
        }
    }
    let mean = global_sum / samples;
    let global_variance = (global_sq_sum / samples - mean * mean).max(0.0);

    // Per-pixel mean and std across frames, then count extreme samples.
    let mut pixel_mean = Array2::<f64>::zeros((h, w));
    for buf in buffers {
        for (acc, &v) in pixel_mean.iter_mut().zip(buf.data.iter()) {
            *acc += v as f64;
        }
    }
    pixel_mean /= n as f64;

    let mut pixel_var = Array2::<f64>::zeros((h, w));
    for buf in buffers {
        for ((acc, &v), &m) in pixel_var.iter_mut().zip(buf.data.iter()).zip(pixel_mean.iter()) {
            let d = v as f64 - m;
            *acc += d * d;
        }
    }
    pixel_var /= n as f64;

    let mut outliers = 0usize;
    for buf in buffers {
        for ((&v, &m), &var) in buf
            .data
            .iter()
            .zip(pixel_mean.iter())
            .zip(pixel_var.iter())
        {
            let std = var.sqrt();
            if std > 0.0 && (v as f64 - m).abs() > OUTLIER_SIGMA as f64 * std {
                outliers += 1;
            }
        }
    }

    Ok(SetStatistics {
        n_frames: n,
        mean,
        std: global_variance.sqrt(),
        global_variance,
        outlier_ratio: outliers as f64 / samples,
    })
}

/// Outcome of the adaptive selector.
#[derive(Clone, Debug)]
pub struct Recommendation {
    /// Always a concrete method, never `Adaptive`.
    pub method: StackMethod,
    pub reason: String,
}

/// Deterministic method recommendation. Never fails; rules are evaluated
/// in priority order and the caller's request passes through when none
/// fires.
pub fn recommend(stats: &SetStatistics, requested: &StackMethod) -> Recommendation {
    if stats.outlier_ratio > OUTLIER_RATIO_THRESHOLD {
        if stats.n_frames < 10 {
            return Recommendation {
                method: StackMethod::Median,
                reason: "robust against outliers with few frames".to_string(),
            };
        }
        return Recommendation {
            method: StackMethod::Sigma { sigma: 2.5 },
            reason: "outlier contamination with enough frames for clipping".to_string(),
        };
    }

    if stats.global_variance < LOW_VARIANCE_THRESHOLD {
        return Recommendation {
            method: StackMethod::Mean,
            reason: "low variance, mean is efficient".to_string(),
        };
    }

    if stats.n_frames < 5 {
        return Recommendation {
            method: StackMethod::Median,
            reason: "too few frames for aggressive rejection".to_string(),
        };
    }

    // Pass the request through, resolving a nested Adaptive to sigma
    // clipping so the recommendation is always directly runnable.
    let method = match requested {
        StackMethod::Adaptive { sigma } => StackMethod::Sigma {
            sigma: sigma.unwrap_or(DEFAULT_SIGMA_THRESHOLD),
        },
        other => other.clone(),
    };
    Recommendation {
        method,
        reason: "requested method is suitable".to_string(),
    }
}
