//! Master-frame statistics and frame-type-specific quality scoring.

use serde::Serialize;

use crate::consts::HISTOGRAM_BINS;
use crate::frame::{FrameType, ImageBuffer};

/// Statistics persisted alongside a master frame.
#[derive(Clone, Debug, Serialize)]
pub struct MasterStats {
    pub mean: f32,
    pub median: f32,
    pub std: f32,
    pub min: f32,
    pub max: f32,
    /// Outlier ratio of the *input* set (from the frame analyzer), carried
    /// through so scoring can see pre-combination contamination.
    pub outlier_ratio: f64,
    pub histogram: Vec<u32>,
}

/// The combined output of one stacking run. Immutable; dark scaling
/// produces a new value instead of editing in place.
#[derive(Clone, Debug)]
pub struct MasterFrame {
    pub image: ImageBuffer,
    pub method: String,
    pub n_frames_used: usize,
    pub stats: MasterStats,
}

impl MasterFrame {
    pub fn new(image: ImageBuffer, method: String, n_frames_used: usize, outlier_ratio: f64) -> Self {
        let stats = master_stats(&image, outlier_ratio);
        Self {
            image,
            method,
            n_frames_used,
            stats,
        }
    }

    /// A new master with every pixel multiplied by `factor` (dark scaling).
    pub fn scaled(&self, factor: f32) -> Self {
        let image = ImageBuffer::new(&self.image.data * factor);
        Self::new(
            image,
            self.method.clone(),
            self.n_frames_used,
            self.stats.outlier_ratio,
        )
    }
}

/// Compute the persisted statistics block for a combined image.
pub fn master_stats(image: &ImageBuffer, outlier_ratio: f64) -> MasterStats {
    MasterStats {
        mean: image.mean(),
        median: image.median(),
        std: image.std(),
        min: image.min_value(),
        max: image.max_value(),
        outlier_ratio,
        histogram: histogram(image, HISTOGRAM_BINS),
    }
}

/// Fixed-bin histogram over the image's own [min, max] range.
pub fn histogram(image: &ImageBuffer, bins: usize) -> Vec<u32> {
    let mut counts = vec![0u32; bins];
    if image.data.is_empty() || bins == 0 {
        return counts;
    }
    let min = image.min_value();
    let max = image.max_value();
    let span = max - min;
    if span <= 0.0 {
        counts[0] = image.data.len() as u32;
        return counts;
    }
    for &v in image.data.iter() {
        let idx = (((v - min) / span) * bins as f32) as usize;
        counts[idx.min(bins - 1)] += 1;
    }
    counts
}

/// Quality verdict for a master frame, 0 (unusable) to 10 (excellent).
#[derive(Clone, Debug, Serialize)]
pub struct QualityScore {
    pub score: f32,
    pub recommendations: Vec<String>,
}

/// Score a master with frame-type-specific heuristics. Deductions are
/// additive; the result is clamped into [0, 10].
pub fn score(stats: &MasterStats, n_frames: usize, frame_type: FrameType) -> QualityScore {
    let mut deductions = 0.0f32;
    let mut recommendations = Vec::new();

    let mut deduct = |amount: f32, message: String| {
        deductions += amount;
        recommendations.push(message);
    };

    match frame_type {
        FrameType::Bias => {
            if stats.std > 15.0 {
                deduct(2.0, format!("read noise is high (std {:.1} > 15)", stats.std));
            }
            if stats.min < 0.0 {
                deduct(1.0, "negative pixel values suggest over-subtraction".to_string());
            }
            if n_frames < 20 {
                deduct(2.0, format!("only {n_frames} frames; 20+ recommended for bias"));
            }
            if stats.max > 60000.0 {
                deduct(1.0, "saturated pixels present in a bias master".to_string());
            }
        }
        FrameType::Dark => {
            if stats.outlier_ratio > 0.005 {
                deduct(
                    3.0,
                    format!(
                        "outlier ratio {:.4} indicates heavy hot-pixel contamination",
                        stats.outlier_ratio
                    ),
                );
            }
            if stats.std > 30.0 {
                deduct(2.0, format!("dark noise is high (std {:.1} > 30)", stats.std));
            }
            if stats.min < 0.0 {
                deduct(1.0, "negative pixel values suggest over-subtraction".to_string());
            }
            if n_frames < 15 {
                deduct(2.0, format!("only {n_frames} frames; 15+ recommended for darks"));
            }
        }
        FrameType::Flat => {
            if stats.min < 1000.0 {
                deduct(1.0, "flat is underexposed (min below 1000 ADU)".to_string());
            }
            if stats.max > 60000.0 {
                deduct(2.0, "flat has saturated regions".to_string());
            }
            if stats.std < 100.0 {
                deduct(
                    1.0,
                    "flat shows almost no structure; check illumination".to_string(),
                );
            }
            if n_frames < 10 {
                deduct(2.0, format!("only {n_frames} frames; 10+ recommended for flats"));
            }
        }
        FrameType::Light | FrameType::Unknown => {
            if stats.outlier_ratio > 0.01 {
                deduct(
                    3.0,
                    format!("outlier ratio {:.4} is very high", stats.outlier_ratio),
                );
            }
            if stats.std > 500.0 {
                deduct(2.0, format!("noise is high (std {:.1} > 500)", stats.std));
            }
            if stats.min < 0.0 {
                deduct(1.0, "negative pixel values present".to_string());
            }
            if stats.max > 60000.0 {
                deduct(1.0, "saturated pixels present".to_string());
            }
            if n_frames < 10 {
                deduct(2.0, format!("only {n_frames} frames; 10+ recommended"));
            }
        }
    }

    QualityScore {
        score: (10.0 - deductions).clamp(0.0, 10.0),
        recommendations,
    }
}
