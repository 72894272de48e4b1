use std::path::PathBuf;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VestaError};

/// A single owned 2D pixel grid.
/// Pixel values are f32 in native ADU units, shape = (height, width).
#[derive(Clone, Debug)]
pub struct ImageBuffer {
    pub data: Array2<f32>,
}

impl ImageBuffer {
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    pub fn from_elem(height: usize, width: usize, fill: f32) -> Self {
        Self {
            data: Array2::from_elem((height, width), fill),
        }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// (height, width)
    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }

    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.sum() / self.data.len() as f32
    }

    pub fn std(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let mean = self.mean();
        let var = self.data.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>()
            / self.data.len() as f32;
        var.sqrt()
    }

    pub fn min_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::INFINITY, f32::min)
    }

    pub fn max_value(&self) -> f32 {
        self.data.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Conventional median: average of the two middle values for even counts.
    pub fn median(&self) -> f32 {
        let mut values: Vec<f32> = self.data.iter().copied().collect();
        median_mut(&mut values)
    }

    /// Linearly interpolated percentile, `p` in [0, 100].
    pub fn percentile(&self, p: f32) -> f32 {
        let mut values: Vec<f32> = self.data.iter().copied().collect();
        percentile_mut(&mut values, p)
    }
}

/// Median of a scratch slice (sorts in place).
pub fn median_mut(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(f32::total_cmp);
    let n = values.len();
    if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    }
}

/// Linearly interpolated percentile of a scratch slice (sorts in place).
pub fn percentile_mut(values: &mut [f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(f32::total_cmp);
    let n = values.len();
    if n == 1 {
        return values[0];
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (n - 1) as f32;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f32;
    values[lo] + (values[hi] - values[lo]) * frac
}

/// Verify every buffer matches the first buffer's shape.
pub fn check_shapes(buffers: &[ImageBuffer]) -> Result<(usize, usize)> {
    let first = buffers.first().ok_or(VestaError::EmptyStack)?;
    let (h, w) = first.dim();
    for buf in &buffers[1..] {
        let (bh, bw) = buf.dim();
        if (bh, bw) != (h, w) {
            return Err(VestaError::ShapeMismatch {
                expected_width: w,
                expected_height: h,
                width: bw,
                height: bh,
            });
        }
    }
    Ok((h, w))
}

/// Exposure class of a calibration frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameType {
    Bias,
    Dark,
    Flat,
    Light,
    Unknown,
}

impl FrameType {
    /// Infer from filename tokens. Case-insensitive substring match,
    /// most specific token first.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains("bias") || lower.contains("offset") {
            Self::Bias
        } else if lower.contains("dark") {
            Self::Dark
        } else if lower.contains("flat") {
            Self::Flat
        } else if lower.contains("light") || lower.contains("science") {
            Self::Light
        } else {
            Self::Unknown
        }
    }

    /// Majority vote over a set of filenames; ties resolve to the first
    /// name's type, an empty set to `Unknown`.
    pub fn aggregate<'a>(names: impl Iterator<Item = &'a str>) -> Self {
        let mut counts = [0usize; 5];
        let mut first = None;
        for name in names {
            let t = Self::from_name(name);
            first.get_or_insert(t);
            counts[t as usize] += 1;
        }
        let Some(first) = first else {
            return Self::Unknown;
        };
        let all = [
            Self::Bias,
            Self::Dark,
            Self::Flat,
            Self::Light,
            Self::Unknown,
        ];
        let best = counts.iter().max().copied().unwrap_or(0);
        if counts[first as usize] == best {
            return first;
        }
        all.into_iter()
            .find(|t| counts[*t as usize] == best)
            .unwrap_or(Self::Unknown)
    }
}

impl std::fmt::Display for FrameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bias => write!(f, "bias"),
            Self::Dark => write!(f, "dark"),
            Self::Flat => write!(f, "flat"),
            Self::Light => write!(f, "light"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Header fields the metadata collaborator extracts for one exposure.
#[derive(Clone, Debug, Default)]
pub struct FrameHeader {
    pub frame_type: Option<FrameType>,
    /// CCD-TEMP, degrees C.
    pub ccd_temp: Option<f32>,
    /// EXPTIME, seconds.
    pub exposure_secs: Option<f32>,
    /// Collaborator confidence in the header interpretation, [0, 1].
    pub confidence: f32,
    pub warnings: Vec<String>,
}

/// Validation verdict for one input frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationStatus {
    Pending,
    Valid,
    Rejected,
}

/// One input exposure. Originals are immutable once read; calibration
/// stages produce new derived records instead of editing in place.
#[derive(Clone, Debug)]
pub struct FrameRecord {
    pub path: PathBuf,
    pub header: FrameHeader,
    pub buffer: ImageBuffer,
    pub validation: ValidationStatus,
    pub rejection_reasons: Vec<String>,
}

impl FrameRecord {
    pub fn new(path: PathBuf, header: FrameHeader, buffer: ImageBuffer) -> Self {
        Self {
            path,
            header,
            buffer,
            validation: ValidationStatus::Pending,
            rejection_reasons: Vec::new(),
        }
    }

    /// A derived record with a transformed buffer and the original header.
    pub fn derive(&self, buffer: ImageBuffer) -> Self {
        Self {
            path: self.path.clone(),
            header: self.header.clone(),
            buffer,
            validation: self.validation,
            rejection_reasons: self.rejection_reasons.clone(),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }
}

/// Boolean defect mask aligned with an image shape; `true` marks a bad pixel.
#[derive(Clone, Debug)]
pub struct BadPixelMap {
    pub mask: Array2<bool>,
}

impl BadPixelMap {
    pub fn new(mask: Array2<bool>) -> Self {
        Self { mask }
    }

    /// Build from an image where any nonzero pixel marks a defect.
    pub fn from_image(image: &ImageBuffer) -> Self {
        Self {
            mask: image.data.mapv(|v| v != 0.0),
        }
    }

    pub fn flagged_count(&self) -> usize {
        self.mask.iter().filter(|b| **b).count()
    }
}
