/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Default sigma threshold for rejection-based stacking methods.
pub const DEFAULT_SIGMA_THRESHOLD: f32 = 3.0;

/// Deviation (in per-pixel standard deviations) beyond which a sample
/// counts toward the analyzer's outlier ratio.
pub const OUTLIER_SIGMA: f32 = 5.0;

/// Outlier ratio above which the adaptive selector switches to a
/// rejection method.
pub const OUTLIER_RATIO_THRESHOLD: f64 = 0.001;

/// Global variance below which plain mean stacking is preferred.
pub const LOW_VARIANCE_THRESHOLD: f64 = 10.0;

/// Default percentile-clip bounds when no threshold is supplied.
pub const PERCENTILE_CLIP_LOW: f32 = 20.0;
pub const PERCENTILE_CLIP_HIGH: f32 = 80.0;

/// Maximum histogram bins for entropy-weighted stacking.
pub const ENTROPY_MAX_BINS: usize = 16;

/// Floor for per-sample weights in entropy-weighted stacking.
pub const MIN_PIXEL_WEIGHT: f32 = 0.001;

/// Maximum number of principal components fitted for a superbias.
pub const MAX_SUPERBIAS_COMPONENTS: usize = 8;

/// Dark scaling factor clamp bounds.
pub const DARK_SCALE_MIN: f32 = 0.5;
pub const DARK_SCALE_MAX: f32 = 2.0;

/// Temperature tolerance for dark/light matching, in degrees C.
pub const TEMP_MATCH_TOLERANCE: f32 = 1.0;

/// Exposure-time tolerance for dark/light matching, in seconds.
pub const EXPOSURE_MATCH_TOLERANCE: f32 = 0.1;

/// Minimum header confidence for a frame to pass validation.
pub const VALIDATION_MIN_CONFIDENCE: f32 = 0.7;

/// Cap on the number of frames a single job will download.
pub const MAX_FRAMES_PER_JOB: usize = 200;

/// Bins in the persisted master-frame histogram.
pub const HISTOGRAM_BINS: usize = 64;

/// Percentile bounds for the 8-bit preview stretch.
pub const PREVIEW_STRETCH_LOW: f32 = 1.0;
pub const PREVIEW_STRETCH_HIGH: f32 = 99.0;

/// Storage prefix scanned for auto-selected master bias frames.
pub const MASTER_BIAS_PREFIX: &str = "master-bias/";
