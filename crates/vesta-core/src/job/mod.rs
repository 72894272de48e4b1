pub mod cancel;
pub mod runner;
pub mod state;

use serde::{Deserialize, Serialize};

use crate::consts::MAX_FRAMES_PER_JOB;
use crate::correct::calibration::MatchingOptions;
use crate::correct::cosmetic::CosmeticMethod;
use crate::stack::StackMethod;

pub use cancel::CancellationToken;
pub use runner::{CalibrationJob, JobCompletion};
pub use state::{InMemoryJobStore, JobRecord, JobResult, JobStatus, JobStore};

/// Configuration for one calibration run. Immutable for the lifetime of
/// a job; round-trips through TOML for the CLI.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StackingSettings {
    #[serde(default)]
    pub method: StackMethod,
    pub cosmetic: Option<CosmeticSettings>,
    #[serde(default)]
    pub bias: BiasSettings,
    #[serde(default)]
    pub matching: MatchingOptions,
    /// Scale the master dark by median(lights)/median(darks).
    #[serde(default)]
    pub dark_scaling: bool,
    /// Storage path of an optional bad-pixel map image.
    pub bad_pixel_map: Option<String>,
    /// Storage path of a pre-built superdark; when present, stacking is
    /// bypassed and this artifact becomes the master directly.
    pub superdark: Option<String>,
    /// Working-set cap for resource control.
    #[serde(default = "default_max_frames")]
    pub max_frames: usize,
}

impl Default for StackingSettings {
    fn default() -> Self {
        Self {
            method: StackMethod::default(),
            cosmetic: None,
            bias: BiasSettings::default(),
            matching: MatchingOptions::default(),
            dark_scaling: false,
            bad_pixel_map: None,
            superdark: None,
            max_frames: default_max_frames(),
        }
    }
}

fn default_max_frames() -> usize {
    MAX_FRAMES_PER_JOB
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CosmeticSettings {
    pub method: CosmeticMethod,
    pub threshold: f32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BiasSettings {
    /// Subtract a master bias from dark frames before stacking.
    pub enabled: bool,
    /// Explicit master-bias path; when absent the lexicographically
    /// latest entry under `master-bias/` is used.
    pub master_path: Option<String>,
}

/// Input set for one job.
#[derive(Clone, Debug)]
pub struct JobRequest {
    pub bucket: String,
    pub inputs: Vec<String>,
    /// Reference light frames for temperature/exposure matching and dark
    /// scaling. May be empty.
    pub reference_lights: Vec<String>,
}
