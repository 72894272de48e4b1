pub mod mean;
pub mod median;
pub mod sigma;
pub mod winsorized;
pub mod minmax;
pub mod linear_fit;
pub mod percentile;
pub mod entropy;
pub mod superbias;

mod reduce;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis;
use crate::consts::DEFAULT_SIGMA_THRESHOLD;
use crate::error::{Result, VestaError};
use crate::frame::{check_shapes, ImageBuffer};

/// Pixel-wise combination method. Closed set; configuration strings that
/// do not name one of these fail at parse time with
/// [`VestaError::UnsupportedMethod`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum StackMethod {
    Mean,
    Median,
    Sigma { sigma: f32 },
    Winsorized { sigma: f32 },
    Minmax,
    LinearFit { sigma: f32 },
    PercentileClip { threshold: Option<f32> },
    EntropyWeighted,
    Superbias,
    Adaptive { sigma: Option<f32> },
}

impl StackMethod {
    /// Parse a configuration-supplied method name. An optional threshold
    /// feeds the sigma/percentile parameter of methods that take one.
    pub fn parse(name: &str, threshold: Option<f32>) -> Result<Self> {
        let sigma = threshold.unwrap_or(DEFAULT_SIGMA_THRESHOLD);
        Ok(match name {
            "mean" => Self::Mean,
            "median" => Self::Median,
            "sigma" => Self::Sigma { sigma },
            "winsorized" => Self::Winsorized { sigma },
            "minmax" => Self::Minmax,
            "linear_fit" => Self::LinearFit { sigma },
            "percentile_clip" => Self::PercentileClip { threshold },
            "entropy_weighted" => Self::EntropyWeighted,
            "superbias" => Self::Superbias,
            "adaptive" => Self::Adaptive { sigma: threshold },
            other => return Err(VestaError::UnsupportedMethod(other.to_string())),
        })
    }

    /// Stable name used in logs, diagnostics, and the persisted result.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Sigma { .. } => "sigma",
            Self::Winsorized { .. } => "winsorized",
            Self::Minmax => "minmax",
            Self::LinearFit { .. } => "linear_fit",
            Self::PercentileClip { .. } => "percentile_clip",
            Self::EntropyWeighted => "entropy_weighted",
            Self::Superbias => "superbias",
            Self::Adaptive { .. } => "adaptive",
        }
    }
}

impl Default for StackMethod {
    fn default() -> Self {
        Self::Sigma {
            sigma: DEFAULT_SIGMA_THRESHOLD,
        }
    }
}

/// Combined image plus any fallback warnings the method emitted.
#[derive(Clone, Debug)]
pub struct StackOutcome {
    pub image: ImageBuffer,
    /// Concrete method that produced the image (differs from the request
    /// only for `Adaptive`).
    pub method: StackMethod,
    pub warnings: Vec<String>,
}

/// Combine a stack of same-shape buffers into one master buffer.
///
/// `Adaptive` resolves to a concrete method once (via the frame analyzer's
/// recommendation) and then dispatches; the recommendation never yields
/// `Adaptive` again, so there is no recursion.
pub fn combine(buffers: &[ImageBuffer], method: &StackMethod) -> Result<StackOutcome> {
    check_shapes(buffers)?;
    let mut warnings = Vec::new();

    let method = if let StackMethod::Adaptive { sigma } = method {
        let stats = analysis::analyze(buffers)?;
        let requested = StackMethod::Sigma {
            sigma: sigma.unwrap_or(DEFAULT_SIGMA_THRESHOLD),
        };
        let rec = analysis::recommend(&stats, &requested);
        info!(
            method = rec.method.label(),
            reason = rec.reason.as_str(),
            "Adaptive selector resolved method"
        );
        warnings.push(format!(
            "adaptive selected {}: {}",
            rec.method.label(),
            rec.reason
        ));
        rec.method
    } else {
        method.clone()
    };

    let image = match &method {
        StackMethod::Mean => mean::mean_stack(buffers)?,
        StackMethod::Median => median::median_stack(buffers)?,
        StackMethod::Sigma { sigma } => sigma::sigma_clip_stack(buffers, *sigma)?,
        StackMethod::Winsorized { sigma } => winsorized::winsorized_stack(buffers, *sigma)?,
        StackMethod::Minmax => minmax::minmax_stack(buffers, &mut warnings)?,
        StackMethod::LinearFit { sigma } => {
            linear_fit::linear_fit_stack(buffers, *sigma, &mut warnings)?
        }
        StackMethod::PercentileClip { threshold } => {
            percentile::percentile_clip_stack(buffers, *threshold, &mut warnings)?
        }
        StackMethod::EntropyWeighted => entropy::entropy_weighted_stack(buffers)?,
        StackMethod::Superbias => superbias::superbias_stack(buffers)?,
        StackMethod::Adaptive { .. } => {
            unreachable!("adaptive resolves to a concrete method above")
        }
    };

    Ok(StackOutcome {
        image,
        method,
        warnings,
    })
}
