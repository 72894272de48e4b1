//! Collaborator traits for header inspection and cosmic-ray cleaning.
//!
//! The production deployments plug in a FITS-aware metadata service and an
//! L.A.Cosmic-style detector; the crate only fixes the interface and ships
//! a filename-token probe good enough for local runs and tests.

use std::path::Path;

use crate::error::Result;
use crate::frame::{FrameHeader, FrameType, ImageBuffer};

/// Inspects a decoded frame and reports header-derived metadata with a
/// confidence figure the validator gates on.
pub trait MetadataProbe: Send + Sync {
    fn inspect(&self, path: &Path, image: &ImageBuffer) -> FrameHeader;
}

/// External cosmic-ray detector used by the `la_cosmic` cosmetic method.
/// `sigma` maps to the detector's sigma-clip parameter.
pub trait CosmicRayDetector: Send + Sync {
    fn clean(&self, image: &ImageBuffer, sigma: f32) -> Result<ImageBuffer>;
}

/// Default probe: infers the frame type from filename tokens.
///
/// A recognized token gets high confidence; files with no recognizable
/// token still pass validation but are scored with the unknown-type
/// heuristics downstream.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilenameProbe;

impl MetadataProbe for FilenameProbe {
    fn inspect(&self, path: &Path, _image: &ImageBuffer) -> FrameHeader {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let frame_type = FrameType::from_name(&name);

        let (confidence, warnings) = if frame_type == FrameType::Unknown {
            (
                0.75,
                vec!["frame type not inferable from filename".to_string()],
            )
        } else {
            (0.95, Vec::new())
        };

        FrameHeader {
            frame_type: Some(frame_type),
            ccd_temp: None,
            exposure_secs: None,
            confidence,
            warnings,
        }
    }
}
