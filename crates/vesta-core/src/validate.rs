//! Per-frame quality gate driven by collaborator-reported header metadata.

use tracing::debug;

use crate::consts::VALIDATION_MIN_CONFIDENCE;
use crate::frame::{FrameRecord, ValidationStatus};

/// Frames split by the validation gate.
#[derive(Debug, Default)]
pub struct Partition {
    pub valid: Vec<FrameRecord>,
    pub rejected: Vec<FrameRecord>,
}

/// Validate one frame: header confidence must reach 0.7 and no warning
/// may report a missing or mandatory field ("Missing" / "must").
pub fn validate(record: &mut FrameRecord) {
    let mut reasons = Vec::new();

    if record.header.confidence < VALIDATION_MIN_CONFIDENCE {
        reasons.push(format!(
            "header confidence {:.2} below {:.2}",
            record.header.confidence, VALIDATION_MIN_CONFIDENCE
        ));
    }

    for warning in &record.header.warnings {
        if warning.contains("Missing") || warning.contains("must") {
            reasons.push(format!("critical header warning: {warning}"));
        }
    }

    if reasons.is_empty() {
        record.validation = ValidationStatus::Valid;
    } else {
        debug!(frame = %record.file_name(), ?reasons, "Frame rejected");
        record.validation = ValidationStatus::Rejected;
        record.rejection_reasons = reasons;
    }
}

/// Validate every frame and partition into valid/rejected.
///
/// `checkpoint` runs after each frame; the job passes its cancellation
/// poll here.
pub fn partition<F>(records: Vec<FrameRecord>, mut checkpoint: F) -> crate::error::Result<Partition>
where
    F: FnMut() -> crate::error::Result<()>,
{
    let mut out = Partition::default();
    for mut record in records {
        validate(&mut record);
        match record.validation {
            ValidationStatus::Valid => out.valid.push(record),
            _ => out.rejected.push(record),
        }
        checkpoint()?;
    }
    Ok(out)
}
