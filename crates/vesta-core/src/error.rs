use thiserror::Error;

#[derive(Error, Debug)]
pub enum VestaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shape mismatch: expected {expected_height}x{expected_width}, got {height}x{width}")]
    ShapeMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },

    #[error("Unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("No valid frames: all {rejected} input frames were rejected")]
    NoValidFrames { rejected: usize },

    #[error("Download failed for {path}: {reason}")]
    Download { path: String, reason: String },

    #[error("External tool error: {0}")]
    ExternalTool(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid master artifact: {0}")]
    InvalidMaster(String),

    #[error("Image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Empty frame stack")]
    EmptyStack,

    #[error("Job cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, VestaError>;
