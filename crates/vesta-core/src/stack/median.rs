use crate::error::Result;
use crate::frame::{median_mut, ImageBuffer};

use super::reduce::per_pixel_reduce;

/// Per-pixel median across the stack.
///
/// Even frame counts use the conventional average-of-two-middle-values
/// median.
pub fn median_stack(buffers: &[ImageBuffer]) -> Result<ImageBuffer> {
    per_pixel_reduce(buffers, |values| median_mut(values))
}
