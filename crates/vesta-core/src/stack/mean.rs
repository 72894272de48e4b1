use ndarray::Array2;

use crate::error::{Result, VestaError};
use crate::frame::ImageBuffer;

/// Arithmetic mean across the stack at each pixel.
pub fn mean_stack(buffers: &[ImageBuffer]) -> Result<ImageBuffer> {
    let first = buffers.first().ok_or(VestaError::EmptyStack)?;
    let (h, w) = first.dim();
    let n = buffers.len() as f32;

    let mut sum = Array2::<f32>::zeros((h, w));
    for buf in buffers {
        sum += &buf.data;
    }
    sum /= n;

    Ok(ImageBuffer::new(sum))
}
