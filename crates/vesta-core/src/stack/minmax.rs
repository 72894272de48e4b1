use tracing::warn;

use crate::error::Result;
use crate::frame::ImageBuffer;

use super::mean::mean_stack;
use super::reduce::per_pixel_reduce;

/// Min-max rejection mean: drop the single lowest and single highest
/// sample at each pixel and average the rest.
///
/// Needs more than two frames to have anything left after rejection;
/// smaller stacks fall back to a plain mean with a warning.
pub fn minmax_stack(buffers: &[ImageBuffer], warnings: &mut Vec<String>) -> Result<ImageBuffer> {
    let n = buffers.len();
    if n <= 2 {
        warn!(n_frames = n, "minmax needs more than 2 frames, using mean");
        warnings.push(format!(
            "minmax requires more than 2 frames (got {n}), fell back to mean"
        ));
        return mean_stack(buffers);
    }

    per_pixel_reduce(buffers, |values| {
        values.sort_unstable_by(f32::total_cmp);
        let kept = &values[1..values.len() - 1];
        kept.iter().sum::<f32>() / kept.len() as f32
    })
}
