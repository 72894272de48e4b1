use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{Result, VestaError};
use crate::frame::ImageBuffer;

/// Apply a per-pixel reduction across the frame stack.
///
/// The closure receives the N samples for one pixel (ordered by frame
/// index) and returns the combined value. Rows are processed in parallel
/// via Rayon for images >= 256x256; each row owns its scratch buffer, so
/// the closure only needs `Sync`.
pub(super) fn per_pixel_reduce<F>(buffers: &[ImageBuffer], reduce: F) -> Result<ImageBuffer>
where
    F: Fn(&mut [f32]) -> f32 + Sync,
{
    let first = buffers.first().ok_or(VestaError::EmptyStack)?;
    let (h, w) = first.dim();
    let n = buffers.len();

    let fill_row = |row: usize, pixel_values: &mut [f32], row_result: &mut [f32]| {
        for (col, result) in row_result.iter_mut().enumerate() {
            for (i, buf) in buffers.iter().enumerate() {
                pixel_values[i] = buf.data[[row, col]];
            }
            *result = reduce(pixel_values);
        }
    };

    let rows: Vec<Vec<f32>> = if h * w >= PARALLEL_PIXEL_THRESHOLD && n > 1 {
        (0..h)
            .into_par_iter()
            .map(|row| {
                let mut pixel_values = vec![0.0f32; n];
                let mut row_result = vec![0.0f32; w];
                fill_row(row, &mut pixel_values, &mut row_result);
                row_result
            })
            .collect()
    } else {
        let mut pixel_values = vec![0.0f32; n];
        (0..h)
            .map(|row| {
                let mut row_result = vec![0.0f32; w];
                fill_row(row, &mut pixel_values, &mut row_result);
                row_result
            })
            .collect()
    };

    let mut result = Array2::<f32>::zeros((h, w));
    for (row, row_data) in rows.into_iter().enumerate() {
        for (col, val) in row_data.into_iter().enumerate() {
            result[[row, col]] = val;
        }
    }

    Ok(ImageBuffer::new(result))
}

/// Mean and population standard deviation of a sample slice.
pub(super) fn mean_stddev(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f32>() / n;
    (mean, var.sqrt())
}
