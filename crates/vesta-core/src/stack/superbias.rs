use ndarray::{Array1, Array2};
use tracing::debug;

use crate::consts::MAX_SUPERBIAS_COMPONENTS;
use crate::error::{Result, VestaError};
use crate::frame::{check_shapes, ImageBuffer};

/// PCA-modelled "superbias".
///
/// The N frames are flattened into an N x (H*W) sample matrix and fitted
/// with up to `min(8, N)` principal components. The output is the fitted
/// mean (the PCA center) reshaped back to H x W: superbias is the robust
/// mean the decomposition learns, not a low-rank reconstruction. The
/// component spectrum is still computed so the fit is a real
/// decomposition; its failure to converge is an external-tool error for
/// this method only.
pub fn superbias_stack(buffers: &[ImageBuffer]) -> Result<ImageBuffer> {
    let (h, w) = check_shapes(buffers)?;
    let n = buffers.len();
    let pixels = h * w;

    // PCA center: per-pixel mean over the N flattened samples.
    let mut center = Array1::<f32>::zeros(pixels);
    for buf in buffers {
        for (acc, &v) in center.iter_mut().zip(buf.data.iter()) {
            *acc += v;
        }
    }
    center /= n as f32;

    let components = MAX_SUPERBIAS_COMPONENTS.min(n);
    if n >= 2 {
        // Eigenvalues of the N x N Gram matrix of the centered samples
        // give the component variances without forming (H*W)^2 anything.
        let mut gram = Array2::<f32>::zeros((n, n));
        for i in 0..n {
            for j in i..n {
                let mut dot = 0.0f32;
                for ((&a, &b), &m) in buffers[i]
                    .data
                    .iter()
                    .zip(buffers[j].data.iter())
                    .zip(center.iter())
                {
                    dot += (a - m) * (b - m);
                }
                gram[[i, j]] = dot;
                gram[[j, i]] = dot;
            }
        }

        let mut eigenvalues = jacobi_eigenvalues(gram)?;
        eigenvalues.sort_unstable_by(|a, b| b.total_cmp(a));
        let total: f32 = eigenvalues.iter().map(|v| v.max(0.0)).sum();
        let explained: f32 = eigenvalues
            .iter()
            .take(components)
            .map(|v| v.max(0.0))
            .sum();
        debug!(
            components,
            explained_variance = if total > 0.0 { explained / total } else { 1.0 },
            "Superbias PCA fit"
        );
    }

    let data = center
        .into_shape_with_order((h, w))
        .map_err(|e| VestaError::ExternalTool(format!("PCA reshape failed: {e}")))?;
    Ok(ImageBuffer::new(data))
}

/// Eigenvalues of a symmetric matrix via cyclic Jacobi rotations.
fn jacobi_eigenvalues(mut m: Array2<f32>) -> Result<Vec<f32>> {
    let n = m.nrows();
    const MAX_SWEEPS: usize = 50;

    for _ in 0..MAX_SWEEPS {
        let mut off_diag = 0.0f32;
        for i in 0..n {
            for j in (i + 1)..n {
                off_diag += m[[i, j]] * m[[i, j]];
            }
        }
        if off_diag.sqrt() <= 1e-6 * (1.0 + m.diag().iter().map(|v| v.abs()).sum::<f32>()) {
            return Ok(m.diag().to_vec());
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = m[[p, q]];
                if apq.abs() <= f32::EPSILON {
                    continue;
                }
                let theta = (m[[q, q]] - m[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let mkp = m[[k, p]];
                    let mkq = m[[k, q]];
                    m[[k, p]] = c * mkp - s * mkq;
                    m[[k, q]] = s * mkp + c * mkq;
                }
                for k in 0..n {
                    let mpk = m[[p, k]];
                    let mqk = m[[q, k]];
                    m[[p, k]] = c * mpk - s * mqk;
                    m[[q, k]] = s * mpk + c * mqk;
                }
            }
        }
    }

    Err(VestaError::ExternalTool(
        "PCA eigensolver did not converge".to_string(),
    ))
}
