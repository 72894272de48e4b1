use vesta_core::frame::{FrameType, ImageBuffer};
use vesta_core::quality::{histogram, master_stats, score, MasterStats};

fn stats(mean: f32, std: f32, min: f32, max: f32, outlier_ratio: f64) -> MasterStats {
    MasterStats {
        mean,
        median: mean,
        std,
        min,
        max,
        outlier_ratio,
        histogram: vec![],
    }
}

// ---------------------------------------------------------------------------
// scoring table
// ---------------------------------------------------------------------------

#[test]
fn test_clean_bias_scores_ten() {
    let s = stats(500.0, 8.0, 490.0, 520.0, 0.0);
    let q = score(&s, 30, FrameType::Bias);
    assert_eq!(q.score, 10.0);
    assert!(q.recommendations.is_empty());
}

#[test]
fn test_noisy_underpopulated_bias_deductions() {
    // std > 15 (-2) and n_frames < 20 (-2)
    let s = stats(500.0, 20.0, 490.0, 520.0, 0.0);
    let q = score(&s, 10, FrameType::Bias);
    assert_eq!(q.score, 6.0);
    assert_eq!(q.recommendations.len(), 2);
}

#[test]
fn test_dark_outlier_ratio_dominates() {
    // outlier (-3), std > 30 (-2), n < 15 (-2)
    let s = stats(100.0, 40.0, 10.0, 300.0, 0.01);
    let q = score(&s, 5, FrameType::Dark);
    assert_eq!(q.score, 3.0);
}

#[test]
fn test_flat_saturation_and_underexposure() {
    // min < 1000 (-1), max > 60000 (-2), n < 10 (-2); std is healthy
    let s = stats(30000.0, 5000.0, 500.0, 65000.0, 0.0);
    let q = score(&s, 5, FrameType::Flat);
    assert_eq!(q.score, 5.0);
}

#[test]
fn test_unknown_type_worst_case_clamps_to_zero() {
    // -3 -2 -1 -1 -2 = -9, score 1.0; add nothing else so clamp stays in range
    let s = stats(100.0, 800.0, -5.0, 65000.0, 0.05);
    let q = score(&s, 3, FrameType::Unknown);
    assert_eq!(q.score, 1.0);
    assert_eq!(q.recommendations.len(), 5);
}

#[test]
fn test_light_frames_use_generic_rules() {
    let s = stats(100.0, 800.0, 10.0, 30000.0, 0.0);
    let q = score(&s, 20, FrameType::Light);
    // Only std > 500 fires
    assert_eq!(q.score, 8.0);
}

// ---------------------------------------------------------------------------
// statistics and histogram
// ---------------------------------------------------------------------------

#[test]
fn test_master_stats_constant_image() {
    let image = ImageBuffer::from_elem(8, 8, 42.0);
    let s = master_stats(&image, 0.0);
    assert!((s.mean - 42.0).abs() < 1e-5);
    assert!((s.median - 42.0).abs() < 1e-5);
    assert_eq!(s.std, 0.0);
    assert_eq!(s.min, 42.0);
    assert_eq!(s.max, 42.0);
    assert_eq!(s.histogram.len(), 64);
    // Flat image: everything lands in the first bin
    assert_eq!(s.histogram[0], 64);
}

#[test]
fn test_histogram_counts_sum_to_pixel_count() {
    let mut image = ImageBuffer::from_elem(8, 8, 0.0);
    for (i, v) in image.data.iter_mut().enumerate() {
        *v = i as f32;
    }
    let h = histogram(&image, 64);
    assert_eq!(h.iter().sum::<u32>(), 64);
    assert_eq!(h.len(), 64);
}
