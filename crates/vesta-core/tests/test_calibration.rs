use std::path::PathBuf;

use approx::assert_abs_diff_eq;
use vesta_core::correct::calibration::{
    auto_select_bias, dark_scale_factor, match_reference, subtract_bias, MatchingOptions,
};
use vesta_core::error::VestaError;
use vesta_core::frame::{FrameHeader, FrameRecord, ImageBuffer};
use vesta_core::storage::{FsStorage, ObjectStorage};

fn record(name: &str, fill: f32, temp: Option<f32>, exposure: Option<f32>) -> FrameRecord {
    let header = FrameHeader {
        frame_type: None,
        ccd_temp: temp,
        exposure_secs: exposure,
        confidence: 1.0,
        warnings: vec![],
    };
    FrameRecord::new(PathBuf::from(name), header, ImageBuffer::from_elem(4, 4, fill))
}

// ---------------------------------------------------------------------------
// bias subtraction
// ---------------------------------------------------------------------------

#[test]
fn test_subtract_bias_produces_derived_records() {
    let darks = vec![record("d1.f32", 110.0, None, None)];
    let bias = ImageBuffer::from_elem(4, 4, 10.0);

    let out = subtract_bias(&darks, &bias, || Ok(())).unwrap();
    assert_eq!(out.len(), 1);
    assert!((out[0].buffer.data[[0, 0]] - 100.0).abs() < 1e-5);
    // Original untouched
    assert!((darks[0].buffer.data[[0, 0]] - 110.0).abs() < 1e-5);
}

#[test]
fn test_subtract_bias_shape_mismatch_is_fatal() {
    let darks = vec![record("d1.f32", 110.0, None, None)];
    let bias = ImageBuffer::from_elem(8, 8, 10.0);
    let err = subtract_bias(&darks, &bias, || Ok(())).unwrap_err();
    assert!(matches!(err, VestaError::ShapeMismatch { .. }));
}

#[test]
fn test_subtract_bias_honors_checkpoint() {
    let darks = vec![
        record("d1.f32", 110.0, None, None),
        record("d2.f32", 110.0, None, None),
    ];
    let bias = ImageBuffer::from_elem(4, 4, 10.0);
    let err = subtract_bias(&darks, &bias, || Err(VestaError::Cancelled)).unwrap_err();
    assert!(matches!(err, VestaError::Cancelled));
}

// ---------------------------------------------------------------------------
// auto bias selection
// ---------------------------------------------------------------------------

#[test]
fn test_auto_select_bias_picks_latest_name() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FsStorage::new(dir.path());
    storage
        .upload("cal", "master-bias/2024-01-01.f32", b"a", false)
        .unwrap();
    storage
        .upload("cal", "master-bias/2024-06-15.f32", b"b", false)
        .unwrap();

    let picked = auto_select_bias(&storage, "cal").unwrap();
    assert_eq!(picked, "master-bias/2024-06-15.f32");
}

#[test]
fn test_auto_select_bias_empty_prefix_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let storage = FsStorage::new(dir.path());
    assert!(auto_select_bias(&storage, "cal").is_err());
}

// ---------------------------------------------------------------------------
// temperature / exposure matching
// ---------------------------------------------------------------------------

fn reference(temp: f32, exposure: f32) -> FrameHeader {
    FrameHeader {
        frame_type: None,
        ccd_temp: Some(temp),
        exposure_secs: Some(exposure),
        confidence: 1.0,
        warnings: vec![],
    }
}

#[test]
fn test_matching_keeps_frames_within_tolerance() {
    let darks = vec![
        record("d1.f32", 1.0, Some(-10.2), Some(60.0)),
        record("d2.f32", 1.0, Some(-15.0), Some(60.0)),
    ];
    let mut warnings = Vec::new();
    let kept = match_reference(
        darks,
        &reference(-10.0, 60.05),
        MatchingOptions {
            temperature: true,
            exposure: true,
        },
        &mut warnings,
    );
    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].file_name(), "d1.f32");
    assert!(warnings.is_empty());
}

#[test]
fn test_matching_falls_back_when_all_rejected() {
    let darks = vec![
        record("d1.f32", 1.0, Some(-25.0), Some(60.0)),
        record("d2.f32", 1.0, Some(-30.0), Some(60.0)),
    ];
    let mut warnings = Vec::new();
    let kept = match_reference(
        darks,
        &reference(-10.0, 60.0),
        MatchingOptions {
            temperature: true,
            exposure: false,
        },
        &mut warnings,
    );
    assert_eq!(kept.len(), 2, "unfiltered set must come back");
    assert!(warnings.iter().any(|w| w.contains("unfiltered")));
}

#[test]
fn test_matching_disabled_is_passthrough() {
    let darks = vec![record("d1.f32", 1.0, Some(-25.0), Some(60.0))];
    let mut warnings = Vec::new();
    let kept = match_reference(
        darks,
        &reference(-10.0, 1.0),
        MatchingOptions::default(),
        &mut warnings,
    );
    assert_eq!(kept.len(), 1);
}

// ---------------------------------------------------------------------------
// dark scaling
// ---------------------------------------------------------------------------

#[test]
fn test_dark_scale_factor_clamps_extremes() {
    let lights = vec![ImageBuffer::from_elem(4, 4, 1000.0)];
    let darks = vec![ImageBuffer::from_elem(4, 4, 100.0)];
    // Raw ratio 10.0 clamps to 2.0
    assert_abs_diff_eq!(dark_scale_factor(&lights, &darks), 2.0, epsilon = 1e-6);

    let dim_lights = vec![ImageBuffer::from_elem(4, 4, 1.0)];
    // Raw ratio 0.01 clamps to 0.5
    assert_abs_diff_eq!(dark_scale_factor(&dim_lights, &darks), 0.5, epsilon = 1e-6);
}

#[test]
fn test_dark_scale_factor_in_range_passes_through() {
    let lights = vec![ImageBuffer::from_elem(4, 4, 150.0)];
    let darks = vec![ImageBuffer::from_elem(4, 4, 100.0)];
    assert_abs_diff_eq!(dark_scale_factor(&lights, &darks), 1.5, epsilon = 1e-6);
}

#[test]
fn test_dark_scale_factor_defaults_to_one() {
    let darks = vec![ImageBuffer::from_elem(4, 4, 100.0)];
    assert_eq!(dark_scale_factor(&[], &darks), 1.0);

    let lights = vec![ImageBuffer::from_elem(4, 4, 150.0)];
    let zero_darks = vec![ImageBuffer::from_elem(4, 4, 0.0)];
    assert_eq!(dark_scale_factor(&lights, &zero_darks), 1.0);
}
