use vesta_core::analysis::{analyze, recommend, SetStatistics};
use vesta_core::frame::ImageBuffer;
use vesta_core::stack::StackMethod;

fn stats(n_frames: usize, global_variance: f64, outlier_ratio: f64) -> SetStatistics {
    SetStatistics {
        n_frames,
        mean: 100.0,
        std: global_variance.sqrt(),
        global_variance,
        outlier_ratio,
    }
}

#[test]
fn test_analyze_identical_frames() {
    let frames: Vec<ImageBuffer> = (0..4).map(|_| ImageBuffer::from_elem(8, 8, 7.0)).collect();
    let s = analyze(&frames).unwrap();
    assert_eq!(s.n_frames, 4);
    assert!(s.global_variance < 1e-9);
    assert_eq!(s.outlier_ratio, 0.0);
    assert!((s.mean - 7.0).abs() < 1e-6);
}

#[test]
fn test_analyze_shape_mismatch() {
    let frames = vec![
        ImageBuffer::from_elem(8, 8, 1.0),
        ImageBuffer::from_elem(4, 8, 1.0),
    ];
    assert!(analyze(&frames).is_err());
}

#[test]
fn test_recommend_outliers_few_frames_prefers_median() {
    let rec = recommend(&stats(5, 500.0, 0.01), &StackMethod::Mean);
    assert_eq!(rec.method, StackMethod::Median);
    assert!(rec.reason.contains("few frames"));
}

#[test]
fn test_recommend_outliers_many_frames_prefers_sigma_2_5() {
    let rec = recommend(&stats(20, 500.0, 0.01), &StackMethod::Mean);
    assert_eq!(rec.method, StackMethod::Sigma { sigma: 2.5 });
}

#[test]
fn test_recommend_low_variance_prefers_mean() {
    let rec = recommend(&stats(20, 5.0, 0.0), &StackMethod::Superbias);
    assert_eq!(rec.method, StackMethod::Mean);
    assert!(rec.reason.contains("low variance"));
}

#[test]
fn test_recommend_few_frames_prefers_median() {
    let rec = recommend(&stats(3, 500.0, 0.0), &StackMethod::Sigma { sigma: 3.0 });
    assert_eq!(rec.method, StackMethod::Median);
}

#[test]
fn test_recommend_passes_request_through() {
    let requested = StackMethod::Winsorized { sigma: 2.0 };
    let rec = recommend(&stats(20, 500.0, 0.0), &requested);
    assert_eq!(rec.method, requested);
}

#[test]
fn test_recommend_never_yields_adaptive() {
    // Sweep the rule space; the result must always be directly runnable.
    let requested = StackMethod::Adaptive { sigma: Some(2.0) };
    for n in [1, 3, 5, 10, 50] {
        for var in [0.0, 5.0, 500.0] {
            for outlier in [0.0, 0.0005, 0.01] {
                let rec = recommend(&stats(n, var, outlier), &requested);
                assert!(
                    !matches!(rec.method, StackMethod::Adaptive { .. }),
                    "recommend returned adaptive for n={n} var={var} outlier={outlier}"
                );
            }
        }
    }
}
