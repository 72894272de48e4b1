use ndarray::Array2;

use vesta_core::correct::cosmetic::{correct, CosmeticMethod};
use vesta_core::error::{Result, VestaError};
use vesta_core::frame::{BadPixelMap, ImageBuffer};
use vesta_core::metadata::CosmicRayDetector;

#[test]
fn test_hot_pixel_repaired_with_neighborhood_median() {
    let mut image = ImageBuffer::from_elem(5, 5, 10.0);
    image.data[[2, 2]] = 1000.0;

    let (fixed, _) = correct(&image, CosmeticMethod::HotPixelMap, 2.0, None, None).unwrap();
    assert!((fixed.data[[2, 2]] - 10.0).abs() < 1e-5);
    // Input untouched
    assert!((image.data[[2, 2]] - 1000.0).abs() < 1e-5);
}

#[test]
fn test_hot_pixel_noop_when_nothing_flagged() {
    let image = ImageBuffer::from_elem(5, 5, 10.0);
    let (fixed, warnings) =
        correct(&image, CosmeticMethod::HotPixelMap, 3.0, None, None).unwrap();
    assert_eq!(fixed.data, image.data);
    assert!(warnings.is_empty());
}

#[test]
fn test_bad_pixel_map_applied_before_statistics() {
    let mut image = ImageBuffer::from_elem(5, 5, 10.0);
    image.data[[0, 0]] = 500.0;

    let mut mask = Array2::from_elem((5, 5), false);
    mask[[0, 0]] = true;
    let map = BadPixelMap::new(mask);

    let (fixed, _) = correct(
        &image,
        CosmeticMethod::HotPixelMap,
        5.0,
        Some(&map),
        None,
    )
    .unwrap();
    // Corner pixel repaired from its reflect-padded neighborhood.
    assert!((fixed.data[[0, 0]] - 10.0).abs() < 1e-5);
}

#[test]
fn test_bad_pixel_map_shape_mismatch() {
    let image = ImageBuffer::from_elem(5, 5, 10.0);
    let map = BadPixelMap::new(Array2::from_elem((4, 4), false));
    let err = correct(&image, CosmeticMethod::HotPixelMap, 3.0, Some(&map), None).unwrap_err();
    assert!(matches!(err, VestaError::ShapeMismatch { .. }));
}

#[test]
fn test_la_cosmic_requires_detector() {
    let image = ImageBuffer::from_elem(5, 5, 10.0);
    let err = correct(&image, CosmeticMethod::LaCosmic, 4.0, None, None).unwrap_err();
    assert!(matches!(err, VestaError::ExternalTool(_)));
}

struct HalvingDetector;

impl CosmicRayDetector for HalvingDetector {
    fn clean(&self, image: &ImageBuffer, _sigma: f32) -> Result<ImageBuffer> {
        Ok(ImageBuffer::new(&image.data * 0.5))
    }
}

#[test]
fn test_la_cosmic_delegates_to_detector() {
    let image = ImageBuffer::from_elem(5, 5, 10.0);
    let detector = HalvingDetector;
    let (fixed, warnings) = correct(
        &image,
        CosmeticMethod::LaCosmic,
        4.0,
        None,
        Some(&detector),
    )
    .unwrap();
    assert!((fixed.data[[0, 0]] - 5.0).abs() < 1e-5);
    assert!(!warnings.is_empty());
}
