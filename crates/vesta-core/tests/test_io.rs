use vesta_core::error::VestaError;
use vesta_core::frame::ImageBuffer;
use vesta_core::io::image_io::{decode_image, encode_preview_png, is_image_file};
use vesta_core::io::master::{decode_master, encode_master};

#[test]
fn test_master_codec_round_trip() {
    let mut image = ImageBuffer::from_elem(3, 5, 0.0);
    for (i, v) in image.data.iter_mut().enumerate() {
        *v = i as f32 * 1.5 - 2.0;
    }

    let decoded = decode_master(&encode_master(&image)).unwrap();
    assert_eq!(decoded.dim(), (3, 5));
    assert_eq!(decoded.data, image.data);
}

#[test]
fn test_decode_master_rejects_bad_magic() {
    let mut bytes = encode_master(&ImageBuffer::from_elem(2, 2, 1.0));
    bytes[0] = b'X';
    let err = decode_master(&bytes).unwrap_err();
    assert!(matches!(err, VestaError::InvalidMaster(_)));
}

#[test]
fn test_decode_master_rejects_truncated_payload() {
    let mut bytes = encode_master(&ImageBuffer::from_elem(2, 2, 1.0));
    bytes.truncate(bytes.len() - 4);
    assert!(decode_master(&bytes).is_err());
}

#[test]
fn test_extension_filter() {
    assert!(is_image_file("lights/dark_001.FIT"));
    assert!(is_image_file("bias.f32"));
    assert!(is_image_file("flat.tiff"));
    assert!(!is_image_file("notes.txt"));
    assert!(!is_image_file("README"));
}

#[test]
fn test_decode_image_routes_f32_by_extension() {
    let image = ImageBuffer::from_elem(4, 4, 123.0);
    let decoded = decode_image(&encode_master(&image), "masters/old.f32").unwrap();
    assert_eq!(decoded.data, image.data);
}

#[test]
fn test_preview_is_valid_png() {
    let mut image = ImageBuffer::from_elem(8, 8, 0.0);
    for (i, v) in image.data.iter_mut().enumerate() {
        *v = i as f32;
    }
    let bytes = encode_preview_png(&image).unwrap();
    assert_eq!(&bytes[1..4], b"PNG");

    let back = decode_image(&bytes, "preview.png").unwrap();
    assert_eq!(back.dim(), (8, 8));
}
