use std::io::Cursor;

use image::{GrayImage, ImageFormat, ImageReader, Luma};
use ndarray::Array2;

use crate::consts::{PREVIEW_STRETCH_HIGH, PREVIEW_STRETCH_LOW};
use crate::error::{Result, VestaError};
use crate::frame::ImageBuffer;

/// Extensions the download filter accepts as image frames.
const IMAGE_EXTENSIONS: &[&str] = &["fits", "fit", "fts", "png", "tif", "tiff", "f32"];

pub fn is_image_file(name: &str) -> bool {
    name.rsplit('.')
        .next()
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Decode downloaded bytes into a grayscale buffer in ADU (0..65535).
///
/// `.f32` is the crate's own raw master format; everything else goes
/// through the `image` crate. Color inputs are collapsed to 16-bit luma.
pub fn decode_image(bytes: &[u8], name: &str) -> Result<ImageBuffer> {
    let ext = name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    if ext == "f32" {
        return super::master::decode_master(bytes);
    }

    let decoded = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| VestaError::Pipeline(format!("cannot sniff format of {name}: {e}")))?
        .decode()?;
    let gray = decoded.to_luma16();
    let (w, h) = gray.dimensions();

    let mut data = Array2::<f32>::zeros((h as usize, w as usize));
    for (x, y, pixel) in gray.enumerate_pixels() {
        data[[y as usize, x as usize]] = pixel.0[0] as f32;
    }
    Ok(ImageBuffer::new(data))
}

/// Render the 8-bit preview: percentile stretch from the 1st to the 99th
/// percentile of the master's pixel values.
pub fn render_preview(image: &ImageBuffer) -> GrayImage {
    let lo = image.percentile(PREVIEW_STRETCH_LOW);
    let hi = image.percentile(PREVIEW_STRETCH_HIGH);
    let span = (hi - lo).max(f32::EPSILON);

    let h = image.height();
    let w = image.width();
    let mut out = GrayImage::new(w as u32, h as u32);
    for row in 0..h {
        for col in 0..w {
            let v = ((image.data[[row, col]] - lo) / span).clamp(0.0, 1.0);
            out.put_pixel(col as u32, row as u32, Luma([(v * 255.0) as u8]));
        }
    }
    out
}

/// Encode the stretched preview as PNG bytes.
pub fn encode_preview_png(image: &ImageBuffer) -> Result<Vec<u8>> {
    let preview = render_preview(image);
    let mut bytes = Vec::new();
    preview.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
    Ok(bytes)
}
