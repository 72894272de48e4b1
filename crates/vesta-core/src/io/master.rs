//! Raw master artifact: a little-endian f32 grid with a fixed header.
//!
//! Layout: 4-byte magic `VSTA`, u32 width, u32 height, then
//! `width * height` f32 samples row-major.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::Array2;

use crate::error::{Result, VestaError};
use crate::frame::ImageBuffer;

const MAGIC: &[u8; 4] = b"VSTA";

pub fn encode_master(image: &ImageBuffer) -> Vec<u8> {
    let (h, w) = image.dim();
    let mut bytes = Vec::with_capacity(12 + h * w * 4);
    bytes.extend_from_slice(MAGIC);
    bytes.write_u32::<LittleEndian>(w as u32).expect("vec write");
    bytes.write_u32::<LittleEndian>(h as u32).expect("vec write");
    for &v in image.data.iter() {
        bytes.write_f32::<LittleEndian>(v).expect("vec write");
    }
    bytes
}

pub fn decode_master(bytes: &[u8]) -> Result<ImageBuffer> {
    if bytes.len() < 12 || &bytes[..4] != MAGIC {
        return Err(VestaError::InvalidMaster(
            "missing VSTA magic header".to_string(),
        ));
    }
    let mut cursor = &bytes[4..];
    let w = cursor.read_u32::<LittleEndian>()? as usize;
    let h = cursor.read_u32::<LittleEndian>()? as usize;

    let expected = h * w * 4;
    if cursor.len() != expected {
        return Err(VestaError::InvalidMaster(format!(
            "payload is {} bytes, expected {expected} for {w}x{h}",
            cursor.len()
        )));
    }

    let mut data = Array2::<f32>::zeros((h, w));
    for v in data.iter_mut() {
        *v = cursor.read_f32::<LittleEndian>()?;
    }
    Ok(ImageBuffer::new(data))
}
