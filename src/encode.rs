//! JPEG encoding of transformed frames.

use crate::capture::{Frame, PixelFormat};
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use thiserror::Error;

/// Errors that can occur while encoding a frame.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("malformed frame: {width}x{height} {format:?} with {len} bytes")]
    MalformedFrame {
        width: u32,
        height: u32,
        format: PixelFormat,
        len: usize,
    },
    #[error("jpeg encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),
}

/// Compresses a frame to JPEG.
///
/// `quality` ranges over 0 to 100, higher meaning larger and better. The
/// codec's lowest setting is 1, so 0 encodes the same as 1.
pub fn encode(frame: &Frame, quality: u8) -> Result<Bytes, EncodeError> {
    if !frame.is_valid() {
        return Err(EncodeError::MalformedFrame {
            width: frame.width(),
            height: frame.height(),
            format: frame.format(),
            len: frame.pixels().len(),
        });
    }

    let quality = quality.clamp(1, 100);
    // An eighth of the raw size covers most frames at high quality.
    let mut buffer = Vec::with_capacity(frame.pixels().len() / 8);
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
        let (width, height) = (frame.width(), frame.height());

        match frame.format() {
            PixelFormat::Rgb8 => {
                encoder.encode(frame.pixels(), width, height, ExtendedColorType::Rgb8)?
            }
            PixelFormat::Bgr8 => {
                let rgb = bgr_to_rgb(frame.pixels());
                encoder.encode(&rgb, width, height, ExtendedColorType::Rgb8)?
            }
            PixelFormat::Gray8 => {
                encoder.encode(frame.pixels(), width, height, ExtendedColorType::L8)?
            }
        }
    }

    Ok(Bytes::from(buffer))
}

fn bgr_to_rgb(pixels: &[u8]) -> Vec<u8> {
    pixels
        .chunks_exact(3)
        .flat_map(|px| [px[2], px[1], px[0]])
        .collect()
}
