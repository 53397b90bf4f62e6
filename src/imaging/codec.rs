//! Image codec seam
//!
//! Decoding accepts anything the `image` crate recognizes (comic hosts mix
//! JPEG with PNG and WebP); encoding always produces baseline JPEG.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageError};

/// Decodes page payloads and encodes images for disk
pub trait ImageCodec: Send + Sync {
    /// Decodes raw bytes into an in-memory bitmap
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageError>;

    /// Encodes a bitmap at the given quality (1-100)
    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError>;

    /// File extension matching `encode` output, without the dot
    fn extension(&self) -> &'static str;

    /// Largest width or height `encode` accepts
    fn max_dimension(&self) -> u32;
}

/// Production codec backed by the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegCodec;

impl ImageCodec for JpegCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageError> {
        image::load_from_memory(bytes)
    }

    fn encode(&self, image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImageError> {
        let mut buffer = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);

        // JPEG has no alpha channel; flatten everything else to RGB first
        match image {
            DynamicImage::ImageRgb8(rgb) => encoder.write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?,
            other => {
                let rgb = other.to_rgb8();
                encoder.write_image(
                    rgb.as_raw(),
                    rgb.width(),
                    rgb.height(),
                    ExtendedColorType::Rgb8,
                )?
            }
        }

        Ok(buffer)
    }

    fn extension(&self) -> &'static str {
        "jpg"
    }

    fn max_dimension(&self) -> u32 {
        // JPEG frame headers store each side in 16 bits
        u32::from(u16::MAX)
    }
}
