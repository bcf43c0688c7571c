// SPDX-License-Identifier: GPL-3.0-only

//! Photo encoding
//!
//! Backends use [`encode_jpeg`] to produce the file data they deliver for a
//! capture. [`PhotoEncoder`] writes decoded captures back to disk for the
//! command-line front end.

use super::decoding::CapturedImage;
use crate::constants::photo;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Supported encoding formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingFormat {
    /// JPEG format (lossy compression)
    #[default]
    Jpeg,
    /// PNG format (lossless compression)
    Png,
}

impl EncodingFormat {
    /// Get file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            EncodingFormat::Jpeg => "jpg",
            EncodingFormat::Png => "png",
        }
    }

    /// Pick the format matching a path's extension, JPEG otherwise
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => EncodingFormat::Png,
            _ => EncodingFormat::Jpeg,
        }
    }
}

/// Encode an RGB image as JPEG
pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, String> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
        .write_image(
            image.as_raw(),
            image.width(),
            image.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| format!("JPEG encoding failed: {}", e))?;
    Ok(buffer)
}

/// Encoded image data ready for saving
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub format: EncodingFormat,
    pub width: u32,
    pub height: u32,
}

/// Encoder for captured photos
#[derive(Debug, Clone)]
pub struct PhotoEncoder {
    format: EncodingFormat,
    jpeg_quality: u8,
}

impl PhotoEncoder {
    /// JPEG at the default quality
    pub fn new() -> Self {
        Self {
            format: EncodingFormat::Jpeg,
            jpeg_quality: photo::DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn set_format(&mut self, format: EncodingFormat) {
        self.format = format;
    }

    /// Set JPEG quality (1-100)
    pub fn set_quality(&mut self, quality: u8) {
        self.jpeg_quality = quality.clamp(1, 100);
    }

    /// Encode a captured image on a blocking worker
    pub async fn encode(&self, captured: &CapturedImage) -> Result<EncodedImage, String> {
        let format = self.format;
        let quality = self.jpeg_quality;
        let image = captured.image.clone();

        info!(
            width = image.width(),
            height = image.height(),
            format = ?format,
            "Starting encoding"
        );

        // CPU-bound, keep it off the async workers
        tokio::task::spawn_blocking(move || {
            let (width, height) = image.dimensions();
            let data = match format {
                EncodingFormat::Jpeg => {
                    // JPEG has no alpha channel
                    let rgb = DynamicImage::ImageRgba8(image).to_rgb8();
                    encode_jpeg(&rgb, quality)?
                }
                EncodingFormat::Png => {
                    let mut buffer = Vec::new();
                    PngEncoder::new(&mut buffer)
                        .write_image(image.as_raw(), width, height, ExtendedColorType::Rgba8)
                        .map_err(|e| format!("PNG encoding failed: {}", e))?;
                    buffer
                }
            };

            debug!(size = data.len(), "Encoding complete");

            Ok(EncodedImage {
                data,
                format,
                width,
                height,
            })
        })
        .await
        .map_err(|e| format!("Encoding task error: {}", e))?
    }

    /// Save to `output_dir` under a timestamped name
    pub async fn save(
        &self,
        encoded: EncodedImage,
        output_dir: PathBuf,
    ) -> Result<PathBuf, String> {
        let filename = format!(
            "{}_{}.{}",
            photo::PHOTO_PREFIX,
            chrono::Local::now().format("%Y%m%d_%H%M%S"),
            encoded.format.extension()
        );
        self.save_to(encoded, output_dir.join(filename)).await
    }

    /// Save to an explicit path, creating parent directories
    pub async fn save_to(&self, encoded: EncodedImage, path: PathBuf) -> Result<PathBuf, String> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
        }

        tokio::fs::write(&path, &encoded.data)
            .await
            .map_err(|e| format!("Failed to write {}: {}", path.display(), e))?;

        info!(
            path = %path.display(),
            width = encoded.width,
            height = encoded.height,
            "Photo saved"
        );
        Ok(path)
    }
}

impl Default for PhotoEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jpeg_roundtrips_through_image_crate() {
        let image = RgbImage::from_pixel(16, 8, image::Rgb([200, 10, 10]));
        let bytes = encode_jpeg(&image, 90).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (16, 8));
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            EncodingFormat::from_path(Path::new("shot.PNG")),
            EncodingFormat::Png
        );
        assert_eq!(
            EncodingFormat::from_path(Path::new("shot")),
            EncodingFormat::Jpeg
        );
    }
}
