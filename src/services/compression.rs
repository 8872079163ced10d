use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;

/// Content type of every compressed output.
pub const OUTPUT_CONTENT_TYPE: &str = "image/jpeg";

/// Re-encodes images as lossy JPEG at a fixed quality.
///
/// Output is not stable under repetition: compressing a compressed image
/// degrades it further.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    quality: u8,
}

impl Compressor {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }

    /// Decode any supported format and encode it as JPEG.
    pub fn compress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        let decoded = image::load_from_memory(data).map_err(CompressionError::Decode)?;

        // JPEG has no alpha channel.
        let rgb = DynamicImage::ImageRgb8(decoded.to_rgb8());

        let mut output = Vec::with_capacity(data.len() / 2);
        rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut output, self.quality))
            .map_err(CompressionError::Encode)?;
        Ok(output)
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(50)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompressionError {
    #[error("Failed to decode image: {0}")]
    Decode(image::ImageError),

    #[error("Failed to encode JPEG: {0}")]
    Encode(image::ImageError),
}
