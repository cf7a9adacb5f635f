use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat, ImageReader};

use super::{CodecError, ImageCodec, OutputFormat};
use crate::exif;
use crate::orientation::GeometricTransform;

/// JPEG quality used when re-encoding rotated images.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// A decoded image: pixels plus the raw EXIF TIFF data found in the source file.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: DynamicImage,
    exif: Option<Vec<u8>>,
}

impl DecodedImage {
    /// Wrap pixels decoded elsewhere, optionally with raw EXIF TIFF data.
    pub fn from_parts(pixels: DynamicImage, exif: Option<Vec<u8>>) -> Self {
        Self { pixels, exif }
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn into_pixels(self) -> DynamicImage {
        self.pixels
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    /// Raw TIFF data of the EXIF block, if the source carried one.
    pub fn exif(&self) -> Option<&[u8]> {
        self.exif.as_deref()
    }
}

/// [`ImageCodec`] backed by the `image` crate, with `img-parts` for EXIF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageCrateCodec {
    jpeg_quality: u8,
}

impl Default for ImageCrateCodec {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl ImageCrateCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the JPEG quality used by [`encode`](ImageCodec::encode), clamped to `1..=100`.
    pub fn with_jpeg_quality(quality: u8) -> Self {
        Self {
            jpeg_quality: quality.clamp(1, 100),
        }
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
    }
}

fn decode_parts(bytes: &[u8]) -> Result<DecodedImage, CodecError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CodecError::Decode(e.to_string()))?;
    let pixels = reader.decode().map_err(|e| CodecError::Decode(e.to_string()))?;

    Ok(DecodedImage {
        pixels,
        exif: exif::extract_exif(bytes),
    })
}

impl ImageCodec for ImageCrateCodec {
    type Image = DecodedImage;

    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, CodecError> {
        // A decoder panic on a hostile payload is just another bad image.
        panic::catch_unwind(AssertUnwindSafe(|| decode_parts(bytes))).map_err(|_| {
            log::debug!("Image decoder panicked on {} byte payload", bytes.len());
            CodecError::DecoderPanicked
        })?
    }

    fn encode(&self, image: &DecodedImage, format: OutputFormat) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        match format {
            OutputFormat::Jpeg => {
                // Baseline JPEG has no alpha channel.
                let rgb = image.pixels.to_rgb8();
                JpegEncoder::new_with_quality(&mut buf, self.jpeg_quality)
                    .encode_image(&rgb)
                    .map_err(|e| CodecError::Encode(e.to_string()))?;
            }
            OutputFormat::Png => {
                image
                    .pixels
                    .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                    .map_err(|e| CodecError::Encode(e.to_string()))?;
            }
        }

        match &image.exif {
            Some(tiff) => exif::attach_exif(buf, tiff, format)
                .map_err(|e| CodecError::Encode(format!("failed to embed EXIF: {e}"))),
            None => Ok(buf),
        }
    }

    fn tag(&self, image: &DecodedImage, key: u16) -> Option<Vec<u8>> {
        exif::read_tag(image.exif.as_deref()?, key)
    }

    fn remove_tag(&self, image: &mut DecodedImage, key: u16) {
        let Some(tiff) = image.exif.as_deref() else {
            return;
        };
        image.exif = match exif::remove_tag(tiff, key) {
            Ok(remaining) => remaining,
            Err(e) => {
                // Keeping the old block would keep the tag.
                log::warn!("Dropping EXIF block that could not be rewritten: {e}");
                None
            }
        };
    }

    fn apply_transform(
        &self,
        image: &mut DecodedImage,
        transform: GeometricTransform,
    ) -> Result<(), CodecError> {
        let pixels = &image.pixels;
        image.pixels = match transform {
            GeometricTransform::Identity => return Ok(()),
            GeometricTransform::FlipHorizontal => pixels.fliph(),
            GeometricTransform::Rotate180 => pixels.rotate180(),
            GeometricTransform::Rotate180FlipHorizontal => pixels.flipv(),
            GeometricTransform::Rotate90FlipHorizontal => pixels.rotate90().fliph(),
            GeometricTransform::Rotate90 => pixels.rotate90(),
            GeometricTransform::Rotate270FlipHorizontal => pixels.rotate270().fliph(),
            GeometricTransform::Rotate270 => pixels.rotate270(),
        };
        Ok(())
    }
}
