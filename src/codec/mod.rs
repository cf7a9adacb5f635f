//! Image codec capability.
//!
//! The validator and the orientation normalizer never touch pixels or
//! metadata directly. They go through [`ImageCodec`], a narrow capability
//! covering decode, encode, tag lookup/removal and geometric transforms.
//! [`ImageCrateCodec`] is the default implementation, built on the `image`
//! crate for pixels, `img-parts` for the EXIF block and `kamadak-exif` for
//! the tags inside it.

mod image_codec;

#[cfg(test)]
pub(crate) mod fake;

pub use image_codec::{DEFAULT_JPEG_QUALITY, DecodedImage, ImageCrateCodec};

use serde::{Deserialize, Serialize};

use crate::orientation::GeometricTransform;

/// Errors raised by an [`ImageCodec`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("failed to apply {transform:?}: {reason}")]
    Transform {
        transform: GeometricTransform,
        reason: String,
    },

    #[error("image decoder panicked")]
    DecoderPanicked,
}

/// Target format for re-encoding a normalized image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Png,
}

impl OutputFormat {
    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

/// Decode/encode and metadata capability consumed by the validator.
///
/// Implementations must be usable from several threads at once when the
/// validator is shared; none of the methods take `&mut self`.
pub trait ImageCodec {
    /// In-memory decoded image handle.
    type Image;

    /// Decode an encoded payload into pixels plus metadata.
    fn decode(&self, bytes: &[u8]) -> Result<Self::Image, CodecError>;

    /// Encode the (possibly transformed) pixels, carrying over remaining metadata.
    fn encode(&self, image: &Self::Image, format: OutputFormat) -> Result<Vec<u8>, CodecError>;

    /// Raw value bytes of an EXIF tag, or `None` if the image does not carry it.
    fn tag(&self, image: &Self::Image, key: u16) -> Option<Vec<u8>>;

    /// Remove an EXIF tag. Removing an absent tag is a no-op.
    fn remove_tag(&self, image: &mut Self::Image, key: u16);

    /// Rotate/flip the pixel buffer in place.
    fn apply_transform(
        &self,
        image: &mut Self::Image,
        transform: GeometricTransform,
    ) -> Result<(), CodecError>;
}
