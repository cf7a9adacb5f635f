//! EXIF orientation normalization.
//!
//! Cameras often store pixels in sensor order and record the rotation needed
//! for display in the EXIF `Orientation` tag (`0x0112`). [`OrientationNormalizer`]
//! reads that tag, applies the matching [`GeometricTransform`] to the pixels and
//! clears the tag, so stored images are always upright and carry no orientation
//! metadata for downstream consumers to interpret.

use serde::Serialize;

use crate::codec::{CodecError, ImageCodec};

/// EXIF tag ID of `Orientation` (IFD0).
pub const ORIENTATION_TAG: u16 = 0x0112;

/// Canonical rotate/flip combination that brings an image upright.
///
/// Rotations are clockwise. In the combined variants the rotation is applied
/// first and the horizontal mirror second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometricTransform {
    #[default]
    Identity,
    FlipHorizontal,
    Rotate180,
    Rotate180FlipHorizontal,
    Rotate90FlipHorizontal,
    Rotate90,
    Rotate270FlipHorizontal,
    Rotate270,
}

impl GeometricTransform {
    /// Map an EXIF orientation code to the transform that undoes it.
    ///
    /// Total over `u8`: `1` and every value outside `1..=8` map to [`Identity`](Self::Identity).
    ///
    /// ```rust
    /// use upright::orientation::GeometricTransform;
    ///
    /// assert_eq!(GeometricTransform::from_exif_orientation(6), GeometricTransform::Rotate90);
    /// assert_eq!(GeometricTransform::from_exif_orientation(0), GeometricTransform::Identity);
    /// ```
    pub fn from_exif_orientation(orientation: u8) -> Self {
        match orientation {
            2 => Self::FlipHorizontal,
            3 => Self::Rotate180,
            4 => Self::Rotate180FlipHorizontal,
            5 => Self::Rotate90FlipHorizontal,
            6 => Self::Rotate90,
            7 => Self::Rotate270FlipHorizontal,
            8 => Self::Rotate270,
            _ => Self::Identity,
        }
    }

    pub fn is_identity(self) -> bool {
        self == Self::Identity
    }
}

/// Reads the orientation tag of a decoded image and rotates its pixels upright.
///
/// Tag clearing is on by default. Turning it off with [`keep_tag`](Self::keep_tag)
/// leaves the tag readable, so a second pass applies the same transform again.
///
/// # Example
///
/// ```rust,no_run
/// use upright::codec::{ImageCodec, ImageCrateCodec};
/// use upright::orientation::OrientationNormalizer;
///
/// # fn example(bytes: &[u8]) -> Result<(), upright::codec::CodecError> {
/// let codec = ImageCrateCodec::default();
/// let mut image = codec.decode(bytes)?;
/// let transform = OrientationNormalizer::default().normalize(&codec, &mut image)?;
/// println!("applied {transform:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientationNormalizer {
    clear_tag: bool,
}

impl Default for OrientationNormalizer {
    fn default() -> Self {
        Self { clear_tag: true }
    }
}

impl OrientationNormalizer {
    pub fn new(clear_tag: bool) -> Self {
        Self { clear_tag }
    }

    /// Leave the orientation tag in place after applying the transform.
    pub fn keep_tag(self) -> Self {
        Self { clear_tag: false }
    }

    pub fn clears_tag(&self) -> bool {
        self.clear_tag
    }

    /// Apply the image's EXIF orientation to its pixels.
    ///
    /// Returns the transform that was applied. A missing or empty tag yields
    /// [`GeometricTransform::Identity`] and leaves the image untouched. Errors
    /// come only from the codec's transform step and are returned as-is.
    pub fn normalize<C>(
        &self,
        codec: &C,
        image: &mut C::Image,
    ) -> Result<GeometricTransform, CodecError>
    where
        C: ImageCodec + ?Sized,
    {
        let Some(value) = codec.tag(image, ORIENTATION_TAG) else {
            return Ok(GeometricTransform::Identity);
        };
        let Some(&code) = value.first() else {
            log::debug!("Orientation tag present but empty, treating as upright");
            return Ok(GeometricTransform::Identity);
        };

        let transform = GeometricTransform::from_exif_orientation(code);
        if transform.is_identity() {
            return Ok(transform);
        }

        log::debug!("EXIF orientation {code}: applying {transform:?}");
        codec.apply_transform(image, transform)?;
        if self.clear_tag {
            codec.remove_tag(image, ORIENTATION_TAG);
        }

        Ok(transform)
    }
}

/// Normalize with the default options (tag cleared after applying).
pub fn normalize<C>(codec: &C, image: &mut C::Image) -> Result<GeometricTransform, CodecError>
where
    C: ImageCodec + ?Sized,
{
    OrientationNormalizer::default().normalize(codec, image)
}
