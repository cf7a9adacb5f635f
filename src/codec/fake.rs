//! In-memory codec for exercising orientation and validation logic without real decoding.

use std::collections::HashMap;

use super::{CodecError, ImageCodec, OutputFormat};
use crate::orientation::GeometricTransform;

/// Payload prefix the fake codec accepts as a decodable image.
pub(crate) const FAKE_MAGIC: &[u8] = b"FAKEIMG";

/// Bytes returned by [`FakeCodec::encode`].
pub(crate) const FAKE_REENCODED: &[u8] = b"FAKEIMG re-encoded";

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct FakeImage {
    pub tags: HashMap<u16, Vec<u8>>,
    pub applied: Vec<GeometricTransform>,
}

impl FakeImage {
    pub fn with_tag(key: u16, value: Vec<u8>) -> Self {
        let mut image = Self::default();
        image.tags.insert(key, value);
        image
    }
}

#[derive(Debug, Default)]
pub(crate) struct FakeCodec {
    /// Orientation bytes attached to every decoded image.
    pub orientation: Option<Vec<u8>>,
    pub fail_transform: bool,
    pub fail_encode: bool,
}

impl FakeCodec {
    pub fn with_orientation(code: u8) -> Self {
        Self {
            orientation: Some(vec![code, 0]),
            ..Self::default()
        }
    }
}

impl ImageCodec for FakeCodec {
    type Image = FakeImage;

    fn decode(&self, bytes: &[u8]) -> Result<FakeImage, CodecError> {
        if !bytes.starts_with(FAKE_MAGIC) {
            return Err(CodecError::Decode("missing fake magic".into()));
        }
        let mut image = FakeImage::default();
        if let Some(value) = &self.orientation {
            image.tags.insert(crate::orientation::ORIENTATION_TAG, value.clone());
        }
        Ok(image)
    }

    fn encode(&self, _image: &FakeImage, _format: OutputFormat) -> Result<Vec<u8>, CodecError> {
        if self.fail_encode {
            return Err(CodecError::Encode("fake encode failure".into()));
        }
        Ok(FAKE_REENCODED.to_vec())
    }

    fn tag(&self, image: &FakeImage, key: u16) -> Option<Vec<u8>> {
        image.tags.get(&key).cloned()
    }

    fn remove_tag(&self, image: &mut FakeImage, key: u16) {
        image.tags.remove(&key);
    }

    fn apply_transform(
        &self,
        image: &mut FakeImage,
        transform: GeometricTransform,
    ) -> Result<(), CodecError> {
        if self.fail_transform {
            return Err(CodecError::Transform {
                transform,
                reason: "fake transform failure".into(),
            });
        }
        image.applied.push(transform);
        Ok(())
    }
}
