//! Upload validation.
//!
//! [`UploadValidator::validate`] runs a fixed sequence of checks against an
//! [`UploadCandidate`] and stops at the first failure:
//!
//! 1. declared MIME type is on the allow-list ([`RejectReason::InvalidType`])
//! 2. filename extension is on the allow-list ([`RejectReason::InvalidType`])
//! 3. the stream can report its position ([`RejectReason::Unreadable`])
//! 4. declared length is at least the minimum ([`RejectReason::TooSmall`])
//! 5. the payload reads cleanly ([`RejectReason::ReadFailure`]) and carries no
//!    HTML/script markers ([`RejectReason::SuspiciousContent`])
//! 6. the payload decodes, and its EXIF orientation is normalized
//!    ([`RejectReason::NotADecodableImage`])
//!
//! The candidate stream is rewound to offset 0 before `validate` returns.

mod rewind;
mod sniff;

pub use sniff::contains_suspicious_markup;

use serde::{Deserialize, Serialize};
use std::io::{Cursor, Read, Seek};
use std::path::Path;

use crate::codec::{ImageCodec, ImageCrateCodec, OutputFormat};
use crate::config::Config;
use crate::orientation::{GeometricTransform, OrientationNormalizer};
use rewind::RewindGuard;

/// Declared MIME types accepted by default.
pub const DEFAULT_CONTENT_TYPES: &[&str] = &["image/jpg", "image/jpeg", "image/png"];

/// Filename extensions accepted by default.
pub const DEFAULT_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];

/// Declared lengths below this are rejected before the payload is read.
pub const MIN_CONTENT_LENGTH: u64 = 512;

/// Why a candidate was rejected. Exactly one reason is reported per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    #[error("declared content type or file extension is not allowed")]
    InvalidType,

    #[error("upload stream is not readable")]
    Unreadable,

    #[error("upload is smaller than the minimum size")]
    TooSmall,

    #[error("failed to read upload payload")]
    ReadFailure,

    #[error("upload contains markup or script content")]
    SuspiciousContent,

    #[error("upload is not a decodable image")]
    NotADecodableImage,
}

impl RejectReason {
    /// Stable machine-readable code, suitable for mapping to localized messages.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidType => "invalid_type",
            Self::Unreadable => "unreadable",
            Self::TooSmall => "too_small",
            Self::ReadFailure => "read_failure",
            Self::SuspiciousContent => "suspicious_content",
            Self::NotADecodableImage => "not_a_decodable_image",
        }
    }
}

/// An upload as delivered by the transport layer.
///
/// Everything except `source` is client-declared and untrusted.
#[derive(Debug)]
pub struct UploadCandidate<R> {
    pub source: R,
    pub content_type: String,
    pub filename: String,
    pub content_length: u64,
}

impl<R> UploadCandidate<R> {
    pub fn new(
        source: R,
        content_type: impl Into<String>,
        filename: impl Into<String>,
        content_length: u64,
    ) -> Self {
        Self {
            source,
            content_type: content_type.into(),
            filename: filename.into(),
            content_length,
        }
    }
}

impl UploadCandidate<Cursor<Vec<u8>>> {
    /// In-memory candidate whose declared length is the payload length.
    pub fn from_bytes(
        bytes: Vec<u8>,
        content_type: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        let len = bytes.len() as u64;
        Self::new(Cursor::new(bytes), content_type, filename, len)
    }
}

/// A candidate that passed every check.
#[derive(Debug)]
pub struct AcceptedUpload<I> {
    /// Payload to store: the original bytes, or the re-encoded image when
    /// its orientation was normalized.
    pub bytes: Vec<u8>,
    /// Decoded image, upright, with the orientation tag cleared.
    pub image: I,
    /// Filename without directory components or extension.
    pub base_name: String,
    /// Extension as declared, leading dot included (e.g. `.JPG`).
    pub extension: String,
    pub transform: GeometricTransform,
    /// Whether `bytes` were re-encoded rather than passed through.
    pub reencoded: bool,
}

/// Outcome of [`UploadValidator::validate`].
pub type ValidationResult<I> = Result<AcceptedUpload<I>, RejectReason>;

/// Validates untrusted image uploads and normalizes their orientation.
///
/// Holds no mutable state; one validator can serve concurrent uploads from
/// many threads when its codec is `Sync`.
///
/// # Example
///
/// ```rust
/// use upright::validator::{RejectReason, UploadCandidate, UploadValidator};
///
/// let validator = UploadValidator::new();
/// let mut candidate = UploadCandidate::from_bytes(b"hello".to_vec(), "text/plain", "notes.txt");
///
/// assert_eq!(validator.validate(&mut candidate).unwrap_err(), RejectReason::InvalidType);
/// ```
#[derive(Debug, Clone)]
pub struct UploadValidator<C = ImageCrateCodec> {
    codec: C,
    allowed_content_types: Vec<String>,
    allowed_extensions: Vec<String>,
    min_content_length: u64,
    output_format: OutputFormat,
    normalizer: OrientationNormalizer,
}

impl UploadValidator<ImageCrateCodec> {
    /// Validator with the default allow-lists and the `image`-backed codec.
    pub fn new() -> Self {
        Self::with_codec(ImageCrateCodec::default())
    }

    /// Validator configured from `config`, including JPEG quality.
    pub fn from_config(config: &Config) -> Self {
        let codec = ImageCrateCodec::with_jpeg_quality(config.output.jpeg_quality);
        Self::with_codec_and_config(codec, config)
    }
}

impl Default for UploadValidator<ImageCrateCodec> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ImageCodec> UploadValidator<C> {
    pub fn with_codec(codec: C) -> Self {
        Self::with_codec_and_config(codec, &Config::default())
    }

    pub fn with_codec_and_config(codec: C, config: &Config) -> Self {
        Self {
            codec,
            allowed_content_types: config.allowed_content_types.clone(),
            allowed_extensions: config.allowed_extensions.clone(),
            min_content_length: config.min_content_length,
            output_format: config.output.format,
            // Always clear: leaving the tag would let a second pass rotate again.
            normalizer: OrientationNormalizer::default(),
        }
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format
    }

    /// Validate one candidate.
    ///
    /// Reads at most `content_length` bytes from the current stream position,
    /// then rewinds the stream to offset 0 whatever the outcome.
    pub fn validate<R: Read + Seek>(
        &self,
        candidate: &mut UploadCandidate<R>,
    ) -> ValidationResult<C::Image> {
        let result = self.run_checks(candidate);
        match &result {
            Ok(accepted) => log::debug!(
                "Accepted upload {:?} ({} bytes, {:?})",
                candidate.filename,
                accepted.bytes.len(),
                accepted.transform
            ),
            Err(reason) => log::debug!("Rejected upload {:?}: {reason}", candidate.filename),
        }
        result
    }

    fn run_checks<R: Read + Seek>(
        &self,
        candidate: &mut UploadCandidate<R>,
    ) -> ValidationResult<C::Image> {
        if !allowed(&self.allowed_content_types, &candidate.content_type) {
            return Err(RejectReason::InvalidType);
        }

        let (base_name, extension) =
            split_filename(&candidate.filename).ok_or(RejectReason::InvalidType)?;
        if !allowed(&self.allowed_extensions, &extension) {
            return Err(RejectReason::InvalidType);
        }

        let mut stream = RewindGuard::new(&mut candidate.source).map_err(|e| {
            log::debug!("Upload stream cannot report its position: {e}");
            RejectReason::Unreadable
        })?;

        if candidate.content_length < self.min_content_length {
            return Err(RejectReason::TooSmall);
        }

        let mut bytes = Vec::new();
        (&mut *stream)
            .take(candidate.content_length)
            .read_to_end(&mut bytes)
            .map_err(|e| {
                log::debug!("Failed to read upload payload: {e}");
                RejectReason::ReadFailure
            })?;

        if contains_suspicious_markup(&bytes) {
            return Err(RejectReason::SuspiciousContent);
        }

        let not_an_image = |e: crate::codec::CodecError| {
            log::debug!("Payload rejected by codec: {e}");
            RejectReason::NotADecodableImage
        };
        let mut image = self.codec.decode(&bytes).map_err(not_an_image)?;
        let transform = self.normalizer.normalize(&self.codec, &mut image).map_err(not_an_image)?;

        let reencoded = !transform.is_identity();
        if reencoded {
            bytes = self.codec.encode(&image, self.output_format).map_err(not_an_image)?;
        }

        Ok(AcceptedUpload {
            bytes,
            image,
            base_name,
            extension,
            transform,
            reencoded,
        })
    }
}

fn allowed(list: &[String], value: &str) -> bool {
    list.iter().any(|entry| entry.eq_ignore_ascii_case(value))
}

/// Split a declared filename into base name and dotted extension.
///
/// Directory components are dropped. Names without an extension (including
/// dotfiles such as `.jpg`) yield `None`.
fn split_filename(filename: &str) -> Option<(String, String)> {
    let path = Path::new(filename);
    let extension = path.extension()?.to_str()?;
    let base_name = path.file_stem()?.to_str()?;
    Some((base_name.to_string(), format!(".{extension}")))
}
