//! # upright
//!
//! Validation of untrusted image uploads, with EXIF orientation normalization.
//! Decides whether a submitted blob is a genuine, safe-to-store raster image,
//! and rotates its pixels upright so nothing downstream has to interpret the
//! camera's orientation tag.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use upright::validator::{UploadCandidate, UploadValidator};
//!
//! fn main() -> anyhow::Result<()> {
//!     let validator = UploadValidator::new();
//!
//!     // Declared type and filename come from the client and are not trusted.
//!     let bytes = std::fs::read("upload.jpg")?;
//!     let mut candidate = UploadCandidate::from_bytes(bytes, "image/jpeg", "IMG_0042.JPG");
//!
//!     match validator.validate(&mut candidate) {
//!         Ok(accepted) => {
//!             let name = format!("{}{}", accepted.base_name, accepted.extension);
//!             println!("store {name} ({} bytes)", accepted.bytes.len());
//!             if accepted.reencoded {
//!                 println!("rotated: {:?}", accepted.transform);
//!             }
//!         }
//!         Err(reason) => println!("rejected: {}", reason.code()),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Checks
//!
//! | # | Check | Rejection |
//! |---|-------|-----------|
//! | 1 | Declared MIME type is `image/jpg`, `image/jpeg` or `image/png` | `InvalidType` |
//! | 2 | Filename extension is `.jpg`, `.jpeg` or `.png` | `InvalidType` |
//! | 3 | Stream can report its position | `Unreadable` |
//! | 4 | Declared length is at least 512 bytes | `TooSmall` |
//! | 5 | Payload reads and contains no HTML/script markers | `ReadFailure` / `SuspiciousContent` |
//! | 6 | Payload decodes as an image | `NotADecodableImage` |
//!
//! Matching is case-insensitive; the first failing check wins. An accepted
//! image with an EXIF orientation other than 1 is rotated, stripped of the
//! tag and re-encoded; otherwise the original bytes are returned untouched.
//!
//! ## Custom Codecs
//!
//! The validator reaches pixels and metadata only through
//! [`codec::ImageCodec`]. Plug in another decoder by implementing it and
//! passing it to [`UploadValidator::with_codec`](validator::UploadValidator::with_codec).
//!
//! ## Modules
//!
//! - [`codec`] — Codec capability trait and the `image`-backed implementation
//! - [`config`] — Configuration types and loading/saving
//! - [`exif`] — Raw EXIF block extraction, tag lookup and removal
//! - [`orientation`] — Orientation tag to transform mapping and normalization
//! - [`pipeline`] — File collection, file-level validation and rotation used by the CLI
//! - [`validator`] — The upload validator and its rejection reasons

pub mod codec;
pub mod config;
pub mod exif;
pub mod orientation;
pub mod pipeline;
pub mod validator;
