use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, ErrorKind, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::codec::{ImageCodec, OutputFormat};
use crate::orientation::{GeometricTransform, OrientationNormalizer};
use crate::validator::{RejectReason, UploadCandidate, UploadValidator};

/// Declared type used when the extension gives no hint.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Highest numeric suffix tried before giving up on a free output name.
const MAX_NAME_SUFFIX: u32 = 9999;

/// The result of validating a single file as an upload candidate.
///
/// Exactly one of `reason` (rejected) or `transform` (accepted) is set.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Content type the file was declared with.
    pub content_type: String,
    /// Content type of the payload that would be stored.
    pub stored_content_type: Option<String>,
    pub accepted: bool,
    pub reason: Option<RejectReason>,
    pub transform: Option<GeometricTransform>,
    pub reencoded: bool,
    /// Size of the payload that would be stored.
    pub stored_bytes: Option<usize>,
    /// Where the accepted payload was written, if an output directory was given.
    pub output_path: Option<PathBuf>,
}

/// Collect files from the given paths.
///
/// Accepts a mix of file paths and directory paths. Directories are walked
/// recursively (following symlinks). No filtering by extension happens here;
/// deciding what is acceptable is the validator's job.
///
/// # Example
///
/// ```rust,no_run
/// use upright::pipeline::collect_files;
/// use std::path::PathBuf;
///
/// let files = collect_files(&[
///     PathBuf::from("avatar.png"),   // single file
///     PathBuf::from("./incoming/"),  // entire directory
/// ]);
/// println!("Found {} files", files.len());
/// ```
pub fn collect_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        } else {
            log::warn!("Path does not exist: {}", path.display());
        }
    }

    files
}

/// Guess the MIME type a browser would declare for a file, from its extension.
pub fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "txt" => "text/plain",
        "htm" | "html" => "text/html",
        _ => FALLBACK_CONTENT_TYPE,
    }
}

/// Validate a file on disk as if it had just been uploaded.
///
/// The declared length is the file size and the declared filename is the
/// file name. `content_type` overrides the type guessed from the extension.
/// When `out_dir` is given, an accepted payload is written there as
/// `<base name><extension>`, using the output format's extension if the
/// image was re-encoded. Existing files are never replaced: a taken name
/// gets a `-1`, `-2`, ... suffix before the extension.
///
/// Returns `Err` only for I/O problems outside validation itself (file
/// cannot be opened, output cannot be written); rejections are reported in
/// the [`FileReport`].
pub fn validate_file<C: ImageCodec>(
    path: &Path,
    validator: &UploadValidator<C>,
    content_type: Option<&str>,
    out_dir: Option<&Path>,
) -> Result<FileReport> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let content_length = file
        .metadata()
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    let content_type = content_type.unwrap_or_else(|| guess_content_type(path));
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let source = BufReader::new(file);
    let mut candidate = UploadCandidate::new(source, content_type, filename, content_length);

    let mut report = FileReport {
        path: path.to_path_buf(),
        content_type: content_type.to_string(),
        stored_content_type: None,
        accepted: false,
        reason: None,
        transform: None,
        reencoded: false,
        stored_bytes: None,
        output_path: None,
    };

    let accepted = match validator.validate(&mut candidate) {
        Ok(accepted) => accepted,
        Err(reason) => {
            report.reason = Some(reason);
            return Ok(report);
        }
    };

    report.accepted = true;
    report.transform = Some(accepted.transform);
    report.reencoded = accepted.reencoded;
    report.stored_bytes = Some(accepted.bytes.len());
    report.stored_content_type = Some(if accepted.reencoded {
        validator.output_format().mime_type().to_string()
    } else {
        content_type.to_string()
    });

    if let Some(dir) = out_dir {
        let extension = if accepted.reencoded {
            validator.output_format().extension()
        } else {
            accepted.extension.as_str()
        };
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        let output_path = write_new(dir, &accepted.base_name, extension, &accepted.bytes)?;
        log::debug!("Stored {}", output_path.display());
        report.output_path = Some(output_path);
    }

    Ok(report)
}

/// Write `bytes` to `<dir>/<base><extension>` without replacing an existing
/// file, falling back to `<base>-1<extension>`, `<base>-2<extension>`, ...
fn write_new(dir: &Path, base: &str, extension: &str, bytes: &[u8]) -> Result<PathBuf> {
    for n in 0..=MAX_NAME_SUFFIX {
        let name = match n {
            0 => format!("{base}{extension}"),
            n => format!("{base}-{n}{extension}"),
        };
        let path = dir.join(name);
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", path.display()));
            }
        };
        file.write_all(bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        return Ok(path);
    }
    anyhow::bail!("No free output name for {base}{extension} in {}", dir.display())
}

/// Rotate an image file upright according to its EXIF orientation.
///
/// Reads and decodes `source`, applies its orientation and, only when that
/// changed the pixels, encodes the result as `format` and writes it to
/// `target` (which may be `source` itself). An upright image leaves the file
/// system untouched. With `clear_tag` the orientation tag is dropped from
/// the written file; otherwise it is kept as read.
///
/// Returns the transform that was applied. No upload checks run here; use
/// [`validate_file`] for untrusted input.
pub fn normalize_file<C: ImageCodec>(
    codec: &C,
    source: &Path,
    target: &Path,
    format: OutputFormat,
    clear_tag: bool,
) -> Result<GeometricTransform> {
    let bytes = std::fs::read(source)
        .with_context(|| format!("Failed to read {}", source.display()))?;
    let mut image = codec
        .decode(&bytes)
        .with_context(|| format!("Failed to decode {}", source.display()))?;

    let transform = OrientationNormalizer::new(clear_tag)
        .normalize(codec, &mut image)
        .with_context(|| format!("Failed to rotate {}", source.display()))?;
    if transform.is_identity() {
        log::debug!("{} is already upright", source.display());
        return Ok(transform);
    }

    let encoded = codec
        .encode(&image, format)
        .with_context(|| format!("Failed to encode {}", source.display()))?;
    std::fs::write(target, encoded)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    log::info!("{} → {} ({transform:?})", source.display(), target.display());

    Ok(transform)
}
