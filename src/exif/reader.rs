use ::exif::{Context, Exif, In, Reader, Tag, Value};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF};

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG_SOI: &[u8] = &[0xFF, 0xD8];

/// IFD0 tag with the given number.
pub(crate) fn primary_tag(number: u16) -> Tag {
    Tag(Context::Tiff, number)
}

/// Parse raw TIFF data; `None` (logged) when the block is malformed.
pub(crate) fn parse(tiff: &[u8]) -> Option<Exif> {
    Reader::new()
        .read_raw(tiff.to_vec())
        .map_err(|e| log::debug!("Unparseable EXIF block: {e}"))
        .ok()
}

/// Read the value of an IFD0 tag from raw TIFF data.
///
/// Multi-byte components come back little-endian regardless of the block's
/// byte order, so the first byte of a SHORT value is its low byte. ASCII
/// values keep their NUL terminators. Returns `None` when the tag is absent,
/// has an unknown field type, or the block is malformed.
pub fn read_tag(tiff: &[u8], tag: u16) -> Option<Vec<u8>> {
    let exif = parse(tiff)?;
    let field = exif.get_field(primary_tag(tag), In::PRIMARY)?;
    value_bytes(&field.value)
}

fn value_bytes(value: &Value) -> Option<Vec<u8>> {
    let bytes = match value {
        Value::Byte(v) | Value::Undefined(v, _) => v.clone(),
        Value::SByte(v) => v.iter().map(|&b| b as u8).collect(),
        Value::Ascii(strings) => strings
            .iter()
            .flat_map(|s| s.iter().copied().chain(std::iter::once(0)))
            .collect(),
        Value::Short(v) => v.iter().flat_map(|n| n.to_le_bytes()).collect(),
        Value::SShort(v) => v.iter().flat_map(|n| n.to_le_bytes()).collect(),
        Value::Long(v) => v.iter().flat_map(|n| n.to_le_bytes()).collect(),
        Value::SLong(v) => v.iter().flat_map(|n| n.to_le_bytes()).collect(),
        Value::Float(v) => v.iter().flat_map(|n| n.to_le_bytes()).collect(),
        Value::Double(v) => v.iter().flat_map(|n| n.to_le_bytes()).collect(),
        Value::Rational(v) => v
            .iter()
            .flat_map(|r| r.num.to_le_bytes().into_iter().chain(r.denom.to_le_bytes()))
            .collect(),
        Value::SRational(v) => v
            .iter()
            .flat_map(|r| r.num.to_le_bytes().into_iter().chain(r.denom.to_le_bytes()))
            .collect(),
        _ => return None,
    };
    Some(bytes)
}

/// Extract the raw TIFF data of the EXIF block embedded in a JPEG (APP1) or PNG (eXIf).
///
/// Returns `None` for other formats, for files without EXIF, and for files
/// `img-parts` cannot split into segments/chunks.
pub fn extract_exif(data: &[u8]) -> Option<Vec<u8>> {
    let exif = if data.starts_with(JPEG_SOI) {
        Jpeg::from_bytes(Bytes::copy_from_slice(data)).ok()?.exif()
    } else if data.starts_with(PNG_SIGNATURE) {
        Png::from_bytes(Bytes::copy_from_slice(data)).ok()?.exif()
    } else {
        None
    }?;

    if exif.is_empty() {
        log::debug!("Empty EXIF block ignored");
        return None;
    }
    Some(exif.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::testing::{build_tiff, orientation_tiff};

    // ── read_tag ─────────────────────────────────────────────────────

    #[test]
    fn read_orientation_little_endian() {
        let tiff = orientation_tiff(false, 6);
        assert_eq!(read_tag(&tiff, 0x0112), Some(vec![6, 0]));
    }

    #[test]
    fn read_orientation_big_endian_normalized() {
        let tiff = orientation_tiff(true, 8);
        assert_eq!(read_tag(&tiff, 0x0112), Some(vec![8, 0]));
    }

    #[test]
    fn read_absent_tag() {
        let tiff = orientation_tiff(false, 3);
        assert_eq!(read_tag(&tiff, 0x010F), None);
    }

    #[test]
    fn read_out_of_line_value() {
        // ASCII "Canon\0" does not fit in the 4-byte inline slot.
        let tiff = build_tiff(false, &[(0x010F, 2, 6, b"Canon\0".to_vec())]);
        assert_eq!(read_tag(&tiff, 0x010F), Some(b"Canon\0".to_vec()));
    }

    #[test]
    fn read_picks_tag_among_several() {
        let tiff = build_tiff(
            true,
            &[(0x010F, 2, 4, b"Sny\0".to_vec()), (0x0112, 3, 1, vec![0, 5])],
        );
        assert_eq!(read_tag(&tiff, 0x0112), Some(vec![5, 0]));
        assert_eq!(read_tag(&tiff, 0x010F), Some(b"Sny\0".to_vec()));
    }

    #[test]
    fn read_long_value_big_endian_normalized() {
        // ImageWidth as LONG
        let tiff = build_tiff(true, &[(0x0100, 4, 1, vec![0, 0, 0x01, 0x02])]);
        assert_eq!(read_tag(&tiff, 0x0100), Some(vec![0x02, 0x01, 0, 0]));
    }

    #[test]
    fn read_rejects_malformed_blocks() {
        assert_eq!(read_tag(b"", 0x0112), None);
        assert_eq!(read_tag(b"XX*\0\x08\0\0\0", 0x0112), None);

        let mut tiff = orientation_tiff(false, 6);
        tiff.truncate(12);
        assert_eq!(read_tag(&tiff, 0x0112), None);

        // IFD0 offset pointing past the end
        let mut tiff = orientation_tiff(false, 6);
        tiff[4..8].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());
        assert_eq!(read_tag(&tiff, 0x0112), None);
    }

    #[test]
    fn read_unknown_field_type_is_absent() {
        let tiff = build_tiff(false, &[(0x0112, 99, 1, vec![6, 0])]);
        assert_eq!(read_tag(&tiff, 0x0112), None);
    }

    // ── extract_exif ─────────────────────────────────────────────────

    #[test]
    fn extract_exif_from_non_image() {
        assert_eq!(extract_exif(b"just some text"), None);
        assert_eq!(extract_exif(b""), None);
    }

    #[test]
    fn extract_exif_png_without_exif() {
        let mut png = Vec::new();
        image::RgbImage::new(4, 4)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        assert_eq!(extract_exif(&png), None);
    }
}
