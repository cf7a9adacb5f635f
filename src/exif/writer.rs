use std::io::Cursor;

use ::exif::experimental::Writer;
use ::exif::{In, Tag};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF};

use super::reader::{parse, primary_tag};
use crate::codec::OutputFormat;

/// Offset tags the writer regenerates itself.
const POINTER_TAGS: &[Tag] = &[
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
];

/// Remove an IFD0 tag from raw TIFF data.
///
/// The block is re-serialized in its original byte order with the primary
/// image's fields (IFD0 and its Exif, GPS and interoperability sub-IFDs).
/// The thumbnail IFD is dropped. Returns `Ok(None)` when nothing but the
/// removed tag was left. A malformed block or an absent tag is returned
/// unchanged.
pub fn remove_tag(tiff: &[u8], tag: u16) -> Result<Option<Vec<u8>>, ::exif::Error> {
    let Some(exif) = parse(tiff) else {
        return Ok(Some(tiff.to_vec()));
    };
    let target = primary_tag(tag);
    if exif.get_field(target, In::PRIMARY).is_none() {
        return Ok(Some(tiff.to_vec()));
    }

    let mut writer = Writer::new();
    let mut kept = 0;
    for field in exif.fields() {
        if field.ifd_num != In::PRIMARY || field.tag == target {
            continue;
        }
        if !POINTER_TAGS.contains(&field.tag) {
            kept += 1;
        }
        writer.push_field(field);
    }
    if kept == 0 {
        return Ok(None);
    }

    let mut out = Cursor::new(Vec::new());
    writer.write(&mut out, tiff.starts_with(b"II"))?;
    Ok(Some(out.into_inner()))
}

/// Embed raw TIFF data as the EXIF block of an encoded JPEG or PNG.
///
/// Any EXIF block already present in `encoded` is replaced.
pub fn attach_exif(
    encoded: Vec<u8>,
    tiff: &[u8],
    format: OutputFormat,
) -> img_parts::Result<Vec<u8>> {
    let exif = Some(Bytes::copy_from_slice(tiff));
    let output = match format {
        OutputFormat::Jpeg => {
            let mut jpeg = Jpeg::from_bytes(Bytes::from(encoded))?;
            jpeg.set_exif(exif);
            jpeg.encoder().bytes()
        }
        OutputFormat::Png => {
            let mut png = Png::from_bytes(Bytes::from(encoded))?;
            png.set_exif(exif);
            png.encoder().bytes()
        }
    };
    Ok(output.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exif::testing::{build_tiff, orientation_tiff};
    use crate::exif::{extract_exif, read_tag};
    use ::exif::{Field, Value};

    fn encoded(format: image::ImageFormat) -> Vec<u8> {
        let mut buf = Vec::new();
        image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]))
            .write_to(&mut Cursor::new(&mut buf), format)
            .unwrap();
        buf
    }

    // ── remove_tag ───────────────────────────────────────────────────

    #[test]
    fn remove_only_entry() {
        let tiff = orientation_tiff(false, 6);
        assert_eq!(remove_tag(&tiff, 0x0112).unwrap(), None);
    }

    #[test]
    fn remove_keeps_other_entries_big_endian() {
        let tiff = build_tiff(
            true,
            &[
                (0x010F, 2, 6, b"Canon\0".to_vec()),
                (0x0112, 3, 1, vec![0, 6]),
                (0x0131, 2, 4, b"abc\0".to_vec()),
            ],
        );
        let stripped = remove_tag(&tiff, 0x0112).unwrap().unwrap();
        assert!(stripped.starts_with(b"MM"));
        assert_eq!(read_tag(&stripped, 0x0112), None);
        assert_eq!(read_tag(&stripped, 0x010F), Some(b"Canon\0".to_vec()));
        assert_eq!(read_tag(&stripped, 0x0131), Some(b"abc\0".to_vec()));
    }

    #[test]
    fn remove_keeps_exif_sub_ifd() {
        let fields = [
            Field {
                tag: Tag::Orientation,
                ifd_num: In::PRIMARY,
                value: Value::Short(vec![6]),
            },
            Field {
                tag: Tag::DateTimeOriginal,
                ifd_num: In::PRIMARY,
                value: Value::Ascii(vec![b"2024:05:01 12:00:00".to_vec()]),
            },
        ];
        let mut writer = Writer::new();
        for field in &fields {
            writer.push_field(field);
        }
        let mut tiff = Cursor::new(Vec::new());
        writer.write(&mut tiff, true).unwrap();
        let tiff = tiff.into_inner();

        let stripped = remove_tag(&tiff, 0x0112).unwrap().unwrap();
        let exif = parse(&stripped).unwrap();
        assert!(exif.get_field(Tag::Orientation, In::PRIMARY).is_none());
        let date = exif.get_field(Tag::DateTimeOriginal, In::PRIMARY).unwrap();
        assert!(matches!(&date.value, Value::Ascii(v) if v[0] == b"2024:05:01 12:00:00"));
    }

    #[test]
    fn remove_absent_tag_is_noop() {
        let tiff = orientation_tiff(false, 6);
        assert_eq!(remove_tag(&tiff, 0x010F).unwrap(), Some(tiff));
    }

    #[test]
    fn remove_from_malformed_block_is_noop() {
        let garbage = b"not a tiff block".to_vec();
        assert_eq!(remove_tag(&garbage, 0x0112).unwrap(), Some(garbage));
    }

    // ── attach_exif ──────────────────────────────────────────────────

    #[test]
    fn attach_to_jpeg_round_trips() {
        let tiff = orientation_tiff(false, 3);
        let jpeg =
            attach_exif(encoded(image::ImageFormat::Jpeg), &tiff, OutputFormat::Jpeg).unwrap();
        assert_eq!(extract_exif(&jpeg), Some(tiff));
        assert!(image::load_from_memory(&jpeg).is_ok());
    }

    #[test]
    fn attach_to_png_round_trips() {
        let tiff = orientation_tiff(true, 8);
        let png = attach_exif(encoded(image::ImageFormat::Png), &tiff, OutputFormat::Png).unwrap();
        assert_eq!(extract_exif(&png), Some(tiff));
    }

    #[test]
    fn attach_to_wrong_container_fails() {
        let tiff = orientation_tiff(false, 3);
        assert!(attach_exif(b"garbage".to_vec(), &tiff, OutputFormat::Jpeg).is_err());
    }
}
