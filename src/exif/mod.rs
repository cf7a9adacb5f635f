//! Raw EXIF handling.
//!
//! - [`extract_exif`] — pull the TIFF data of the EXIF block out of a JPEG or PNG
//! - [`read_tag`] — read an IFD0 tag value from that TIFF data
//! - [`remove_tag`] — rewrite that TIFF data without one IFD0 tag
//! - [`attach_exif`] — embed TIFF data into a freshly encoded JPEG or PNG
//!
//! `img-parts` handles the containers and `kamadak-exif` the TIFF inside.
//! Tags are looked up in IFD0 only; orientation lives there.

mod reader;
mod writer;

pub use reader::{extract_exif, read_tag};
pub use writer::{attach_exif, remove_tag};

#[cfg(test)]
pub(crate) mod testing {
    /// Build a TIFF block with one IFD0. Values are given already encoded in
    /// the block's byte order; values over 4 bytes go to a data area after the IFD.
    pub fn build_tiff(big_endian: bool, entries: &[(u16, u16, u32, Vec<u8>)]) -> Vec<u8> {
        let u16b = |v: u16| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };
        let u32b = |v: u32| if big_endian { v.to_be_bytes() } else { v.to_le_bytes() };

        let mut out = Vec::new();
        out.extend_from_slice(if big_endian { b"MM" } else { b"II" });
        out.extend_from_slice(&u16b(42));
        out.extend_from_slice(&u32b(8));
        out.extend_from_slice(&u16b(entries.len() as u16));

        let mut data_offset = 8 + 2 + entries.len() * 12 + 4;
        let mut data_area = Vec::new();
        for (tag, format, count, value) in entries {
            out.extend_from_slice(&u16b(*tag));
            out.extend_from_slice(&u16b(*format));
            out.extend_from_slice(&u32b(*count));
            if value.len() <= 4 {
                let mut inline = [0u8; 4];
                inline[..value.len()].copy_from_slice(value);
                out.extend_from_slice(&inline);
            } else {
                out.extend_from_slice(&u32b(data_offset as u32));
                data_area.extend_from_slice(value);
                data_offset += value.len();
            }
        }
        out.extend_from_slice(&u32b(0));
        out.extend_from_slice(&data_area);
        out
    }

    /// TIFF block whose IFD0 holds only the orientation tag.
    pub fn orientation_tiff(big_endian: bool, code: u8) -> Vec<u8> {
        let value = if big_endian { [0, code] } else { [code, 0] };
        build_tiff(big_endian, &[(0x0112, 3, 1, value.to_vec())])
    }
}
