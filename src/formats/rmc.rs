//! RBASIC machine code files (`.RMC`).
//!
//! Seven-byte header: type byte 0xFE, then begin, end and start words.

use super::{slice_payload, word_at, ByteWindow};
use crate::error::Result;
use crate::types::{Fields, Format, ProgramImage};

/// Type byte at offset 0.
pub const TYPE_BYTE: u8 = 0xFE;

/// Header length.
pub const HEADER_LEN: usize = 7;

/// Check the type byte.
pub fn detect(window: &ByteWindow) -> bool {
    window.bytes().first() == Some(&TYPE_BYTE)
}

/// Header fields.
pub fn fields(bytes: &[u8]) -> Fields {
    Fields {
        beg_addr: word_at(bytes, 1),
        end_addr: word_at(bytes, 3),
        start_addr: word_at(bytes, 5),
        ..Fields::default()
    }
}

/// Slice the payload behind the header.
pub fn build_image(bytes: &[u8]) -> Result<ProgramImage> {
    let f = fields(bytes);
    let (Some(beg), Some(end)) = (f.beg_addr, f.end_addr) else {
        return Err(super::truncated(bytes, 0, HEADER_LEN));
    };
    let len = usize::from(end.wrapping_sub(beg)) + 1;
    let payload = slice_payload(bytes, HEADER_LEN, len);
    Ok(ProgramImage::new(payload, beg, Format::Rmc).with_start(f.start_addr))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rmc_image() {
        let mut data = vec![TYPE_BYTE, 0x00, 0xC0, 0x0F, 0xC0, 0x00, 0xC0];
        data.extend(0..16u8);
        assert!(detect(&ByteWindow::new(&data, Some("x.rmc"))));

        let image = build_image(&data).unwrap();
        assert_eq!(image.beg_addr, 0xC000);
        assert_eq!(image.end_addr(), 0xC00F);
        assert_eq!(image.start_addr, Some(0xC000));
        assert_eq!(image.len(), 16);
    }
}
