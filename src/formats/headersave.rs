//! Z1013 Headersave files.
//!
//! 32-byte header: begin, end and start words, a file type character at
//! byte 12, three 0xD3 marker bytes and a 16-character description.

use super::{read_description, slice_payload, word_at, ByteWindow};
use crate::error::Result;
use crate::types::{Fields, Format, ProgramImage};

/// Header length; payload follows immediately.
pub const HEADER_LEN: usize = 32;

/// File type of directly startable machine code.
pub const TYPE_MACHINE_CODE: u8 = b'C';

/// Headersave marker bytes at offset 13.
pub const MARKER: [u8; 3] = [0xD3, 0xD3, 0xD3];

/// Check the marker bytes.
pub fn detect(window: &ByteWindow) -> bool {
    window.file_len() > HEADER_LEN
        && window.len() > 15
        && window.bytes()[13..16] == MARKER
}

/// Header fields; the type is only reported when printable.
pub fn fields(bytes: &[u8]) -> Fields {
    let file_type = bytes.get(12).copied();
    let start_addr = if file_type == Some(TYPE_MACHINE_CODE) {
        word_at(bytes, 4)
    } else {
        None
    };
    Fields {
        beg_addr: word_at(bytes, 0),
        end_addr: word_at(bytes, 2),
        start_addr,
        file_type: file_type.filter(|t| (0x20..0x7F).contains(t)),
        description: read_description(bytes, 16, 16),
    }
}

/// Slice the payload behind the header.
pub fn build_image(bytes: &[u8]) -> Result<ProgramImage> {
    let fields = fields(bytes);
    let (Some(beg), Some(end)) = (fields.beg_addr, fields.end_addr) else {
        return Err(super::truncated(bytes, 0, HEADER_LEN));
    };
    let len = usize::from(end.wrapping_sub(beg)) + 1;
    let payload = slice_payload(bytes, HEADER_LEN, len);
    Ok(ProgramImage::new(payload, beg, Format::Headersave).with_start(fields.start_addr))
}

#[cfg(test)]
pub(crate) fn make_headersave(beg: u16, end: u16, start: u16, file_type: u8, name: &str) -> Vec<u8> {
    let mut data = vec![0u8; HEADER_LEN];
    data[0..2].copy_from_slice(&beg.to_le_bytes());
    data[2..4].copy_from_slice(&end.to_le_bytes());
    data[4..6].copy_from_slice(&start.to_le_bytes());
    data[12] = file_type;
    data[13..16].copy_from_slice(&MARKER);
    let name = name.as_bytes();
    data[16..16 + name.len()].copy_from_slice(name);
    let len = usize::from(end.wrapping_sub(beg)) + 1;
    data.extend((0..len).map(|i| (i & 0xFF) as u8));
    data
}
