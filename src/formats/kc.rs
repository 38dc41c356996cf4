//! KC85/Z9001 system files and KC-BASIC header files.
//!
//! A KC system file (KCC, KCB) starts with a 128-byte header:
//!
//! | Offset | Size | Field |
//! |---|---|---|
//! | 0 | 11 | name (last 3 chars are the extension) |
//! | 16 | 1 | argument count (2, or 3 with start address) |
//! | 17 | 2 | begin address |
//! | 19 | 2 | end address + 1 |
//! | 21 | 2 | start address |
//!
//! KC-BASIC header files carry three marker bytes, an 8-character name
//! and the program length in front of the tokenized program.
//!
//! Both may be prefixed by tape block numbers, which shift every offset
//! by one.

use super::{basic, blocks, name_with_ext, read_description, slice_payload, word_at, ByteWindow};
use crate::error::{KcFileError, Result};
use crate::types::{BlockLayout, Fields, Format, ProgramImage};
use tracing::warn;

/// KC system file header length.
pub const HEADER_LEN: usize = 128;

/// Offset of the argument count.
pub const ARG_COUNT: usize = 16;

/// Offset of the begin address.
pub const BEG_ADDR: usize = 17;

/// Offset of the exclusive end address.
pub const END_ADDR: usize = 19;

/// Offset of the start address.
pub const START_ADDR: usize = 21;

/// Length of a KC-BASIC header (markers, name, length word).
pub const BASIC_HEAD_LEN: usize = 13;

/// Marker triples preceding KC-BASIC files.
pub mod markers {
    /// Tokenized program (plain or protected)
    pub const PRG: [u8; 2] = [0xD3, 0xD7];
    /// Data field
    pub const DATA: [u8; 2] = [0xD4, 0xD8];
    /// ASCII listing
    pub const ASC: [u8; 2] = [0xD5, 0xD9];
}

/// Map a three-byte marker to a KC-BASIC header format.
pub fn basic_marker(bytes: &[u8]) -> Option<Format> {
    let &[a, b, c] = bytes.get(0..3)? else {
        return None;
    };
    if a != b || b != c {
        return None;
    }
    if markers::PRG.contains(&a) {
        Some(Format::KcBasicHeadPrg)
    } else if markers::DATA.contains(&a) {
        Some(Format::KcBasicHeadData)
    } else if markers::ASC.contains(&a) {
        Some(Format::KcBasicHeadAsc)
    } else {
        None
    }
}

/// Detect a KC-BASIC header file, optionally with block numbers.
pub fn detect_basic_head(window: &ByteWindow) -> Option<Format> {
    if window.file_len() <= 20 {
        return None;
    }
    let layout = blocks::has_block_numbers(window.bytes());
    let offset = layout.header_offset();
    let format = basic_marker(window.bytes().get(offset..)?)?;
    Some(format.with_blocks(layout))
}

/// Argument count, begin and end word of a KC header at `offset`.
fn header_words(bytes: &[u8], offset: usize) -> Option<(u8, u16, u16)> {
    let arg_count = *bytes.get(ARG_COUNT + offset)?;
    let beg = word_at(bytes, BEG_ADDR + offset)?;
    let end = word_at(bytes, END_ADDR + offset)?;
    Some((arg_count, beg, end))
}

/// `.KCB`: KC header whose address range can hold a BASIC program.
pub fn detect_kcb(window: &ByteWindow) -> Option<Format> {
    let layout = blocks::has_block_numbers(window.bytes());
    let offset = layout.header_offset();
    if window.file_len() <= HEADER_LEN - 1 + offset {
        return None;
    }
    let (arg_count, beg, end) = header_words(window.bytes(), offset)?;
    if (2..=4).contains(&arg_count) && beg <= basic::KC_ROM_BASE && end >= basic::KC_ROM_BASE + 8 {
        Some(Format::Kcb.with_blocks(layout))
    } else {
        None
    }
}

/// `.KCC` and relatives: KC header with a plausible address range.
pub fn detect_kcc(window: &ByteWindow) -> Option<Format> {
    let layout = blocks::has_block_numbers(window.bytes());
    let offset = layout.header_offset();
    if window.file_len() <= HEADER_LEN - 1 + offset {
        return None;
    }
    let (arg_count, beg, end) = header_words(window.bytes(), offset)?;
    if (2..=4).contains(&arg_count) && beg <= end.wrapping_sub(1) {
        Some(Format::Kcc.with_blocks(layout))
    } else {
        None
    }
}

fn layout_of(format: Format) -> BlockLayout {
    BlockLayout {
        present: format.block_size().is_some(),
        has_checksum: format.block_size() == Some(130),
    }
}

/// Fields of KC system files (`Kcc*`, `Kcb*`).
pub fn system_fields(bytes: &[u8], format: Format) -> Fields {
    let o = layout_of(format).header_offset();
    let start_addr = match bytes.get(ARG_COUNT + o) {
        Some(&n) if n >= 3 => word_at(bytes, START_ADDR + o),
        _ => None,
    };
    Fields {
        beg_addr: word_at(bytes, BEG_ADDR + o),
        end_addr: word_at(bytes, END_ADDR + o).map(|end| end.wrapping_sub(1)),
        start_addr,
        file_type: None,
        description: name_with_ext(bytes, o, 11, o + 8),
    }
}

/// Fields of KC-BASIC header files.
pub fn basic_head_fields(bytes: &[u8], format: Format) -> Fields {
    let o = layout_of(format).header_offset();
    let description = read_description(bytes, 3 + o, 8);
    if format.base() != Format::KcBasicHeadPrg {
        return Fields {
            description,
            ..Fields::default()
        };
    }
    let base = bytes.get(14 + o).map(|&m| basic::kc_basic_base(m));
    let end_addr = match (base, word_at(bytes, 11 + o)) {
        (Some(base), Some(len)) => Some(len.wrapping_add(base).wrapping_sub(1)),
        _ => None,
    };
    Fields {
        beg_addr: base,
        end_addr,
        description,
        ..Fields::default()
    }
}

/// Load a KCC file: straight slice behind the 128-byte header.
fn build_kcc(bytes: &[u8], format: Format) -> Result<ProgramImage> {
    let fields = system_fields(bytes, Format::Kcc);
    let (Some(beg), Some(end)) = (fields.beg_addr, fields.end_addr) else {
        return Err(super::truncated(bytes, 0, START_ADDR));
    };
    let len = usize::from(end.wrapping_sub(beg)) + 1;
    let payload = slice_payload(bytes, HEADER_LEN, len);
    Ok(ProgramImage::new(payload, beg, format).with_start(fields.start_addr))
}

/// Load the BASIC program of a KCB file by walking its line chain.
fn build_kcb(bytes: &[u8], format: Format) -> Result<ProgramImage> {
    let Some((_, file_beg, file_end)) = header_words(bytes, 0) else {
        return Err(super::truncated(bytes, 0, START_ADDR));
    };
    if file_beg > basic::KC_ROM_BASE || file_end < basic::KC_ROM_BASE + 8 {
        return Err(KcFileError::corrupt(
            format,
            "address range cannot hold a KC-BASIC program",
        ));
    }
    // File offset of the byte at address 0x0401
    let offset = HEADER_LEN + usize::from(basic::KC_ROM_BASE - file_beg);
    let len = basic::program_len(bytes, offset, basic::KC_ROM_BASE, file_end)
        .map_err(|message| KcFileError::corrupt(format, message))?;
    let payload = slice_payload(bytes, offset, len);
    Ok(ProgramImage::new(payload, basic::KC_ROM_BASE, format).with_advisory(
        "Only the KC-BASIC program is loaded. Machine code or other data \
         in the file is not; load it as KCC file to get everything.",
    ))
}

/// Load the program of a KC-BASIC header file.
fn build_basic_head(bytes: &[u8], format: Format) -> Result<ProgramImage> {
    let (Some(len), Some(&marker)) = (word_at(bytes, 11), bytes.get(14)) else {
        return Err(super::truncated(bytes, 11, 4));
    };
    if len == 0 {
        return Err(KcFileError::corrupt(format, "program length is zero"));
    }
    let payload = slice_payload(bytes, BASIC_HEAD_LEN, usize::from(len));
    Ok(ProgramImage::new(payload, basic::kc_basic_base(marker), format))
}

/// Build the image of any loadable KC system or KC-BASIC header format.
pub fn build_image(bytes: &[u8], format: Format) -> Result<ProgramImage> {
    if format.is_tape_only() {
        return Err(KcFileError::TapeOnlyFormat { format });
    }
    let layout = layout_of(format);
    let stripped;
    let data = if layout.present {
        stripped = blocks::strip(bytes, layout);
        stripped.as_slice()
    } else {
        bytes
    };
    let result = match format.base() {
        Format::Kcc => build_kcc(data, format),
        Format::Kcb => build_kcb(data, format),
        Format::KcBasicHeadPrg => build_basic_head(data, format),
        other => Err(KcFileError::TapeOnlyFormat { format: other }),
    };
    if let Err(ref e) = result {
        warn!(%format, error = %e, "cannot load KC file");
    }
    result
}

#[cfg(test)]
pub(crate) fn make_kc_header(name: &str, arg_count: u8, beg: u16, end_excl: u16, start: u16) -> Vec<u8> {
    let mut data = vec![0u8; HEADER_LEN];
    let name = name.as_bytes();
    data[..name.len()].copy_from_slice(name);
    data[ARG_COUNT] = arg_count;
    data[BEG_ADDR..BEG_ADDR + 2].copy_from_slice(&beg.to_le_bytes());
    data[END_ADDR..END_ADDR + 2].copy_from_slice(&end_excl.to_le_bytes());
    data[START_ADDR..START_ADDR + 2].copy_from_slice(&start.to_le_bytes());
    data
}
