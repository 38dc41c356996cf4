//! BASIC program dumps.
//!
//! A tokenized BASIC program is a chain of lines, each starting with a
//! link word pointing at the next line; a zero link ends the program.
//! The load base differs per interpreter, so headerless dumps are
//! recognized by where their first link points.

use super::{slice_payload, word_at, ByteWindow};
use crate::error::{KcFileError, Result};
use crate::types::{Fields, Format, ProgramImage};
use tracing::debug;

/// Program start of the KC-BASIC interpreter in ROM.
pub const KC_ROM_BASE: u16 = 0x0401;

/// Program start of the KC-BASIC interpreter loaded into RAM.
pub const KC_RAM_BASE: u16 = 0x2C01;

/// Upper bound on lines followed in a link chain.
pub const MAX_LINES: usize = 0x10000;

/// Load base of a KC-BASIC program selected by its marker byte.
///
/// The marker is the high byte of the first line link.
pub fn kc_basic_base(marker: u8) -> u16 {
    if marker < 0x2C {
        KC_ROM_BASE
    } else {
        KC_RAM_BASE
    }
}

/// Memory layout of one BASIC interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicLayout {
    /// Interpreter name
    pub name: &'static str,
    /// Address of the first program line
    pub base: u16,
    /// Type byte in front of the program, if any
    pub prefix: Option<u8>,
    /// Mask applied to the high byte of the first link
    pub mask: u8,
    /// Expected masked high byte
    pub marker: u8,
    /// Smallest plausible first link (base plus a minimal line)
    pub min_link: u16,
}

impl BasicLayout {
    const fn plain(name: &'static str, base: u16, mask: u8, marker: u8) -> Self {
        Self {
            name,
            base,
            prefix: None,
            mask,
            marker,
            min_link: base + 6,
        }
    }

    /// Bytes in front of the first program line.
    pub fn header_len(&self) -> usize {
        usize::from(self.prefix.is_some())
    }

    /// Format assigned to files of this layout.
    pub fn format(&self) -> Format {
        if self.prefix.is_some() {
            Format::RBasicPrg
        } else {
            Format::BasicPrg
        }
    }

    /// Whether `bytes` start like a program of this layout.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        if let Some(prefix) = self.prefix {
            if bytes.first() != Some(&prefix) {
                return false;
            }
        }
        let offset = self.header_len();
        match (word_at(bytes, offset), bytes.get(offset + 1)) {
            (Some(link), Some(&hi)) => hi & self.mask == self.marker && link >= self.min_link,
            _ => false,
        }
    }
}

/// Known interpreter layouts, tested in order.
pub const LAYOUTS: [BasicLayout; 8] = [
    BasicLayout {
        name: "RBASIC",
        base: 0x8001,
        prefix: Some(0xFF),
        mask: 0xF0,
        marker: 0x80,
        min_link: 0x8007,
    },
    BasicLayout::plain("KC-ROM-BASIC", KC_ROM_BASE, 0xFC, 0x04),
    BasicLayout::plain("Kramer-MC", 0x1001, 0xF0, 0x10),
    BasicLayout::plain("KC-RAM-BASIC", KC_RAM_BASE, 0xFC, 0x2C),
    BasicLayout::plain("Huebler-Grafik-MC", 0x3770, 0xF0, 0x30),
    BasicLayout::plain("AC1-BASIC6", 0x6300, 0xFF, 0x63),
    BasicLayout::plain("AC1/LLC2", 0x60F7, 0xFC, 0x60),
    BasicLayout::plain("AC1-12K", 0x6FB7, 0xF0, 0x60),
];

/// Find the interpreter layout a headerless dump was saved from.
pub fn find_layout(bytes: &[u8]) -> Option<&'static BasicLayout> {
    LAYOUTS.iter().find(|layout| layout.matches(bytes))
}

/// `.ABC`, `.BAC`, `.BAS`: headerless BASIC dump.
pub fn detect_dump(window: &ByteWindow) -> Option<Format> {
    find_layout(window.bytes()).map(BasicLayout::format)
}

/// `.SSS`: KC-BASIC program with a leading length word.
///
/// Byte 3 (high byte of the first link) selects the load base and the
/// link has to point above it.
pub fn detect_sss(window: &ByteWindow) -> bool {
    if window.file_len() < 9 {
        return false;
    }
    match (window.bytes().get(3), word_at(window.bytes(), 2)) {
        (Some(&marker), Some(link)) => link > kc_basic_base(marker),
        _ => false,
    }
}

/// Length of a program whose first line sits at file offset `offset`.
///
/// Follows the link chain from `base`. A link that does not increase,
/// reaches `limit` or cannot be read is an error. The length covers the
/// terminating zero link.
pub fn program_len(
    bytes: &[u8],
    offset: usize,
    base: u16,
    limit: u16,
) -> std::result::Result<usize, &'static str> {
    let mut cur = base;
    for _ in 0..MAX_LINES {
        let pos = offset + usize::from(cur - base);
        let next = word_at(bytes, pos).ok_or("line chain runs past the end of the file")?;
        if next == 0 {
            return Ok(usize::from(cur - base) + 2);
        }
        if next <= cur {
            return Err("line pointer does not increase");
        }
        if next >= limit {
            return Err("line pointer beyond the end address");
        }
        cur = next;
    }
    Err("too many program lines")
}

/// Fields of `KcBasicPrg` (`.SSS`) files.
pub fn sss_fields(bytes: &[u8]) -> Fields {
    let base = bytes.get(3).map(|&m| kc_basic_base(m));
    let end_addr = match (base, word_at(bytes, 0)) {
        (Some(base), Some(len)) => Some(len.wrapping_add(base).wrapping_sub(1)),
        _ => None,
    };
    Fields {
        beg_addr: base,
        end_addr,
        ..Fields::default()
    }
}

/// Fields of headerless dumps: only the load base is known.
pub fn dump_fields(bytes: &[u8]) -> Fields {
    Fields {
        beg_addr: find_layout(bytes).map(|layout| layout.base),
        ..Fields::default()
    }
}

/// Load a `.SSS` program.
pub fn build_sss(bytes: &[u8]) -> Result<ProgramImage> {
    let (Some(len), Some(&marker)) = (word_at(bytes, 0), bytes.get(3)) else {
        return Err(super::truncated(bytes, 0, 4));
    };
    if len == 0 {
        return Err(KcFileError::corrupt(
            Format::KcBasicPrg,
            "program length is zero",
        ));
    }
    let payload = slice_payload(bytes, 2, usize::from(len));
    Ok(ProgramImage::new(
        payload,
        kc_basic_base(marker),
        Format::KcBasicPrg,
    ))
}

/// Load a headerless dump at its interpreter's base.
pub fn build_dump(bytes: &[u8], format: Format) -> Result<ProgramImage> {
    let layout = find_layout(bytes)
        .filter(|layout| layout.format() == format)
        .ok_or_else(|| KcFileError::corrupt(format, "no known BASIC memory layout"))?;
    debug!(layout = layout.name, base = layout.base, "headerless BASIC dump");
    let payload = bytes[layout.header_len()..].to_vec();
    Ok(ProgramImage::new(payload, layout.base, format))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(link: u16) -> Vec<u8> {
        let mut data = link.to_le_bytes().to_vec();
        data.extend_from_slice(&[0x0A, 0x00, 0x8B, 0x00, 0x00, 0x00]);
        data
    }

    #[test]
    fn test_kc_basic_base() {
        assert_eq!(kc_basic_base(0x04), 0x0401);
        assert_eq!(kc_basic_base(0x2B), 0x0401);
        assert_eq!(kc_basic_base(0x2C), 0x2C01);
        assert_eq!(kc_basic_base(0x40), 0x2C01);
    }

    #[test]
    fn test_find_layout() {
        assert_eq!(find_layout(&dump(0x0409)).map(|l| l.name), Some("KC-ROM-BASIC"));
        assert_eq!(find_layout(&dump(0x0409)).map(|l| l.base), Some(0x0401));
        assert_eq!(find_layout(&dump(0x2C09)).map(|l| l.base), Some(0x2C01));
        assert_eq!(find_layout(&dump(0x1010)).map(|l| l.base), Some(0x1001));
        assert_eq!(find_layout(&dump(0x3780)).map(|l| l.base), Some(0x3770));
        assert_eq!(find_layout(&dump(0x6105)).map(|l| l.base), Some(0x60F7));
        assert_eq!(find_layout(&dump(0x6310)).map(|l| l.base), Some(0x6300));
        assert_eq!(find_layout(&dump(0x6FC5)).map(|l| l.base), Some(0x6FB7));
        // Link inside the first six bytes cannot be a program line
        assert_eq!(find_layout(&dump(0x0403)), None);
        assert_eq!(find_layout(&dump(0xC000)), None);
    }

    #[test]
    fn test_rbasic_layout() {
        let mut data = vec![0xFF];
        data.extend(dump(0x8010));
        let layout = find_layout(&data).unwrap();
        assert_eq!(layout.name, "RBASIC");
        assert_eq!(layout.format(), Format::RBasicPrg);

        let image = build_dump(&data, Format::RBasicPrg).unwrap();
        assert_eq!(image.beg_addr, 0x8001);
        assert_eq!(image.len(), data.len() - 1);
        assert_eq!(image.payload[..2], [0x10, 0x80]);
    }

    #[test]
    fn test_detect_sss() {
        let mut data = 0x0020u16.to_le_bytes().to_vec();
        data.extend(dump(0x0409));
        data.resize(0x22, 0);
        assert!(detect_sss(&ByteWindow::new(&data, None)));

        let image = build_sss(&data).unwrap();
        assert_eq!(image.beg_addr, 0x0401);
        assert_eq!(image.len(), 0x20);

        let fields = sss_fields(&data);
        assert_eq!(fields.beg_addr, Some(0x0401));
        assert_eq!(fields.end_addr, Some(0x0420));
    }

    #[test]
    fn test_sss_link_below_base() {
        let mut data = vec![0x10, 0x00, 0x00, 0x00];
        data.resize(16, 0);
        assert!(!detect_sss(&ByteWindow::new(&data, None)));
    }

    #[test]
    fn test_program_len_stops_at_zero_link() {
        // 0x0401 -> 0x0409 -> end
        let mut data = dump(0x0409);
        data.extend_from_slice(&[0x00, 0x00]);
        assert_eq!(program_len(&data, 0, KC_ROM_BASE, 0x0500), Ok(10));
    }

    #[test]
    fn test_program_len_rejects_loops() {
        let data = dump(0x0401);
        assert!(program_len(&data, 0, KC_ROM_BASE, 0x0500).is_err());
        let data = dump(0x0409);
        assert!(program_len(&data, 0, KC_ROM_BASE, 0x0500).is_err());
    }
}
