//! KC-TAP tape containers.
//!
//! A KC-TAP file is the 16-byte magic followed by 129-byte tape blocks,
//! each a block number plus 128 data bytes. System files keep a full
//! 128-byte KC header in the first block; BASIC files start with three
//! marker bytes, an 8-character name and the program length. Several
//! containers may be concatenated into one file.

use super::{basic, kc, magic, name_with_ext, read_description, word_at, ByteWindow};
use crate::error::{KcFileError, Result};
use crate::types::{Fields, Format, ProgramImage};
use tracing::debug;

/// Length of the container magic.
pub const MAGIC_LEN: usize = magic::KCTAP.len();

/// Tape block length including the block number.
pub const BLOCK_LEN: usize = 129;

/// Offset of the first block number.
pub const FIRST_BLOCK: usize = MAGIC_LEN;

/// Offset of the KC header in system containers.
pub const HEADER: usize = FIRST_BLOCK + 1;

/// First data byte of system containers (block number of block 2).
pub const SYS_DATA: usize = HEADER + kc::HEADER_LEN;

/// First program byte of BASIC containers.
pub const BASIC_DATA: usize = HEADER + kc::BASIC_HEAD_LEN;

/// Program bytes stored in the first block of BASIC containers.
pub const BASIC_FIRST_BLOCK: usize = BLOCK_LEN - 1 - kc::BASIC_HEAD_LEN;

/// Whether a container magic begins at `offset`.
pub fn is_magic_at(bytes: &[u8], offset: usize) -> bool {
    offset
        .checked_add(MAGIC_LEN)
        .and_then(|end| bytes.get(offset..end))
        .map_or(false, |m| m == magic::KCTAP)
}

/// Detect a KC-TAP container and its content.
///
/// A BASIC marker triple wins over the block number at byte 16.
pub fn detect(window: &ByteWindow) -> Option<Format> {
    let bytes = window.bytes();
    if window.file_len() <= 144 || window.len() <= 33 || !is_magic_at(bytes, 0) {
        return None;
    }
    let format = match kc::basic_marker(&bytes[HEADER..HEADER + 3]) {
        Some(Format::KcBasicHeadPrg) => Format::KcTapBasicPrg,
        Some(Format::KcBasicHeadData) => Format::KcTapBasicData,
        Some(_) => Format::KcTapBasicAsc,
        None => match bytes[FIRST_BLOCK] {
            0 => Format::KcTapZ9001,
            1 => Format::KcTapKc85,
            _ => Format::KcTapSys,
        },
    };
    Some(format)
}

/// Header fields of a container.
pub fn fields(bytes: &[u8], format: Format) -> Fields {
    match format {
        Format::KcTapSys | Format::KcTapZ9001 | Format::KcTapKc85 => {
            let end_raw = word_at(bytes, HEADER + kc::END_ADDR);
            // KC85 stores the exclusive end, Z9001 the last address
            let end_addr = if format == Format::KcTapKc85 {
                end_raw.map(|end| end.wrapping_sub(1))
            } else {
                end_raw
            };
            let start_addr = match bytes.get(HEADER + kc::ARG_COUNT) {
                Some(&n) if n >= 3 => word_at(bytes, HEADER + kc::START_ADDR),
                _ => None,
            };
            Fields {
                beg_addr: word_at(bytes, HEADER + kc::BEG_ADDR),
                end_addr,
                start_addr,
                file_type: None,
                description: name_with_ext(bytes, HEADER, 11, HEADER + 8),
            }
        }
        Format::KcTapBasicPrg => {
            let base = bytes.get(BASIC_DATA + 1).map(|&m| basic::kc_basic_base(m));
            let end_addr = match (base, word_at(bytes, BASIC_DATA - 2)) {
                (Some(base), Some(len)) => Some(len.wrapping_add(base).wrapping_sub(1)),
                _ => None,
            };
            Fields {
                beg_addr: base,
                end_addr,
                description: read_description(bytes, HEADER + 3, 8),
                ..Fields::default()
            }
        }
        Format::KcTapBasicData | Format::KcTapBasicAsc => Fields {
            description: read_description(bytes, HEADER + 3, 8),
            ..Fields::default()
        },
        _ => Fields::default(),
    }
}

/// Number of payload bytes the container announces.
pub fn payload_len(bytes: &[u8], format: Format) -> Option<usize> {
    match format {
        Format::KcTapSys | Format::KcTapZ9001 | Format::KcTapKc85 => {
            let f = fields(bytes, format);
            let (beg, end) = (f.beg_addr?, f.end_addr?);
            Some(usize::from(end.wrapping_sub(beg)) + 1)
        }
        Format::KcTapBasicPrg => word_at(bytes, BASIC_DATA - 2).map(usize::from),
        _ => None,
    }
}

/// Offset of a chained container following the one at the start of `bytes`.
///
/// `len` is the payload length of the first container. System files
/// occupy the header block plus one block per 128 bytes; BASIC files
/// pack markers, name, length word, program and end marker into blocks.
pub fn next_subfile_offset(bytes: &[u8], format: Format, len: usize) -> Option<usize> {
    let blocks = match format {
        Format::KcTapSys | Format::KcTapZ9001 | Format::KcTapKc85 => 1 + (len + 127) / 128,
        Format::KcTapBasicPrg => (len + kc::BASIC_HEAD_LEN + 1 + 127) / 128,
        _ => return None,
    };
    let offset = FIRST_BLOCK + BLOCK_LEN * blocks;
    if is_magic_at(bytes, offset) {
        debug!(offset, "chained KC-TAP container");
        Some(offset)
    } else {
        None
    }
}

/// Copy `len` data bytes starting at `pos`, skipping block numbers.
///
/// `blk_remain` is the number of data bytes left in the block `pos`
/// points into; zero means `pos` is at a block number.
fn deinterleave(bytes: &[u8], mut pos: usize, mut blk_remain: usize, len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(len);
    while out.len() < len && pos < bytes.len() {
        if blk_remain == 0 {
            blk_remain = BLOCK_LEN - 1;
        } else {
            out.push(bytes[pos]);
            blk_remain -= 1;
        }
        pos += 1;
    }
    out
}

/// Collect the payload of a container.
pub fn build_image(bytes: &[u8], format: Format) -> Result<ProgramImage> {
    if format.is_tape_only() {
        return Err(KcFileError::TapeOnlyFormat { format });
    }
    let fields = fields(bytes, format);
    let (Some(beg), Some(len)) = (fields.beg_addr, payload_len(bytes, format)) else {
        return Err(super::truncated(bytes, 0, SYS_DATA));
    };
    if len == 0 {
        return Err(KcFileError::corrupt(format, "program length is zero"));
    }
    let (pos, blk_remain) = if format == Format::KcTapBasicPrg {
        (BASIC_DATA, BASIC_FIRST_BLOCK)
    } else {
        (SYS_DATA, 0)
    };
    let payload = deinterleave(bytes, pos, blk_remain, len);
    Ok(ProgramImage::new(payload, beg, format).with_start(fields.start_addr))
}

/// One container inside a chained KC-TAP file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subfile {
    /// Offset of the container magic
    pub offset: usize,
    /// Content of the container
    pub format: Format,
}

/// Iterator over chained containers.
#[derive(Debug, Clone)]
pub struct Subfiles<'a> {
    bytes: &'a [u8],
    next: Option<usize>,
}

impl<'a> Iterator for Subfiles<'a> {
    type Item = Subfile;

    fn next(&mut self) -> Option<Subfile> {
        let offset = self.next.take()?;
        let rest = &self.bytes[offset..];
        let format = detect(&ByteWindow::new(rest, None))?;
        self.next = payload_len(rest, format)
            .and_then(|len| next_subfile_offset(rest, format, len))
            .map(|n| offset + n);
        Some(Subfile { offset, format })
    }
}

/// Walk all containers of a KC-TAP file.
pub fn subfiles(bytes: &[u8]) -> Subfiles<'_> {
    Subfiles {
        bytes,
        next: if is_magic_at(bytes, 0) { Some(0) } else { None },
    }
}

#[cfg(test)]
fn push_blocks(data: &mut Vec<u8>, body: &[u8], first: u8) {
    let n_blocks = (body.len() + 127) / 128;
    for (i, chunk) in body.chunks(128).enumerate() {
        let num = if i + 1 == n_blocks {
            0xFF
        } else {
            first.wrapping_add(i as u8)
        };
        data.push(num);
        data.extend_from_slice(chunk);
        data.resize(data.len() + 128 - chunk.len(), 0);
    }
}

/// System container; `end` is stored as given.
#[cfg(test)]
pub(crate) fn make_kctap_sys(first: u8, name: &str, beg: u16, end: u16, start: u16, payload: &[u8]) -> Vec<u8> {
    let mut data = magic::KCTAP.to_vec();
    data.push(first);
    data.extend(kc::make_kc_header(name, 3, beg, end, start));
    push_blocks(&mut data, payload, first.wrapping_add(1));
    data
}

#[cfg(test)]
pub(crate) fn make_kctap_basic(name: &str, program: &[u8]) -> Vec<u8> {
    let mut body = vec![0xD3, 0xD3, 0xD3];
    let mut padded = name.as_bytes().to_vec();
    padded.resize(8, b' ');
    body.extend(padded);
    body.extend_from_slice(&(program.len() as u16).to_le_bytes());
    body.extend_from_slice(program);
    body.push(0x03);
    let mut data = magic::KCTAP.to_vec();
    push_blocks(&mut data, &body, 1);
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_detect_variants() {
        let z9001 = make_kctap_sys(0, "GAME", 0x0300, 0x03FF, 0x0300, &payload(256));
        let kc85 = make_kctap_sys(1, "GAME", 0x0300, 0x0400, 0x0300, &payload(256));
        let sys = make_kctap_sys(7, "GAME", 0x0300, 0x03FF, 0x0300, &payload(256));
        let basic = make_kctap_basic("PROG", &payload(40));

        let detect_bytes = |b: &[u8]| detect(&ByteWindow::new(b, None));
        assert_eq!(detect_bytes(&z9001), Some(Format::KcTapZ9001));
        assert_eq!(detect_bytes(&kc85), Some(Format::KcTapKc85));
        assert_eq!(detect_bytes(&sys), Some(Format::KcTapSys));
        assert_eq!(detect_bytes(&basic), Some(Format::KcTapBasicPrg));
        assert_eq!(detect_bytes(&z9001[..100]), None);
    }

    #[test]
    fn test_basic_marker_wins_over_block_number() {
        let mut data = make_kctap_basic("DATA", &payload(40));
        data[HEADER..HEADER + 3].copy_from_slice(&[0xD8, 0xD8, 0xD8]);
        data[FIRST_BLOCK] = 0;
        assert_eq!(
            detect(&ByteWindow::new(&data, None)),
            Some(Format::KcTapBasicData)
        );
        assert!(matches!(
            build_image(&data, Format::KcTapBasicData),
            Err(KcFileError::TapeOnlyFormat { .. })
        ));
    }

    #[test]
    fn test_end_conventions() {
        let z9001 = make_kctap_sys(0, "GAME", 0x0300, 0x03FF, 0x0300, &payload(256));
        let kc85 = make_kctap_sys(1, "GAME", 0x0300, 0x0400, 0x0300, &payload(256));
        assert_eq!(fields(&z9001, Format::KcTapZ9001).end_addr, Some(0x03FF));
        assert_eq!(fields(&kc85, Format::KcTapKc85).end_addr, Some(0x03FF));
        assert_eq!(payload_len(&kc85, Format::KcTapKc85), Some(256));
        assert_eq!(
            fields(&kc85, Format::KcTapKc85).description.as_deref(),
            Some("GAME")
        );
    }

    #[test]
    fn test_build_sys_image() {
        let data_in = payload(300);
        let data = make_kctap_sys(1, "LONG", 0x1000, 0x1000 + 300, 0x1010, &data_in);
        let image = build_image(&data, Format::KcTapKc85).unwrap();
        assert_eq!(image.beg_addr, 0x1000);
        assert_eq!(image.start_addr, Some(0x1010));
        assert_eq!(image.payload, data_in);
    }

    #[test]
    fn test_build_basic_image() {
        let program = payload(200);
        let data = make_kctap_basic("PROG", &program);
        let image = build_image(&data, Format::KcTapBasicPrg).unwrap();
        assert_eq!(image.payload, program);
        assert_eq!(image.start_addr, None);
        assert_eq!(
            fields(&data, Format::KcTapBasicPrg).description.as_deref(),
            Some("PROG")
        );
    }

    #[test]
    fn test_truncated_container_yields_partial_image() {
        let data = make_kctap_sys(0, "CUT", 0x2000, 0x2FFF, 0, &payload(256));
        let image = build_image(&data, Format::KcTapZ9001).unwrap();
        assert_eq!(image.len(), 256);
    }

    #[test]
    fn test_chained_containers() {
        let first = make_kctap_sys(0, "PART1", 0x1000, 0x10FF, 0x1000, &payload(256));
        let second = make_kctap_basic("PART2", &payload(20));
        assert_eq!(first.len(), 16 + 3 * 129);

        let mut data = first.clone();
        data.extend_from_slice(&second);
        assert_eq!(
            next_subfile_offset(&data, Format::KcTapZ9001, 256),
            Some(first.len())
        );
        assert_eq!(next_subfile_offset(&first, Format::KcTapZ9001, 256), None);

        let parts: Vec<Subfile> = subfiles(&data).collect();
        assert_eq!(
            parts,
            vec![
                Subfile {
                    offset: 0,
                    format: Format::KcTapZ9001
                },
                Subfile {
                    offset: first.len(),
                    format: Format::KcTapBasicPrg
                },
            ]
        );
    }

    #[test]
    fn test_chained_after_basic() {
        let first = make_kctap_basic("A", &payload(120));
        let second = make_kctap_basic("B", &payload(10));
        let mut data = first.clone();
        data.extend_from_slice(&second);
        assert_eq!(
            next_subfile_offset(&data, Format::KcTapBasicPrg, 120),
            Some(first.len())
        );
    }
}
