//! Home computer file format sniffers and loaders.
//!
//! This module recognizes:
//! - Z1013 Headersave files
//! - KC-TAP containers (KC85, Z9001, KC-BASIC)
//! - KC system files (KCC, KCB) and KC-BASIC header files, with or
//!   without tape block numbers
//! - Headerless BASIC dumps of various interpreters
//! - RBASIC machine code, Intel HEX
//! - Tape audio (CSW) and foreign tape images (TZX, CDT, ZX Spectrum TAP)

pub mod basic;
pub mod blocks;
pub mod headersave;
pub mod hex;
pub mod kc;
pub mod kctap;
pub mod rmc;
pub mod tape;

use crate::error::{KcFileError, Result};
use crate::types::{ClassifierOptions, Fields, FileInfo, Format, ProgramImage, WINDOW_SIZE};
use byteorder::{ByteOrder, LittleEndian};
use std::path::Path;
use tracing::debug;

/// Magic byte signatures for format detection.
pub mod magic {
    /// CSW: "Compressed Square Wave" followed by 0x1A
    pub const CSW: [u8; 23] = *b"Compressed Square Wave\x1A";

    /// KC-TAP: 0xC3 "KC-TAPE by AF. " (Latin-1)
    pub const KCTAP: [u8; 16] = [
        0xC3, b'K', b'C', b'-', b'T', b'A', b'P', b'E', b' ', b'b', b'y', b' ', b'A', b'F', b'.',
        b' ',
    ];

    /// TZX/CDT: "ZXTape!" followed by 0x1A
    pub const TZX: [u8; 8] = *b"ZXTape!\x1A";
}

/// Extensions of KC system files loaded as KCC.
pub const KCC_EXTENSIONS: [&str; 8] = ["KCC", "KCM", "851", "852", "853", "854", "855", "JTC"];

/// Extensions of headerless BASIC dumps.
pub const BASIC_EXTENSIONS: [&str; 3] = ["ABC", "BAC", "BAS"];

/// Leading bytes of a file used for classification.
#[derive(Debug, Clone, Copy)]
pub struct ByteWindow<'a> {
    bytes: &'a [u8],
    file_len: usize,
    file_name: Option<&'a str>,
}

impl<'a> ByteWindow<'a> {
    /// Window over the first 256 bytes of a complete file.
    pub fn new(data: &'a [u8], file_name: Option<&'a str>) -> Self {
        Self::with_size(data, file_name, WINDOW_SIZE)
    }

    /// Window over the first `size` bytes of a complete file, at most 256.
    pub fn with_size(data: &'a [u8], file_name: Option<&'a str>, size: usize) -> Self {
        Self {
            bytes: &data[..data.len().min(size.min(WINDOW_SIZE))],
            file_len: data.len(),
            file_name,
        }
    }

    /// Window over an already read file prefix.
    pub fn from_prefix(prefix: &'a [u8], file_len: usize, file_name: Option<&'a str>) -> Self {
        Self {
            bytes: prefix,
            file_len: file_len.max(prefix.len()),
            file_name,
        }
    }

    /// Bytes inside the window.
    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Number of bytes inside the window.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the window holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Length of the whole file.
    pub fn file_len(&self) -> usize {
        self.file_len
    }

    /// File name used for extension heuristics.
    pub fn file_name(&self) -> Option<&'a str> {
        self.file_name
    }

    /// Upper-case extension of the file name.
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name?;
        Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_uppercase)
    }
}

/// Classify a window with signature tests and filename heuristics.
pub fn classify(window: &ByteWindow) -> Option<Format> {
    classify_with(window, true)
}

/// Classify a window; `use_filename` enables the extension heuristics.
///
/// The first matching test wins.
pub fn classify_with(window: &ByteWindow, use_filename: bool) -> Option<Format> {
    let format = classify_signature(window).or_else(|| {
        if use_filename {
            classify_by_name(window)
        } else {
            None
        }
    });
    match format {
        Some(format) => debug!(%format, file_len = window.file_len(), "classified"),
        None => debug!(file_len = window.file_len(), "no format matched"),
    }
    format
}

fn classify_signature(window: &ByteWindow) -> Option<Format> {
    if headersave::detect(window) {
        return Some(Format::Headersave);
    }
    if let Some(format) = kctap::detect(window) {
        return Some(format);
    }
    if let Some(format) = kc::detect_basic_head(window) {
        return Some(format);
    }
    if tape::detect_csw(window) {
        return Some(Format::Csw);
    }
    if let Some(format) = tape::detect_tzx(window) {
        return Some(format);
    }
    if hex::detect(window) {
        return Some(Format::IntelHex);
    }
    None
}

fn classify_by_name(window: &ByteWindow) -> Option<Format> {
    let ext = window.extension()?;
    match ext.as_str() {
        "KCB" => kc::detect_kcb(window),
        e if KCC_EXTENSIONS.contains(&e) => kc::detect_kcc(window),
        "SSS" => basic::detect_sss(window).then_some(Format::KcBasicPrg),
        e if BASIC_EXTENSIONS.contains(&e) => basic::detect_dump(window),
        "RMC" => rmc::detect(window).then_some(Format::Rmc),
        "TAP" if !kctap::is_magic_at(window.bytes(), 0) => Some(Format::ZxTap),
        "BIN" | "ROM" => Some(Format::Bin),
        _ => None,
    }
}

/// Read the display fields of a classified file.
pub fn extract_fields(bytes: &[u8], format: Format) -> Fields {
    match format {
        Format::Headersave => headersave::fields(bytes),
        Format::KcTapSys
        | Format::KcTapZ9001
        | Format::KcTapKc85
        | Format::KcTapBasicPrg
        | Format::KcTapBasicData
        | Format::KcTapBasicAsc => kctap::fields(bytes, format),
        Format::Kcb
        | Format::KcbBlkn
        | Format::KcbBlknCks
        | Format::Kcc
        | Format::KccBlkn
        | Format::KccBlknCks => kc::system_fields(bytes, format),
        Format::KcBasicHeadPrg
        | Format::KcBasicHeadPrgBlkn
        | Format::KcBasicHeadPrgBlknCks
        | Format::KcBasicHeadData
        | Format::KcBasicHeadDataBlkn
        | Format::KcBasicHeadDataBlknCks
        | Format::KcBasicHeadAsc
        | Format::KcBasicHeadAscBlkn
        | Format::KcBasicHeadAscBlknCks => kc::basic_head_fields(bytes, format),
        Format::KcBasicPrg => basic::sss_fields(bytes),
        Format::BasicPrg | Format::RBasicPrg => basic::dump_fields(bytes),
        Format::Rmc => rmc::fields(bytes),
        Format::IntelHex => hex::fields(bytes),
        Format::Csw | Format::Tzx | Format::Cdt | Format::ZxTap | Format::Bin => Fields::default(),
    }
}

/// Materialize the program image of a classified file.
pub fn build_image(bytes: &[u8], format: Format) -> Result<ProgramImage> {
    let image = match format {
        Format::Csw
        | Format::Tzx
        | Format::Cdt
        | Format::ZxTap
        | Format::KcTapBasicData
        | Format::KcTapBasicAsc
        | Format::KcBasicHeadData
        | Format::KcBasicHeadDataBlkn
        | Format::KcBasicHeadDataBlknCks
        | Format::KcBasicHeadAsc
        | Format::KcBasicHeadAscBlkn
        | Format::KcBasicHeadAscBlknCks => Err(KcFileError::TapeOnlyFormat { format }),
        Format::Headersave => headersave::build_image(bytes),
        Format::KcTapSys | Format::KcTapZ9001 | Format::KcTapKc85 | Format::KcTapBasicPrg => {
            kctap::build_image(bytes, format)
        }
        Format::Kcb
        | Format::KcbBlkn
        | Format::KcbBlknCks
        | Format::Kcc
        | Format::KccBlkn
        | Format::KccBlknCks
        | Format::KcBasicHeadPrg
        | Format::KcBasicHeadPrgBlkn
        | Format::KcBasicHeadPrgBlknCks => kc::build_image(bytes, format),
        Format::KcBasicPrg => basic::build_sss(bytes),
        Format::BasicPrg | Format::RBasicPrg => basic::build_dump(bytes, format),
        Format::Rmc => rmc::build_image(bytes),
        Format::IntelHex => hex::build_image(bytes),
        Format::Bin => Err(KcFileError::MissingLoadAddress { format }),
    }?;
    debug!(%format, image = %image, "built program image");
    Ok(image)
}

/// Load a plain memory image at a caller-supplied address.
pub fn build_bin_image(bytes: &[u8], beg_addr: u16) -> ProgramImage {
    let len = bytes.len().min(0x10000);
    ProgramImage::new(bytes[..len].to_vec(), beg_addr, Format::Bin)
}

/// Classify a file and read its display fields.
///
/// The end address is only kept when it does not lie below the begin
/// address, and the start address only when it lies in between.
pub fn describe(bytes: &[u8], file_name: Option<&str>, options: &ClassifierOptions) -> FileInfo {
    describe_prefix(bytes, bytes.len(), file_name, options)
}

/// Classify a file of `file_len` bytes from its leading part.
///
/// Fields are read from `bytes`; the reported length is `file_len`.
pub fn describe_prefix(
    bytes: &[u8],
    file_len: usize,
    file_name: Option<&str>,
    options: &ClassifierOptions,
) -> FileInfo {
    let size = options.window_size.min(WINDOW_SIZE);
    let window = ByteWindow::from_prefix(&bytes[..bytes.len().min(size)], file_len, file_name);
    let mut info = FileInfo::unrecognized(window.file_len());
    let Some(format) = classify_with(&window, options.use_filename) else {
        return info;
    };
    let fields = extract_fields(bytes, format);

    info.format = Some(format);
    info.beg_addr = fields.beg_addr;
    if let Some(beg) = fields.beg_addr {
        info.end_addr = fields.end_addr.filter(|&end| end >= beg);
        if let Some(end) = info.end_addr {
            info.start_addr = fields.start_addr.filter(|start| (beg..=end).contains(start));
        }
    }
    info.file_type = fields.file_type;
    info.description = fields.description;
    if format.is_kc_tap() {
        info.next_subfile_offset = kctap::payload_len(bytes, format)
            .and_then(|len| kctap::next_subfile_offset(bytes, format, len));
    }
    info
}

/// Read bytes with bounds checking.
pub fn read_bytes(data: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    if offset + len > data.len() {
        return Err(truncated(data, offset, len));
    }
    Ok(&data[offset..offset + len])
}

/// Read a little-endian u16.
pub fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    let bytes = read_bytes(data, offset, 2)?;
    Ok(LittleEndian::read_u16(bytes))
}

/// Little-endian word at `offset`, if present.
pub fn word_at(data: &[u8], offset: usize) -> Option<u16> {
    read_u16(data, offset).ok()
}

pub(crate) fn truncated(data: &[u8], offset: usize, expected: usize) -> KcFileError {
    KcFileError::TruncatedData {
        offset,
        expected,
        actual: data.len().saturating_sub(offset),
    }
}

/// Up to `len` bytes from `offset`, clamped to the data.
pub(crate) fn slice_payload(data: &[u8], offset: usize, len: usize) -> Vec<u8> {
    match data.get(offset..) {
        Some(rest) => rest[..len.min(rest.len())].to_vec(),
        None => Vec::new(),
    }
}

fn is_printable(b: u8) -> bool {
    (0x21..=0x7E).contains(&b) || b >= 0xA1
}

/// Text of a fixed-width name field.
///
/// Stops at NUL. Spaces only appear in front of a later visible
/// character; unprintable bytes are dropped.
pub fn read_description(data: &[u8], pos: usize, len: usize) -> Option<String> {
    let mut text = String::with_capacity(len);
    let mut spaces = 0;
    for &b in data.iter().skip(pos).take(len) {
        if b == 0 {
            break;
        }
        if b == b' ' {
            spaces += 1;
        } else if is_printable(b) {
            text.extend(std::iter::repeat(' ').take(spaces));
            spaces = 0;
            text.push(char::from(b));
        }
    }
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Name field with the 3-character extension appended to short names.
pub fn name_with_ext(data: &[u8], pos: usize, len: usize, ext_pos: usize) -> Option<String> {
    let name = read_description(data, pos, len)?;
    if name.chars().count() < 8 {
        if let Some(ext) = read_description(data, ext_pos, 3) {
            return Some(format!("{name}.{ext}"));
        }
    }
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn classify_named(data: &[u8], name: &str) -> Option<Format> {
        classify(&ByteWindow::new(data, Some(name)))
    }

    /// Deterministic pseudo-random bytes.
    fn noise(len: usize, seed: u32) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                (state >> 16) as u8
            })
            .collect()
    }

    #[test]
    fn test_classify_is_total() {
        let names = [None, Some("x.kcc"), Some("x.kcb"), Some("x.sss"), Some("x.bas"), Some("x.tap")];
        for len in [0, 1, 2, 3, 15, 16, 20, 21, 33, 128, 145, 255, 256, 300] {
            for seed in 0..8 {
                let data = noise(len, seed);
                for name in names {
                    let window = ByteWindow::new(&data, name);
                    let first = classify(&window);
                    assert_eq!(first, classify(&window));
                    let info = describe(&data, name, &ClassifierOptions::new());
                    assert_eq!(info.format, first);
                }
            }
        }
    }

    #[test]
    fn test_headersave_wins() {
        let data = headersave::make_headersave(0x0401, 0x0420, 0x0410, b'C', "GAME");
        assert_eq!(classify_named(&data, "game.kcc"), Some(Format::Headersave));
    }

    #[test]
    fn test_signatures() {
        let mut csw = magic::CSW.to_vec();
        csw.extend_from_slice(&[0; 8]);
        assert_eq!(classify(&ByteWindow::new(&csw, None)), Some(Format::Csw));

        let hex = b":10010000214601360121470136007EFE09D2190140\n";
        assert_eq!(classify(&ByteWindow::new(hex, None)), Some(Format::IntelHex));

        let mut tzx = magic::TZX.to_vec();
        tzx.extend_from_slice(&[1, 20]);
        assert_eq!(classify_named(&tzx, "demo.CDT"), Some(Format::Cdt));
    }

    #[test]
    fn test_extension_heuristics() {
        let mut kcc = kc::make_kc_header("DEMO", 2, 0x0300, 0x0340, 0);
        kcc.resize(0xC0, 0);
        assert_eq!(classify_named(&kcc, "DEMO.KCC"), Some(Format::Kcc));
        assert_eq!(classify_named(&kcc, "demo.853"), Some(Format::Kcc));
        assert_eq!(classify_named(&kcc, "demo.jtc"), Some(Format::Kcc));
        assert_eq!(classify_named(&kcc, "demo.dat"), None);
        assert_eq!(classify(&ByteWindow::new(&kcc, None)), None);

        assert_eq!(classify_named(&[0x12; 40], "game.tap"), Some(Format::ZxTap));
        assert_eq!(classify_named(&[0x12; 40], "rom.bin"), Some(Format::Bin));
        assert_eq!(classify_named(&[0x12; 40], "rom.ROM"), Some(Format::Bin));
        assert_eq!(classify_named(&[0x12; 40], "x.rmc"), None);
    }

    #[test]
    fn test_strict_options_skip_names() {
        let data = [0x12; 40];
        let info = describe(&data, Some("rom.bin"), &ClassifierOptions::strict());
        assert_eq!(info.format, None);
        let info = describe(&data, Some("rom.bin"), &ClassifierOptions::new());
        assert_eq!(info.format, Some(Format::Bin));
    }

    #[test]
    fn test_describe_headersave() {
        let data = headersave::make_headersave(0x0401, 0x0420, 0x0410, b'C', "GAME");
        let info = describe(&data, None, &ClassifierOptions::new());
        assert_eq!(info.to_string(), "Headersave: 0401-0420 Start=0410 Typ=C GAME");
        assert_eq!(info.file_len, data.len());
    }

    #[test]
    fn test_describe_hides_start_outside_range() {
        let data = headersave::make_headersave(0x0401, 0x0420, 0xE000, b'C', "GAME");
        let info = describe(&data, None, &ClassifierOptions::new());
        assert_eq!(info.start_addr, None);
        assert_eq!(info.end_addr, Some(0x0420));
    }

    #[test]
    fn test_describe_chained_tap() {
        let first = kctap::make_kctap_sys(0, "ONE", 0x1000, 0x10FF, 0x1000, &[0x55; 256]);
        let second = kctap::make_kctap_sys(0, "TWO", 0x2000, 0x20FF, 0x2000, &[0xAA; 256]);
        let mut data = first.clone();
        data.extend_from_slice(&second);

        let info = describe(&data, Some("both.tap"), &ClassifierOptions::new());
        assert_eq!(info.format, Some(Format::KcTapZ9001));
        assert_eq!(info.next_subfile_offset, Some(first.len()));
        assert_eq!(info.description.as_deref(), Some("ONE"));
    }

    fn kcc_fixture() -> Vec<u8> {
        let mut kcc = kc::make_kc_header("DEMO", 2, 0x0300, 0x0340, 0);
        kcc.resize(0xC0, 0);
        kcc
    }

    fn kcb_fixture() -> Vec<u8> {
        let mut kcb = kc::make_kc_header("PROG    KCB", 2, 0x0401, 0x0500, 0);
        kcb.extend_from_slice(&[0x09, 0x04, 0x0A, 0x00, 0x8B, 0x20, 0x31, 0x00]);
        kcb.extend_from_slice(&[0x0F, 0x04, 0x14, 0x00, 0x81, 0x00, 0x00, 0x00]);
        kcb.resize(kc::HEADER_LEN + 0xFF, 0);
        kcb
    }

    fn sss_fixture() -> Vec<u8> {
        let mut sss = vec![0x20, 0x00, 0x09, 0x04, 0x0A, 0x00, 0x8B, 0x00, 0x00, 0x00];
        sss.resize(0x22, 0);
        sss
    }

    fn rmc_fixture() -> Vec<u8> {
        let mut rmc = vec![0xFE, 0x00, 0xC0, 0x0F, 0xC0, 0x00, 0xC0];
        rmc.extend_from_slice(&[0xC9; 16]);
        rmc
    }

    #[test]
    fn test_extension_routing() {
        let dump = vec![0x09, 0x04, 0x0A, 0x00, 0x8B, 0x00, 0x00, 0x00, 0x00, 0x00];
        let rbasic = vec![0xFF, 0x10, 0x80, 0x0A, 0x00, 0x8B, 0x00, 0x00, 0x00, 0x00, 0x00];
        let noise = vec![0x12u8; 40];
        let mut tzx = magic::TZX.to_vec();
        tzx.extend_from_slice(&[1, 20]);
        let kcc = kcc_fixture();

        let cases = vec![
            (kcb_fixture(), "PROG.KCB", Format::Kcb),
            (sss_fixture(), "prog.sss", Format::KcBasicPrg),
            (dump.clone(), "prog.ABC", Format::BasicPrg),
            (dump.clone(), "prog.bac", Format::BasicPrg),
            (dump, "prog.BAS", Format::BasicPrg),
            (rbasic, "prog.bas", Format::RBasicPrg),
            (rmc_fixture(), "code.RMC", Format::Rmc),
            (kcc.clone(), "demo.KCC", Format::Kcc),
            (kcc.clone(), "demo.kcm", Format::Kcc),
            (kcc.clone(), "demo.851", Format::Kcc),
            (kcc.clone(), "demo.852", Format::Kcc),
            (kcc.clone(), "demo.854", Format::Kcc),
            (kcc.clone(), "demo.855", Format::Kcc),
            (kcc, "demo.JTC", Format::Kcc),
            (noise.clone(), "game.TAP", Format::ZxTap),
            (noise, "rom.rom", Format::Bin),
            (tzx, "game.cdt", Format::Cdt),
        ];
        for (data, name, expected) in &cases {
            assert_eq!(classify_named(data, name), Some(*expected), "{name}");
        }
    }

    #[test]
    fn test_describe_prefix_keeps_file_len() {
        let mut tzx = magic::TZX.to_vec();
        tzx.extend_from_slice(&[1, 20]);
        let info = describe_prefix(&tzx, 900_000, Some("long.tzx"), &ClassifierOptions::new());
        assert_eq!(info.format, Some(Format::Tzx));
        assert_eq!(info.file_len, 900_000);
    }

    #[test]
    fn test_window_size_is_capped() {
        let data = [0u8; 1000];
        assert_eq!(ByteWindow::with_size(&data, None, 4096).len(), WINDOW_SIZE);
        assert_eq!(ByteWindow::with_size(&data, None, 16).len(), 16);
        assert_eq!(ByteWindow::with_size(&data, None, 4096).file_len(), 1000);
    }

    #[test]
    fn test_build_image_is_idempotent() {
        let tap = kctap::make_kctap_sys(0, "ONE", 0x1000, 0x10FF, 0x1000, &[1; 256]);
        let hex = b":0210000001021B\n:00000001FF\n".to_vec();
        let cases = [
            (headersave::make_headersave(0x1000, 0x10FF, 0x1000, b'C', "AGAIN"), None),
            (kcc_fixture(), Some("DEMO.KCC")),
            (blocks::frame(&kcb_fixture(), 1, true), Some("PROG.KCB")),
            (tap, Some("ONE.TAP")),
            (hex, None),
            (sss_fixture(), Some("PROG.SSS")),
            (rmc_fixture(), Some("CODE.RMC")),
        ];
        for (data, name) in &cases {
            let window = ByteWindow::new(data, *name);
            let format = classify(&window).unwrap();
            assert_eq!(classify(&window), Some(format));
            let a = build_image(data, format).unwrap();
            let b = build_image(data, format).unwrap();
            assert_eq!(a, b);
            assert_eq!(describe(data, *name, &ClassifierOptions::new()).format, Some(format));
        }
    }

    #[test]
    fn test_tape_and_bin_not_loadable() {
        assert!(matches!(
            build_image(&[0; 64], Format::Tzx),
            Err(KcFileError::TapeOnlyFormat { format: Format::Tzx })
        ));
        assert!(matches!(
            build_image(&[0; 64], Format::Bin),
            Err(KcFileError::MissingLoadAddress { .. })
        ));
        let image = build_bin_image(&[1, 2, 3], 0x8000);
        assert_eq!(image.end_addr(), 0x8002);
    }

    #[test]
    fn test_read_description() {
        assert_eq!(read_description(b"AB  CD  ", 0, 8).as_deref(), Some("AB  CD"));
        assert_eq!(read_description(b"AB\0CD", 0, 5).as_deref(), Some("AB"));
        assert_eq!(read_description(b"A\x01B\x7F", 0, 4).as_deref(), Some("AB"));
        assert_eq!(read_description(b"    ", 0, 4), None);
        assert_eq!(read_description(b"AB", 5, 4), None);
        assert_eq!(read_description(b"\xC4RGER", 0, 5).as_deref(), Some("\u{C4}RGER"));
    }

    #[test]
    fn test_name_with_ext() {
        assert_eq!(
            name_with_ext(b"GAME\0\0\0\0COM", 0, 11, 8).as_deref(),
            Some("GAME.COM")
        );
        assert_eq!(
            name_with_ext(b"LONGNAMECOM", 0, 11, 8).as_deref(),
            Some("LONGNAMECOM")
        );
    }

    #[test]
    fn test_read_u16() {
        let data = [0x01, 0x04, 0x03];
        assert_eq!(read_u16(&data, 0).unwrap(), 0x0401);
        assert!(matches!(
            read_u16(&data, 2),
            Err(KcFileError::TruncatedData { offset: 2, expected: 2, actual: 1 })
        ));
        assert_eq!(word_at(&data, 5), None);
    }
}
