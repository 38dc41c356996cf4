//! Core types for the file sniffer.
//!
//! This module defines the closed set of recognized file formats,
//! the classification result shown to users, and the program image
//! handed to an emulated address space.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of leading bytes examined for classification.
pub const WINDOW_SIZE: usize = 256;

/// Maximum number of file bytes read for extraction.
///
/// Worst case Intel HEX stores one payload byte per 13 file bytes
/// (`:01AAAA00DDCC\r\n`), so this is enough for a full 64K image.
pub const MAX_READ_LEN: usize = 0x10000 * 13;

/// Recognized home computer file formats.
///
/// `_Blkn` variants carry a leading block number in front of every
/// 128 payload bytes, `_BlknCks` variants additionally a trailing
/// checksum byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Format {
    /// Z1013 Headersave file with 32-byte header
    Headersave,
    /// KC-TAP container, system file of unknown origin
    KcTapSys,
    /// KC-TAP container written by a Z9001 (first block number 0)
    KcTapZ9001,
    /// KC-TAP container written by a KC85 (first block number 1)
    KcTapKc85,
    /// KC-TAP container holding a KC-BASIC program
    KcTapBasicPrg,
    /// KC-TAP container holding a KC-BASIC data field
    KcTapBasicData,
    /// KC-TAP container holding a KC-BASIC ASCII listing
    KcTapBasicAsc,
    /// KC system file holding a KC-BASIC program
    Kcb,
    /// KCB with block numbers
    KcbBlkn,
    /// KCB with block numbers and checksums
    KcbBlknCks,
    /// KC system file (KCC/JTC)
    Kcc,
    /// KCC with block numbers
    KccBlkn,
    /// KCC with block numbers and checksums
    KccBlknCks,
    /// KC-BASIC program with 11-byte header
    KcBasicHeadPrg,
    /// KC-BASIC program with block numbers
    KcBasicHeadPrgBlkn,
    /// KC-BASIC program with block numbers and checksums
    KcBasicHeadPrgBlknCks,
    /// KC-BASIC data field with 11-byte header
    KcBasicHeadData,
    /// KC-BASIC data field with block numbers
    KcBasicHeadDataBlkn,
    /// KC-BASIC data field with block numbers and checksums
    KcBasicHeadDataBlknCks,
    /// KC-BASIC ASCII listing with 11-byte header
    KcBasicHeadAsc,
    /// KC-BASIC ASCII listing with block numbers
    KcBasicHeadAscBlkn,
    /// KC-BASIC ASCII listing with block numbers and checksums
    KcBasicHeadAscBlknCks,
    /// KC-BASIC program without header (.SSS)
    KcBasicPrg,
    /// Memory dump of a BASIC program (.BAS/.ABC/.BAC)
    BasicPrg,
    /// RBASIC program file
    RBasicPrg,
    /// RBASIC machine code file
    Rmc,
    /// Compressed Square Wave audio
    Csw,
    /// ZX Spectrum tape
    Tzx,
    /// Amstrad CPC tape (TZX layout)
    Cdt,
    /// ZX Spectrum TAP
    ZxTap,
    /// Intel HEX
    IntelHex,
    /// Plain memory image without header
    Bin,
}

bitflags! {
    /// Properties shared by groups of formats.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FormatTraits: u8 {
        /// Only playable through the emulated tape interface.
        const TAPE_ONLY        = 0x01;
        /// Payload is a tokenized KC-BASIC program.
        const KC_BASIC_PROGRAM = 0x02;
        /// Every 128 payload bytes are preceded by a block number.
        const BLOCK_NUMBERS    = 0x04;
        /// Every block ends with an 8-bit checksum.
        const CHECKSUMS        = 0x08;
        /// Stored inside a KC-TAP container.
        const KC_TAP_CONTAINER = 0x10;
        /// Can be materialized into a program image.
        const LOADABLE         = 0x20;
    }
}

impl Format {
    /// All formats, in classification priority order.
    pub const ALL: [Format; 32] = [
        Format::Headersave,
        Format::KcTapSys,
        Format::KcTapZ9001,
        Format::KcTapKc85,
        Format::KcTapBasicPrg,
        Format::KcTapBasicData,
        Format::KcTapBasicAsc,
        Format::KcBasicHeadPrg,
        Format::KcBasicHeadPrgBlkn,
        Format::KcBasicHeadPrgBlknCks,
        Format::KcBasicHeadData,
        Format::KcBasicHeadDataBlkn,
        Format::KcBasicHeadDataBlknCks,
        Format::KcBasicHeadAsc,
        Format::KcBasicHeadAscBlkn,
        Format::KcBasicHeadAscBlknCks,
        Format::Csw,
        Format::Tzx,
        Format::Cdt,
        Format::IntelHex,
        Format::Kcb,
        Format::KcbBlkn,
        Format::KcbBlknCks,
        Format::Kcc,
        Format::KccBlkn,
        Format::KccBlknCks,
        Format::KcBasicPrg,
        Format::BasicPrg,
        Format::RBasicPrg,
        Format::Rmc,
        Format::ZxTap,
        Format::Bin,
    ];

    /// Returns a human-readable name for this format.
    pub fn name(&self) -> &'static str {
        match self {
            Format::Headersave => "Headersave",
            Format::KcTapSys => "KC-TAP",
            Format::KcTapZ9001 => "KC-TAP (Z9001)",
            Format::KcTapKc85 => "KC-TAP (KC85)",
            Format::KcTapBasicPrg => "KC-TAP BASIC program",
            Format::KcTapBasicData => "KC-TAP BASIC data field",
            Format::KcTapBasicAsc => "KC-TAP BASIC ASCII listing",
            Format::Kcb => "KCB",
            Format::KcbBlkn => "KCB with block numbers",
            Format::KcbBlknCks => "KCB with block numbers and checksums",
            Format::Kcc => "KCC",
            Format::KccBlkn => "KCC with block numbers",
            Format::KccBlknCks => "KCC with block numbers and checksums",
            Format::KcBasicHeadPrg => "KC-BASIC program with header",
            Format::KcBasicHeadPrgBlkn => "KC-BASIC program with header and block numbers",
            Format::KcBasicHeadPrgBlknCks => {
                "KC-BASIC program with header, block numbers and checksums"
            }
            Format::KcBasicHeadData => "KC-BASIC data field with header",
            Format::KcBasicHeadDataBlkn => "KC-BASIC data field with header and block numbers",
            Format::KcBasicHeadDataBlknCks => {
                "KC-BASIC data field with header, block numbers and checksums"
            }
            Format::KcBasicHeadAsc => "KC-BASIC ASCII listing with header",
            Format::KcBasicHeadAscBlkn => "KC-BASIC ASCII listing with header and block numbers",
            Format::KcBasicHeadAscBlknCks => {
                "KC-BASIC ASCII listing with header, block numbers and checksums"
            }
            Format::KcBasicPrg => "KC-BASIC program",
            Format::BasicPrg => "BASIC program",
            Format::RBasicPrg => "RBASIC program",
            Format::Rmc => "RBASIC machine code",
            Format::Csw => "CSW",
            Format::Tzx => "TZX",
            Format::Cdt => "CDT",
            Format::ZxTap => "ZX Spectrum TAP",
            Format::IntelHex => "Intel HEX",
            Format::Bin => "BIN",
        }
    }

    /// Returns the trait set of this format.
    pub fn traits(&self) -> FormatTraits {
        use FormatTraits as T;
        match self {
            Format::Headersave | Format::Kcc | Format::Rmc | Format::IntelHex => T::LOADABLE,
            Format::BasicPrg | Format::RBasicPrg | Format::Bin => T::LOADABLE,
            Format::KccBlkn => T::LOADABLE | T::BLOCK_NUMBERS,
            Format::KccBlknCks => T::LOADABLE | T::BLOCK_NUMBERS | T::CHECKSUMS,
            Format::KcTapSys | Format::KcTapZ9001 | Format::KcTapKc85 => {
                T::LOADABLE | T::KC_TAP_CONTAINER
            }
            Format::KcTapBasicPrg => T::LOADABLE | T::KC_TAP_CONTAINER | T::KC_BASIC_PROGRAM,
            Format::KcTapBasicData | Format::KcTapBasicAsc => T::TAPE_ONLY | T::KC_TAP_CONTAINER,
            Format::Kcb | Format::KcBasicHeadPrg | Format::KcBasicPrg => {
                T::LOADABLE | T::KC_BASIC_PROGRAM
            }
            Format::KcbBlkn | Format::KcBasicHeadPrgBlkn => {
                T::LOADABLE | T::KC_BASIC_PROGRAM | T::BLOCK_NUMBERS
            }
            Format::KcbBlknCks | Format::KcBasicHeadPrgBlknCks => {
                T::LOADABLE | T::KC_BASIC_PROGRAM | T::BLOCK_NUMBERS | T::CHECKSUMS
            }
            Format::KcBasicHeadData | Format::KcBasicHeadAsc => T::TAPE_ONLY,
            Format::KcBasicHeadDataBlkn | Format::KcBasicHeadAscBlkn => {
                T::TAPE_ONLY | T::BLOCK_NUMBERS
            }
            Format::KcBasicHeadDataBlknCks | Format::KcBasicHeadAscBlknCks => {
                T::TAPE_ONLY | T::BLOCK_NUMBERS | T::CHECKSUMS
            }
            Format::Csw | Format::Tzx | Format::Cdt | Format::ZxTap => T::TAPE_ONLY,
        }
    }

    /// Whether the format can only be played back as tape audio.
    pub fn is_tape_only(&self) -> bool {
        self.traits().contains(FormatTraits::TAPE_ONLY)
    }

    /// Whether the payload is a KC-BASIC program.
    pub fn is_kc_basic_program(&self) -> bool {
        self.traits().contains(FormatTraits::KC_BASIC_PROGRAM)
    }

    /// Whether the payload can be loaded into memory.
    pub fn is_loadable(&self) -> bool {
        self.traits().contains(FormatTraits::LOADABLE)
    }

    /// Whether the format is a KC-TAP container.
    pub fn is_kc_tap(&self) -> bool {
        self.traits().contains(FormatTraits::KC_TAP_CONTAINER)
    }

    /// Number of bytes per interleaved block, if any.
    pub fn block_size(&self) -> Option<usize> {
        let traits = self.traits();
        if traits.contains(FormatTraits::CHECKSUMS) {
            Some(130)
        } else if traits.contains(FormatTraits::BLOCK_NUMBERS) {
            Some(129)
        } else {
            None
        }
    }

    /// Format with block numbers and checksums removed.
    pub fn base(&self) -> Format {
        match self {
            Format::KcbBlkn | Format::KcbBlknCks => Format::Kcb,
            Format::KccBlkn | Format::KccBlknCks => Format::Kcc,
            Format::KcBasicHeadPrgBlkn | Format::KcBasicHeadPrgBlknCks => Format::KcBasicHeadPrg,
            Format::KcBasicHeadDataBlkn | Format::KcBasicHeadDataBlknCks => {
                Format::KcBasicHeadData
            }
            Format::KcBasicHeadAscBlkn | Format::KcBasicHeadAscBlknCks => Format::KcBasicHeadAsc,
            other => *other,
        }
    }

    /// Selects the block-number variant of a base format.
    pub fn with_blocks(&self, layout: BlockLayout) -> Format {
        if !layout.present {
            return *self;
        }
        let cks = layout.has_checksum;
        match (self, cks) {
            (Format::Kcb, false) => Format::KcbBlkn,
            (Format::Kcb, true) => Format::KcbBlknCks,
            (Format::Kcc, false) => Format::KccBlkn,
            (Format::Kcc, true) => Format::KccBlknCks,
            (Format::KcBasicHeadPrg, false) => Format::KcBasicHeadPrgBlkn,
            (Format::KcBasicHeadPrg, true) => Format::KcBasicHeadPrgBlknCks,
            (Format::KcBasicHeadData, false) => Format::KcBasicHeadDataBlkn,
            (Format::KcBasicHeadData, true) => Format::KcBasicHeadDataBlknCks,
            (Format::KcBasicHeadAsc, false) => Format::KcBasicHeadAscBlkn,
            (Format::KcBasicHeadAsc, true) => Format::KcBasicHeadAscBlknCks,
            (other, _) => *other,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Block-number layout detected in the leading window of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlockLayout {
    /// Every block starts with an incrementing block number.
    pub present: bool,
    /// Every block ends with an 8-bit checksum.
    pub has_checksum: bool,
}

impl BlockLayout {
    /// Layout without block numbers.
    pub const NONE: BlockLayout = BlockLayout {
        present: false,
        has_checksum: false,
    };

    /// Size of one block including metadata bytes.
    pub fn block_size(&self) -> usize {
        if self.has_checksum {
            130
        } else {
            129
        }
    }

    /// Offset of header fields caused by a leading block number.
    pub fn header_offset(&self) -> usize {
        usize::from(self.present)
    }
}

/// Metadata fields read from fixed header offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fields {
    /// Load address
    pub beg_addr: Option<u16>,
    /// Inclusive end address
    pub end_addr: Option<u16>,
    /// Entry address
    pub start_addr: Option<u16>,
    /// Headersave file type character
    pub file_type: Option<u8>,
    /// Name stored in the header
    pub description: Option<String>,
}

/// Result of classifying a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Detected format, `None` when nothing matched
    pub format: Option<Format>,
    /// Total length of the file
    pub file_len: usize,
    /// Load address
    pub beg_addr: Option<u16>,
    /// Inclusive end address
    pub end_addr: Option<u16>,
    /// Entry address, only when it lies inside the loaded range
    pub start_addr: Option<u16>,
    /// Headersave file type character
    pub file_type: Option<u8>,
    /// Name stored in the header
    pub description: Option<String>,
    /// Offset of a chained KC-TAP container following this one
    pub next_subfile_offset: Option<usize>,
}

impl FileInfo {
    /// Result for a file no test recognized.
    pub fn unrecognized(file_len: usize) -> Self {
        Self {
            format: None,
            file_len,
            beg_addr: None,
            end_addr: None,
            start_addr: None,
            file_type: None,
            description: None,
            next_subfile_offset: None,
        }
    }

    /// Whether the file holds a KC-BASIC program.
    pub fn is_kc_basic_program(&self) -> bool {
        self.format.map_or(false, |f| f.is_kc_basic_program())
    }

    /// Address summary: `begin-end [Start=entry] [Typ=X]`.
    pub fn addr_text(&self) -> Option<String> {
        let mut s = String::new();
        if let Some(beg) = self.beg_addr {
            s.push_str(&format!("{:04X}", beg));
            if let Some(end) = self.end_addr {
                s.push_str(&format!("-{:04X}", end));
                if let Some(start) = self.start_addr {
                    s.push_str(&format!(" Start={:04X}", start));
                }
            }
        }
        if let Some(t) = self.file_type {
            if !s.is_empty() {
                s.push(' ');
            }
            s.push_str("Typ=");
            s.push(char::from(t));
        }
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

impl fmt::Display for FileInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.format {
            Some(format) => write!(f, "{}", format)?,
            None => write!(f, "Unknown")?,
        }
        let addr = self.addr_text();
        let mut colon = true;
        if let Some(ref addr) = addr {
            write!(f, ": {}", addr)?;
            colon = false;
        }
        if let Some(ref desc) = self.description {
            if colon {
                write!(f, ": {}", desc)?;
            } else {
                write!(f, " {}", desc)?;
            }
        }
        Ok(())
    }
}

/// Contiguous program image ready to be copied into a 64K address space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramImage {
    /// Payload bytes
    #[serde(skip)]
    pub payload: Vec<u8>,
    /// Target load address
    pub beg_addr: u16,
    /// Entry address
    pub start_addr: Option<u16>,
    /// Format the image was extracted from
    pub source_format: Option<Format>,
    /// Message for the user when only part of the file was loaded
    pub advisory: Option<String>,
}

impl ProgramImage {
    /// Create an image without entry address.
    pub fn new(payload: Vec<u8>, beg_addr: u16, source_format: Format) -> Self {
        Self {
            payload,
            beg_addr,
            start_addr: None,
            source_format: Some(source_format),
            advisory: None,
        }
    }

    /// Set the entry address.
    pub fn with_start(mut self, start_addr: Option<u16>) -> Self {
        self.start_addr = start_addr;
        self
    }

    /// Attach an advisory message.
    pub fn with_advisory(mut self, advisory: impl Into<String>) -> Self {
        self.advisory = Some(advisory.into());
        self
    }

    /// Retarget the image; the entry address is dropped when the address changes.
    pub fn with_beg_addr(mut self, beg_addr: u16) -> Self {
        if beg_addr != self.beg_addr {
            self.start_addr = None;
        }
        self.beg_addr = beg_addr;
        self
    }

    /// Truncate the image; the entry address is dropped when bytes are cut.
    pub fn with_len(mut self, len: usize) -> Self {
        if len < self.payload.len() {
            self.payload.truncate(len);
            self.start_addr = None;
        }
        self
    }

    /// Number of payload bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the image holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Inclusive end address, wrapping at 0x10000.
    pub fn end_addr(&self) -> u16 {
        let len = (self.payload.len() & 0xFFFF) as u16;
        self.beg_addr.wrapping_add(len).wrapping_sub(1)
    }
}

impl fmt::Display for ProgramImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}-{:04X}", self.beg_addr, self.end_addr())?;
        if let Some(start) = self.start_addr {
            write!(f, " Start={:04X}", start)?;
        }
        write!(f, " ({} bytes)", self.len())
    }
}

/// Options for classification behavior.
#[derive(Debug, Clone)]
pub struct ClassifierOptions {
    /// Number of leading bytes examined
    pub window_size: usize,
    /// Maximum number of bytes read from a file
    pub max_read_len: usize,
    /// Apply filename-extension heuristics
    pub use_filename: bool,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ClassifierOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            window_size: WINDOW_SIZE,
            max_read_len: MAX_READ_LEN,
            use_filename: true,
        }
    }

    /// Signature tests only, no filename heuristics.
    pub fn strict() -> Self {
        Self {
            use_filename: false,
            ..Self::new()
        }
    }
}

/// Bytes read from a file, possibly only its leading part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileData {
    /// File contents, at most `max_read_len` bytes
    pub bytes: Vec<u8>,
    /// Length of the whole file
    pub file_len: usize,
}

impl FileData {
    /// Data holding a complete file.
    pub fn new(bytes: Vec<u8>) -> Self {
        let file_len = bytes.len();
        Self { bytes, file_len }
    }

    /// Whether `bytes` stops short of the end of the file.
    pub fn is_truncated(&self) -> bool {
        self.bytes.len() < self.file_len
    }
}

/// A chained container inside a KC-TAP file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubfileInfo {
    /// Offset of the container in the file
    pub offset: usize,
    /// Classification of the container
    pub info: FileInfo,
}

/// Everything known about one file, ready for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReport {
    /// Classification and display fields
    pub info: FileInfo,
    /// Loaded program image, if requested and possible
    pub image: Option<ProgramImage>,
    /// Why no image could be loaded
    pub load_error: Option<String>,
    /// Chained KC-TAP containers
    pub subfiles: Vec<SubfileInfo>,
}

impl FileReport {
    /// Report holding only the classification.
    pub fn new(info: FileInfo) -> Self {
        Self {
            info,
            image: None,
            load_error: None,
            subfiles: Vec::new(),
        }
    }

    /// Attach the outcome of loading the program image.
    pub fn with_image<E: fmt::Display>(mut self, image: std::result::Result<ProgramImage, E>) -> Self {
        match image {
            Ok(image) => self.image = Some(image),
            Err(e) => self.load_error = Some(e.to_string()),
        }
        self
    }

    /// Attach chained containers.
    pub fn with_subfiles(mut self, subfiles: Vec<SubfileInfo>) -> Self {
        self.subfiles = subfiles;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_display() {
        assert_eq!(Format::Kcc.to_string(), "KCC");
        assert_eq!(Format::IntelHex.to_string(), "Intel HEX");
    }

    #[test]
    fn test_format_traits() {
        assert!(Format::Csw.is_tape_only());
        assert!(Format::KcBasicHeadDataBlkn.is_tape_only());
        assert!(!Format::Kcc.is_tape_only());
        assert!(Format::KcbBlknCks.is_kc_basic_program());
        assert!(Format::KcTapKc85.is_kc_tap());
        assert!(!Format::ZxTap.is_loadable());
    }

    #[test]
    fn test_block_variants_round_trip() {
        let cks = BlockLayout {
            present: true,
            has_checksum: true,
        };
        let blkn = BlockLayout {
            present: true,
            has_checksum: false,
        };
        assert_eq!(Format::Kcc.with_blocks(cks), Format::KccBlknCks);
        assert_eq!(Format::Kcc.with_blocks(blkn), Format::KccBlkn);
        assert_eq!(Format::Kcc.with_blocks(BlockLayout::NONE), Format::Kcc);
        assert_eq!(Format::KccBlknCks.base(), Format::Kcc);
        assert_eq!(Format::KccBlknCks.block_size(), Some(130));
        assert_eq!(Format::KcbBlkn.block_size(), Some(129));
        assert_eq!(Format::Kcb.block_size(), None);
    }

    #[test]
    fn test_all_formats_listed_once() {
        for (i, a) in Format::ALL.iter().enumerate() {
            for b in &Format::ALL[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_file_info_display() {
        let info = FileInfo {
            format: Some(Format::Headersave),
            beg_addr: Some(0x0401),
            end_addr: Some(0x0420),
            start_addr: Some(0x0410),
            file_type: Some(b'C'),
            description: Some("GAME".to_string()),
            ..FileInfo::unrecognized(64)
        };
        assert_eq!(info.addr_text().as_deref(), Some("0401-0420 Start=0410 Typ=C"));
        assert_eq!(
            info.to_string(),
            "Headersave: 0401-0420 Start=0410 Typ=C GAME"
        );
    }

    #[test]
    fn test_file_data_truncation() {
        let full = FileData::new(vec![0; 16]);
        assert_eq!(full.file_len, 16);
        assert!(!full.is_truncated());

        let prefix = FileData {
            bytes: vec![0; 16],
            file_len: 1000,
        };
        assert!(prefix.is_truncated());
    }

    #[test]
    fn test_image_end_wraps() {
        let image = ProgramImage::new(vec![0; 0x20], 0xFFF0, Format::Bin);
        assert_eq!(image.end_addr(), 0x000F);
        assert_eq!(image.len(), 0x20);
    }

    #[test]
    fn test_image_retarget_drops_start() {
        let image = ProgramImage::new(vec![0; 4], 0x1000, Format::Kcc).with_start(Some(0x1000));
        assert_eq!(image.clone().with_beg_addr(0x1000).start_addr, Some(0x1000));
        assert_eq!(image.clone().with_beg_addr(0x2000).start_addr, None);
        assert_eq!(image.clone().with_len(8).start_addr, Some(0x1000));
        let cut = image.with_len(2);
        assert_eq!(cut.len(), 2);
        assert_eq!(cut.start_addr, None);
    }
}
