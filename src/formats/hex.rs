//! Intel HEX loader.
//!
//! Records are `:` followed by hex digit pairs: byte count, address
//! (2 bytes), record type, data, checksum. Only a single contiguous data
//! area in the 16-bit address space is loaded; anything else stops
//! loading with an advisory for the user.

use super::ByteWindow;
use crate::error::{KcFileError, Result};
use crate::types::{Fields, Format, ProgramImage};
use tracing::warn;

/// Intel HEX record types.
pub mod intel_hex {
    /// Data bytes
    pub const DATA: u8 = 0x00;
    /// End of file
    pub const EOF: u8 = 0x01;
    /// Extended segment address
    pub const EXT_SEGMENT: u8 = 0x02;
    /// Start segment address
    pub const START_SEGMENT: u8 = 0x03;
    /// Extended linear address
    pub const EXT_LINEAR: u8 = 0x04;
    /// Start linear address
    pub const START_LINEAR: u8 = 0x05;
}

/// Record start character.
pub const RECORD_MARK: u8 = b':';

const NON_CONTIGUOUS: &str =
    "The file contains several non-contiguous data areas. Only the first one was loaded.";
const UNSUPPORTED_TYPE: &str = "The file contains unsupported record types. \
     Only the data up to the first unsupported record was loaded.";
const EXTENDED_ADDRESS: &str = "The file uses extended addresses beyond 64K. \
     Only the data up to the first extended address record was loaded.";
const BAD_DIGITS: &str = "The file does not match the expected HEX format. \
     Only the data up to the first invalid record was loaded.";
const TOO_LARGE: &str = "The data exceeds the 64K address space and was truncated.";

/// `:` followed by ten hex digits.
pub fn detect(window: &ByteWindow) -> bool {
    let bytes = window.bytes();
    bytes.len() > 10
        && bytes[0] == RECORD_MARK
        && bytes[1..=10].iter().all(u8::is_ascii_hexdigit)
}

/// Decode `n` bytes written as hex digit pairs at `pos`.
fn decode_at(bytes: &[u8], pos: usize, n: usize) -> Option<Vec<u8>> {
    let digits = bytes.get(pos..pos + 2 * n)?;
    hex::decode(digits).ok()
}

/// Load address of the first record.
pub fn fields(bytes: &[u8]) -> Fields {
    let beg_addr = if bytes.first() == Some(&RECORD_MARK) {
        decode_at(bytes, 3, 2).map(|a| u16::from_be_bytes([a[0], a[1]]))
    } else {
        None
    };
    Fields {
        beg_addr,
        ..Fields::default()
    }
}

/// Assemble the first contiguous data area.
pub fn build_image(bytes: &[u8]) -> Result<ProgramImage> {
    let mut out: Vec<u8> = Vec::new();
    let mut first_addr: Option<u16> = None;
    let mut cur_addr: u32 = 0;
    let mut advisory: Option<&str> = None;
    let mut pos = 0;

    while let Some(idx) = memchr::memchr(RECORD_MARK, &bytes[pos..]) {
        pos += idx + 1;
        let Some(head) = decode_at(bytes, pos, 4) else {
            advisory = Some(BAD_DIGITS);
            break;
        };
        pos += 8;
        let cnt = usize::from(head[0]);
        let addr = u16::from_be_bytes([head[1], head[2]]);
        let rec_type = head[3];

        match rec_type {
            intel_hex::DATA | intel_hex::EOF => {
                if cnt > 0 {
                    let begin = *first_addr.get_or_insert(addr);
                    if out.is_empty() {
                        cur_addr = u32::from(begin);
                    }
                    if u32::from(addr) != cur_addr {
                        advisory = Some(NON_CONTIGUOUS);
                        break;
                    }
                    let Some(data) = decode_at(bytes, pos, cnt) else {
                        advisory = Some(BAD_DIGITS);
                        break;
                    };
                    pos += 2 * cnt;
                    if out.len() + cnt > 0x10000 {
                        advisory = Some(TOO_LARGE);
                        break;
                    }
                    out.extend_from_slice(&data);
                    cur_addr += cnt as u32;
                }
                if rec_type == intel_hex::EOF {
                    break;
                }
            }
            intel_hex::EXT_SEGMENT | intel_hex::EXT_LINEAR => {
                match decode_at(bytes, pos, 2) {
                    Some(v) if v == [0, 0] => pos += 4,
                    Some(_) => {
                        advisory = Some(EXTENDED_ADDRESS);
                        break;
                    }
                    None => {
                        advisory = Some(BAD_DIGITS);
                        break;
                    }
                }
            }
            intel_hex::START_SEGMENT | intel_hex::START_LINEAR => {}
            _ => {
                advisory = Some(UNSUPPORTED_TYPE);
                break;
            }
        }
    }

    if let Some(msg) = advisory {
        warn!(loaded = out.len(), "{msg}");
    }
    let Some(beg) = first_addr.filter(|_| !out.is_empty()) else {
        let message = advisory.unwrap_or("no data records");
        return Err(KcFileError::corrupt(Format::IntelHex, message));
    };
    let image = ProgramImage::new(out, beg, Format::IntelHex);
    Ok(match advisory {
        Some(msg) => image.with_advisory(msg),
        None => image,
    })
}
