//! Tape audio and foreign tape images.
//!
//! These files describe a tape signal rather than memory contents and
//! are only usable through the emulated tape interface.

use super::{magic, ByteWindow};
use crate::types::Format;

/// Compressed Square Wave audio.
pub fn detect_csw(window: &ByteWindow) -> bool {
    window.bytes().starts_with(&magic::CSW)
}

/// TZX tape image, `Cdt` when the name says so.
pub fn detect_tzx(window: &ByteWindow) -> Option<Format> {
    if !window.bytes().starts_with(&magic::TZX) {
        return None;
    }
    if window.extension().as_deref() == Some("CDT") {
        Some(Format::Cdt)
    } else {
        Some(Format::Tzx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csw() {
        let mut data = magic::CSW.to_vec();
        data.extend_from_slice(&[2, 0, 0x44, 0xAC]);
        assert!(detect_csw(&ByteWindow::new(&data, None)));
        assert!(!detect_csw(&ByteWindow::new(&data[..10], None)));
    }

    #[test]
    fn test_tzx_and_cdt() {
        let mut data = magic::TZX.to_vec();
        data.extend_from_slice(&[1, 20]);
        assert_eq!(
            detect_tzx(&ByteWindow::new(&data, Some("game.tzx"))),
            Some(Format::Tzx)
        );
        assert_eq!(
            detect_tzx(&ByteWindow::new(&data, Some("GAME.cdt"))),
            Some(Format::Cdt)
        );
        assert_eq!(detect_tzx(&ByteWindow::new(&data, None)), Some(Format::Tzx));
    }
}
