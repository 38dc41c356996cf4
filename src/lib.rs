//! kcfile - KC85, Z9001, Z1013 and AC1 File Sniffer
//!
//! This library recognizes the file formats used for programs of East German
//! 8-bit home computers and their emulators, reads the load address, end
//! address, entry point and name stored in them, and extracts the program
//! bytes so they can be placed into an emulated 64K address space.
//!
//! # Features
//!
//! - **Format Detection**: Headersave, KC-TAP, KCC/KCB, KC-BASIC, Intel HEX and more
//! - **Block Handling**: Strips tape block numbers and checksums
//! - **Chained Containers**: Walks KC-TAP files holding several programs
//! - **Loading**: Copies program images into any [`memory::AddressSpace`]
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use kcfile::{classify_file, load_file};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let info = classify_file("path/to/GAME.KCC")?;
//!     println!("{}", info);
//!
//!     let image = load_file("path/to/GAME.KCC")?;
//!     println!("{} bytes at {:04X}", image.len(), image.beg_addr);
//!     Ok(())
//! }
//! ```
//!
//! # Supported Formats
//!
//! - Z1013 Headersave
//! - KC-TAP containers (KC85, Z9001, KC-BASIC)
//! - KCC and KCB system files, with or without block numbers and checksums
//! - KC-BASIC header files and `.SSS` programs
//! - Headerless BASIC dumps (KC, Kramer, Huebler, AC1, LLC2, RBASIC)
//! - RBASIC machine code, Intel HEX, plain memory images
//! - Tape images recognized but not loadable: CSW, TZX, CDT, ZX Spectrum TAP

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::similar_names)]
#![allow(clippy::too_many_lines)]

pub mod error;
pub mod formats;
pub mod formatter;
pub mod memory;
pub mod types;

pub use error::{KcFileError, Result};
pub use memory::AddressSpace;
pub use types::{
    BlockLayout, ClassifierOptions, Fields, FileData, FileInfo, FileReport, Format, FormatTraits,
    ProgramImage, SubfileInfo,
};

use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Classify a file by path.
///
/// Reads at most the configured maximum and uses the file name for the
/// extension heuristics. Longer files are classified from their leading
/// bytes and keep their real length.
///
/// # Example
///
/// ```rust,no_run
/// use kcfile::classify_file;
///
/// let info = classify_file("GAME.KCC")?;
/// println!("{}", info);
/// # Ok::<(), kcfile::KcFileError>(())
/// ```
pub fn classify_file<P: AsRef<Path>>(path: P) -> Result<FileInfo> {
    classify_file_with_options(path, &ClassifierOptions::new())
}

/// Classify a file by path with custom options.
pub fn classify_file_with_options<P: AsRef<Path>>(
    path: P,
    options: &ClassifierOptions,
) -> Result<FileInfo> {
    let path = path.as_ref();
    let data = read_file(path, options)?;
    Ok(formats::describe_prefix(
        &data.bytes,
        data.file_len,
        file_name(path),
        options,
    ))
}

/// Classify file contents.
///
/// Never fails; unrecognized data yields a [`FileInfo`] without format.
///
/// # Example
///
/// ```rust
/// use kcfile::{classify_bytes, Format};
///
/// let hex = b":0210000001021B\n:00000001FF\n";
/// let info = classify_bytes(hex, None);
/// assert_eq!(info.format, Some(Format::IntelHex));
/// assert_eq!(info.beg_addr, Some(0x1000));
/// ```
pub fn classify_bytes(data: &[u8], file_name: Option<&str>) -> FileInfo {
    classify_bytes_with_options(data, file_name, &ClassifierOptions::new())
}

/// Classify file contents with custom options.
pub fn classify_bytes_with_options(
    data: &[u8],
    file_name: Option<&str>,
    options: &ClassifierOptions,
) -> FileInfo {
    formats::describe(data, file_name, options)
}

/// Read at most `options.max_read_len` bytes of a file.
///
/// Longer files are not an error; the result records the full length.
pub fn read_file<P: AsRef<Path>>(path: P, options: &ClassifierOptions) -> Result<FileData> {
    let file = std::fs::File::open(path)?;
    let file_len = usize::try_from(file.metadata()?.len()).unwrap_or(usize::MAX);
    let mut bytes = Vec::with_capacity(file_len.min(options.max_read_len));
    file.take(options.max_read_len as u64).read_to_end(&mut bytes)?;
    let data = FileData {
        file_len: file_len.max(bytes.len()),
        bytes,
    };
    if data.is_truncated() {
        debug!(read = data.bytes.len(), file_len = data.file_len, "classifying file prefix");
    }
    Ok(data)
}

/// Classify file contents and extract the program image.
pub fn extract(data: &[u8], file_name: Option<&str>) -> Result<ProgramImage> {
    let info = classify_bytes(data, file_name);
    let format = info.format.ok_or(KcFileError::UnrecognizedFormat)?;
    formats::build_image(data, format)
}

/// Classify a file by path and extract the program image.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<ProgramImage> {
    let path = path.as_ref();
    let options = ClassifierOptions::new();
    let data = read_file(path, &options)?;
    let info = formats::describe_prefix(&data.bytes, data.file_len, file_name(path), &options);
    let format = info.format.ok_or(KcFileError::UnrecognizedFormat)?;
    formats::build_image(&data.bytes, format)
}

/// Classify every container of a chained KC-TAP file.
///
/// Empty when the data does not start with a KC-TAP container.
pub fn subfiles(data: &[u8]) -> Vec<SubfileInfo> {
    let options = ClassifierOptions::strict();
    formats::kctap::subfiles(data)
        .map(|sub| SubfileInfo {
            offset: sub.offset,
            info: formats::describe(&data[sub.offset..], None, &options),
        })
        .collect()
}

/// Classification, image and chained containers of one file.
pub fn analyze(data: &FileData, file_name: Option<&str>, options: &ClassifierOptions) -> FileReport {
    let bytes = &data.bytes;
    let info = formats::describe_prefix(bytes, data.file_len, file_name, options);
    let chained = info.next_subfile_offset.is_some();
    let image = match info.format {
        Some(format) => formats::build_image(bytes, format),
        None => Err(KcFileError::UnrecognizedFormat),
    };
    let report = FileReport::new(info).with_image(image);
    if chained {
        report.with_subfiles(subfiles(bytes))
    } else {
        report
    }
}

/// Get version information for this library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
