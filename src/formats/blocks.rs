//! Interleaved block numbers and checksums.
//!
//! Some KC tape dumps keep the tape framing: every 128 payload bytes are
//! preceded by a block number and optionally followed by an 8-bit sum.
//! Detection only looks at the leading window; stripping covers the
//! whole file.

use crate::types::BlockLayout;

/// Payload bytes per tape block.
pub const BLOCK_PAYLOAD: usize = 128;

/// Block number marking the last block of a file.
pub const LAST_BLOCK: u8 = 0xFF;

/// Detect a block-number prefix in the leading window.
///
/// Byte 0 must be 0 or 1. When the window holds more than 129 bytes and
/// byte 129 equals the 8-bit sum of bytes 1..=128, blocks are 130 bytes
/// with a trailing checksum. Every later block boundary inside the window
/// must carry the previous number plus one, or 0xFF at the last boundary.
pub fn has_block_numbers(window: &[u8]) -> BlockLayout {
    let Some(&first) = window.first() else {
        return BlockLayout::NONE;
    };
    if first > 1 {
        return BlockLayout::NONE;
    }

    let has_checksum = window.len() > BLOCK_PAYLOAD + 1
        && checksum(&window[1..=BLOCK_PAYLOAD]) == window[BLOCK_PAYLOAD + 1];
    let layout = BlockLayout {
        present: true,
        has_checksum,
    };

    let block_size = layout.block_size();
    let mut prev = first;
    let mut pos = block_size;
    while pos < window.len() {
        let blk_num = window[pos];
        let last_boundary = pos + block_size >= window.len();
        if blk_num == prev.wrapping_add(1) {
            prev = blk_num;
        } else if !(blk_num == LAST_BLOCK && last_boundary) {
            return BlockLayout::NONE;
        }
        pos += block_size;
    }
    layout
}

/// 8-bit sum over a block payload.
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Drop the first byte of every `block_size` group.
pub fn strip_block_numbers(bytes: &[u8], block_size: usize) -> Vec<u8> {
    if block_size < 2 {
        return bytes.to_vec();
    }
    let mut out = Vec::with_capacity(bytes.len());
    for block in bytes.chunks(block_size) {
        out.extend_from_slice(&block[1..]);
    }
    out
}

/// Drop the first and last byte of every 130-byte group.
///
/// A short trailing group loses only its block number, as there is no
/// checksum to remove yet.
pub fn strip_block_numbers_and_checksums(bytes: &[u8]) -> Vec<u8> {
    let block_size = BLOCK_PAYLOAD + 2;
    let mut out = Vec::with_capacity(bytes.len());
    for block in bytes.chunks(block_size) {
        if block.len() == block_size {
            out.extend_from_slice(&block[1..block_size - 1]);
        } else {
            out.extend_from_slice(&block[1..]);
        }
    }
    out
}

/// Remove the framing described by `layout`.
pub fn strip(bytes: &[u8], layout: BlockLayout) -> Vec<u8> {
    match (layout.present, layout.has_checksum) {
        (false, _) => bytes.to_vec(),
        (true, false) => strip_block_numbers(bytes, layout.block_size()),
        (true, true) => strip_block_numbers_and_checksums(bytes),
    }
}

#[cfg(test)]
/// Frame `payload` the way a tape recorder dump does.
pub(crate) fn frame(payload: &[u8], first: u8, with_checksum: bool) -> Vec<u8> {
    let mut out = Vec::new();
    let n_blocks = (payload.len() + BLOCK_PAYLOAD - 1) / BLOCK_PAYLOAD;
    for (i, chunk) in payload.chunks(BLOCK_PAYLOAD).enumerate() {
        let mut block = chunk.to_vec();
        block.resize(BLOCK_PAYLOAD, 0);
        let num = if i + 1 == n_blocks {
            LAST_BLOCK
        } else {
            first.wrapping_add(i as u8)
        };
        out.push(num);
        out.extend_from_slice(&block);
        if with_checksum {
            out.push(checksum(&block));
        }
    }
    out
}
