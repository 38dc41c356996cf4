//! Emulated memory targets for program images.

use crate::types::ProgramImage;
use tracing::debug;

/// Size of the 16-bit address space.
pub const ADDRESS_SPACE_LEN: usize = 0x10000;

/// A byte-addressable 64K memory.
pub trait AddressSpace {
    /// Store `value` at `addr`.
    fn write_byte(&mut self, addr: u16, value: u8);
}

impl AddressSpace for [u8; ADDRESS_SPACE_LEN] {
    fn write_byte(&mut self, addr: u16, value: u8) {
        self[usize::from(addr)] = value;
    }
}

/// Writes beyond the vector's length are dropped.
impl AddressSpace for Vec<u8> {
    fn write_byte(&mut self, addr: u16, value: u8) {
        if let Some(cell) = self.get_mut(usize::from(addr)) {
            *cell = value;
        }
    }
}

impl ProgramImage {
    /// Copy the payload to its load address; addresses wrap at 0xFFFF.
    ///
    /// Returns the entry address when the image has one.
    pub fn load_into<M: AddressSpace + ?Sized>(&self, memory: &mut M) -> Option<u16> {
        let mut addr = self.beg_addr;
        for &b in &self.payload {
            memory.write_byte(addr, b);
            addr = addr.wrapping_add(1);
        }
        debug!(
            beg = self.beg_addr,
            len = self.payload.len(),
            start = ?self.start_addr,
            "loaded program image"
        );
        self.start_addr
    }
}
