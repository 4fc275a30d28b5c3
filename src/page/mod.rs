//! Page Module
//!
//! On-flash layout of a store page. The layout is bit-exact with the
//! firmware so images can move between host and device.
//!
//! ## Page Format
//! ```text
//! ┌────────────────────────────────────────────┐
//! │ word 0: Header                             │
//! │   ┌────────────┬───────────────────────┐   │
//! │   │ Status (8) │   Erase Count (24)    │   │
//! │   └────────────┴───────────────────────┘   │
//! ├────────────────────────────────────────────┤
//! │ word 1..P-1: Slots                         │
//! │   ┌───────────────┬─────────────────┐      │
//! │   │   Key (16)    │  Payload (16)   │      │
//! │   └───────────────┴─────────────────┘      │
//! │   ... appended head → tail ...             │
//! │   (0xFFFFFFFF = untouched slot)            │
//! │   (key 0x0000 = tombstone)                 │
//! └────────────────────────────────────────────┘
//! ```

mod header;
mod slot;

pub use header::{Header, PageStatus, ERASE_COUNT_MASK, ERASE_COUNT_UNSET};
pub use slot::{is_valid_key, Slot, KEY_ERASED, KEY_TOMBSTONE, TOMBSTONE_WORD};

use crate::device::Geometry;

/// Location of one ring page on the block device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Position in the page ring (0-based)
    pub index: u32,

    /// Device page number (for erase)
    pub device_page: u32,

    /// Word address of the header
    pub start: u32,

    /// Words in the page, header included
    pub words: u32,
}

impl Page {
    /// Describe ring page `index`, stored at device page `device_page`
    pub fn new(index: u32, device_page: u32, geometry: &Geometry) -> Self {
        Self {
            index,
            device_page,
            start: geometry.page_address(device_page),
            words: geometry.page_words,
        }
    }

    /// Number of slots (every word except the header)
    pub fn capacity(&self) -> u32 {
        self.words - 1
    }

    /// Word address of the header
    pub fn header_address(&self) -> u32 {
        self.start
    }

    /// Word address of slot `slot` (0-based, head first)
    pub fn slot_address(&self, slot: u32) -> u32 {
        debug_assert!(slot < self.capacity());
        self.start + 1 + slot
    }
}
