//! Slot encoding
//!
//! One slot is one word: key in the high half, payload in the low half.

use crate::device::ERASED_WORD;

/// Key of a slot that was never written
pub const KEY_ERASED: u16 = 0xFFFF;

/// Key of a deleted slot
pub const KEY_TOMBSTONE: u16 = 0x0000;

/// Program word that clears the key half and keeps the payload bits
pub const TOMBSTONE_WORD: u32 = 0x0000_FFFF;

/// Whether `key` can be used by callers
pub fn is_valid_key(key: u16) -> bool {
    key != KEY_ERASED && key != KEY_TOMBSTONE
}

/// Decoded slot word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub key: u16,
    pub payload: u16,
}

impl Slot {
    pub fn new(key: u16, payload: u16) -> Self {
        Self { key, payload }
    }

    pub fn decode(word: u32) -> Self {
        Self {
            key: (word >> 16) as u16,
            payload: word as u16,
        }
    }

    pub fn encode(&self) -> u32 {
        ((self.key as u32) << 16) | self.payload as u32
    }

    /// Untouched since the last erase
    pub fn is_free(word: u32) -> bool {
        word == ERASED_WORD
    }

    /// Holds a caller key (not free, not tombstoned)
    pub fn is_live(&self) -> bool {
        is_valid_key(self.key)
    }
}

