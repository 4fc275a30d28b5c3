//! Page header encoding
//!
//! The header word carries the page status in its top byte and the
//! erase counter in the low 24 bits. Both halves are programmed
//! separately; the half that must not change is written as all-ones so
//! the AND-only program leaves it intact.

/// Low 24 bits: erase counter
pub const ERASE_COUNT_MASK: u32 = 0x00FF_FFFF;

/// Erase counter value of a header that never had one programmed
pub const ERASE_COUNT_UNSET: u32 = ERASE_COUNT_MASK;

/// Persisted page status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// Page holds nothing (status byte still all-ones)
    Erased,

    /// Target of an unfinished compaction
    Receiving,

    /// Authoritative page for reads
    Active,

    /// Status byte matches none of the above
    Unknown(u8),
}

impl PageStatus {
    /// Persisted status byte
    pub fn to_byte(self) -> u8 {
        match self {
            PageStatus::Erased => 0xFF,
            PageStatus::Receiving => 0xAA,
            PageStatus::Active => 0x00,
            PageStatus::Unknown(b) => b,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0xFF => PageStatus::Erased,
            0xAA => PageStatus::Receiving,
            0x00 => PageStatus::Active,
            other => PageStatus::Unknown(other),
        }
    }

    /// Header word that programs this status and leaves the counter alone
    pub fn program_word(self) -> u32 {
        ((self.to_byte() as u32) << 24) | ERASE_COUNT_MASK
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageStatus::Erased => write!(f, "erased"),
            PageStatus::Receiving => write!(f, "receiving"),
            PageStatus::Active => write!(f, "active"),
            PageStatus::Unknown(b) => write!(f, "unknown({:#04x})", b),
        }
    }
}

/// Decoded header word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub status: PageStatus,
    pub erase_count: u32,
}

impl Header {
    pub fn decode(word: u32) -> Self {
        Self {
            status: PageStatus::from_byte((word >> 24) as u8),
            erase_count: word & ERASE_COUNT_MASK,
        }
    }

    /// Erase counter, reporting a never-programmed counter as 0
    pub fn erase_count_or_zero(&self) -> u32 {
        if self.erase_count == ERASE_COUNT_UNSET {
            0
        } else {
            self.erase_count
        }
    }

    /// Header word that programs `count` and leaves the status alone
    pub fn erase_count_word(count: u32) -> u32 {
        0xFF00_0000 | (count & ERASE_COUNT_MASK)
    }
}

