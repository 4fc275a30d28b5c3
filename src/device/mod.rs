//! Block Device Module
//!
//! The raw non-volatile memory the store is built on.
//!
//! ## Responsibilities
//! - Report page geometry
//! - Erase whole pages back to all-ones
//! - Program words with AND-only semantics (bits only go 1 → 0)
//! - Read raw words, uncached
//!
//! ## Addressing
//! ```text
//! word address = page * page_words + offset
//!
//! ┌──────────────┬──────────────┬──────────────┬─────
//! │ page 0       │ page 1       │ page 2       │ ...
//! │ [0 .. P)     │ [P .. 2P)    │ [2P .. 3P)   │
//! └──────────────┴──────────────┴──────────────┴─────
//! ```

mod file;
mod ram;

pub use file::FileFlash;
pub use ram::MemFlash;

use crate::error::Result;

/// Content of every word after an erase
pub const ERASED_WORD: u32 = 0xFFFF_FFFF;

/// Size and shape of a block device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// 32-bit words per erasable page
    pub page_words: u32,

    /// Number of erasable pages
    pub page_count: u32,
}

impl Geometry {
    /// Total addressable words
    pub fn total_words(&self) -> u64 {
        self.page_words as u64 * self.page_count as u64
    }

    /// Whether every word has a 32-bit address
    pub fn is_addressable(&self) -> bool {
        self.total_words() <= u32::MAX as u64
    }

    /// Word address of the first word of `page`
    ///
    /// Only meaningful for addressable geometries and `page < page_count`.
    pub fn page_address(&self, page: u32) -> u32 {
        page * self.page_words
    }
}

/// Block-erasable, word-programmable memory
///
/// Implementations must honour the flash contract: `program_words` stores
/// `old & new` for every word, and `erase_block` resets every word of the
/// page to [`ERASED_WORD`]. Failures are reported, never retried here.
pub trait BlockDevice {
    /// Device geometry (fixed for the lifetime of the device)
    fn geometry(&self) -> Geometry;

    /// Read the raw content of one word
    fn read_word(&mut self, address: u32) -> Result<u32>;

    /// Program consecutive words starting at `address`
    fn program_words(&mut self, address: u32, words: &[u32]) -> Result<()>;

    /// Erase one page
    fn erase_block(&mut self, page: u32) -> Result<()>;
}

impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    fn geometry(&self) -> Geometry {
        (**self).geometry()
    }

    fn read_word(&mut self, address: u32) -> Result<u32> {
        (**self).read_word(address)
    }

    fn program_words(&mut self, address: u32, words: &[u32]) -> Result<()> {
        (**self).program_words(address, words)
    }

    fn erase_block(&mut self, page: u32) -> Result<()> {
        (**self).erase_block(page)
    }
}
