//! Store Module
//!
//! The variable store: a rewritable 16-bit key → 16-bit value map on top
//! of a ring of flash pages.
//!
//! ## Responsibilities
//! - Resolve persisted page states at startup (`scanner`)
//! - Look up and append slots in the active page (`slots`)
//! - Rotate and garbage-collect pages when one fills up (`compactor`)
//! - Tombstone keys without erasing (`delete`)
//! - Store short byte arrays over consecutive keys (`array`)
//! - Report wear and page diagnostics (`stats`)
//!
//! ## Page Ring
//! ```text
//!   ┌────────┐   compact   ┌────────┐   compact   ┌────────┐
//!   │ page 0 │ ──────────▶ │ page 1 │ ──────────▶ │ page 2 │ ─ ─ ▶ ...
//!   │ Active │             │ Active │             │ Active │
//!   └────────┘             └────────┘             └────────┘
//!        ▲                                                │
//!        └──────────── wrap: erase counter += 1 ──────────┘
//! ```
//!
//! ## Concurrency
//! None. Every operation takes `&mut self` and runs to completion,
//! including any compaction it triggers. Share a store through
//! [`crate::sync::SharedStore`].

mod array;
mod compactor;
mod delete;
mod scanner;
mod slots;
mod stats;

pub use array::MAX_ARRAY_LEN;
pub use stats::PageReport;

use crate::config::Config;
use crate::device::{BlockDevice, FileFlash, ERASED_WORD};
use crate::error::{EepromError, Result};
use crate::page::{is_valid_key, Page};

/// Virtual EEPROM store over a block device
pub struct Store<D: BlockDevice> {
    /// Underlying flash
    device: D,

    /// Store configuration
    config: Config,

    /// Ring pages, derived once from the device geometry
    pages: Vec<Page>,

    /// Ring index of the active page
    active: Option<usize>,

    /// Ring index of the page an unfinished compaction is filling
    receiving: Option<usize>,

    /// Set by a successful `init`/`format`, cleared by device failures
    initialized: bool,
}

impl<D: BlockDevice> Store<D> {
    /// Wrap a device without touching it
    ///
    /// Computes the page table; call `init` (or `format`) before use.
    pub fn new(device: D, config: Config) -> Result<Self> {
        let geometry = device.geometry();

        if geometry.page_words < 2 {
            return Err(EepromError::Config(format!(
                "pages of {} words leave no room for slots",
                geometry.page_words
            )));
        }

        if !geometry.is_addressable() {
            return Err(EepromError::Config(format!(
                "device of {} pages of {} words exceeds 32-bit word addressing",
                geometry.page_count, geometry.page_words
            )));
        }

        let mut num_pages = config.num_pages;
        if num_pages < 2 {
            tracing::warn!("Page ring needs at least 2 pages, got {}, using 2", num_pages);
            num_pages = 2;
        }

        let end = config.base_page as u64 + num_pages as u64;
        if end > geometry.page_count as u64 {
            return Err(EepromError::Config(format!(
                "pages {}..{} exceed device with {} pages",
                config.base_page, end, geometry.page_count
            )));
        }

        let pages = (0..num_pages)
            .map(|i| Page::new(i, config.base_page + i, &geometry))
            .collect();

        Ok(Self {
            device,
            config,
            pages,
            active: None,
            receiving: None,
            initialized: false,
        })
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Whether the store is ready for reads and writes
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Ring index of the active page
    pub fn active_page(&self) -> Option<u32> {
        self.active.map(|i| self.pages[i].index)
    }

    /// Ring index of the receiving page, if a compaction is pending
    pub fn receiving_page(&self) -> Option<u32> {
        self.receiving.map(|i| self.pages[i].index)
    }

    /// Pages in the ring
    pub fn num_pages(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Slots per page
    pub fn capacity(&self) -> u32 {
        self.pages[0].capacity()
    }

    /// Ring page descriptors
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Borrow the device
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Borrow the device mutably (fault injection in tests)
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Give the device back, dropping in-memory state
    pub fn into_device(self) -> D {
        self.device
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    /// Active page, or `NotInitialized`
    fn ready_page(&self) -> Result<Page> {
        match self.active {
            Some(i) if self.initialized => Ok(self.pages[i]),
            _ => Err(EepromError::NotInitialized),
        }
    }

    /// Drop to the uninitialized state when the device failed
    ///
    /// After a failed erase/program the persisted state is unknown until
    /// the pages are scanned again.
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.is_device_failure() {
                tracing::error!("Block device failure, store requires init: {}", e);
                self.initialized = false;
                self.active = None;
                self.receiving = None;
            }
        }
        result
    }

    fn read_word(&mut self, address: u32) -> Result<u32> {
        self.device.read_word(address)
    }

    fn program_word(&mut self, address: u32, word: u32) -> Result<()> {
        self.device.program_words(address, &[word])
    }

    fn erase_page(&mut self, page: Page) -> Result<()> {
        self.device.erase_block(page.device_page)
    }

    /// Every word of the page, header included, is all-ones
    fn page_is_erased(&mut self, page: Page) -> Result<bool> {
        for offset in 0..page.words {
            if self.read_word(page.start + offset)? != ERASED_WORD {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl Store<FileFlash> {
    /// Open (or create) the flash image named by the config
    ///
    /// An existing image must match `page_words` × `device_pages`.
    /// The store still needs `init` or `format`.
    pub fn open_image(config: Config) -> Result<Self> {
        let device = FileFlash::open(
            &config.image_path,
            config.image_geometry(),
            config.sync_strategy,
        )?;
        Self::new(device, config)
    }
}

/// Reject reserved keys
fn check_key(key: u16) -> Result<()> {
    if is_valid_key(key) {
        Ok(())
    } else {
        Err(EepromError::InvalidKey(key))
    }
}

/// Key `offset` positions after `base`, if it is a caller key
fn offset_key(base: u16, offset: usize) -> Option<u16> {
    let key = base as usize + offset;
    if key > u16::MAX as usize {
        return None;
    }
    let key = key as u16;
    is_valid_key(key).then_some(key)
}
