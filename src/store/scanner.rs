//! Page Scanner / Initializer
//!
//! Turns whatever the pages hold after a restart into a consistent
//! (Active, optional Receiving) pair.
//!
//! ## Resolution Rules
//! ```text
//! Active  Receiving   Action
//! ──────  ─────────   ────────────────────────────────────────────
//!   1        0        ready
//!   1        1        resume the interrupted compaction
//!   0        1        promote Receiving to Active
//!   0        0        Unformatted (caller must format)
//!  >1       any       Integrity error, nothing modified
//!  any      >1        Integrity error, nothing modified
//! ```
//! Pages with an unknown status byte, and "erased" pages that are not
//! entirely all-ones, are erased once the state is known to be sound.

use crate::device::BlockDevice;
use crate::error::{EepromError, Result};
use crate::page::{Header, PageStatus};

use super::Store;

impl<D: BlockDevice> Store<D> {
    /// Scan the pages and make the store ready
    ///
    /// Safe to call again at any time; in-memory state is rebuilt from
    /// flash. This is the recovery path after a device failure.
    pub fn init(&mut self) -> Result<()> {
        let result = self.scan();
        self.guard(result)
    }

    /// Wipe every page and start over with page 0 active
    ///
    /// Page 0 gets erase count 1. The store is ready afterwards.
    pub fn format(&mut self) -> Result<()> {
        let result = self.format_pages();
        self.guard(result)
    }

    fn scan(&mut self) -> Result<()> {
        self.initialized = false;
        self.active = None;
        self.receiving = None;

        // Step 1: Classify every page (read-only)
        let mut statuses = Vec::with_capacity(self.pages.len());
        for page in self.pages.clone() {
            let header = Header::decode(self.read_word(page.header_address())?);
            tracing::debug!("Page {} classified as {}", page.index, header.status);
            statuses.push(header.status);
        }

        let active: Vec<usize> = positions(&statuses, PageStatus::Active);
        let receiving: Vec<usize> = positions(&statuses, PageStatus::Receiving);

        // Step 2: Refuse to guess when the ring is ambiguous
        if active.len() > 1 {
            tracing::error!("More than one active page: {:?}", active);
            return Err(EepromError::Integrity(format!(
                "{} active pages: {:?}",
                active.len(),
                active
            )));
        }
        if receiving.len() > 1 {
            tracing::error!("More than one receiving page: {:?}", receiving);
            return Err(EepromError::Integrity(format!(
                "{} receiving pages: {:?}",
                receiving.len(),
                receiving
            )));
        }

        // Step 3: Erase pages that hold garbage
        for (i, status) in statuses.iter().enumerate() {
            let page = self.pages[i];
            match status {
                PageStatus::Erased => {
                    if !self.page_is_erased(page)? {
                        tracing::warn!("Erased page {} holds residue, erasing", page.index);
                        self.erase_page(page)?;
                    }
                }
                PageStatus::Unknown(byte) => {
                    tracing::warn!("Page {} has unknown status {:#04x}, erasing", page.index, byte);
                    self.erase_page(page)?;
                }
                PageStatus::Active | PageStatus::Receiving => {}
            }
        }

        // Step 4: Resolve the active page
        match (active.first().copied(), receiving.first().copied()) {
            (None, None) => {
                tracing::warn!("No active or receiving page, store must be formatted");
                Err(EepromError::Unformatted)
            }
            (Some(a), None) => {
                self.active = Some(a);
                self.initialized = true;
                tracing::info!("Store ready, active page {}", a);
                Ok(())
            }
            (None, Some(r)) => {
                tracing::warn!("Promoting receiving page {} to active", r);
                let page = self.pages[r];
                self.program_word(page.header_address(), PageStatus::Active.program_word())?;
                self.active = Some(r);
                self.initialized = true;
                tracing::info!("Store ready, active page {}", r);
                Ok(())
            }
            (Some(a), Some(r)) => {
                tracing::warn!("Resuming interrupted compaction from page {} into page {}", a, r);
                self.active = Some(a);
                self.receiving = Some(r);
                self.initialized = true;
                self.compact_pages(None)?;
                tracing::info!("Store ready, active page {:?}", self.active);
                Ok(())
            }
        }
    }

    fn format_pages(&mut self) -> Result<()> {
        self.initialized = false;
        self.active = None;
        self.receiving = None;

        for page in self.pages.clone().into_iter().rev() {
            if !self.page_is_erased(page)? {
                tracing::debug!("Erasing page {}", page.index);
                self.erase_page(page)?;
            }
        }

        let first = self.pages[0];
        self.program_word(first.header_address(), Header::erase_count_word(1))?;
        self.program_word(first.header_address(), PageStatus::Active.program_word())?;

        self.active = Some(0);
        self.initialized = true;
        tracing::info!(
            "Store formatted: {} pages of {} slots",
            self.pages.len(),
            first.capacity()
        );
        Ok(())
    }
}

fn positions(statuses: &[PageStatus], wanted: PageStatus) -> Vec<usize> {
    statuses
        .iter()
        .enumerate()
        .filter(|&(_, &s)| s == wanted)
        .map(|(i, _)| i)
        .collect()
}
