//! Slot Reader / Slot Writer
//!
//! Reads walk the active page tail → head so the most recent slot for a
//! key wins. Writes append at the first untouched slot; programming an
//! all-ones word never has to set a bit, so an append is always legal.

use crate::device::BlockDevice;
use crate::error::Result;
use crate::page::{Page, Slot};

use super::{check_key, Store};

impl<D: BlockDevice> Store<D> {
    /// Read the current payload of `key`
    ///
    /// Returns:
    /// - `Ok(Some(payload))`: key is live
    /// - `Ok(None)`: never written or deleted
    pub fn read(&mut self, key: u16) -> Result<Option<u16>> {
        let result = self.read_key(key);
        self.guard(result)
    }

    /// Store `payload` under `key`
    ///
    /// Skipped when the stored value already matches. Compacts when the
    /// active page has no untouched slot left.
    pub fn write(&mut self, key: u16, payload: u16) -> Result<()> {
        let result = self.write_key(key, payload);
        self.guard(result)
    }

    pub(super) fn read_key(&mut self, key: u16) -> Result<Option<u16>> {
        let page = self.ready_page()?;
        check_key(key)?;
        self.find_in_page(page, key)
    }

    pub(super) fn write_key(&mut self, key: u16, payload: u16) -> Result<()> {
        let page = self.ready_page()?;
        check_key(key)?;

        if self.find_in_page(page, key)? == Some(payload) {
            tracing::debug!("Write of key {:#06x} elided, value unchanged", key);
            return Ok(());
        }

        let slot = Slot::new(key, payload);
        if !self.append(page, slot)? {
            tracing::debug!("Active page {} full, compacting for key {:#06x}", page.index, key);
            self.compact_pages(Some(slot))?;
        }

        Ok(())
    }

    /// Most recent payload for `key` in `page`
    pub(super) fn find_in_page(&mut self, page: Page, key: u16) -> Result<Option<u16>> {
        for i in (0..page.capacity()).rev() {
            let slot = Slot::decode(self.read_word(page.slot_address(i))?);
            if slot.key == key {
                return Ok(Some(slot.payload));
            }
        }
        Ok(None)
    }

    /// Program `slot` into the first untouched slot of `page`
    ///
    /// Returns false when the page is full.
    pub(super) fn append(&mut self, page: Page, slot: Slot) -> Result<bool> {
        for i in 0..page.capacity() {
            let address = page.slot_address(i);
            if Slot::is_free(self.read_word(address)?) {
                self.program_word(address, slot.encode())?;
                tracing::trace!("Key {:#06x} appended to page {} slot {}", slot.key, page.index, i);
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether `key` was already written to `page`
    ///
    /// Scans head → tail and stops at the first untouched slot, since
    /// nothing is ever written past it.
    pub(super) fn page_contains(&mut self, page: Page, key: u16) -> Result<bool> {
        for i in 0..page.capacity() {
            let word = self.read_word(page.slot_address(i))?;
            if Slot::is_free(word) {
                return Ok(false);
            }
            if Slot::decode(word).key == key {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
