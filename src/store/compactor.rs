//! Compactor
//!
//! Copy-then-switch garbage collection. Live keys move from the active
//! page into the next page of the ring, then the old page is erased.
//!
//! ## Protocol
//! ```text
//!  1. target = receiving page (resume) or (active + 1) mod pages
//!  2. erase target if it is not clean            (fresh runs only)
//!  3. target.status = Receiving                  ◀─ checkpoint
//!  4. append carried-in write
//!  5. copy live keys, active tail → head, skipping keys already in target
//!  6. target.erase_count = count (+1 when target is page 0)
//!  7. erase old active
//!  8. target.status = Active
//!  9. active = target, receiving = none
//! ```
//! A restart anywhere in 3..8 leaves a Receiving page behind; `init`
//! re-runs this routine with no carried-in write. Step 5 skips keys the
//! earlier run already copied, so replaying is harmless.

use std::collections::BTreeSet;

use crate::device::BlockDevice;
use crate::error::{EepromError, Result};
use crate::page::{Header, Page, PageStatus, Slot, ERASE_COUNT_UNSET};

use super::Store;

impl<D: BlockDevice> Store<D> {
    /// Reclaim space now, without a pending write
    ///
    /// Rotates the active page even when it still has free slots.
    pub fn compact(&mut self) -> Result<()> {
        let result = self.ready_page().and_then(|_| self.compact_pages(None));
        self.guard(result)
    }

    /// Move live keys (and `carried`) into the next page of the ring
    pub(super) fn compact_pages(&mut self, carried: Option<Slot>) -> Result<()> {
        let source = self.ready_page()?;
        let source_idx = source.index as usize;
        let resumed = self.receiving.is_some();
        let target_idx = self
            .receiving
            .unwrap_or((source_idx + 1) % self.pages.len());
        let target = self.pages[target_idx];

        // Refuse before touching flash if the result cannot fit one page
        let mut live = self.live_keys(source)?;
        if let Some(slot) = carried {
            live.insert(slot.key);
        }
        if live.len() > target.capacity() as usize {
            return Err(EepromError::StoreFull {
                live: live.len(),
                capacity: target.capacity() as usize,
            });
        }

        tracing::debug!(
            "Compacting page {} into page {} ({} live keys, resumed: {})",
            source.index,
            target.index,
            live.len(),
            resumed
        );

        // Step 2: Clean the target (a resumed target already holds copies)
        if !resumed {
            if !self.page_is_erased(target)? {
                tracing::warn!("Compaction target page {} not clean, erasing", target.index);
                self.erase_page(target)?;
            }
            self.receiving = Some(target_idx);
        }

        // Step 3: Mark the target as in progress
        self.program_word(target.header_address(), PageStatus::Receiving.program_word())?;

        // Step 4: The newest write goes first
        if let Some(slot) = carried {
            self.append_or_full(target, slot)?;
        }

        // Step 5: Copy authoritative slots
        let mut copied = 0usize;
        for i in (0..source.capacity()).rev() {
            let slot = Slot::decode(self.read_word(source.slot_address(i))?);
            if !slot.is_live() {
                continue;
            }
            if self.page_contains(target, slot.key)? {
                continue;
            }
            self.append_or_full(target, slot)?;
            copied += 1;
        }

        // Step 6: Carry the erase counter forward
        let current = self.page_erase_count(source)?;
        let count = if target.index == 0 {
            (current + 1).min(ERASE_COUNT_UNSET - 1)
        } else {
            current
        };
        self.program_word(target.header_address(), Header::erase_count_word(count))?;

        // Step 7: Retire the old page
        self.erase_page(source)?;

        // Step 8: Switch
        self.program_word(target.header_address(), PageStatus::Active.program_word())?;

        // Step 9
        self.active = Some(target_idx);
        self.receiving = None;

        tracing::info!(
            "Compaction finished: page {} -> {}, {} slots copied, erase count {}",
            source.index,
            target.index,
            copied,
            count
        );
        Ok(())
    }

    /// Distinct caller keys with at least one slot in `page`
    ///
    /// Deletes tombstone every copy of a key, so any live slot means the
    /// key is live.
    pub(super) fn live_keys(&mut self, page: Page) -> Result<BTreeSet<u16>> {
        let mut keys = BTreeSet::new();
        for i in 0..page.capacity() {
            let slot = Slot::decode(self.read_word(page.slot_address(i))?);
            if slot.is_live() {
                keys.insert(slot.key);
            }
        }
        Ok(keys)
    }

    /// Erase counter stored in the header of `page`
    pub(super) fn page_erase_count(&mut self, page: Page) -> Result<u32> {
        let header = Header::decode(self.read_word(page.header_address())?);
        Ok(header.erase_count_or_zero())
    }

    fn append_or_full(&mut self, page: Page, slot: Slot) -> Result<()> {
        if self.append(page, slot)? {
            Ok(())
        } else {
            Err(EepromError::StoreFull {
                live: page.capacity() as usize + 1,
                capacity: page.capacity() as usize,
            })
        }
    }
}
