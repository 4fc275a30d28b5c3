//! Erase counter and page diagnostics

use std::collections::{BTreeMap, BTreeSet};

use crate::device::BlockDevice;
use crate::error::Result;
use crate::page::{Header, PageStatus, Slot, ERASE_COUNT_UNSET, KEY_TOMBSTONE};

use super::Store;

/// Snapshot of one ring page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageReport {
    /// Position in the ring
    pub index: u32,

    /// Device page number
    pub device_page: u32,

    /// Persisted status
    pub status: PageStatus,

    /// Erase counter, `None` if never programmed
    pub erase_count: Option<u32>,

    /// Slots that are not untouched
    pub used_slots: u32,

    /// Distinct caller keys with a slot in the page
    pub live_keys: u32,

    /// Slots whose key was cleared
    pub tombstones: u32,

    /// Total slots
    pub capacity: u32,

    /// CRC32 over the page words (little-endian)
    pub crc32: u32,
}

impl<D: BlockDevice> Store<D> {
    /// Number of times the page ring wrapped back to page 0
    ///
    /// Reads 0 when the active header never got a counter.
    pub fn erase_counter(&mut self) -> Result<u32> {
        let result = self
            .ready_page()
            .and_then(|page| self.page_erase_count(page));
        self.guard(result)
    }

    /// Live `(key, payload)` pairs in ascending key order
    pub fn entries(&mut self) -> Result<Vec<(u16, u16)>> {
        let result = self.collect_entries();
        self.guard(result)
    }

    /// Describe every page of the ring
    ///
    /// Works on unformatted or damaged devices too; nothing is modified.
    pub fn inspect(&mut self) -> Result<Vec<PageReport>> {
        let result = self.collect_reports();
        self.guard(result)
    }

    fn collect_entries(&mut self) -> Result<Vec<(u16, u16)>> {
        let page = self.ready_page()?;

        // Tail → head: the first slot seen for a key is authoritative
        let mut entries = BTreeMap::new();
        for i in (0..page.capacity()).rev() {
            let slot = Slot::decode(self.read_word(page.slot_address(i))?);
            if slot.is_live() {
                entries.entry(slot.key).or_insert(slot.payload);
            }
        }

        Ok(entries.into_iter().collect())
    }

    fn collect_reports(&mut self) -> Result<Vec<PageReport>> {
        let mut reports = Vec::with_capacity(self.pages.len());

        for page in self.pages.clone() {
            let mut hasher = crc32fast::Hasher::new();
            let header_word = self.read_word(page.header_address())?;
            hasher.update(&header_word.to_le_bytes());
            let header = Header::decode(header_word);

            let mut used_slots = 0;
            let mut tombstones = 0;
            let mut keys = BTreeSet::new();
            for i in 0..page.capacity() {
                let word = self.read_word(page.slot_address(i))?;
                hasher.update(&word.to_le_bytes());
                if Slot::is_free(word) {
                    continue;
                }
                used_slots += 1;
                let slot = Slot::decode(word);
                if slot.is_live() {
                    keys.insert(slot.key);
                } else if slot.key == KEY_TOMBSTONE {
                    tombstones += 1;
                }
            }

            reports.push(PageReport {
                index: page.index,
                device_page: page.device_page,
                status: header.status,
                erase_count: (header.erase_count != ERASE_COUNT_UNSET)
                    .then_some(header.erase_count),
                used_slots,
                live_keys: keys.len() as u32,
                tombstones,
                capacity: page.capacity(),
                crc32: hasher.finalize(),
            });
        }

        Ok(reports)
    }
}
