//! Delete
//!
//! Tombstones clear the key half of a slot to 0x0000 in place. Only bits
//! go from one to zero, so no erase is needed; the slot is reclaimed at
//! the next compaction.

use crate::device::BlockDevice;
use crate::error::Result;
use crate::page::{Slot, TOMBSTONE_WORD};

use super::{check_key, Store};

impl<D: BlockDevice> Store<D> {
    /// Delete every slot holding `key`
    ///
    /// Stale copies are tombstoned too, so a later compaction cannot bring
    /// an older value back. Returns whether any slot was found.
    pub fn delete(&mut self, key: u16) -> Result<bool> {
        let result = self.delete_key(key);
        self.guard(result)
    }

    pub(super) fn delete_key(&mut self, key: u16) -> Result<bool> {
        let page = self.ready_page()?;
        check_key(key)?;

        let mut deleted = false;
        for i in (0..page.capacity()).rev() {
            let address = page.slot_address(i);
            if Slot::decode(self.read_word(address)?).key == key {
                self.program_word(address, TOMBSTONE_WORD)?;
                tracing::debug!("Key {:#06x} tombstoned in slot {}", key, i);
                deleted = true;
            }
        }

        Ok(deleted)
    }
}
