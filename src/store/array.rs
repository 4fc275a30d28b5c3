//! Byte Arrays
//!
//! Short byte strings spread over consecutive keys, one byte per slot.
//!
//! ## Layout
//! ```text
//!   key        key+1      key+2          key+len-1
//! ┌──────────┬──────────┬──────────┬───┬──────────┐
//! │ len│ b0  │ 00 │ b1  │ 00 │ b2  │...│ 00 │ bN  │
//! └──────────┴──────────┴──────────┴───┴──────────┘
//!   hi   lo
//! ```
//! The `_of_length` variants skip the length prefix: every key carries a
//! data byte and the caller supplies the count.

use crate::device::BlockDevice;
use crate::error::{EepromError, Result};

use super::{check_key, offset_key, Store};

/// Longest array a one-byte length prefix can describe
pub const MAX_ARRAY_LEN: usize = u8::MAX as usize;

impl<D: BlockDevice> Store<D> {
    /// Read a length-prefixed array stored at `key`
    ///
    /// Returns `Ok(None)` when `key` holds nothing and
    /// `Err(PartialArrayRead)` with the bytes found so far when a later
    /// byte is missing.
    pub fn read_array(&mut self, key: u16) -> Result<Option<Vec<u8>>> {
        let result = self.read_prefixed(key);
        self.guard(result)
    }

    /// Read `count` bytes from keys `key .. key + count`
    pub fn read_array_of_length(&mut self, key: u16, count: usize) -> Result<Option<Vec<u8>>> {
        let result = self.read_bytes(key, count);
        self.guard(result)
    }

    /// Store `bytes` (1..=255 of them) as a length-prefixed array at `key`
    ///
    /// An older array of another length is deleted first so none of its
    /// trailing bytes survive.
    pub fn write_array(&mut self, key: u16, bytes: &[u8]) -> Result<()> {
        let result = self.write_prefixed(key, bytes);
        self.guard(result)
    }

    /// Store each byte at `key + i`, without a length prefix
    pub fn write_array_of_length(&mut self, key: u16, bytes: &[u8]) -> Result<()> {
        let result = self.write_bytes(key, bytes);
        self.guard(result)
    }

    /// Delete the length-prefixed array at `key`
    pub fn delete_array(&mut self, key: u16) -> Result<bool> {
        let result = self.delete_prefixed(key);
        self.guard(result)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn read_prefixed(&mut self, key: u16) -> Result<Option<Vec<u8>>> {
        let head = match self.read_key(key)? {
            Some(head) => head,
            None => return Ok(None),
        };

        let len = (head >> 8) as usize;
        let mut bytes = Vec::with_capacity(len);
        if len == 0 {
            return Ok(Some(bytes));
        }

        bytes.push(head as u8);
        for i in 1..len {
            match self.read_byte(key, i)? {
                Some(b) => bytes.push(b),
                None => {
                    return Err(EepromError::PartialArrayRead {
                        recovered: bytes,
                        expected: len,
                    })
                }
            }
        }

        Ok(Some(bytes))
    }

    fn read_bytes(&mut self, key: u16, count: usize) -> Result<Option<Vec<u8>>> {
        self.ready_page()?;
        check_key(key)?;

        let mut bytes = Vec::with_capacity(count);
        for i in 0..count {
            match self.read_byte(key, i)? {
                Some(b) => bytes.push(b),
                None if i == 0 => return Ok(None),
                None => {
                    return Err(EepromError::PartialArrayRead {
                        recovered: bytes,
                        expected: count,
                    })
                }
            }
        }

        Ok(Some(bytes))
    }

    fn write_prefixed(&mut self, key: u16, bytes: &[u8]) -> Result<()> {
        if bytes.is_empty() || bytes.len() > MAX_ARRAY_LEN {
            return Err(EepromError::InvalidLength(bytes.len()));
        }
        check_range(key, bytes.len())?;

        // Drop the old array if its length changes
        if let Some(head) = self.read_key(key)? {
            let old_len = (head >> 8) as usize;
            if old_len != bytes.len() {
                tracing::debug!(
                    "Array at {:#06x} changes length {} -> {}",
                    key,
                    old_len,
                    bytes.len()
                );
                self.delete_run(key, old_len.max(1))?;
            }
        }

        let head = ((bytes.len() as u16) << 8) | bytes[0] as u16;
        self.write_key(key, head)?;
        for (i, &b) in bytes.iter().enumerate().skip(1) {
            if let Some(k) = offset_key(key, i) {
                self.write_key(k, b as u16)?;
            }
        }

        Ok(())
    }

    fn write_bytes(&mut self, key: u16, bytes: &[u8]) -> Result<()> {
        self.ready_page()?;
        check_key(key)?;
        if bytes.is_empty() {
            return Ok(());
        }
        check_range(key, bytes.len())?;

        for (i, &b) in bytes.iter().enumerate() {
            if let Some(k) = offset_key(key, i) {
                self.write_key(k, b as u16)?;
            }
        }

        Ok(())
    }

    fn delete_prefixed(&mut self, key: u16) -> Result<bool> {
        match self.read_key(key)? {
            Some(head) => {
                let len = (head >> 8) as usize;
                self.delete_run(key, len.max(1))
            }
            None => Ok(false),
        }
    }

    /// Tombstone `key .. key + count`
    fn delete_run(&mut self, key: u16, count: usize) -> Result<bool> {
        let mut deleted = false;
        for i in 0..count {
            match offset_key(key, i) {
                Some(k) => deleted |= self.delete_key(k)?,
                None => break,
            }
        }
        Ok(deleted)
    }

    fn read_byte(&mut self, base: u16, offset: usize) -> Result<Option<u8>> {
        match offset_key(base, offset) {
            Some(k) => Ok(self.read_key(k)?.map(|v| v as u8)),
            None => Ok(None),
        }
    }
}

/// Every key in `key .. key + len` must be a caller key
fn check_range(key: u16, len: usize) -> Result<()> {
    check_key(key)?;
    if offset_key(key, len - 1).is_none() {
        return Err(EepromError::InvalidKey(key));
    }
    Ok(())
}
