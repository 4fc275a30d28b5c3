//! File-backed flash
//!
//! Keeps a flash image on the host file system so a store can be
//! inspected and edited outside the target.
//!
//! ## Image Format
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ page 0: page_words × u32 (little-endian)     │
//! ├──────────────────────────────────────────────┤
//! │ page 1: page_words × u32 (little-endian)     │
//! ├──────────────────────────────────────────────┤
//! │ ...                                          │
//! └──────────────────────────────────────────────┘
//! ```
//! No header: the image is a raw dump of the flash region.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::SyncStrategy;
use crate::error::{EepromError, Result};

use super::{BlockDevice, Geometry, ERASED_WORD};

const WORD_BYTES: u64 = 4;

/// Flash image stored in a regular file
pub struct FileFlash {
    path: PathBuf,
    file: File,
    geometry: Geometry,
    sync_strategy: SyncStrategy,
}

impl FileFlash {
    /// Open an existing image or create an erased one
    ///
    /// An existing image must be exactly `geometry.total_words() * 4` bytes.
    pub fn open(path: &Path, geometry: Geometry, sync_strategy: SyncStrategy) -> Result<Self> {
        if geometry.page_words < 2 || geometry.page_count == 0 || !geometry.is_addressable() {
            return Err(EepromError::Config(format!(
                "invalid image geometry: {} pages of {} words",
                geometry.page_count, geometry.page_words
            )));
        }

        let expected_len = geometry.total_words() * WORD_BYTES;
        let exists = path.exists();

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if exists {
            let len = file.metadata()?.len();
            if len != expected_len {
                return Err(EepromError::Config(format!(
                    "image {} is {} bytes, geometry expects {}",
                    path.display(),
                    len,
                    expected_len
                )));
            }
        } else {
            tracing::debug!(
                "Creating erased flash image {} ({} bytes)",
                path.display(),
                expected_len
            );
            let page = erased_page_bytes(geometry.page_words);
            for _ in 0..geometry.page_count {
                file.write_all(&page)?;
            }
            file.sync_all()?;
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            geometry,
            sync_strategy,
        })
    }

    /// Image file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush image contents to stable storage
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn maybe_sync(&mut self) -> Result<()> {
        if self.sync_strategy == SyncStrategy::EveryOperation {
            self.file.sync_data()?;
        }
        Ok(())
    }

    fn check_range(&self, address: u32, len: usize) -> Result<()> {
        let end = address as u64 + len as u64;
        if end > self.geometry.total_words() {
            return Err(EepromError::BlockDevice(format!(
                "address range {:#x}..{:#x} outside image ({} words)",
                address,
                end,
                self.geometry.total_words()
            )));
        }
        Ok(())
    }
}

impl BlockDevice for FileFlash {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn read_word(&mut self, address: u32) -> Result<u32> {
        self.check_range(address, 1)?;

        let mut buf = [0u8; WORD_BYTES as usize];
        self.file.seek(SeekFrom::Start(address as u64 * WORD_BYTES))?;
        self.file.read_exact(&mut buf)?;

        Ok(u32::from_le_bytes(buf))
    }

    fn program_words(&mut self, address: u32, words: &[u32]) -> Result<()> {
        self.check_range(address, words.len())?;

        let offset = address as u64 * WORD_BYTES;
        let mut current = vec![0u8; words.len() * WORD_BYTES as usize];
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut current)?;

        // Flash programming can only clear bits
        for (chunk, &word) in current.chunks_exact_mut(WORD_BYTES as usize).zip(words) {
            let old = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            chunk.copy_from_slice(&(old & word).to_le_bytes());
        }

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&current)?;
        self.maybe_sync()
    }

    fn erase_block(&mut self, page: u32) -> Result<()> {
        if page >= self.geometry.page_count {
            return Err(EepromError::BlockDevice(format!(
                "erase of page {} outside image ({} pages)",
                page, self.geometry.page_count
            )));
        }

        let offset = self.geometry.page_address(page) as u64 * WORD_BYTES;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&erased_page_bytes(self.geometry.page_words))?;
        self.maybe_sync()
    }
}

fn erased_page_bytes(page_words: u32) -> Vec<u8> {
    ERASED_WORD
        .to_le_bytes()
        .repeat(page_words as usize)
}
