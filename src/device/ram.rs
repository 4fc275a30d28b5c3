//! RAM-backed flash
//!
//! In-memory block device that behaves like NOR flash: programming ANDs
//! into the stored word and only an erase brings bits back to one.
//! Used by tests and benchmarks, with fault injection for power-loss runs.

use crate::error::{EepromError, Result};

use super::{BlockDevice, Geometry, ERASED_WORD};

/// In-memory flash with wear tracking and fault injection
///
/// ```
/// use eepromkv::device::{BlockDevice, MemFlash};
///
/// let mut flash = MemFlash::new(4, 16);
/// flash.program_words(3, &[0x0F0F_0F0F]).unwrap();
/// flash.program_words(3, &[0xFFFF_00FF]).unwrap();
/// assert_eq!(flash.read_word(3).unwrap(), 0x0F0F_000F);
///
/// flash.erase_block(0).unwrap();
/// assert_eq!(flash.read_word(3).unwrap(), 0xFFFF_FFFF);
/// assert_eq!(flash.erase_count(0), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MemFlash {
    geometry: Geometry,
    /// Word storage, initialized erased
    words: Vec<u32>,
    /// Erases per page
    erase_counts: Vec<u32>,
    /// Successful erase + program calls
    mutations: u64,
    /// Mutations left before the injected fault fires
    fault_countdown: Option<u64>,
    /// Set once the fault fired; every later mutation fails
    faulted: bool,
}

impl MemFlash {
    /// Create an erased device
    pub fn new(page_count: u32, page_words: u32) -> Self {
        let geometry = Geometry {
            page_words,
            page_count,
        };

        Self {
            geometry,
            words: vec![ERASED_WORD; geometry.total_words() as usize],
            erase_counts: vec![0; page_count as usize],
            mutations: 0,
            fault_countdown: None,
            faulted: false,
        }
    }

    /// Raw word contents (for test verification)
    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// Raw words of one page
    pub fn page(&self, page: u32) -> &[u32] {
        let start = self.geometry.page_address(page) as usize;
        &self.words[start..start + self.geometry.page_words as usize]
    }

    /// Whether every word of the page is erased
    pub fn is_page_erased(&self, page: u32) -> bool {
        self.page(page).iter().all(|&w| w == ERASED_WORD)
    }

    /// Number of times `page` has been erased
    pub fn erase_count(&self, page: u32) -> u32 {
        self.erase_counts[page as usize]
    }

    /// Successful erase and program calls since creation
    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    /// Let `count` more mutations succeed, then fail all of them
    ///
    /// A failing operation leaves memory untouched, like a power cut just
    /// before the operation reached the array.
    pub fn fail_after(&mut self, count: u64) {
        self.fault_countdown = Some(count);
        self.faulted = false;
    }

    /// Restore power: mutations succeed again
    pub fn clear_fault(&mut self) {
        self.fault_countdown = None;
        self.faulted = false;
    }

    /// Overwrite a word ignoring flash semantics (corruption injection)
    pub fn corrupt_word(&mut self, address: u32, value: u32) {
        self.words[address as usize] = value;
    }

    fn check_fault(&mut self, op: &str) -> Result<()> {
        if self.faulted {
            return Err(EepromError::BlockDevice(format!("{op}: device powered down")));
        }

        if let Some(left) = self.fault_countdown.as_mut() {
            if *left == 0 {
                self.faulted = true;
                return Err(EepromError::BlockDevice(format!("{op}: injected fault")));
            }
            *left -= 1;
        }

        Ok(())
    }

    fn check_range(&self, address: u32, len: usize) -> Result<()> {
        let end = address as u64 + len as u64;
        if end > self.geometry.total_words() {
            return Err(EepromError::BlockDevice(format!(
                "address range {:#x}..{:#x} outside device ({} words)",
                address,
                end,
                self.geometry.total_words()
            )));
        }
        Ok(())
    }
}

impl BlockDevice for MemFlash {
    fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn read_word(&mut self, address: u32) -> Result<u32> {
        self.check_range(address, 1)?;
        Ok(self.words[address as usize])
    }

    fn program_words(&mut self, address: u32, words: &[u32]) -> Result<()> {
        self.check_range(address, words.len())?;
        self.check_fault("program")?;

        let start = address as usize;
        for (slot, &word) in self.words[start..start + words.len()].iter_mut().zip(words) {
            *slot &= word;
        }

        self.mutations += 1;
        Ok(())
    }

    fn erase_block(&mut self, page: u32) -> Result<()> {
        if page >= self.geometry.page_count {
            return Err(EepromError::BlockDevice(format!(
                "erase of page {} outside device ({} pages)",
                page, self.geometry.page_count
            )));
        }
        self.check_fault("erase")?;

        let start = self.geometry.page_address(page) as usize;
        let end = start + self.geometry.page_words as usize;
        self.words[start..end].fill(ERASED_WORD);
        self.erase_counts[page as usize] += 1;

        self.mutations += 1;
        Ok(())
    }
}
