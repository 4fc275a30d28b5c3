//! Tests for the variable store
//!
//! These tests verify:
//! - Format and startup states
//! - Read/write round trips and write elision
//! - Compaction, stale slot removal and StoreFull
//! - Delete and tombstones
//! - Erase counter wrap-around
//! - Page scanner resolution rules
//! - Diagnostics and base page offsets

use eepromkv::device::{BlockDevice, Geometry, MemFlash, ERASED_WORD};
use eepromkv::page::{PageStatus, Slot};
use eepromkv::{Config, EepromError, Store};

// =============================================================================
// Helper Functions
// =============================================================================

fn config(pages: u32) -> Config {
    Config::builder().num_pages(pages).build()
}

fn new_store(pages: u32, words: u32) -> Store<MemFlash> {
    Store::new(MemFlash::new(pages, words), config(pages)).unwrap()
}

fn formatted_store(pages: u32, words: u32) -> Store<MemFlash> {
    let mut store = new_store(pages, words);
    store.format().unwrap();
    store
}

/// Restart: keep the flash contents, drop everything in memory
fn restart(store: Store<MemFlash>) -> Store<MemFlash> {
    let pages = store.num_pages();
    Store::new(store.into_device(), config(pages)).unwrap()
}

fn header(store: &Store<MemFlash>, page: u32) -> u32 {
    store.device().page(page)[0]
}

/// Device whose geometry needs more than 32-bit word addresses
struct OversizedFlash;

impl BlockDevice for OversizedFlash {
    fn geometry(&self) -> Geometry {
        Geometry {
            page_words: 0x1_0000,
            page_count: 0x1_0001,
        }
    }

    fn read_word(&mut self, _address: u32) -> eepromkv::Result<u32> {
        Ok(ERASED_WORD)
    }

    fn program_words(&mut self, _address: u32, _words: &[u32]) -> eepromkv::Result<()> {
        Ok(())
    }

    fn erase_block(&mut self, _page: u32) -> eepromkv::Result<()> {
        Ok(())
    }
}

// =============================================================================
// Format and Startup Tests
// =============================================================================

#[test]
fn test_format_layout() {
    let store = formatted_store(4, 16);

    assert!(store.is_initialized());
    assert_eq!(store.active_page(), Some(0));
    assert_eq!(store.receiving_page(), None);
    assert_eq!(store.capacity(), 15);

    // Active status, erase count 1
    assert_eq!(header(&store, 0), 0x0000_0001);
    assert!(store.device().page(0)[1..].iter().all(|&w| w == ERASED_WORD));
    for page in 1..4 {
        assert!(store.device().is_page_erased(page));
    }
}

#[test]
fn test_format_wipes_existing_data() {
    let mut store = formatted_store(4, 16);
    store.write(1, 10).unwrap();
    store.compact().unwrap();
    store.write(2, 20).unwrap();

    store.format().unwrap();

    assert_eq!(store.active_page(), Some(0));
    assert_eq!(store.read(1).unwrap(), None);
    assert_eq!(store.read(2).unwrap(), None);
    assert_eq!(store.erase_counter().unwrap(), 1);
}

#[test]
fn test_init_unformatted() {
    let mut store = new_store(4, 16);

    let result = store.init();
    assert!(matches!(result, Err(EepromError::Unformatted)));
    assert!(!store.is_initialized());
    assert_eq!(store.device().mutations(), 0);
}

#[test]
fn test_operations_require_init() {
    let mut store = new_store(4, 16);

    assert!(matches!(store.read(1), Err(EepromError::NotInitialized)));
    assert!(matches!(store.write(1, 1), Err(EepromError::NotInitialized)));
    assert!(matches!(store.delete(1), Err(EepromError::NotInitialized)));
    assert!(matches!(store.compact(), Err(EepromError::NotInitialized)));
    assert!(matches!(store.erase_counter(), Err(EepromError::NotInitialized)));
    assert!(matches!(store.entries(), Err(EepromError::NotInitialized)));
}

#[test]
fn test_init_after_format_and_restart() {
    let mut store = formatted_store(4, 16);
    store.write(0x0010, 0x1234).unwrap();

    let mut store = restart(store);
    store.init().unwrap();

    assert_eq!(store.active_page(), Some(0));
    assert_eq!(store.read(0x0010).unwrap(), Some(0x1234));
}

#[test]
fn test_config_validation() {
    // Ring larger than the device
    let result = Store::new(MemFlash::new(4, 16), config(5));
    assert!(matches!(result, Err(EepromError::Config(_))));

    // No room for slots
    let result = Store::new(MemFlash::new(4, 1), config(4));
    assert!(matches!(result, Err(EepromError::Config(_))));

    // Word addresses past 32 bits
    let oversized_config = Config::builder().num_pages(2).base_page(0xFFFF).build();
    let result = Store::new(OversizedFlash, oversized_config);
    assert!(matches!(result, Err(EepromError::Config(_))));

    // A one-page ring is raised to two pages
    let store = Store::new(MemFlash::new(4, 16), config(1)).unwrap();
    assert_eq!(store.num_pages(), 2);
}

// =============================================================================
// Read / Write Tests
// =============================================================================

#[test]
fn test_write_read_roundtrip() {
    let mut store = formatted_store(4, 16);

    store.write(0x0001, 0xBEEF).unwrap();
    store.write(0xFFFE, 0x0000).unwrap();
    store.write(0x1234, 0xFFFF).unwrap();

    assert_eq!(store.read(0x0001).unwrap(), Some(0xBEEF));
    assert_eq!(store.read(0xFFFE).unwrap(), Some(0x0000));
    assert_eq!(store.read(0x1234).unwrap(), Some(0xFFFF));
    assert_eq!(store.read(0x0002).unwrap(), None);
}

#[test]
fn test_overwrite_returns_latest() {
    let mut store = formatted_store(4, 16);

    store.write(7, 1).unwrap();
    store.write(7, 2).unwrap();
    store.write(7, 3).unwrap();

    assert_eq!(store.read(7).unwrap(), Some(3));
    assert_eq!(store.inspect().unwrap()[0].used_slots, 3);
}

#[test]
fn test_write_elided_when_unchanged() {
    let mut store = formatted_store(4, 16);
    store.write(5, 42).unwrap();

    let words = store.device().words().to_vec();
    let mutations = store.device().mutations();

    store.write(5, 42).unwrap();

    assert_eq!(store.device().words(), words.as_slice());
    assert_eq!(store.device().mutations(), mutations);
}

#[test]
fn test_reserved_keys_rejected() {
    let mut store = formatted_store(4, 16);

    assert!(matches!(store.write(0x0000, 1), Err(EepromError::InvalidKey(0x0000))));
    assert!(matches!(store.write(0xFFFF, 1), Err(EepromError::InvalidKey(0xFFFF))));
    assert!(matches!(store.read(0x0000), Err(EepromError::InvalidKey(_))));
    assert!(matches!(store.delete(0xFFFF), Err(EepromError::InvalidKey(_))));

    // Rejection is not a device failure
    assert!(store.is_initialized());
}

// =============================================================================
// Compaction Tests
// =============================================================================

#[test]
fn test_full_page_compacts_into_next_page() {
    // 9-word pages: 8 slots
    let mut store = formatted_store(4, 9);
    for key in 1..=7 {
        store.write(key, key).unwrap();
    }
    store.write(1, 100).unwrap(); // stale copy of key 1 fills the page

    store.write(100, 1).unwrap();

    assert_eq!(store.active_page(), Some(1));
    assert_eq!(store.read(100).unwrap(), Some(1));
    assert_eq!(store.read(1).unwrap(), Some(100));
    for key in 2..=7 {
        assert_eq!(store.read(key).unwrap(), Some(key));
    }

    assert!(store.device().is_page_erased(0));
    // Active, erase count carried over unchanged
    assert_eq!(header(&store, 1), 0x0000_0001);

    // Carried write first, then the rest without the stale copy
    let report = &store.inspect().unwrap()[1];
    assert_eq!(report.used_slots, 8);
    assert_eq!(report.live_keys, 8);
    assert_eq!(
        Slot::decode(store.device().page(1)[1]),
        Slot::new(100, 1)
    );
}

#[test]
fn test_compaction_drops_stale_slots() {
    let mut store = formatted_store(4, 16);
    for value in 0..10 {
        store.write(3, value).unwrap();
    }
    store.write(4, 44).unwrap();

    store.compact().unwrap();

    let report = &store.inspect().unwrap()[1];
    assert_eq!(report.used_slots, 2);
    assert_eq!(store.read(3).unwrap(), Some(9));
    assert_eq!(store.read(4).unwrap(), Some(44));
}

#[test]
fn test_store_full_leaves_flash_untouched() {
    // 5-word pages: 4 slots
    let mut store = formatted_store(2, 5);
    for key in 1..=4 {
        store.write(key, key * 10).unwrap();
    }

    let words = store.device().words().to_vec();
    let result = store.write(5, 50);

    match result {
        Err(EepromError::StoreFull { live, capacity }) => {
            assert_eq!(live, 5);
            assert_eq!(capacity, 4);
        }
        other => panic!("expected StoreFull, got {:?}", other),
    }
    assert_eq!(store.device().words(), words.as_slice());
    assert!(store.is_initialized());
    assert_eq!(store.active_page(), Some(0));
    assert_eq!(store.read(5).unwrap(), None);
    assert_eq!(store.read(4).unwrap(), Some(40));
}

#[test]
fn test_overwrite_on_full_page_with_all_keys_live() {
    let mut store = formatted_store(2, 5);
    for key in 1..=4 {
        store.write(key, key).unwrap();
    }

    store.write(1, 99).unwrap();

    assert_eq!(store.active_page(), Some(1));
    assert_eq!(store.read(1).unwrap(), Some(99));
    for key in 2..=4 {
        assert_eq!(store.read(key).unwrap(), Some(key));
    }
}

#[test]
fn test_compact_on_empty_store() {
    let mut store = formatted_store(4, 16);

    store.compact().unwrap();

    assert_eq!(store.active_page(), Some(1));
    assert_eq!(store.entries().unwrap(), vec![]);
}

// =============================================================================
// Delete Tests
// =============================================================================

#[test]
fn test_delete_tombstones_slot() {
    let mut store = formatted_store(4, 16);
    store.write(0x0042, 0x00A5).unwrap();

    assert!(store.delete(0x0042).unwrap());

    assert_eq!(store.read(0x0042).unwrap(), None);
    // Key cleared, payload bits left as they were
    assert_eq!(store.device().page(0)[1], 0x0000_00A5);
    assert!(!store.delete(0x0042).unwrap());
}

#[test]
fn test_delete_covers_stale_copies() {
    let mut store = formatted_store(4, 16);
    store.write(9, 1).unwrap();
    store.write(9, 2).unwrap();
    store.write(10, 3).unwrap();

    store.delete(9).unwrap();
    store.compact().unwrap();

    assert_eq!(store.read(9).unwrap(), None);
    assert_eq!(store.read(10).unwrap(), Some(3));

    let report = &store.inspect().unwrap()[1];
    assert_eq!(report.used_slots, 1);
}

#[test]
fn test_delete_then_rewrite() {
    let mut store = formatted_store(4, 16);
    store.write(9, 1).unwrap();
    store.delete(9).unwrap();

    store.write(9, 1).unwrap();

    assert_eq!(store.read(9).unwrap(), Some(1));
}

#[test]
fn test_delete_missing_key() {
    let mut store = formatted_store(4, 16);
    let mutations = store.device().mutations();

    assert!(!store.delete(77).unwrap());
    assert_eq!(store.device().mutations(), mutations);
}

// =============================================================================
// Erase Counter Tests
// =============================================================================

#[test]
fn test_erase_counter_increments_on_wrap() {
    let mut store = formatted_store(4, 16);
    assert_eq!(store.erase_counter().unwrap(), 1);

    let mut counters = Vec::new();
    for _ in 0..4 {
        store.compact().unwrap();
        counters.push(store.erase_counter().unwrap());
    }

    assert_eq!(counters, vec![1, 1, 1, 2]);
    assert_eq!(store.active_page(), Some(0));
    for page in 0..4 {
        assert_eq!(store.device().erase_count(page), 1);
    }
}

#[test]
fn test_erase_counter_survives_restart() {
    let mut store = formatted_store(2, 16);
    for _ in 0..6 {
        store.compact().unwrap();
    }
    assert_eq!(store.erase_counter().unwrap(), 4);

    let mut store = restart(store);
    store.init().unwrap();
    assert_eq!(store.erase_counter().unwrap(), 4);
}

#[test]
fn test_unset_erase_counter_reads_zero() {
    let mut flash = MemFlash::new(2, 16);
    flash
        .program_words(0, &[PageStatus::Active.program_word()])
        .unwrap();

    let mut store = Store::new(flash, config(2)).unwrap();
    store.init().unwrap();

    assert_eq!(store.erase_counter().unwrap(), 0);
}

// =============================================================================
// Scanner Tests
// =============================================================================

#[test]
fn test_scan_erases_unknown_status() {
    let mut store = formatted_store(4, 16);
    store.write(1, 1).unwrap();
    store.device_mut().corrupt_word(2 * 16, 0x5AFF_FFFF);
    store.device_mut().corrupt_word(2 * 16 + 3, 0x1234_5678);

    let mut store = restart(store);
    store.init().unwrap();

    assert!(store.device().is_page_erased(2));
    assert_eq!(store.active_page(), Some(0));
    assert_eq!(store.read(1).unwrap(), Some(1));
}

#[test]
fn test_scan_erases_residue_in_erased_page() {
    let mut store = formatted_store(4, 16);
    store.device_mut().corrupt_word(3 * 16 + 5, 0x0001_0001);

    let mut store = restart(store);
    store.init().unwrap();

    assert!(store.device().is_page_erased(3));
    assert_eq!(store.device().erase_count(3), 1);
    assert_eq!(store.read(1).unwrap(), None);
}

#[test]
fn test_scan_two_active_pages_is_integrity_error() {
    let mut store = formatted_store(4, 16);
    store.device_mut().corrupt_word(2 * 16, 0x00FF_FFFF);
    store.device_mut().corrupt_word(16, 0x5AFF_FFFF);

    let mut store = restart(store);
    let words = store.device().words().to_vec();

    assert!(matches!(store.init(), Err(EepromError::Integrity(_))));
    assert!(!store.is_initialized());
    // Not even the unknown-status page was erased
    assert_eq!(store.device().words(), words.as_slice());
}

#[test]
fn test_scan_two_receiving_pages_is_integrity_error() {
    let mut store = formatted_store(4, 16);
    store.device_mut().corrupt_word(16, 0xAAFF_FFFF);
    store.device_mut().corrupt_word(2 * 16, 0xAAFF_FFFF);

    let mut store = restart(store);
    let words = store.device().words().to_vec();

    assert!(matches!(store.init(), Err(EepromError::Integrity(_))));
    assert_eq!(store.device().words(), words.as_slice());
}

#[test]
fn test_scan_promotes_lone_receiving_page() {
    let mut flash = MemFlash::new(4, 16);
    flash
        .program_words(
            2 * 16,
            &[
                PageStatus::Receiving.program_word(),
                Slot::new(7, 70).encode(),
            ],
        )
        .unwrap();

    let mut store = Store::new(flash, config(4)).unwrap();
    store.init().unwrap();

    assert_eq!(store.active_page(), Some(2));
    assert_eq!(store.receiving_page(), None);
    assert_eq!(store.read(7).unwrap(), Some(70));
    assert_eq!(header(&store, 2) >> 24, 0x00);
}

#[test]
fn test_scan_resumes_interrupted_compaction() {
    let mut store = formatted_store(4, 16);
    store.write(1, 10).unwrap();
    store.write(2, 20).unwrap();

    // Compaction got as far as copying key 2
    let base = 16;
    store
        .device_mut()
        .program_words(
            base,
            &[PageStatus::Receiving.program_word(), Slot::new(2, 20).encode()],
        )
        .unwrap();

    let mut store = restart(store);
    store.init().unwrap();

    assert_eq!(store.active_page(), Some(1));
    assert_eq!(store.receiving_page(), None);
    assert!(store.device().is_page_erased(0));
    assert_eq!(store.read(1).unwrap(), Some(10));
    assert_eq!(store.read(2).unwrap(), Some(20));

    // No duplicate for the key copied before the restart
    assert_eq!(store.inspect().unwrap()[1].used_slots, 2);
    assert_eq!(store.erase_counter().unwrap(), 1);
}

// =============================================================================
// Diagnostics Tests
// =============================================================================

#[test]
fn test_entries_sorted_and_current() {
    let mut store = formatted_store(4, 16);
    store.write(30, 3).unwrap();
    store.write(10, 1).unwrap();
    store.write(20, 2).unwrap();
    store.write(10, 11).unwrap();
    store.delete(20).unwrap();

    assert_eq!(store.entries().unwrap(), vec![(10, 11), (30, 3)]);
}

#[test]
fn test_inspect_reports_pages() {
    let mut store = formatted_store(4, 16);
    store.write(1, 1).unwrap();
    store.write(1, 2).unwrap();
    store.write(2, 2).unwrap();
    store.delete(2).unwrap();

    let reports = store.inspect().unwrap();
    assert_eq!(reports.len(), 4);

    let active = &reports[0];
    assert_eq!(active.status, PageStatus::Active);
    assert_eq!(active.erase_count, Some(1));
    assert_eq!(active.used_slots, 3);
    assert_eq!(active.live_keys, 1);
    assert_eq!(active.tombstones, 1);
    assert_eq!(active.capacity, 15);

    for report in &reports[1..] {
        assert_eq!(report.status, PageStatus::Erased);
        assert_eq!(report.erase_count, None);
        assert_eq!(report.used_slots, 0);
    }
    assert_eq!(reports[1].crc32, reports[2].crc32);
    assert_ne!(reports[0].crc32, reports[1].crc32);
}

#[test]
fn test_inspect_works_unformatted() {
    let mut store = new_store(2, 16);

    let reports = store.inspect().unwrap();

    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.status == PageStatus::Erased));
    assert!(!store.is_initialized());
}

// =============================================================================
// Base Page Tests
// =============================================================================

#[test]
fn test_base_page_offsets_ring() {
    let config = Config::builder().num_pages(3).base_page(2).build();
    let mut store = Store::new(MemFlash::new(6, 16), config).unwrap();
    store.format().unwrap();
    store.write(1, 1).unwrap();
    store.compact().unwrap();

    // Ring page 1 is device page 3
    assert_eq!(store.active_page(), Some(1));
    assert_eq!(store.pages()[1].device_page, 3);
    assert_eq!(header(&store, 3), 0x0000_0001);
    assert!(store.device().is_page_erased(0));
    assert!(store.device().is_page_erased(1));
    assert_eq!(store.device().erase_count(0), 0);
    assert_eq!(store.device().erase_count(1), 0);

    assert_eq!(store.inspect().unwrap()[1].device_page, 3);
}
