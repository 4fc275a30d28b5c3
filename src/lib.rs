//! # eepromkv
//!
//! Virtual EEPROM emulation on block-erasable flash:
//! - Rewritable 16-bit keys holding 16-bit values or short byte arrays
//! - Round-robin page rotation for wear leveling
//! - Copy-then-switch compaction that survives power loss at any step
//! - Bit-exact page layout shared with the firmware
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Callers / CLI / SharedStore                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ read / write / delete / arrays
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                        Store                                 │
//! │   Scanner (init/format)   Slot Reader/Writer   Delete        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ page full
//!                       ▼
//!               ┌───────────────┐
//!               │   Compactor   │
//!               └───────┬───────┘
//!                       │ erase / program / read
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │              BlockDevice (MemFlash / FileFlash)              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use eepromkv::{Config, MemFlash, Store};
//!
//! let flash = MemFlash::new(4, 64);
//! let mut store = Store::new(flash, Config::default()).unwrap();
//! store.format().unwrap();
//!
//! store.write(0x0010, 1234).unwrap();
//! assert_eq!(store.read(0x0010).unwrap(), Some(1234));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod device;
pub mod page;
pub mod store;
pub mod sync;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{EepromError, Result};
pub use config::{Config, SyncStrategy};
pub use device::{BlockDevice, FileFlash, Geometry, MemFlash};
pub use store::{PageReport, Store};
pub use sync::SharedStore;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of eepromkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
