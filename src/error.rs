//! Error types for eepromkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using EepromError
pub type Result<T> = std::result::Result<T, EepromError>;

/// Unified error type for eepromkv operations
#[derive(Debug, Error)]
pub enum EepromError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Block Device Errors
    // -------------------------------------------------------------------------
    #[error("Block device failure: {0}")]
    BlockDevice(String),

    // -------------------------------------------------------------------------
    // Store State Errors
    // -------------------------------------------------------------------------
    #[error("Store not initialized")]
    NotInitialized,

    #[error("Store is not formatted: no active or receiving page found")]
    Unformatted,

    #[error("Integrity error: {0}")]
    Integrity(String),

    #[error("Store full: {live} live keys do not fit {capacity} slots")]
    StoreFull { live: usize, capacity: usize },

    // -------------------------------------------------------------------------
    // Caller Errors
    // -------------------------------------------------------------------------
    #[error("Invalid key: {0:#06x}")]
    InvalidKey(u16),

    #[error("Invalid array length: {0} (expected 1..=255)")]
    InvalidLength(usize),

    #[error("Partial array read: recovered {} of {expected} bytes", recovered.len())]
    PartialArrayRead { recovered: Vec<u8>, expected: usize },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EepromError {
    /// Whether this error came from the underlying device
    ///
    /// Device failures leave the persisted state unknown, so the store
    /// must be re-scanned before it is used again.
    pub fn is_device_failure(&self) -> bool {
        matches!(self, EepromError::BlockDevice(_) | EepromError::Io(_))
    }
}
