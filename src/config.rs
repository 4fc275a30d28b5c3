//! Configuration for eepromkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::device::Geometry;

/// Main configuration for an eepromkv store
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Store Configuration
    // -------------------------------------------------------------------------
    /// Number of device pages in the page ring (values below 2 are raised to 2)
    pub num_pages: u32,

    /// First device page owned by the store
    /// Pages `base_page .. base_page + num_pages` form the ring:
    ///   [base_page]     ring index 0
    ///   [base_page + 1] ring index 1
    ///   ...
    pub base_page: u32,

    // -------------------------------------------------------------------------
    // Image Configuration
    // -------------------------------------------------------------------------
    /// Path of the flash image used by the file-backed device
    pub image_path: PathBuf,

    /// Words per page when a new image is created
    pub page_words: u32,

    /// Pages in a newly created image
    pub device_pages: u32,

    /// When to fsync the image file
    pub sync_strategy: SyncStrategy,
}

/// Image sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    /// fsync after every erase/program (survives host crashes)
    EveryOperation,

    /// Only sync when the caller asks for it
    Deferred,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            num_pages: 4,
            base_page: 0,
            image_path: PathBuf::from("./eeprom.img"),
            page_words: 512, // 2 KiB pages
            device_pages: 4,
            sync_strategy: SyncStrategy::EveryOperation,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Geometry of a freshly created image
    pub fn image_geometry(&self) -> Geometry {
        Geometry {
            page_words: self.page_words,
            page_count: self.device_pages,
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the number of pages in the ring
    pub fn num_pages(mut self, pages: u32) -> Self {
        self.config.num_pages = pages;
        self
    }

    /// Set the first device page used by the store
    pub fn base_page(mut self, page: u32) -> Self {
        self.config.base_page = page;
        self
    }

    /// Set the flash image path
    pub fn image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.image_path = path.into();
        self
    }

    /// Set the page size (in 32-bit words) for new images
    pub fn page_words(mut self, words: u32) -> Self {
        self.config.page_words = words;
        self
    }

    /// Set the page count for new images
    pub fn device_pages(mut self, pages: u32) -> Self {
        self.config.device_pages = pages;
        self
    }

    /// Set the image sync strategy
    pub fn sync_strategy(mut self, strategy: SyncStrategy) -> Self {
        self.config.sync_strategy = strategy;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
