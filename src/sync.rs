//! Shared Store
//!
//! The store itself has no locking. `SharedStore` puts it behind one
//! mutex so several threads can use it; every call, compaction included,
//! runs while holding the lock.

use parking_lot::Mutex;

use crate::device::BlockDevice;
use crate::error::Result;
use crate::store::{PageReport, Store};

/// Mutex-serialized store handle
///
/// Wrap it in an `Arc` to hand it to other threads.
pub struct SharedStore<D: BlockDevice> {
    inner: Mutex<Store<D>>,
}

impl<D: BlockDevice> SharedStore<D> {
    pub fn new(store: Store<D>) -> Self {
        Self {
            inner: Mutex::new(store),
        }
    }

    pub fn init(&self) -> Result<()> {
        self.inner.lock().init()
    }

    pub fn format(&self) -> Result<()> {
        self.inner.lock().format()
    }

    pub fn read(&self, key: u16) -> Result<Option<u16>> {
        self.inner.lock().read(key)
    }

    pub fn write(&self, key: u16, payload: u16) -> Result<()> {
        self.inner.lock().write(key, payload)
    }

    pub fn delete(&self, key: u16) -> Result<bool> {
        self.inner.lock().delete(key)
    }

    pub fn read_array(&self, key: u16) -> Result<Option<Vec<u8>>> {
        self.inner.lock().read_array(key)
    }

    pub fn read_array_of_length(&self, key: u16, count: usize) -> Result<Option<Vec<u8>>> {
        self.inner.lock().read_array_of_length(key, count)
    }

    pub fn write_array(&self, key: u16, bytes: &[u8]) -> Result<()> {
        self.inner.lock().write_array(key, bytes)
    }

    pub fn write_array_of_length(&self, key: u16, bytes: &[u8]) -> Result<()> {
        self.inner.lock().write_array_of_length(key, bytes)
    }

    pub fn delete_array(&self, key: u16) -> Result<bool> {
        self.inner.lock().delete_array(key)
    }

    pub fn compact(&self) -> Result<()> {
        self.inner.lock().compact()
    }

    pub fn erase_counter(&self) -> Result<u32> {
        self.inner.lock().erase_counter()
    }

    pub fn entries(&self) -> Result<Vec<(u16, u16)>> {
        self.inner.lock().entries()
    }

    pub fn inspect(&self) -> Result<Vec<PageReport>> {
        self.inner.lock().inspect()
    }

    /// Run several operations under one lock acquisition
    ///
    /// Useful for read-modify-write sequences that must not interleave
    /// with other callers.
    pub fn with<R>(&self, f: impl FnOnce(&mut Store<D>) -> R) -> R {
        let mut store = self.inner.lock();
        f(&mut *store)
    }

    /// Take the store back
    pub fn into_inner(self) -> Store<D> {
        self.inner.into_inner()
    }
}
