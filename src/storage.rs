//! Shared storage block for channel payloads and the element counter.
//!
//! Backed by a close-on-exec `memfd` mapped `MAP_SHARED` via `memmap2`.
//! A memfd rather than a plain heap allocation is what makes this block
//! visible to a forked child without any further IPC: the memfd *is* the
//! cross-process handle.

use std::sync::atomic::AtomicU64;

use memfd::MemfdOptions;
use memmap2::{MmapOptions, MmapRaw};

use crate::Error;

/// Bytes reserved at the front of the mapping for the shared element
/// counter: a cache-line-sized header before the element slots.
const HEADER_SIZE: usize = 64;

pub struct SharedStorage {
    // Kept alive for as long as the mapping is; never read/written after
    // construction.
    _memfd: memfd::Memfd,
    mmap: MmapRaw,
}

impl SharedStorage {
    /// Allocates a `HEADER_SIZE + capacity_physical * element_size` byte
    /// block from an anonymous, close-on-exec memfd and maps it
    /// `MAP_SHARED`. The kernel zero-fills the pages, so `element_count`
    /// starts at zero without any explicit initialisation.
    pub fn new(element_size: usize, capacity_physical: usize) -> Result<Self, Error> {
        let bytes = HEADER_SIZE + capacity_physical * element_size;
        let opts = MemfdOptions::default().close_on_exec(true);
        let memfd = opts.create("chanfd")?;
        memfd.as_file().set_len(bytes as u64)?;
        let mmap = MmapOptions::new().map_raw(memfd.as_file())?;
        Ok(Self {
            _memfd: memfd,
            mmap,
        })
    }

    /// The shared element counter living in the mapping's header, visible
    /// identically to every thread and to any process that inherits the
    /// memfd.
    pub fn element_count(&self) -> &AtomicU64 {
        unsafe { &*(self.mmap.as_mut_ptr() as *const AtomicU64) }
    }

    /// Pointer to the start of the element slots, past the header.
    pub fn slots_ptr(&self) -> *mut u8 {
        unsafe { self.mmap.as_mut_ptr().add(HEADER_SIZE) }
    }
}

// The mapping is shared memory; every access through it is either an
// atomic op on `element_count` or a byte copy guarded by the owning
// protocol's semaphores/spinlock.
unsafe impl Send for SharedStorage {}
unsafe impl Sync for SharedStorage {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn element_count_starts_zero() {
        let s = SharedStorage::new(8, 4).unwrap();
        assert_eq!(s.element_count().load(Ordering::Relaxed), 0);
    }

    #[test]
    fn slots_are_writable_and_distinct() {
        let s = SharedStorage::new(4, 3).unwrap();
        for i in 0..3usize {
            unsafe {
                let p = s.slots_ptr().add(i * 4);
                std::ptr::write_bytes(p, i as u8, 4);
            }
        }
        for i in 0..3usize {
            let byte = unsafe { *s.slots_ptr().add(i * 4) };
            assert_eq!(byte, i as u8);
        }
    }
}
