//! The buffered (`capacity >= 1`) ring protocol: two sequence indices over
//! the shared storage, protected by a spinlock that is elided when the
//! physical capacity is 1 (the free/filled semaphores alone then provide
//! mutual exclusion).

use std::os::unix::io::RawFd;
use std::ptr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::sem::Sem;
use crate::spinlock::SpinLock;
use crate::storage::SharedStorage;
use crate::Error;

pub struct Ring {
    free: Sem,
    filled: Sem,
    lock: Option<SpinLock>,
    storage: SharedStorage,
    in_idx: AtomicUsize,
    out_idx: AtomicUsize,
    capacity_physical: usize,
    element_size: usize,
}

impl Ring {
    /// `capacity` is the channel's declared capacity (`>= 1`); the
    /// physical ring always has `max(capacity, 1)` slots.
    pub fn create(element_size: usize, capacity: usize) -> Result<Self, Error> {
        let capacity_physical = capacity.max(1);
        let storage = SharedStorage::new(element_size, capacity_physical)?;
        let lock = if capacity_physical > 1 {
            Some(SpinLock::new())
        } else {
            None
        };
        Ok(Self {
            free: Sem::new(capacity_physical as u64)?,
            filled: Sem::new(0)?,
            lock,
            storage,
            in_idx: AtomicUsize::new(0),
            out_idx: AtomicUsize::new(0),
            capacity_physical,
            element_size,
        })
    }

    fn slot(&self, index: usize) -> *mut u8 {
        unsafe { self.storage.slots_ptr().add(index * self.element_size) }
    }

    fn element_count(&self) -> &AtomicU64 {
        self.storage.element_count()
    }

    pub fn capacity_physical(&self) -> usize {
        self.capacity_physical
    }

    /// Runs `f` under the spinlock, or directly if the lock was elided at
    /// capacity 1 (where the semaphores alone already serialise access).
    fn with_lock<R>(&self, f: impl FnOnce() -> R) -> R {
        match &self.lock {
            Some(lock) => {
                lock.lock();
                let r = f();
                lock.unlock();
                r
            }
            None => f(),
        }
    }

    pub fn send(&self, data: &[u8]) {
        debug_assert_eq!(data.len(), self.element_size);
        self.free.acquire();
        self.with_lock(|| {
            let idx = self.in_idx.load(Ordering::Relaxed);
            unsafe { ptr::copy_nonoverlapping(data.as_ptr(), self.slot(idx), self.element_size) };
            self.in_idx
                .store((idx + 1) % self.capacity_physical, Ordering::Relaxed);
        });
        self.filled.release(1);
        self.element_count().fetch_add(1, Ordering::Release);
    }

    pub fn recv(&self, data: &mut [u8]) {
        debug_assert_eq!(data.len(), self.element_size);
        self.filled.acquire();
        self.with_lock(|| {
            let idx = self.out_idx.load(Ordering::Relaxed);
            unsafe { ptr::copy_nonoverlapping(self.slot(idx), data.as_mut_ptr(), self.element_size) };
            self.out_idx
                .store((idx + 1) % self.capacity_physical, Ordering::Relaxed);
        });
        self.free.release(1);
        self.element_count().fetch_sub(1, Ordering::Release);
    }

    pub fn sender_fd(&self) -> RawFd {
        self.free.as_raw_fd()
    }

    pub fn receiver_fd(&self) -> RawFd {
        self.filled.as_raw_fd()
    }

    pub fn is_empty(&self) -> bool {
        self.element_count().load(Ordering::Acquire) == 0
    }
}
