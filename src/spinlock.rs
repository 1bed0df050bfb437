//! A small adaptive-backoff spin lock.
//!
//! Guards the buffered ring's `in`/`out` indices and the element copy when
//! physical capacity is greater than one (see [`crate::buffered::Ring`]).
//! Held only across an index bump and one `memcpy` of `element_size`
//! bytes; never across a blocking semaphore call.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Busy-spin, then yield, then sleep (avoids burning a core under heavy
/// contention while staying cheap in the common, lightly-contended case).
#[inline]
fn backoff(k: &mut u32) {
    if *k < 4 {
        // busy spin
    } else if *k < 16 {
        std::hint::spin_loop();
    } else if *k < 32 {
        std::thread::yield_now();
    } else {
        std::thread::sleep(Duration::from_micros(50));
        return;
    }
    *k += 1;
}

pub struct SpinLock {
    locked: AtomicU32,
}

impl SpinLock {
    pub const fn new() -> Self {
        Self {
            locked: AtomicU32::new(0),
        }
    }

    pub fn lock(&self) {
        let mut k = 0u32;
        while self.locked.swap(1, Ordering::Acquire) != 0 {
            backoff(&mut k);
        }
    }

    pub fn unlock(&self) {
        self.locked.store(0, Ordering::Release);
    }
}

impl Default for SpinLock {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for SpinLock {}
unsafe impl Sync for SpinLock {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn mutual_exclusion_under_contention() {
        let lock = Arc::new(SpinLock::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let mut threads = Vec::new();
        for _ in 0..8 {
            let lock = lock.clone();
            let counter = counter.clone();
            threads.push(thread::spawn(move || {
                for _ in 0..1000 {
                    lock.lock();
                    let v = counter.load(Ordering::Relaxed);
                    counter.store(v + 1, Ordering::Relaxed);
                    lock.unlock();
                }
            }));
        }
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(counter.load(Ordering::Relaxed), 8000);
    }

    #[test]
    fn starts_unlocked() {
        let lock = SpinLock::new();
        lock.lock();
        lock.unlock();
    }
}
