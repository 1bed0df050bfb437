//! The unbuffered (`capacity == 0`) rendezvous protocol: three semaphores
//! guarding a single shared slot.
//!
//! "Receiver completes first": `send` does not return until the matching
//! `recv` has copied the slot out and signalled the acknowledgement
//! semaphore, so stack-allocated payloads are safe across an unbuffered
//! channel.

use std::os::unix::io::RawFd;
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::sem::Sem;
use crate::storage::SharedStorage;
use crate::Error;

pub struct Rendezvous {
    free: Sem,
    filled: Sem,
    ack: Sem,
    storage: SharedStorage,
    element_size: usize,
}

impl Rendezvous {
    pub fn create(element_size: usize) -> Result<Self, Error> {
        let storage = SharedStorage::new(element_size, 1)?;
        Ok(Self {
            free: Sem::new(1)?,
            filled: Sem::new(0)?,
            ack: Sem::new(0)?,
            storage,
            element_size,
        })
    }

    fn slot(&self) -> *mut u8 {
        self.storage.slots_ptr()
    }

    fn element_count(&self) -> &AtomicU64 {
        self.storage.element_count()
    }

    pub fn send(&self, data: &[u8]) {
        debug_assert_eq!(data.len(), self.element_size);
        self.free.acquire();
        unsafe { ptr::copy_nonoverlapping(data.as_ptr(), self.slot(), self.element_size) };
        self.filled.release(1);
        self.ack.acquire();
        self.element_count().fetch_add(1, Ordering::Release);
    }

    pub fn recv(&self, data: &mut [u8]) {
        debug_assert_eq!(data.len(), self.element_size);
        self.filled.acquire();
        unsafe { ptr::copy_nonoverlapping(self.slot(), data.as_mut_ptr(), self.element_size) };
        self.ack.release(1);
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn single_threaded_round_trip() {
        let r = Rendezvous::create(4).unwrap();
        let producer = Arc::new(r);
        let consumer = producer.clone();
        let t = thread::spawn(move || {
            consumer.send(&42u32.to_ne_bytes());
        });
        let mut buf = [0u8; 4];
        producer.recv(&mut buf);
        t.join().unwrap();
        assert_eq!(u32::from_ne_bytes(buf), 42);
    }

    #[test]
    fn is_empty_after_balanced_pairs() {
        let r = Rendezvous::create(4).unwrap();
        let r = Arc::new(r);
        let r2 = r.clone();
        let t = thread::spawn(move || r2.send(&1u32.to_ne_bytes()));
        let mut buf = [0u8; 4];
        r.recv(&mut buf);
        t.join().unwrap();
        assert!(r.is_empty());
    }
}
