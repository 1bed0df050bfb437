//! A kernel counting semaphore exposed as a pollable file descriptor.
//!
//! Backed by a Linux `eventfd(2)` opened in `EFD_SEMAPHORE` mode: each read
//! of 8 bytes decrements the count by one, blocking while it is zero; each
//! write of an 8-byte count increments it by that amount and wakes any
//! waiters. Read-readiness on the descriptor means "count > 0", exactly
//! the readiness rule a channel needs to expose to an external
//! multiplexer. This is the only blocking primitive used anywhere in this
//! crate.

use std::fs::File;
use std::io::{Read, Write};
use std::os::unix::io::{AsRawFd, FromRawFd, RawFd};

use crate::Error;

pub struct Sem(File);

impl Sem {
    /// Creates a semaphore with the given initial count.
    pub fn new(initial: u64) -> Result<Self, Error> {
        let initial: libc::c_uint = initial
            .try_into()
            .expect("semaphore initial count out of range");
        let fd = unsafe { libc::eventfd(initial, libc::EFD_CLOEXEC | libc::EFD_SEMAPHORE) };
        if fd == -1 {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(Self(unsafe { File::from_raw_fd(fd) }))
    }

    /// Blocks until the count is greater than zero, then atomically
    /// decrements it by one.
    pub fn acquire(&self) {
        let mut buf = [0u8; 8];
        loop {
            match (&self.0).read(&mut buf) {
                Ok(8) => return,
                Ok(n) => panic!(
                    "short read ({} bytes) on semaphore fd; channel invariants are violated",
                    n
                ),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => panic!("semaphore acquire failed: {}", e),
            }
        }
    }

    /// Atomically increments the count by `n`, waking any waiters.
    pub fn release(&self, n: u64) {
        let buf = n.to_ne_bytes();
        loop {
            match (&self.0).write(&buf) {
                Ok(8) => return,
                Ok(w) => panic!(
                    "short write ({} bytes) on semaphore fd; channel invariants are violated",
                    w
                ),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => panic!("semaphore release failed: {}", e),
            }
        }
    }

    /// The raw descriptor. Poll it for **read**-readiness only; never
    /// register it for write-readiness, and never read or write it
    /// directly (doing so corrupts the owning channel).
    pub fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn poll_readable(fd: RawFd) -> bool {
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let rc = unsafe { libc::poll(&mut pfd, 1, 0) };
        assert!(rc >= 0);
        rc == 1 && (pfd.revents & libc::POLLIN) != 0
    }

    #[test]
    fn acquire_release_roundtrip() {
        let s = Sem::new(1).unwrap();
        s.acquire();
        s.release(1);
        s.acquire();
    }

    #[test]
    fn release_n_allows_n_acquires() {
        let s = Sem::new(0).unwrap();
        s.release(3);
        s.acquire();
        s.acquire();
        s.acquire();
    }

    #[test]
    fn acquire_blocks_until_release() {
        let s = Arc::new(Sem::new(0).unwrap());
        let s2 = s.clone();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            s2.release(1);
        });
        s.acquire();
        t.join().unwrap();
    }

    #[test]
    fn fd_is_readable_iff_count_positive() {
        let s = Sem::new(0).unwrap();
        assert!(!poll_readable(s.as_raw_fd()));
        s.release(1);
        assert!(poll_readable(s.as_raw_fd()));
        s.acquire();
        assert!(!poll_readable(s.as_raw_fd()));
    }
}
