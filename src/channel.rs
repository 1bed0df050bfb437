//! The channel façade: a tagged union over the unbuffered rendezvous and
//! buffered ring protocols, exposing one external interface for both.

use std::os::unix::io::RawFd;

use crate::buffered::Ring;
use crate::unbuffered::Rendezvous;
use crate::Error;

enum Inner {
    Unbuffered(Rendezvous),
    Buffered(Ring),
}

/// A typed inter-thread (and, via shared memory, inter-process) channel
/// whose readiness is exposed as pollable kernel file descriptors.
///
/// `capacity == 0` selects the unbuffered rendezvous protocol;
/// `capacity >= 1` selects the buffered ring. Teardown happens on
/// `Drop` (there is no explicit `destroy`), and a `Channel` shared via
/// `Arc` tears down once when the last handle drops, which is this
/// crate's rendering of "destroy only when quiescent".
pub struct Channel {
    inner: Inner,
    element_size: usize,
    capacity: usize,
}

impl Channel {
    /// Creates a channel carrying `element_size`-byte payloads.
    /// `capacity == 0` is an unbuffered rendezvous; otherwise a buffered
    /// ring of `capacity` slots (physically `max(capacity, 1)`).
    pub fn create(element_size: usize, capacity: usize) -> Result<Self, Error> {
        if element_size == 0 {
            return Err(Error::ZeroSizeElement);
        }
        let inner = if capacity == 0 {
            Inner::Unbuffered(Rendezvous::create(element_size)?)
        } else {
            Inner::Buffered(Ring::create(element_size, capacity)?)
        };
        Ok(Self {
            inner,
            element_size,
            capacity,
        })
    }

    /// Copies `data` into the channel, blocking until the matching
    /// protocol step completes. Panics if `data.len() != element_size()`.
    pub fn send(&self, data: &[u8]) {
        assert_eq!(data.len(), self.element_size, "payload size mismatch");
        match &self.inner {
            Inner::Unbuffered(r) => r.send(data),
            Inner::Buffered(r) => r.send(data),
        }
    }

    /// Copies the next element out of the channel into `data`, blocking
    /// while the channel is empty. Panics if `data.len() !=
    /// element_size()`.
    pub fn recv(&self, data: &mut [u8]) {
        assert_eq!(data.len(), self.element_size, "payload size mismatch");
        match &self.inner {
            Inner::Unbuffered(r) => r.recv(data),
            Inner::Buffered(r) => r.recv(data),
        }
    }

    /// Descriptor that is read-readable iff a send by the winner of the
    /// next `acquire` race will not block. Poll for read-readiness only.
    pub fn sender_fd(&self) -> RawFd {
        match &self.inner {
            Inner::Unbuffered(r) => r.sender_fd(),
            Inner::Buffered(r) => r.sender_fd(),
        }
    }

    /// Descriptor that is read-readable iff a recv by the winner of the
    /// next `acquire` race will not block. Poll for read-readiness only.
    pub fn receiver_fd(&self) -> RawFd {
        match &self.inner {
            Inner::Unbuffered(r) => r.receiver_fd(),
            Inner::Buffered(r) => r.receiver_fd(),
        }
    }

    /// Advisory, lock-free emptiness check: a fast path for tight loops,
    /// not a substitute for blocking on `receiver_fd` via a multiplexer.
    pub fn is_empty(&self) -> bool {
        match &self.inner {
            Inner::Unbuffered(r) => r.is_empty(),
            Inner::Buffered(r) => r.is_empty(),
        }
    }

    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// The capacity as passed to `create`; 0 for an unbuffered channel
    /// (note this differs from the physical ring size, which is always
    /// at least 1).
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

const _: fn() = || {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Channel>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_element_size_rejected() {
        assert!(matches!(
            Channel::create(0, 4),
            Err(Error::ZeroSizeElement)
        ));
    }

    #[test]
    fn unbuffered_selected_at_capacity_zero() {
        let c = Channel::create(4, 0).unwrap();
        assert_eq!(c.capacity(), 0);
        assert!(matches!(c.inner, Inner::Unbuffered(_)));
    }

    #[test]
    fn buffered_selected_above_zero_capacity() {
        let c = Channel::create(4, 5).unwrap();
        assert_eq!(c.capacity(), 5);
        assert!(matches!(c.inner, Inner::Buffered(_)));
    }

    #[test]
    fn buffered_send_recv_roundtrip() {
        let c = Channel::create(4, 2).unwrap();
        c.send(&7u32.to_ne_bytes());
        let mut buf = [0u8; 4];
        c.recv(&mut buf);
        assert_eq!(u32::from_ne_bytes(buf), 7);
        assert!(c.is_empty());
    }

    #[test]
    #[should_panic(expected = "payload size mismatch")]
    fn send_rejects_wrong_size() {
        let c = Channel::create(4, 1).unwrap();
        c.send(&[0u8; 3]);
    }
}
