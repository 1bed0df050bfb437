//! A typed inter-thread (and, via shared memory, inter-process) channel
//! whose readiness is exposed as pollable kernel file descriptors.
//!
//! Two variants share one external interface ([`Channel`]):
//!  * an **unbuffered** rendezvous (`capacity == 0`), where the sender's
//!    return is ordered after the receiver's copy-out ("receiver completes
//!    first");
//!  * a **buffered** ring (`capacity >= 1`), where the sender returns as
//!    soon as its payload is copied into the ring.
//!
//! [`Channel::sender_fd`]/[`Channel::receiver_fd`] expose the underlying
//! counting semaphores' descriptors for registration with an external
//! `select`/`poll`/`epoll` loop. The [`typed`] module layers a generic,
//! zero-boilerplate `Sender<T>`/`Receiver<T>` pair on top of the raw
//! byte-copy core for callers who don't want to hand-roll byte slices.
//!
//! This crate does not implement thread/process creation, a multiplexer,
//! or a generic test harness (those are external collaborators a caller
//! supplies: a thread pool, `mio`/`tokio`, etc). It also does not support
//! selecting across multiple channels atomically; that's left to whatever
//! the caller polls the exposed descriptors with.

pub mod buffered;
pub mod channel;
pub mod sem;
pub mod spinlock;
pub mod storage;
pub mod typed;
pub mod unbuffered;

pub use channel::Channel;
pub use typed::{channel, Receiver, Sender};

/// Errors that can occur while constructing a [`Channel`].
///
/// Once a channel is constructed, `send`/`recv` are total: the only
/// remaining failure modes are kernel-invariant violations (a short read
/// or write on a semaphore descriptor), which are fatal programming errors
/// and panic rather than return a `Result`.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("memfd error")]
    Memfd(#[from] memfd::Error),
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    #[error("element_size must be greater than zero")]
    ZeroSizeElement,
}
