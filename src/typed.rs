//! Generic, zero-boilerplate `Sender<T>`/`Receiver<T>` adapters over the
//! raw byte-copy [`Channel`] core: callers get a typed API without
//! hand-rolling `unsafe` transmutes over byte slices themselves.

use std::marker::PhantomData;
use std::mem::size_of;
use std::os::unix::io::RawFd;
use std::sync::Arc;

use zerocopy::{AsBytes, FromBytes};

use crate::{Channel, Error};

/// Creates a typed channel pair backed by one [`Channel`]. `capacity ==
/// 0` is unbuffered; the element size is `size_of::<T>()`.
pub fn channel<T>(capacity: usize) -> Result<(Sender<T>, Receiver<T>), Error>
where
    T: AsBytes + FromBytes,
{
    let ch = Arc::new(Channel::create(size_of::<T>(), capacity)?);
    Ok((Sender(ch.clone(), PhantomData), Receiver(ch, PhantomData)))
}

/// The sending half of a typed channel. `Clone`s share the same
/// underlying [`Channel`], which is how N-sender scenarios are supported
/// without exposing `Channel` cloning directly.
pub struct Sender<T>(Arc<Channel>, PhantomData<T>);

/// The receiving half of a typed channel. `Clone`s share the same
/// underlying [`Channel`].
pub struct Receiver<T>(Arc<Channel>, PhantomData<T>);

impl<T: AsBytes> Sender<T> {
    pub fn send(&self, v: &T) {
        self.0.send(v.as_bytes());
    }

    pub fn as_raw_fd(&self) -> RawFd {
        self.0.sender_fd()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Sender(self.0.clone(), PhantomData)
    }
}

impl<T: FromBytes + AsBytes + Default> Receiver<T> {
    pub fn recv(&self) -> T {
        let mut v = T::default();
        self.0.recv(v.as_bytes_mut());
        v
    }
}

impl<T> Receiver<T> {
    pub fn as_raw_fd(&self) -> RawFd {
        self.0.receiver_fd()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Clone for Receiver<T> {
    fn clone(&self) -> Self {
        Receiver(self.0.clone(), PhantomData)
    }
}
