//! Network Layer: slice I/O di atas dua backend
//!
//! - [`OsBackend`]: kernel socket API
//! - `FStackBackend`: userspace stack (feature `fstack`)
//!
//! Adapters di [`adapters`] adalah pass-through tanpa retry. Helper
//! [`read`] / [`write`] di module ini menambahkan retry untuk EINTR saja.

pub mod adapters;
mod backend;
mod frame;
#[cfg(feature = "fstack")]
mod fstack;
mod sockopt;

use std::io;
use std::os::unix::io::RawFd;

pub use adapters::{read_cslice, read_slice, write_cslice, write_slice};
pub use backend::{Backend, OsBackend};
pub use frame::{Frame, Window};
#[cfg(feature = "fstack")]
pub use fstack::FStackBackend;
pub use sockopt::{set_nonblocking, set_reuse_port};

use crate::config::BackendKind;

/// Ulangi `f` selama gagal dengan `ErrorKind::Interrupted`
#[inline]
pub fn retry_interrupted<T, F>(mut f: F) -> io::Result<T>
where
    F: FnMut() -> io::Result<T>,
{
    loop {
        match f() {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

/// Read ke byte slice biasa, retry pada EINTR
pub fn read<K: Backend + ?Sized>(backend: &K, fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
    retry_interrupted(|| backend.read(fd, &mut *buf))
}

/// Write dari byte slice biasa, retry pada EINTR
pub fn write<K: Backend + ?Sized>(backend: &K, fd: RawFd, buf: &[u8]) -> io::Result<usize> {
    retry_interrupted(|| backend.write(fd, buf))
}

/// Pilih backend saat konstruksi
///
/// `BackendKind::Stack` butuh feature `fstack` dan [`FStackBackend::init`]
/// yang sudah dipanggil sebelumnya.
pub fn open_backend(kind: BackendKind) -> io::Result<Box<dyn Backend>> {
    match kind {
        BackendKind::Os => Ok(Box::new(OsBackend)),
        #[cfg(feature = "fstack")]
        BackendKind::Stack => Ok(Box::new(FStackBackend)),
        #[cfg(not(feature = "fstack"))]
        BackendKind::Stack => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "userspace stack backend requires the `fstack` feature",
        )),
    }
}
