//! Backend trait: sumber I/O untuk slice adapters
//!
//! Dua implementasi:
//! - [`OsBackend`]: socket API kernel (`read`, `write`, `ioctl`, `setsockopt`)
//! - `FStackBackend`: userspace stack (feature `fstack`)
//!
//! Semua method adalah pass-through langsung. Tidak ada retry, tidak ada
//! buffering; error membawa errno asli dari backend.

use std::io;
use std::os::unix::io::RawFd;

use super::sockopt;

/// Descriptor-level primitives yang dibutuhkan adapters dan socket helpers
pub trait Backend {
    /// Nama pendek untuk logging
    fn name(&self) -> &'static str;

    fn read(&self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize>;

    fn write(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize>;

    /// Set / clear non-blocking I/O (FIONBIO)
    fn ioctl_nonblocking(&self, fd: RawFd, on: bool) -> io::Result<()>;

    /// Izinkan re-bind alamat yang masih dalam TIME_WAIT
    fn reuse_addr(&self, fd: RawFd) -> io::Result<()>;
}

impl<K: Backend + ?Sized> Backend for &K {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    #[inline(always)]
    fn read(&self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(fd, buf)
    }

    #[inline(always)]
    fn write(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize> {
        (**self).write(fd, buf)
    }

    fn ioctl_nonblocking(&self, fd: RawFd, on: bool) -> io::Result<()> {
        (**self).ioctl_nonblocking(fd, on)
    }

    fn reuse_addr(&self, fd: RawFd) -> io::Result<()> {
        (**self).reuse_addr(fd)
    }
}

impl<K: Backend + ?Sized> Backend for Box<K> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    #[inline(always)]
    fn read(&self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(fd, buf)
    }

    #[inline(always)]
    fn write(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize> {
        (**self).write(fd, buf)
    }

    fn ioctl_nonblocking(&self, fd: RawFd, on: bool) -> io::Result<()> {
        (**self).ioctl_nonblocking(fd, on)
    }

    fn reuse_addr(&self, fd: RawFd) -> io::Result<()> {
        (**self).reuse_addr(fd)
    }
}

/// Kernel socket API
#[derive(Debug, Clone, Copy, Default)]
pub struct OsBackend;

impl Backend for OsBackend {
    fn name(&self) -> &'static str {
        "os"
    }

    #[inline(always)]
    fn read(&self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: buf valid untuk buf.len() bytes selama call
        let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    #[inline(always)]
    fn write(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: buf valid untuk buf.len() bytes selama call
        let n = unsafe { libc::write(fd, buf.as_ptr() as *const libc::c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn ioctl_nonblocking(&self, fd: RawFd, on: bool) -> io::Result<()> {
        sockopt::sys_ioctl_nonblocking(fd, on)
    }

    fn reuse_addr(&self, fd: RawFd) -> io::Result<()> {
        sockopt::sys_set_reuse_addr(fd)
    }
}
