//! Socket option helpers
//!
//! Status dari backend dikembalikan apa adanya (errno dipertahankan).

use std::io;
use std::os::unix::io::RawFd;

use tracing::debug;

use super::Backend;

/// Toggle non-blocking mode lewat backend
pub fn set_nonblocking<K: Backend + ?Sized>(backend: &K, fd: RawFd, on: bool) -> io::Result<()> {
    backend.ioctl_nonblocking(fd, on)?;
    debug!(backend = backend.name(), fd, on, "non-blocking mode set");
    Ok(())
}

/// Aktifkan address reuse supaya siklus bind/close yang cepat tidak gagal
/// dengan EADDRINUSE
pub fn set_reuse_port<K: Backend + ?Sized>(backend: &K, fd: RawFd) -> io::Result<()> {
    backend.reuse_addr(fd)?;
    debug!(backend = backend.name(), fd, "address reuse enabled");
    Ok(())
}

/// `ioctl(fd, FIONBIO, &on)` pada descriptor kernel
pub(crate) fn sys_ioctl_nonblocking(fd: RawFd, on: bool) -> io::Result<()> {
    let mut on = on as libc::c_int;
    // SAFETY: FIONBIO membaca satu c_int dari pointer yang valid
    let ret = unsafe { libc::ioctl(fd, libc::FIONBIO, &mut on as *mut libc::c_int) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// `setsockopt(fd, SOL_SOCKET, SO_REUSEADDR, 1)` pada descriptor kernel
pub(crate) fn sys_set_reuse_addr(fd: RawFd) -> io::Result<()> {
    let yes: libc::c_int = 1;
    // SAFETY: optval menunjuk c_int yang hidup selama call
    let ret = unsafe {
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            &yes as *const _ as *const libc::c_void,
            std::mem::size_of::<libc::c_int>() as libc::socklen_t,
        )
    };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}
