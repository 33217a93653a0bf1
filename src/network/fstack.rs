//! F-Stack (DPDK userspace TCP/IP) backend
//!
//! Binding FFI minimal ke `libfstack`: init, polling loop, read/write dan
//! ioctl. Socket table dan epoll milik F-Stack tidak disentuh di sini.

use std::ffi::CString;
use std::io;
use std::os::raw::{c_char, c_int, c_ulong, c_void};
use std::os::unix::io::RawFd;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, trace};

use super::Backend;
use crate::hook::EventLoop;

mod ffi {
    use super::*;

    pub type LoopFunc = extern "C" fn(arg: *mut c_void) -> c_int;

    extern "C" {
        pub fn ff_init(argc: c_int, argv: *const *mut c_char) -> c_int;
        pub fn ff_run(loop_fn: LoopFunc, arg: *mut c_void);
        pub fn ff_read(fd: c_int, buf: *mut c_void, nbytes: usize) -> isize;
        pub fn ff_write(fd: c_int, buf: *const c_void, nbytes: usize) -> isize;
        pub fn ff_ioctl(fd: c_int, request: c_ulong, ...) -> c_int;
    }
}

/// Descriptor milik F-Stack, bukan milik kernel
#[derive(Debug, Clone, Copy, Default)]
pub struct FStackBackend;

impl FStackBackend {
    /// Inisialisasi DPDK + F-Stack. `args` diteruskan sebagai argv
    /// (contoh: `["app", "--conf", "config.ini", "--proc-type=primary"]`).
    pub fn init<S: AsRef<str>>(args: &[S]) -> io::Result<Self> {
        let owned = args
            .iter()
            .map(|arg| CString::new(arg.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

        let argv: Vec<*mut c_char> = owned.iter().map(|s| s.as_ptr() as *mut c_char).collect();

        // SAFETY: argv menunjuk CString yang hidup sampai akhir fungsi
        let ret = unsafe { ffi::ff_init(argv.len() as c_int, argv.as_ptr()) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }

        debug!(argc = argv.len(), "f-stack initialized");
        Ok(Self)
    }
}

impl Backend for FStackBackend {
    fn name(&self) -> &'static str {
        "fstack"
    }

    #[inline(always)]
    fn read(&self, fd: RawFd, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: buf valid untuk buf.len() bytes selama call
        let n = unsafe { ffi::ff_read(fd, buf.as_mut_ptr() as *mut c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    #[inline(always)]
    fn write(&self, fd: RawFd, buf: &[u8]) -> io::Result<usize> {
        // SAFETY: buf valid untuk buf.len() bytes selama call
        let n = unsafe { ffi::ff_write(fd, buf.as_ptr() as *const c_void, buf.len()) };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(n as usize)
    }

    fn ioctl_nonblocking(&self, fd: RawFd, on: bool) -> io::Result<()> {
        let mut on = on as c_int;
        // SAFETY: FIONBIO membaca satu c_int dari pointer yang valid
        let ret = unsafe {
            ffi::ff_ioctl(fd, libc::FIONBIO as c_ulong, &mut on as *mut c_int)
        };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn reuse_addr(&self, fd: RawFd) -> io::Result<()> {
        // Port F-Stack tidak dibagi dengan proses lain
        trace!(fd, "reuse_addr is a no-op on f-stack");
        Ok(())
    }
}

impl EventLoop for FStackBackend {
    /// Serahkan `step` ke `ff_run`. Tidak kembali selama F-Stack berjalan.
    fn run(&mut self, step: &mut dyn FnMut() -> i32) {
        let mut step: &mut dyn FnMut() -> i32 = step;
        let arg = &mut step as *mut &mut dyn FnMut() -> i32 as *mut c_void;
        // SAFETY: arg menunjuk `step` di stack frame ini, yang hidup selama ff_run
        unsafe { ffi::ff_run(trampoline, arg) };
    }
}

extern "C" fn trampoline(arg: *mut c_void) -> c_int {
    // SAFETY: arg berasal dari EventLoop::run di atas
    let step = unsafe { &mut *(arg as *mut &mut dyn FnMut() -> i32) };

    // Panic tidak boleh unwind melewati frame C
    match panic::catch_unwind(AssertUnwindSafe(|| step())) {
        Ok(status) => status,
        Err(_) => {
            error!("loop step panicked inside ff_run");
            -1
        }
    }
}
