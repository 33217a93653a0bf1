//! Error types
//!
//! - [`Error`]: kegagalan operasi buffer (alokasi, range, length)
//! - [`HookError`]: kegagalan hook dan loop driver
//!
//! I/O backend tetap memakai `std::io::Error` supaya errno asli dari backend
//! tidak pernah ditulis ulang.

use thiserror::Error;

use crate::hook::Handle;

/// Error level buffer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// Allocator tidak bisa menyediakan storage
    #[error("allocation of {capacity} bytes failed")]
    Alloc { capacity: u32 },

    /// Range child view melewati storage parent
    #[error("range {offset}+{len} exceeds capacity {capacity}")]
    OutOfRange { offset: u32, len: u32, capacity: u32 },

    /// Panjang awal ditolak (kapasitas 0 atau len > capacity)
    #[error("invalid length {len} for capacity {capacity}")]
    InvalidLength { len: u32, capacity: u32 },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Kegagalan begin hook, callback, atau end hook
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum HookError {
    /// Hook jalan dan mengembalikan status negatif
    #[error("hook returned status {0}")]
    Status(i32),

    /// Handle tidak terdaftar di registry
    #[error("no routine registered for handle {0}")]
    UnknownHandle(Handle),
}

impl HookError {
    /// Status gaya C untuk kegagalan ini, selalu negatif
    pub fn status(&self) -> i32 {
        match *self {
            HookError::Status(status) => status,
            HookError::UnknownHandle(_) => -libc::EBADF,
        }
    }
}
