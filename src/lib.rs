//! uscall - Slice buffers dan run-loop hooks untuk userspace network stack
//!
//! Arsitektur:
//! - Bounded Buffer: [`Slice`] dengan len/capacity eksplisit, child views
//!   yang dipinjam dari parent
//! - Adapters: read/write accumulating dan fixed-frame di atas [`Backend`]
//! - Hook Bridge: begin → callback → end per iterasi, driver stack / native
//!
//! ```no_run
//! use uscall::network::{read_slice, OsBackend};
//! use uscall::Slice;
//!
//! # fn demo(fd: std::os::unix::io::RawFd) -> Result<(), Box<dyn std::error::Error>> {
//! let mut slice = Slice::allocate(1024)?;
//! let n = read_slice(&OsBackend, fd, &mut slice)?;
//! assert_eq!(slice.as_bytes().len(), n);
//! # Ok(())
//! # }
//! ```

#[cfg(not(unix))]
compile_error!("uscall hanya mendukung target unix");

pub mod config;
pub mod core;
pub mod error;
pub mod hook;
pub mod network;

pub use crate::config::{BackendKind, Config, Tool};
pub use crate::core::{release, Child, ChildMut, Slice, SliceBuf, StorageKind};
pub use crate::error::{Error, HookError, Result};
pub use crate::hook::{EventLoop, ForeignCall, Handle, HandleRegistry, Hook, LoopParams};
pub use crate::network::Backend;
