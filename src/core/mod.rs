//! Core module: slice buffers
//!
//! Prinsip desain:
//! - No-Allocation: storage dialokasikan sekali, lalu dipakai ulang (reset)
//! - Zero-Copy: child view menunjuk langsung ke storage parent
//! - Explicit length: `len` dan `capacity` selalu terlihat oleh caller

mod slice;
mod storage;

pub use slice::{release, Child, ChildMut, Slice, SliceBuf};
pub use storage::StorageKind;
