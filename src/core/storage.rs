//! Backing storage untuk slice buffers
//!
//! Dua sumber memori:
//! - Heap: `Box<[u8]>`, dialokasikan dengan `try_reserve_exact` agar kegagalan
//!   alokasi bisa dilaporkan, bukan abort
//! - Mapped: anonymous mmap, page-aligned dan sudah di-zero oleh kernel.
//!   Cocok untuk buffer besar yang dipakai ulang di hot path

use memmap2::{MmapMut, MmapOptions};

use crate::error::{Error, Result};

#[cfg(test)]
thread_local! {
    static FAIL_NEXT: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Buat alokasi berikutnya di thread ini gagal dengan [`Error::Alloc`]
#[cfg(test)]
pub(crate) fn fail_next_allocation() {
    FAIL_NEXT.with(|fail| fail.set(true));
}

/// Sumber memori untuk storage baru
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageKind {
    #[default]
    Heap,
    Mapped,
}

/// Storage milik satu slice. Panjangnya adalah kapasitas slice.
pub(crate) enum Storage {
    Empty,
    Heap(Box<[u8]>),
    Mapped(MmapMut),
}

impl Storage {
    /// Alokasi storage ter-zero sebesar tepat `capacity` bytes
    pub(crate) fn allocate(kind: StorageKind, capacity: u32) -> Result<Self> {
        if capacity == 0 {
            return Ok(Storage::Empty);
        }

        #[cfg(test)]
        if FAIL_NEXT.with(|fail| fail.replace(false)) {
            return Err(Error::Alloc { capacity });
        }

        let size = capacity as usize;
        let storage = match kind {
            StorageKind::Heap => {
                let mut buf = Vec::new();
                buf.try_reserve_exact(size)
                    .map_err(|_| Error::Alloc { capacity })?;
                buf.resize(size, 0);
                Storage::Heap(buf.into_boxed_slice())
            }
            StorageKind::Mapped => {
                let mmap = MmapOptions::new()
                    .len(size)
                    .map_anon()
                    .map_err(|_| Error::Alloc { capacity })?;
                Storage::Mapped(mmap)
            }
        };

        Ok(storage)
    }

    #[inline(always)]
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self, Storage::Empty)
    }

    #[inline(always)]
    pub(crate) fn as_slice(&self) -> &[u8] {
        match self {
            Storage::Empty => &[],
            Storage::Heap(buf) => buf,
            Storage::Mapped(mmap) => mmap,
        }
    }

    #[inline(always)]
    pub(crate) fn as_mut_slice(&mut self) -> &mut [u8] {
        match self {
            Storage::Empty => &mut [],
            Storage::Heap(buf) => buf,
            Storage::Mapped(mmap) => mmap,
        }
    }
}
