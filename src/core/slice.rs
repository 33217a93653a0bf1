//! Slice: bounded byte buffer dengan panjang dan kapasitas eksplisit
//!
//! Satu storage, dua cara pakai:
//! - [`Slice`] memiliki storage-nya sendiri (owning)
//! - [`Child`] / [`ChildMut`] adalah view non-owning ke storage parent.
//!   Borrow checker menjamin view tidak hidup lebih lama dari parent dan
//!   parent tidak bisa di-release selama view masih dipakai.
//!
//! Invariant: `len <= capacity` selalu.

use tracing::{trace, warn};

use super::storage::{Storage, StorageKind};
use crate::error::{Error, Result};

/// Akses seragam ke buffer yang bisa dipakai oleh I/O adapters
///
/// `storage` selalu sepanjang `capacity`, bukan `len`.
pub trait SliceBuf {
    /// Bytes yang valid / terpakai
    fn len(&self) -> u32;

    /// Bytes yang bisa dialamatkan
    fn capacity(&self) -> u32;

    /// # Panics
    /// Panic jika `len > capacity`
    fn set_len(&mut self, len: u32);

    fn storage(&self) -> &[u8];

    fn storage_mut(&mut self) -> &mut [u8];

    #[inline(always)]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owning buffer
pub struct Slice {
    storage: Storage,
    kind: StorageKind,
    len: u32,
}

impl Default for Slice {
    fn default() -> Self {
        Self::empty(StorageKind::Heap)
    }
}

impl std::fmt::Debug for Slice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Slice")
            .field("kind", &self.kind)
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl Slice {
    /// Record kosong tanpa storage. Isi dengan [`Slice::allocate_into`].
    pub const fn empty(kind: StorageKind) -> Self {
        Self {
            storage: Storage::Empty,
            kind,
            len: 0,
        }
    }

    /// Alokasi heap storage ter-zero sebesar `capacity`, `len = 0`
    pub fn allocate(capacity: u32) -> Result<Self> {
        Self::allocate_with(StorageKind::Heap, capacity)
    }

    /// Seperti [`Slice::allocate`] dengan sumber memori pilihan
    pub fn allocate_with(kind: StorageKind, capacity: u32) -> Result<Self> {
        let storage = Storage::allocate(kind, capacity).inspect_err(|e| {
            warn!(capacity, ?kind, error = %e, "slice allocation failed");
        })?;

        Ok(Self {
            storage,
            kind,
            len: 0,
        })
    }

    /// Alokasi dengan panjang awal, untuk frame berukuran tetap
    ///
    /// Menolak `capacity == 0` atau `len > capacity`.
    pub fn with_len(len: u32, capacity: u32) -> Result<Self> {
        if capacity == 0 || len > capacity {
            return Err(Error::InvalidLength { len, capacity });
        }

        let mut slice = Self::allocate(capacity)?;
        slice.len = len;
        Ok(slice)
    }

    /// Copy `data` ke storage baru; `len == capacity == data.len()`
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let capacity = u32::try_from(data.len()).map_err(|_| Error::Alloc {
            capacity: u32::MAX,
        })?;

        let mut slice = Self::allocate(capacity)?;
        slice.storage.as_mut_slice().copy_from_slice(data);
        slice.len = capacity;
        Ok(slice)
    }

    /// Alokasi storage untuk record yang sudah ada (in place)
    ///
    /// Storage lama dilepas hanya jika alokasi baru berhasil. `len` tidak
    /// disentuh kecuali melebihi kapasitas baru, maka di-clamp. Ini bukan
    /// constructor lengkap: panggil [`Slice::reset`] jika perlu isi bersih.
    ///
    /// Returns kapasitas baru.
    pub fn allocate_into(&mut self, capacity: u32) -> Result<u32> {
        let storage = Storage::allocate(self.kind, capacity).inspect_err(|e| {
            warn!(capacity, kind = ?self.kind, error = %e, "in-place allocation failed");
        })?;

        self.storage = storage;
        self.len = self.len.min(capacity);
        Ok(capacity)
    }

    /// Lepas storage saja; record tetap bisa dipakai ulang
    ///
    /// `len` dan `capacity` menjadi 0. Aman dipanggil berulang kali.
    pub fn release_contents(&mut self) {
        self.storage = Storage::Empty;
        self.len = 0;
    }

    /// Zero-fill seluruh kapasitas dan set `len = 0`
    ///
    /// No-op jika belum ada storage.
    pub fn reset(&mut self) {
        if self.storage.is_empty() {
            return;
        }
        self.storage.as_mut_slice().fill(0);
        self.len = 0;
    }

    #[inline(always)]
    pub fn kind(&self) -> StorageKind {
        self.kind
    }

    /// Bytes valid `[0, len)`
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.storage.as_slice()[..self.len as usize]
    }

    #[inline(always)]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.len as usize;
        &mut self.storage.as_mut_slice()[..len]
    }

    /// Ruang kosong `[len, capacity)`
    #[inline(always)]
    pub fn spare_capacity_mut(&mut self) -> &mut [u8] {
        let len = self.len as usize;
        &mut self.storage.as_mut_slice()[len..]
    }

    /// View non-owning mulai `offset`, sepanjang `len`
    ///
    /// Kapasitas child adalah `capacity - offset` (sisa ruang sampai akhir
    /// storage parent), bukan `len`. Child membawa headroom parent.
    pub fn child(&self, offset: u32, len: u32) -> Result<Child<'_>> {
        check_range(offset, len, self.capacity())?;
        Ok(Child {
            bytes: &self.storage.as_slice()[offset as usize..],
            len,
        })
    }

    /// Versi mutable dari [`Slice::child`]; eksklusif terhadap parent
    pub fn child_mut(&mut self, offset: u32, len: u32) -> Result<ChildMut<'_>> {
        check_range(offset, len, self.capacity())?;
        Ok(ChildMut {
            bytes: &mut self.storage.as_mut_slice()[offset as usize..],
            len,
        })
    }
}

impl SliceBuf for Slice {
    #[inline(always)]
    fn len(&self) -> u32 {
        self.len
    }

    #[inline(always)]
    fn capacity(&self) -> u32 {
        self.storage.as_slice().len() as u32
    }

    #[inline(always)]
    fn set_len(&mut self, len: u32) {
        assert!(len <= self.capacity(), "len must not exceed capacity");
        self.len = len;
    }

    #[inline(always)]
    fn storage(&self) -> &[u8] {
        self.storage.as_slice()
    }

    #[inline(always)]
    fn storage_mut(&mut self) -> &mut [u8] {
        self.storage.as_mut_slice()
    }
}

/// Lepas owning slice dari slot-nya
///
/// Slot kosong adalah no-op, jadi release kedua kali aman.
pub fn release(slot: &mut Option<Slice>) {
    if let Some(slice) = slot.take() {
        trace!(capacity = slice.capacity(), "slice released");
        drop(slice);
    }
}

/// Read-only child view
#[derive(Debug, Clone, Copy)]
pub struct Child<'a> {
    bytes: &'a [u8],
    len: u32,
}

impl<'a> Child<'a> {
    #[inline(always)]
    pub fn len(&self) -> u32 {
        self.len
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sisa storage parent dari offset child
    #[inline(always)]
    pub fn capacity(&self) -> u32 {
        self.bytes.len() as u32
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &'a [u8] {
        &self.bytes[..self.len as usize]
    }

    /// Child dari child; offset relatif ke view ini
    pub fn child(&self, offset: u32, len: u32) -> Result<Child<'a>> {
        check_range(offset, len, self.capacity())?;
        Ok(Child {
            bytes: &self.bytes[offset as usize..],
            len,
        })
    }
}

/// Mutable child view, bisa dipakai langsung oleh I/O adapters
#[derive(Debug)]
pub struct ChildMut<'a> {
    bytes: &'a mut [u8],
    len: u32,
}

impl ChildMut<'_> {
    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[inline(always)]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.len as usize]
    }

    /// Reborrow sebagian view ini
    pub fn child_mut(&mut self, offset: u32, len: u32) -> Result<ChildMut<'_>> {
        check_range(offset, len, self.capacity())?;
        Ok(ChildMut {
            bytes: &mut self.bytes[offset as usize..],
            len,
        })
    }
}

impl SliceBuf for ChildMut<'_> {
    #[inline(always)]
    fn len(&self) -> u32 {
        self.len
    }

    #[inline(always)]
    fn capacity(&self) -> u32 {
        self.bytes.len() as u32
    }

    #[inline(always)]
    fn set_len(&mut self, len: u32) {
        assert!(len <= self.capacity(), "len must not exceed capacity");
        self.len = len;
    }

    #[inline(always)]
    fn storage(&self) -> &[u8] {
        &*self.bytes
    }

    #[inline(always)]
    fn storage_mut(&mut self) -> &mut [u8] {
        &mut *self.bytes
    }
}

#[inline(always)]
fn check_range(offset: u32, len: u32, capacity: u32) -> Result<()> {
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(Error::OutOfRange {
            offset,
            len,
            capacity,
        }),
    }
}
