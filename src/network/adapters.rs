//! Slice I/O adapters
//!
//! Dua framing:
//! - Accumulating (`read_slice` / `write_slice`): `len` adalah running total.
//!   Read menambah di belakang `len`; write mengurangi `len` dengan jumlah
//!   yang terkirim ("sisa yang belum di-flush").
//! - Fixed-frame (`read_cslice` / `write_cslice`): `len` adalah ukuran frame
//!   dan tidak pernah diubah oleh I/O.
//!
//! Setiap adapter memanggil primitive backend tepat sekali. Would-block,
//! partial transfer dan error lain diteruskan ke caller apa adanya.

use std::io;
use std::os::unix::io::RawFd;

use tracing::trace;

use super::Backend;
use crate::core::SliceBuf;

/// Baca ke `[len, capacity)` dan majukan `len` sebanyak yang terbaca
///
/// `Ok(0)` dan error tidak mengubah `len`.
#[inline]
pub fn read_slice<K, B>(backend: &K, fd: RawFd, output: &mut B) -> io::Result<usize>
where
    K: Backend + ?Sized,
    B: SliceBuf + ?Sized,
{
    let len = output.len();
    let n = backend.read(fd, &mut output.storage_mut()[len as usize..])?;
    if n > 0 {
        output.set_len(len + n as u32);
    }
    trace!(backend = backend.name(), fd, n, "read_slice");
    Ok(n)
}

/// Tulis `[0, len)` lalu kurangi `len` dengan jumlah yang terkirim
///
/// Setelah partial write, `len` adalah jumlah byte yang belum terkirim tetapi
/// data tidak digeser: byte yang belum terkirim ada di `[n, old_len)`.
/// Caller yang butuh sisa data di awal buffer harus menggesernya sendiri.
#[inline]
pub fn write_slice<K, B>(backend: &K, fd: RawFd, input: &mut B) -> io::Result<usize>
where
    K: Backend + ?Sized,
    B: SliceBuf + ?Sized,
{
    let len = input.len();
    let n = backend.write(fd, &input.storage()[..len as usize])?;
    if n > 0 {
        input.set_len(len.saturating_sub(n as u32));
    }
    trace!(backend = backend.name(), fd, n, "write_slice");
    Ok(n)
}

/// Baca maksimal `len` bytes ke `[0, len)`; `len` tidak diubah
#[inline]
pub fn read_cslice<K, B>(backend: &K, fd: RawFd, output: &mut B) -> io::Result<usize>
where
    K: Backend + ?Sized,
    B: SliceBuf + ?Sized,
{
    let len = output.len() as usize;
    backend.read(fd, &mut output.storage_mut()[..len])
}

/// Tulis `[0, len)`; `len` tidak diubah
#[inline]
pub fn write_cslice<K, B>(backend: &K, fd: RawFd, input: &B) -> io::Result<usize>
where
    K: Backend + ?Sized,
    B: SliceBuf + ?Sized,
{
    let len = input.len() as usize;
    backend.write(fd, &input.storage()[..len])
}
