//! Typed framing wrappers di atas [`SliceBuf`]
//!
//! [`Frame`] menjalankan kontrak accumulating (len = bytes terpakai),
//! [`Window`] menjalankan kontrak fixed-frame (len = ukuran window). Dengan
//! wrapper terpisah, buffer yang sama tidak bisa tidak sengaja dipakai
//! dengan dua kontrak sekaligus.

use std::io;
use std::os::unix::io::RawFd;

use super::adapters::{read_cslice, read_slice, write_cslice, write_slice};
use super::Backend;
use crate::core::SliceBuf;
use crate::error::{Error, Result};

/// Buffer accumulating: read menambah, write mengurangi
#[derive(Debug)]
pub struct Frame<B> {
    buf: B,
}

impl<B: SliceBuf> Frame<B> {
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    /// Satu read dari backend, di-append setelah data yang ada
    #[inline]
    pub fn fill<K: Backend + ?Sized>(&mut self, backend: &K, fd: RawFd) -> io::Result<usize> {
        read_slice(backend, fd, &mut self.buf)
    }

    /// Satu write ke backend; lihat [`write_slice`] untuk semantik `len`
    #[inline]
    pub fn flush<K: Backend + ?Sized>(&mut self, backend: &K, fd: RawFd) -> io::Result<usize> {
        write_slice(backend, fd, &mut self.buf)
    }

    /// Bytes terpakai `[0, len)`
    #[inline(always)]
    pub fn filled(&self) -> &[u8] {
        &self.buf.storage()[..self.buf.len() as usize]
    }

    #[inline(always)]
    pub fn len(&self) -> u32 {
        self.buf.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Ruang tersisa untuk read berikutnya
    #[inline(always)]
    pub fn remaining(&self) -> u32 {
        self.buf.capacity() - self.buf.len()
    }

    /// Copy `data` ke belakang bytes terpakai, sebanyak yang muat
    ///
    /// Returns jumlah byte yang di-copy.
    pub fn append(&mut self, data: &[u8]) -> usize {
        let len = self.buf.len() as usize;
        let n = data.len().min(self.remaining() as usize);
        self.buf.storage_mut()[len..len + n].copy_from_slice(&data[..n]);
        self.buf.set_len((len + n) as u32);
        n
    }

    /// Buang `n` bytes pertama dan geser sisanya ke awal buffer
    ///
    /// Dipakai setelah partial [`Frame::flush`] dengan `n` = jumlah terkirim
    /// dan `len_before` = len sebelum flush.
    pub fn compact_after_flush(&mut self, n: u32, len_before: u32) {
        let n = n.min(len_before) as usize;
        let end = len_before as usize;
        self.buf.storage_mut().copy_within(n..end, 0);
        self.buf.set_len((end - n) as u32);
    }

    /// Set `len = 0` tanpa zero-fill
    #[inline(always)]
    pub fn clear(&mut self) {
        self.buf.set_len(0);
    }

    pub fn get_ref(&self) -> &B {
        &self.buf
    }

    pub fn into_inner(self) -> B {
        self.buf
    }
}

/// Buffer fixed-frame: I/O selalu di `[0, size)`, size hanya berubah lewat
/// [`Window::resize`]
#[derive(Debug)]
pub struct Window<B> {
    buf: B,
}

impl<B: SliceBuf> Window<B> {
    /// Window seukuran `len` buffer saat ini
    pub fn new(buf: B) -> Self {
        Self { buf }
    }

    /// Window dengan ukuran eksplisit
    pub fn with_size(mut buf: B, size: u32) -> Result<Self> {
        check_size(size, buf.capacity())?;
        buf.set_len(size);
        Ok(Self { buf })
    }

    pub fn resize(&mut self, size: u32) -> Result<()> {
        check_size(size, self.buf.capacity())?;
        self.buf.set_len(size);
        Ok(())
    }

    #[inline(always)]
    pub fn size(&self) -> u32 {
        self.buf.len()
    }

    /// Read sampai `size` bytes ke awal window
    #[inline]
    pub fn recv<K: Backend + ?Sized>(&mut self, backend: &K, fd: RawFd) -> io::Result<usize> {
        read_cslice(backend, fd, &mut self.buf)
    }

    /// Write `size` bytes dari awal window
    #[inline]
    pub fn send<K: Backend + ?Sized>(&self, backend: &K, fd: RawFd) -> io::Result<usize> {
        write_cslice(backend, fd, &self.buf)
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf.storage()[..self.buf.len() as usize]
    }

    #[inline(always)]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let len = self.buf.len() as usize;
        &mut self.buf.storage_mut()[..len]
    }

    pub fn get_ref(&self) -> &B {
        &self.buf
    }

    pub fn into_inner(self) -> B {
        self.buf
    }
}

fn check_size(size: u32, capacity: u32) -> Result<()> {
    if size > capacity {
        return Err(Error::InvalidLength {
            len: size,
            capacity,
        });
    }
    Ok(())
}
