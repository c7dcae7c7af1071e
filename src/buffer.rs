//! Append-only write buffer.
//!
//! [`WriteBuffer`] sits between the codecs and an [`OmWriteBackend`]. Codecs
//! compress straight into the buffer tail via [`WriteBuffer::reallocate`] +
//! [`WriteBuffer::buffer_at_write_position`] + [`WriteBuffer::increment_write_position`],
//! so a chunk never needs an intermediate allocation regardless of whether a
//! flush happens in between. The buffer tracks the absolute file offset across
//! flushes, which is what LUT entries and record offsets are derived from.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::OmResult;
use crate::io::OmWriteBackend;

pub struct WriteBuffer<B: OmWriteBackend> {
    backend: B,
    buf: BytesMut,
    /// Bytes already flushed to the backend.
    flushed: u64,
    /// Length of an outstanding `buffer_at_write_position` reservation.
    reserved: usize,
}

impl<B: OmWriteBackend> WriteBuffer<B> {
    pub fn new(backend: B, initial_capacity: usize) -> Self {
        Self {
            backend,
            buf: BytesMut::with_capacity(initial_capacity.max(64)),
            flushed: 0,
            reserved: 0,
        }
    }

    /// Absolute file offset of the next written byte.
    pub fn total_bytes_written(&self) -> u64 {
        self.flushed + self.buf.len() as u64
    }

    /// Ensure at least `min_capacity` bytes can be written without another
    /// flush, flushing buffered bytes first if that frees enough room.
    pub async fn reallocate(&mut self, min_capacity: usize) -> OmResult<()> {
        debug_assert_eq!(self.reserved, 0);
        if self.buf.capacity() - self.buf.len() >= min_capacity {
            return Ok(());
        }
        self.flush().await?;
        if self.buf.capacity() < min_capacity {
            self.buf.reserve(min_capacity);
        }
        Ok(())
    }

    /// Zeroed tail region of `len` bytes for a codec to write into.
    ///
    /// Must be followed by [`Self::increment_write_position`] with the number
    /// of bytes actually produced; the rest of the region is discarded.
    pub fn buffer_at_write_position(&mut self, len: usize) -> &mut [u8] {
        debug_assert_eq!(self.reserved, 0);
        let start = self.buf.len();
        self.buf.resize(start + len, 0);
        self.reserved = len;
        &mut self.buf[start..]
    }

    pub fn increment_write_position(&mut self, written: usize) {
        debug_assert!(written <= self.reserved);
        let len = self.buf.len();
        self.buf.truncate(len - (self.reserved - written));
        self.reserved = 0;
    }

    /// Append `bytes`, flushing as needed.
    pub async fn write_bytes(&mut self, bytes: &[u8]) -> OmResult<()> {
        self.reallocate(bytes.len()).await?;
        self.buf.put_slice(bytes);
        Ok(())
    }

    /// Zero-pad so the absolute file offset becomes a multiple of `alignment`.
    pub async fn align_to(&mut self, alignment: u64) -> OmResult<()> {
        let pos = self.total_bytes_written();
        let padding = ((alignment - pos % alignment) % alignment) as usize;
        if padding > 0 {
            self.reallocate(padding).await?;
            self.buf.put_bytes(0, padding);
        }
        Ok(())
    }

    /// Flush all buffered bytes to the backend.
    pub async fn flush(&mut self) -> OmResult<()> {
        debug_assert_eq!(self.reserved, 0);
        if self.buf.is_empty() {
            return Ok(());
        }
        let bytes: Bytes = self.buf.split().freeze();
        let offset = self.flushed;
        self.flushed += bytes.len() as u64;
        self.backend.write_at(bytes, offset).await?;
        Ok(())
    }

    /// Flush and ask the backend to make the bytes durable.
    pub async fn synchronize(&mut self) -> OmResult<()> {
        self.flush().await?;
        self.backend.synchronize().await?;
        Ok(())
    }
}
