//! Storage backends.
//!
//! Readers and writers never touch the file system directly; they go through
//! [`OmReadBackend`] / [`OmWriteBackend`]. Backend calls are the only places a
//! read or write session may suspend — all codec work between two backend
//! calls is synchronous and CPU bound.
//!
//! Provided implementations:
//! - [`StdFileBackend`]: positional reads/writes on a `std::fs::File`,
//!   executed inside `tokio::task::spawn_blocking` so syscalls do not block
//!   the async runtime.
//! - [`MmapBackend`]: read-only memory-mapped file whose `prefetch` issues a
//!   `WillNeed` advisory on the page-aligned range.
//! - [`MemoryBackend`]: a growable in-memory byte buffer usable for both
//!   reading and writing.

use std::os::unix::fs::FileExt;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::BoxFuture;

/// Random-access read capability.
///
/// Implementations must be thread-safe: concurrent readers may share one
/// backend through an `Arc`. Returned [`Bytes`] stay valid for as long as the
/// caller holds them, which is the only lifetime guarantee decoders rely on.
pub trait OmReadBackend: Send + Sync {
    /// Total length of the backing store in bytes.
    fn file_size(&self) -> BoxFuture<'_, std::io::Result<u64>>;

    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// A short read (EOF before `len` bytes) is an error.
    fn read_at(&self, offset: u64, len: usize) -> BoxFuture<'_, std::io::Result<Bytes>>;

    /// Advise the backend that `[offset, offset + len)` will be read soon.
    ///
    /// Advisory only; the default implementation does nothing.
    fn prefetch(&self, _offset: u64, _len: usize) {}

    /// Scoped read: hand the bytes to `f` for the duration of the call.
    ///
    /// Backends with addressable memory (mmap) override this to skip the
    /// copy; the default routes through [`Self::read_at`].
    fn with_read<'a>(
        &'a self,
        offset: u64,
        len: usize,
        f: Box<dyn FnOnce(&[u8]) + Send + 'a>,
    ) -> BoxFuture<'a, std::io::Result<()>> {
        let read = self.read_at(offset, len);
        Box::pin(async move {
            let bytes = read.await?;
            f(&bytes);
            Ok(())
        })
    }
}

/// Positional write capability.
pub trait OmWriteBackend: Send + Sync {
    /// Write all `bytes` at `offset`. A short write is an error.
    fn write_at(&self, bytes: Bytes, offset: u64) -> BoxFuture<'_, std::io::Result<()>>;

    /// Flush written data to durable storage.
    fn synchronize(&self) -> BoxFuture<'_, std::io::Result<()>>;
}

impl<B: OmReadBackend + ?Sized> OmReadBackend for Arc<B> {
    fn file_size(&self) -> BoxFuture<'_, std::io::Result<u64>> {
        (**self).file_size()
    }

    fn read_at(&self, offset: u64, len: usize) -> BoxFuture<'_, std::io::Result<Bytes>> {
        (**self).read_at(offset, len)
    }

    fn prefetch(&self, offset: u64, len: usize) {
        (**self).prefetch(offset, len)
    }

    fn with_read<'a>(
        &'a self,
        offset: u64,
        len: usize,
        f: Box<dyn FnOnce(&[u8]) + Send + 'a>,
    ) -> BoxFuture<'a, std::io::Result<()>> {
        (**self).with_read(offset, len, f)
    }
}

impl<B: OmWriteBackend + ?Sized> OmWriteBackend for Arc<B> {
    fn write_at(&self, bytes: Bytes, offset: u64) -> BoxFuture<'_, std::io::Result<()>> {
        (**self).write_at(bytes, offset)
    }

    fn synchronize(&self) -> BoxFuture<'_, std::io::Result<()>> {
        (**self).synchronize()
    }
}

/// Backend over a `std::fs::File` using positional I/O.
///
/// Positional reads keep the backend thread-safe without an offset cursor, so
/// one open file can serve many concurrent readers.
pub struct StdFileBackend {
    file: Arc<std::fs::File>,
}

impl StdFileBackend {
    pub fn new(file: std::fs::File) -> Self {
        Self {
            file: Arc::new(file),
        }
    }
}

impl OmReadBackend for StdFileBackend {
    fn file_size(&self) -> BoxFuture<'_, std::io::Result<u64>> {
        let file = self.file.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let metadata = file.metadata()?;
                Ok::<u64, std::io::Error>(metadata.len())
            })
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?
        })
    }

    fn read_at(&self, offset: u64, len: usize) -> BoxFuture<'_, std::io::Result<Bytes>> {
        let file = self.file.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let mut buf = vec![0u8; len];
                let mut read_total = 0usize;
                while read_total < buf.len() {
                    let n = file.read_at(&mut buf[read_total..], offset + read_total as u64)?;
                    if n == 0 {
                        return Err(std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "short read",
                        ));
                    }
                    read_total += n;
                }
                Ok::<Bytes, std::io::Error>(Bytes::from(buf))
            })
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?
        })
    }
}

impl OmWriteBackend for StdFileBackend {
    fn write_at(&self, bytes: Bytes, offset: u64) -> BoxFuture<'_, std::io::Result<()>> {
        let file = self.file.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || {
                let mut written_total = 0usize;
                while written_total < bytes.len() {
                    let n = file.write_at(&bytes[written_total..], offset + written_total as u64)?;
                    if n == 0 {
                        return Err(std::io::Error::new(
                            std::io::ErrorKind::WriteZero,
                            "short write",
                        ));
                    }
                    written_total += n;
                }
                Ok::<(), std::io::Error>(())
            })
            .await
            .map_err(|e| std::io::Error::other(e.to_string()))?
        })
    }

    fn synchronize(&self) -> BoxFuture<'_, std::io::Result<()>> {
        let file = self.file.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || file.sync_all())
                .await
                .map_err(|e| std::io::Error::other(e.to_string()))?
        })
    }
}

/// Read-only backend over a memory-mapped file.
pub struct MmapBackend {
    map: memmap2::Mmap,
}

impl MmapBackend {
    const PAGE_SIZE: usize = 4096;

    pub fn new(file: &std::fs::File) -> std::io::Result<Self> {
        // Safety: the map is read-only and the backing file is expected to be
        // immutable for the lifetime of the backend. OM files are sealed by
        // their trailer and never mutated in place.
        let map = unsafe { memmap2::Mmap::map(file)? };
        Ok(Self { map })
    }
}

impl OmReadBackend for MmapBackend {
    fn file_size(&self) -> BoxFuture<'_, std::io::Result<u64>> {
        let len = self.map.len() as u64;
        Box::pin(async move { Ok(len) })
    }

    fn read_at(&self, offset: u64, len: usize) -> BoxFuture<'_, std::io::Result<Bytes>> {
        Box::pin(async move {
            let offset = offset as usize;
            let end = offset.saturating_add(len);
            if end > self.map.len() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "short read",
                ));
            }
            Ok(Bytes::copy_from_slice(&self.map[offset..end]))
        })
    }

    fn prefetch(&self, offset: u64, len: usize) {
        let offset = offset as usize;
        let end = offset.saturating_add(len).min(self.map.len());
        // madvise requires a page-aligned start address.
        let aligned = offset - offset % Self::PAGE_SIZE;
        if end > aligned {
            let _ = self
                .map
                .advise_range(memmap2::Advice::WillNeed, aligned, end - aligned);
        }
    }

    fn with_read<'a>(
        &'a self,
        offset: u64,
        len: usize,
        f: Box<dyn FnOnce(&[u8]) + Send + 'a>,
    ) -> BoxFuture<'a, std::io::Result<()>> {
        Box::pin(async move {
            let offset = offset as usize;
            let end = offset.saturating_add(len);
            if end > self.map.len() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "short read",
                ));
            }
            f(&self.map[offset..end]);
            Ok(())
        })
    }
}

/// In-memory backend usable for both reading and writing.
#[derive(Default)]
pub struct MemoryBackend {
    data: parking_lot::RwLock<Vec<u8>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data: parking_lot::RwLock::new(data),
        }
    }

    /// Copy out the current contents.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.read().clone()
    }
}

impl OmReadBackend for MemoryBackend {
    fn file_size(&self) -> BoxFuture<'_, std::io::Result<u64>> {
        Box::pin(async move { Ok(self.data.read().len() as u64) })
    }

    fn read_at(&self, offset: u64, len: usize) -> BoxFuture<'_, std::io::Result<Bytes>> {
        Box::pin(async move {
            let offset = offset as usize;
            let data = self.data.read();
            let end = offset.saturating_add(len);
            if end > data.len() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "short read",
                ));
            }
            Ok(Bytes::copy_from_slice(&data[offset..end]))
        })
    }
}

impl OmWriteBackend for MemoryBackend {
    fn write_at(&self, bytes: Bytes, offset: u64) -> BoxFuture<'_, std::io::Result<()>> {
        Box::pin(async move {
            let offset = offset as usize;
            let end = offset.saturating_add(bytes.len());
            let mut data = self.data.write();
            if end > data.len() {
                data.resize(end, 0);
            }
            data[offset..end].copy_from_slice(&bytes);
            Ok(())
        })
    }

    fn synchronize(&self) -> BoxFuture<'_, std::io::Result<()>> {
        Box::pin(async move { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_roundtrip() {
        let backend = MemoryBackend::new();
        backend
            .write_at(Bytes::from_static(b"hello world"), 0)
            .await
            .unwrap();
        backend
            .write_at(Bytes::from_static(b"WORLD"), 6)
            .await
            .unwrap();

        assert_eq!(backend.file_size().await.unwrap(), 11);
        let got = backend.read_at(6, 5).await.unwrap();
        assert_eq!(&got[..], b"WORLD");
    }

    #[tokio::test]
    async fn memory_backend_rejects_short_read() {
        let backend = MemoryBackend::from_vec(vec![1, 2, 3]);
        let err = backend.read_at(2, 5).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn with_read_default_routes_through_read_at() {
        let backend = MemoryBackend::from_vec(b"0123456789".to_vec());
        let mut seen = Vec::new();
        backend
            .with_read(3, 4, Box::new(|bytes| seen.extend_from_slice(bytes)))
            .await
            .unwrap();
        assert_eq!(seen, b"3456");
    }

    #[tokio::test]
    async fn memory_backend_write_grows() {
        let backend = MemoryBackend::new();
        backend
            .write_at(Bytes::from_static(b"x"), 10)
            .await
            .unwrap();
        assert_eq!(backend.file_size().await.unwrap(), 11);
        // The gap is zero-filled.
        assert_eq!(&backend.read_at(0, 10).await.unwrap()[..], &[0u8; 10]);
    }
}
