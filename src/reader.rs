//! Read facade.
//!
//! [`OmFileReader`] opens a backend, finds the root variable (trailer first,
//! legacy header as fallback) and navigates the variable tree; children are
//! fetched lazily with one backend read each. [`OmArrayReader`] is the typed
//! view over one array variable and drives the planner:
//!
//! ```text
//! request -> index cursor -> LUT bytes -> data cursor -> chunk bytes -> cube
//! ```
//!
//! Sequential, concurrent and prefetch-only variants share that pipeline; the
//! concurrent variant fans chunk decoding out to blocking workers while the
//! planner itself stays sequential to preserve file-order coalescing.

use std::marker::PhantomData;
use std::ops::Range;
use std::sync::Arc;

use crate::codec::Codec;
use crate::consts::{HEADER_SIZE, LEGACY_HEADER_SIZE, TRAILER_SIZE};
use crate::cube::Dims;
use crate::decoder::{LutWindow, OmDecoder, OutputCube};
use crate::dtype::{Compression, DataType, OmArrayElement, OmScalar};
use crate::error::{OmError, OmResult};
use crate::header::{self, FileHeader};
use crate::io::OmReadBackend;
use crate::planner::{DataRead, DataReadCursor, IndexReadCursor};
use crate::variable::OmVariable;

/// A variable in an open OM file.
pub struct OmFileReader<B: OmReadBackend> {
    backend: Arc<B>,
    variable: OmVariable,
}

impl<B: OmReadBackend> OmFileReader<B> {
    /// Open a file and position the reader at its root variable.
    pub async fn open(backend: B) -> OmResult<Self> {
        Self::open_shared(Arc::new(backend)).await
    }

    /// Open over an already shared backend.
    pub async fn open_shared(backend: Arc<B>) -> OmResult<Self> {
        let file_size = backend.file_size().await?;

        if file_size >= (HEADER_SIZE + TRAILER_SIZE) as u64 {
            let trailer_bytes = backend
                .read_at(file_size - TRAILER_SIZE as u64, TRAILER_SIZE)
                .await?;
            if let Some(root) = header::read_trailer(&trailer_bytes) {
                if root.offset + root.size > file_size {
                    return Err(OmError::OutOfBoundRead);
                }
                let record = backend.read_at(root.offset, root.size as usize).await?;
                let variable = OmVariable::from_record(&record)?;
                return Ok(Self { backend, variable });
            }
        }

        if file_size < LEGACY_HEADER_SIZE as u64 {
            return Err(OmError::NotAnOmFile);
        }
        let header_bytes = backend.read_at(0, LEGACY_HEADER_SIZE).await?;
        match header::read_header(&header_bytes)? {
            FileHeader::Legacy(variable) => Ok(Self { backend, variable }),
            // A v3 magic without a valid trailer means the file was never
            // sealed.
            FileHeader::V3 => Err(OmError::NotAnOmFile),
        }
    }

    pub fn data_type(&self) -> DataType {
        self.variable.data_type
    }

    pub fn name(&self) -> &str {
        &self.variable.name
    }

    pub fn children_count(&self) -> u32 {
        self.variable.children_count()
    }

    pub fn variable(&self) -> &OmVariable {
        &self.variable
    }

    /// Fetch and parse child `index`, or `None` past the end.
    pub async fn child(&self, index: u32) -> OmResult<Option<OmFileReader<B>>> {
        let Some(location) = self.variable.child(index) else {
            return Ok(None);
        };
        let record = self
            .backend
            .read_at(location.offset, location.size as usize)
            .await?;
        Ok(Some(Self {
            backend: self.backend.clone(),
            variable: OmVariable::from_record(&record)?,
        }))
    }

    /// Linear scan over the children for a name match.
    pub async fn child_by_name(&self, name: &str) -> OmResult<Option<OmFileReader<B>>> {
        for index in 0..self.children_count() {
            if let Some(child) = self.child(index).await? {
                if child.name() == name {
                    return Ok(Some(child));
                }
            }
        }
        Ok(None)
    }

    /// Read the scalar payload as `T`; `None` on any type mismatch.
    pub fn read_scalar<T: OmScalar>(&self) -> Option<T> {
        if self.variable.data_type != T::DATA_TYPE {
            return None;
        }
        T::from_payload(self.variable.scalar_payload()?)
    }

    /// Typed array view; `None` unless the variable is an array of `T` with a
    /// codec this crate supports.
    pub fn as_array<T: OmArrayElement>(
        &self,
        io_size_max: u64,
        io_size_merge: u64,
    ) -> Option<OmArrayReader<T, B>> {
        if self.variable.data_type != T::ARRAY_DATA_TYPE {
            return None;
        }
        let info = self.variable.array_info()?.clone();
        let codec = Codec::select(self.variable.data_type, info.compression).ok()?;
        Some(OmArrayReader {
            backend: self.backend.clone(),
            info,
            codec,
            io_size_max,
            io_size_merge,
            _element: PhantomData,
        })
    }
}

/// Typed random-access reader over one array variable.
pub struct OmArrayReader<T: OmArrayElement, B: OmReadBackend> {
    backend: Arc<B>,
    info: crate::variable::ArrayInfo,
    codec: Codec,
    io_size_max: u64,
    io_size_merge: u64,
    _element: PhantomData<T>,
}

impl<T: OmArrayElement, B: OmReadBackend> OmArrayReader<T, B> {
    pub fn dimensions(&self) -> &[u64] {
        &self.info.dimensions
    }

    pub fn chunk_dimensions(&self) -> &[u64] {
        &self.info.chunks
    }

    pub fn compression(&self) -> Compression {
        self.info.compression
    }

    pub fn scale_factor(&self) -> f32 {
        self.info.scale_factor
    }

    pub fn add_offset(&self) -> f32 {
        self.info.add_offset
    }

    fn decoder(
        &self,
        read_offset: &[u64],
        read_count: &[u64],
        cube_offset: &[u64],
        cube_dims: &[u64],
    ) -> OmResult<OmDecoder> {
        OmDecoder::new(
            self.codec,
            self.info.scale_factor,
            self.info.add_offset,
            &self.info.dimensions,
            &self.info.chunks,
            self.info.lut_offset,
            self.info.lut_size,
            self.info.lut_chunk_element_count,
            read_offset,
            read_count,
            cube_offset,
            cube_dims,
            self.io_size_merge,
            self.io_size_max,
        )
    }

    fn split_ranges(&self, ranges: &[Range<u64>]) -> (Dims, Dims) {
        let offset: Dims = ranges.iter().map(|r| r.start).collect();
        let count: Dims = ranges.iter().map(|r| r.end - r.start).collect();
        (offset, count)
    }

    /// Read a sub-cube into a freshly allocated row-major buffer.
    pub async fn read(&self, ranges: &[Range<u64>]) -> OmResult<Vec<T>> {
        let (offset, count) = self.split_ranges(ranges);
        let elements: u64 = count.iter().product();
        let mut out = vec![T::default(); elements as usize];
        let zero: Dims = Dims::from_elem(0, count.len());
        self.read_into(&mut out, &offset, &count, &zero, &count)
            .await?;
        Ok(out)
    }

    /// Read a sub-cube into `out` at `cube_offset` within `cube_dims`.
    ///
    /// Elements of `out` outside the placement are left untouched.
    pub async fn read_into(
        &self,
        out: &mut [T],
        read_offset: &[u64],
        read_count: &[u64],
        cube_offset: &[u64],
        cube_dims: &[u64],
    ) -> OmResult<()> {
        let expected: u64 = cube_dims.iter().product();
        if out.len() as u64 != expected {
            return Err(OmError::InvalidArgument(format!(
                "output buffer holds {} elements, cube needs {expected}",
                out.len()
            )));
        }
        let decoder = self.decoder(read_offset, read_count, cube_offset, cube_dims)?;
        let cube = OutputCube::new(out.as_mut_ptr().cast(), std::mem::size_of_val(out));
        let mut scratch = vec![0u8; decoder.chunk_buffer_size()];

        let mut index_cursor = IndexReadCursor::new(&decoder)?;
        while let Some(index_read) = index_cursor.next() {
            let lut_bytes = self
                .backend
                .read_at(index_read.offset, index_read.count as usize)
                .await?;
            let lut = decoder.decode_lut_window(index_read.first_group, &lut_bytes)?;

            let mut data_cursor = DataReadCursor::new(index_read.chunk_batch);
            while let Some(data_read) = data_cursor.next(&decoder, &lut)? {
                let data = self
                    .backend
                    .read_at(data_read.offset, data_read.count as usize)
                    .await?;
                decode_data_read(&decoder, &lut, &data_read, &data, cube, &mut scratch)?;
            }
        }
        Ok(())
    }

    /// Like [`Self::read`], but decodes each coalesced data range on a
    /// blocking worker; the pool is bounded by the number of hardware
    /// threads. Returns the same bytes as the sequential path.
    pub async fn read_concurrent(&self, ranges: &[Range<u64>]) -> OmResult<Vec<T>> {
        let (offset, count) = self.split_ranges(ranges);
        let elements: u64 = count.iter().product();
        let zero: Dims = Dims::from_elem(0, count.len());

        let decoder = Arc::new(self.decoder(&offset, &count, &zero, &count)?);
        // Workers keep the allocation alive through the Arc even if this
        // future is dropped mid-read; blocking tasks cannot be cancelled.
        let shared = Arc::new(SharedCube::new(vec![T::default(); elements as usize]));
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        let semaphore = Arc::new(tokio::sync::Semaphore::new(concurrency));
        let mut workers: Vec<tokio::task::JoinHandle<OmResult<()>>> = Vec::new();

        let planned = self
            .plan_concurrent(&decoder, &shared, &semaphore, &mut workers)
            .await;

        // The output cube is shared with every spawned worker; join all of
        // them before surfacing any error.
        let mut first_error = planned.err();
        for worker in workers {
            match worker.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => first_error = first_error.or(Some(e)),
                Err(e) => {
                    first_error =
                        first_error.or(Some(OmError::Io(std::io::Error::other(e.to_string()))))
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        let shared = Arc::try_unwrap(shared)
            .map_err(|_| OmError::Io(std::io::Error::other("decode worker leaked output cube")))?;
        Ok(shared.into_inner())
    }

    async fn plan_concurrent(
        &self,
        decoder: &Arc<OmDecoder>,
        shared: &Arc<SharedCube<T>>,
        semaphore: &Arc<tokio::sync::Semaphore>,
        workers: &mut Vec<tokio::task::JoinHandle<OmResult<()>>>,
    ) -> OmResult<()> {
        let mut index_cursor = IndexReadCursor::new(decoder)?;
        while let Some(index_read) = index_cursor.next() {
            let lut_bytes = self
                .backend
                .read_at(index_read.offset, index_read.count as usize)
                .await?;
            let lut = Arc::new(decoder.decode_lut_window(index_read.first_group, &lut_bytes)?);

            let mut data_cursor = DataReadCursor::new(index_read.chunk_batch);
            while let Some(data_read) = data_cursor.next(decoder, &lut)? {
                let data = self
                    .backend
                    .read_at(data_read.offset, data_read.count as usize)
                    .await?;
                let permit = semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .map_err(|e| OmError::Io(std::io::Error::other(e.to_string())))?;
                let decoder = decoder.clone();
                let lut = lut.clone();
                let shared = shared.clone();
                workers.push(tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    let mut scratch = vec![0u8; decoder.chunk_buffer_size()];
                    decode_data_read(&decoder, &lut, &data_read, &data, shared.cube(), &mut scratch)
                }));
            }
        }
        Ok(())
    }

    /// Plan the read and issue prefetch advisories for every data range
    /// instead of decoding. The LUT is still fetched: chunk addresses only
    /// exist after it is decoded.
    pub async fn will_need(&self, ranges: &[Range<u64>]) -> OmResult<()> {
        let (offset, count) = self.split_ranges(ranges);
        let zero: Dims = Dims::from_elem(0, count.len());
        let decoder = self.decoder(&offset, &count, &zero, &count)?;

        let mut index_cursor = IndexReadCursor::new(&decoder)?;
        while let Some(index_read) = index_cursor.next() {
            let lut_bytes = self
                .backend
                .read_at(index_read.offset, index_read.count as usize)
                .await?;
            let lut = decoder.decode_lut_window(index_read.first_group, &lut_bytes)?;

            let mut data_cursor = DataReadCursor::new(index_read.chunk_batch);
            while let Some(data_read) = data_cursor.next(&decoder, &lut)? {
                self.backend
                    .prefetch(data_read.offset, data_read.count as usize);
            }
        }
        Ok(())
    }
}

/// Concurrent decode target: an output cube whose allocation is co-owned by
/// every worker, so a cancelled read can never free memory under a running
/// decode. Workers write disjoint chunk regions through [`OutputCube`].
struct SharedCube<T> {
    data: Vec<T>,
    ptr: *mut u8,
    byte_len: usize,
}

// Safety: workers only touch the heap buffer through `cube()`, whose runs
// are disjoint per chunk by planner construction; the Vec itself is never
// resized or reallocated while workers exist.
unsafe impl<T: Send> Send for SharedCube<T> {}
unsafe impl<T: Send> Sync for SharedCube<T> {}

impl<T: OmArrayElement> SharedCube<T> {
    fn new(mut data: Vec<T>) -> Self {
        let ptr = data.as_mut_ptr().cast();
        let byte_len = std::mem::size_of_val(&data[..]);
        Self {
            data,
            ptr,
            byte_len,
        }
    }

    fn cube(&self) -> OutputCube {
        OutputCube::new(self.ptr, self.byte_len)
    }

    fn into_inner(self) -> Vec<T> {
        self.data
    }
}

/// Decode every chunk of one coalesced data range into the output cube.
fn decode_data_read(
    decoder: &OmDecoder,
    lut: &LutWindow,
    data_read: &DataRead,
    data: &[u8],
    cube: OutputCube,
    scratch: &mut [u8],
) -> OmResult<()> {
    for &chunk in &data_read.chunks {
        let start = lut.entry(chunk)? - data_read.offset;
        let end = lut.entry(chunk + 1)? - data_read.offset;
        let compressed = data
            .get(start as usize..end as usize)
            .ok_or(OmError::OutOfBoundRead)?;
        decoder.decode_chunk_into(chunk, compressed, cube, scratch)?;
    }
    Ok(())
}
