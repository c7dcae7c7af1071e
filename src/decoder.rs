//! Read-side array codec.
//!
//! An [`OmDecoder`] is built per read request. It owns copies of the
//! variable's dimension and chunk arrays, so it never borrows the record
//! bytes it was parsed from, and validates the whole request up front —
//! after construction the only possible failures are I/O errors and
//! corrupted chunk data.

use crate::codec::Codec;
use crate::cube::{self, Dims};
use crate::error::{OmError, OmResult};

/// Destination cube for decoded lanes.
///
/// Carries a raw pointer so concurrent chunk decodes can write without a
/// lock. Safety rests on two invariants the planner upholds: every chunk owns
/// a disjoint set of cube coordinates, and the allocation stays live until
/// all decode workers finish.
#[derive(Clone, Copy)]
pub(crate) struct OutputCube {
    ptr: *mut u8,
    len: usize,
}

unsafe impl Send for OutputCube {}
unsafe impl Sync for OutputCube {}

impl OutputCube {
    pub(crate) fn new(ptr: *mut u8, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Disjoint mutable byte run at `offset`.
    ///
    /// # Safety
    /// No two live runs may overlap and the backing allocation must outlive
    /// the returned slice.
    unsafe fn run(&self, offset: usize, len: usize) -> &'static mut [u8] {
        debug_assert!(offset + len <= self.len);
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(offset), len) }
    }
}

/// Decoded LUT entries covering a span of groups.
pub(crate) struct LutWindow {
    first_entry: u64,
    offsets: Vec<u64>,
}

impl LutWindow {
    /// Absolute byte offset of LUT entry `index`.
    pub(crate) fn entry(&self, index: u64) -> OmResult<u64> {
        self.offsets
            .get((index - self.first_entry) as usize)
            .copied()
            .ok_or(OmError::OutOfBoundRead)
    }
}

#[derive(Debug)]
pub struct OmDecoder {
    pub(crate) dims: Dims,
    pub(crate) chunks: Dims,
    pub(crate) read_offset: Dims,
    pub(crate) read_count: Dims,
    pub(crate) cube_offset: Dims,
    pub(crate) cube_dims: Dims,
    pub(crate) scale_factor: f32,
    pub(crate) add_offset: f32,
    pub(crate) codec: Codec,
    pub(crate) lut_offset: u64,
    pub(crate) lut_size: u64,
    pub(crate) lut_chunk_element_count: u64,
    pub(crate) io_size_merge: u64,
    pub(crate) io_size_max: u64,
}

impl OmDecoder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        codec: Codec,
        scale_factor: f32,
        add_offset: f32,
        dims: &[u64],
        chunks: &[u64],
        lut_offset: u64,
        lut_size: u64,
        lut_chunk_element_count: u64,
        read_offset: &[u64],
        read_count: &[u64],
        cube_offset: &[u64],
        cube_dims: &[u64],
        io_size_merge: u64,
        io_size_max: u64,
    ) -> OmResult<Self> {
        let rank = dims.len();
        if rank == 0 {
            return Err(OmError::InvalidArgument(
                "arrays need at least one dimension".to_string(),
            ));
        }
        if chunks.len() != rank
            || read_offset.len() != rank
            || read_count.len() != rank
            || cube_offset.len() != rank
            || cube_dims.len() != rank
        {
            return Err(OmError::InvalidArgument(format!(
                "request rank does not match array rank {rank}"
            )));
        }
        for i in 0..rank {
            if chunks[i] == 0 {
                return Err(OmError::InvalidArgument(format!(
                    "chunk extent 0 on axis {i}"
                )));
            }
            if read_offset[i] + read_count[i] > dims[i] {
                return Err(OmError::InvalidArgument(format!(
                    "read of {}..{} exceeds dimension {} of size {}",
                    read_offset[i],
                    read_offset[i] + read_count[i],
                    i,
                    dims[i]
                )));
            }
            if cube_offset[i] + read_count[i] > cube_dims[i] {
                return Err(OmError::InvalidArgument(format!(
                    "output cube overflow on axis {i}"
                )));
            }
        }
        Ok(Self {
            dims: Dims::from_slice(dims),
            chunks: Dims::from_slice(chunks),
            read_offset: Dims::from_slice(read_offset),
            read_count: Dims::from_slice(read_count),
            cube_offset: Dims::from_slice(cube_offset),
            cube_dims: Dims::from_slice(cube_dims),
            scale_factor,
            add_offset,
            codec,
            lut_offset,
            lut_size,
            lut_chunk_element_count,
            io_size_merge,
            io_size_max,
        })
    }

    pub(crate) fn total_chunks(&self) -> u64 {
        cube::total_chunks(&self.dims, &self.chunks)
    }

    pub(crate) fn n_lut_groups(&self) -> u64 {
        (self.total_chunks() + 1).div_ceil(self.lut_chunk_element_count)
    }

    /// Fixed byte stride of one compressed LUT group.
    pub(crate) fn lut_stride(&self) -> OmResult<u64> {
        let n_groups = self.n_lut_groups();
        let stride = self.lut_size / n_groups;
        if stride == 0 || self.lut_size % n_groups != 0 {
            return Err(OmError::OutOfBoundRead);
        }
        Ok(stride)
    }

    /// Scratch size for one decompressed chunk in stored lanes.
    pub(crate) fn chunk_buffer_size(&self) -> usize {
        let elements: u64 = self.chunks.iter().product();
        elements as usize * self.codec.bytes_per_element_stored
    }

    /// Iterator over the chunks intersecting this request, in file order.
    pub(crate) fn chunk_indices(&self) -> cube::ChunkIndexIter {
        cube::ChunkIndexIter::new(&self.dims, &self.chunks, &self.read_offset, &self.read_count)
    }

    /// Decode the LUT groups fetched as `bytes`, starting at `first_group`.
    pub(crate) fn decode_lut_window(&self, first_group: u64, bytes: &[u8]) -> OmResult<LutWindow> {
        let stride = self.lut_stride()?;
        let total_entries = self.total_chunks() + 1;
        let groups = bytes.len() as u64 / stride;
        let mut offsets = Vec::new();

        for g in 0..groups {
            let group_index = first_group + g;
            if group_index >= self.n_lut_groups() {
                break;
            }
            let first_entry = group_index * self.lut_chunk_element_count;
            let n = (total_entries - first_entry).min(self.lut_chunk_element_count) as usize;
            let src = &bytes[(g * stride) as usize..((g + 1) * stride) as usize];

            if self.lut_chunk_element_count == 1 {
                // Legacy files store the LUT as raw little-endian offsets.
                let raw: [u8; 8] = src[..8].try_into().map_err(|_| OmError::OutOfBoundRead)?;
                offsets.push(u64::from_le_bytes(raw));
            } else {
                let start = offsets.len();
                offsets.resize(start + n, 0);
                crate::codec::pfor::decompress_lut_group(src, n, &mut offsets[start..])
                    .ok_or(OmError::OutOfBoundRead)?;
            }
        }

        Ok(LutWindow {
            first_entry: first_group * self.lut_chunk_element_count,
            offsets,
        })
    }

    /// Decompress one chunk and scatter its intersection with the request
    /// into the output cube.
    pub(crate) fn decode_chunk_into(
        &self,
        chunk_index: u64,
        compressed: &[u8],
        out: OutputCube,
        scratch: &mut [u8],
    ) -> OmResult<()> {
        let radix = cube::chunks_per_dim(&self.dims, &self.chunks);
        let coords = cube::chunk_coords(chunk_index, &radix);
        let extent = cube::chunk_extent(&coords, &self.dims, &self.chunks);
        let elements: u64 = extent.iter().product();
        let stored = self.codec.bytes_per_element_stored;
        let user = self.codec.bytes_per_element;

        let consumed = (self.codec.decompress)(
            compressed,
            elements as usize,
            &mut scratch[..elements as usize * stored],
        )
        .ok_or(OmError::OutOfBoundRead)?;
        if consumed != compressed.len() {
            return Err(OmError::DeflatedSizeMismatch {
                expected: compressed.len() as u64,
                actual: consumed as u64,
            });
        }

        let cols = extent[extent.len() - 1];
        let rows = elements / cols;
        (self.codec.decode_filter)(
            rows as usize,
            cols as usize,
            &mut scratch[..elements as usize * stored],
        );

        let rank = self.dims.len();
        let mut span: Dims = Dims::with_capacity(rank);
        let mut buf_origin: Dims = Dims::with_capacity(rank);
        let mut cube_origin: Dims = Dims::with_capacity(rank);
        for i in 0..rank {
            let chunk_lo = coords[i] * self.chunks[i];
            let isect_lo = self.read_offset[i].max(chunk_lo);
            let isect_hi = (self.read_offset[i] + self.read_count[i]).min(chunk_lo + extent[i]);
            if isect_hi <= isect_lo {
                return Ok(());
            }
            span.push(isect_hi - isect_lo);
            buf_origin.push(isect_lo - chunk_lo);
            cube_origin.push(self.cube_offset[i] + (isect_lo - self.read_offset[i]));
        }

        cube::for_each_run(
            &span,
            &extent,
            &buf_origin,
            &self.cube_dims,
            &cube_origin,
            |run, buf_off, cube_off| {
                // Safety: runs of distinct chunks cover disjoint cube
                // coordinates and the cube outlives this call.
                let dst = unsafe { out.run(cube_off * user, run * user) };
                (self.codec.decode_convert)(
                    run,
                    self.scale_factor,
                    self.add_offset,
                    &scratch[buf_off * stored..buf_off * stored + run * stored],
                    dst,
                );
            },
        );
        Ok(())
    }
}
