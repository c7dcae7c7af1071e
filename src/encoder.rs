//! Write-side array codec.
//!
//! [`OmEncoder`] compresses aligned chunks of an n-dimensional array and
//! builds the per-chunk LUT. It is deliberately free of I/O: callers hand it
//! an output region sized by [`OmEncoder::compressed_chunk_buffer_size`] and
//! append the returned byte counts to the LUT themselves, which is what lets
//! the buffered writer compress straight into its flush buffer.

use crate::codec::Codec;
use crate::consts::LUT_CHUNK_ELEMENT_COUNT;
use crate::cube::{self, Dims};
use crate::dtype::{Compression, DataType};
use crate::error::{OmError, OmResult};

#[derive(Debug)]
pub struct OmEncoder {
    dims: Dims,
    chunks: Dims,
    scale_factor: f32,
    add_offset: f32,
    codec: Codec,
}

impl OmEncoder {
    pub fn new(
        data_type: DataType,
        compression: Compression,
        scale_factor: f32,
        add_offset: f32,
        dims: &[u64],
        chunks: &[u64],
    ) -> OmResult<Self> {
        if dims.is_empty() {
            return Err(OmError::InvalidArgument(
                "arrays need at least one dimension".to_string(),
            ));
        }
        if dims.len() != chunks.len() {
            return Err(OmError::InvalidArgument(format!(
                "dimension count {} does not match chunk count {}",
                dims.len(),
                chunks.len()
            )));
        }
        for (i, (&d, &c)) in dims.iter().zip(chunks.iter()).enumerate() {
            if c == 0 || (d > 0 && c > d) {
                return Err(OmError::InvalidArgument(format!(
                    "chunk extent {c} invalid for dimension {i} of size {d}"
                )));
            }
        }
        let codec = Codec::select(data_type, compression)?;
        Ok(Self {
            dims: Dims::from_slice(dims),
            chunks: Dims::from_slice(chunks),
            scale_factor,
            add_offset,
            codec,
        })
    }

    /// Total number of chunks of the whole array.
    pub fn number_of_chunks(&self) -> u64 {
        cube::total_chunks(&self.dims, &self.chunks)
    }

    /// Number of chunks a write of `count` elements per axis will produce.
    pub fn number_of_chunks_in_array(&self, count: &[u64]) -> u64 {
        count
            .iter()
            .zip(self.chunks.iter())
            .map(|(&n, &c)| n.div_ceil(c))
            .product()
    }

    /// Scratch size for one chunk in stored lanes.
    pub fn chunk_buffer_size(&self) -> usize {
        let elements: u64 = self.chunks.iter().product();
        elements as usize * self.codec.bytes_per_element_stored
    }

    /// Upper bound of one compressed chunk.
    ///
    /// One width byte per 256-lane block plus the packer's tail slack of 32
    /// lanes. Readers size their scratch with the same formula, so it must
    /// not shrink.
    pub fn compressed_chunk_buffer_size(&self) -> usize {
        let elements: u64 = self.chunks.iter().product();
        let elements = elements as usize;
        (elements + 255) / 256 + (elements + 32) * self.codec.bytes_per_element_stored
    }

    /// Upper bound for the compressed LUT: every group is trial-compressed
    /// and the widest group sets the common per-group stride.
    pub fn lut_buffer_size(&self, lut: &[u64]) -> usize {
        let n_groups = (lut.len() as u64).div_ceil(LUT_CHUNK_ELEMENT_COUNT) as usize;
        let mut scratch = [0u8; 1 + LUT_CHUNK_ELEMENT_COUNT as usize * 8];
        let mut max_length = 0usize;
        for group in lut.chunks(LUT_CHUNK_ELEMENT_COUNT as usize) {
            let len = crate::codec::pfor::compress_lut_group(group, &mut scratch);
            max_length = max_length.max(len);
        }
        max_length * n_groups + 32 * 8
    }

    /// Compress the LUT into `out` (sized by [`Self::lut_buffer_size`]).
    ///
    /// Groups share a fixed stride so arbitrary groups stay seekable; unused
    /// slot bytes are zero-filled. Returns the number of bytes the file's
    /// `lut_size` field records.
    pub fn compress_lut(&self, lut: &[u64], out: &mut [u8]) -> usize {
        let n_groups = (lut.len() as u64).div_ceil(LUT_CHUNK_ELEMENT_COUNT) as usize;
        let lut_size = out.len() - 32 * 8;
        let stride = lut_size / n_groups;

        for (g, group) in lut.chunks(LUT_CHUNK_ELEMENT_COUNT as usize).enumerate() {
            let slot = &mut out[g * stride..(g + 1) * stride];
            let len = crate::codec::pfor::compress_lut_group(group, slot);
            slot[len..].fill(0);
        }
        stride * n_groups
    }

    /// Compress global chunk `chunk_index` from a caller cube into `out`.
    ///
    /// `array` holds little-endian user lanes shaped `array_dims`; the
    /// written region starts at `array_offset` and spans `array_count`.
    /// `chunk_offset_in_array` is the chunk-major position of this chunk
    /// within the written region. Returns compressed bytes written into `out`.
    #[allow(clippy::too_many_arguments)]
    pub fn compress_chunk(
        &self,
        array: &[u8],
        array_dims: &[u64],
        array_offset: &[u64],
        array_count: &[u64],
        chunk_index: u64,
        chunk_offset_in_array: u64,
        out: &mut [u8],
        chunk_buffer: &mut [u8],
    ) -> OmResult<usize> {
        let radix = cube::chunks_per_dim(&self.dims, &self.chunks);
        let coords = cube::chunk_coords(chunk_index, &radix);
        let offset_coords = cube::chunk_coords(chunk_offset_in_array, &radix);
        let extent = cube::chunk_extent(&coords, &self.dims, &self.chunks);

        let mut cube_origin: Dims = Dims::with_capacity(self.dims.len());
        for i in 0..self.dims.len() {
            if extent[i] > array_count[i] || extent[i] > array_dims[i] {
                return Err(OmError::InvalidArgument(format!(
                    "chunk extent {} exceeds written array on axis {i}",
                    extent[i]
                )));
            }
            cube_origin.push(offset_coords[i] * self.chunks[i] + array_offset[i]);
            if cube_origin[i] + extent[i] > array_dims[i] {
                return Err(OmError::InvalidArgument(format!(
                    "chunk read past the supplied array on axis {i}"
                )));
            }
        }

        let elements: u64 = extent.iter().product();
        let stored = self.codec.bytes_per_element_stored;
        let user = self.codec.bytes_per_element;
        let buf_origin: Dims = Dims::from_elem(0, self.dims.len());

        cube::for_each_run(
            &extent,
            &extent,
            &buf_origin,
            array_dims,
            &cube_origin,
            |run, buf_off, cube_off| {
                (self.codec.encode_convert)(
                    run,
                    self.scale_factor,
                    self.add_offset,
                    &array[cube_off * user..cube_off * user + run * user],
                    &mut chunk_buffer[buf_off * stored..buf_off * stored + run * stored],
                );
            },
        );

        let cols = extent[extent.len() - 1];
        let rows = elements / cols;
        (self.codec.encode_filter)(
            rows as usize,
            cols as usize,
            &mut chunk_buffer[..elements as usize * stored],
        );
        Ok((self.codec.compress)(
            &chunk_buffer[..elements as usize * stored],
            elements as usize,
            out,
        ))
    }
}
