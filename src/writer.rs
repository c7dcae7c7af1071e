//! Write facade.
//!
//! One [`OmFileWriter`] drives one write session. Variables are emitted in
//! post-order — children before parents, so every record can reference its
//! children by the `(offset, size)` pairs returned from earlier writes — and
//! the session is sealed by [`OmFileWriter::write_trailer`]. The v3 header is
//! written lazily on the first operation.
//!
//! Array payloads stream through [`OmFileWriterArray`]: `write_data` appends
//! whole chunks in canonical chunk-major order (repeated calls continue where
//! the previous one stopped), `finalize` emits the compressed LUT, and
//! [`OmFileWriter::write_array`] writes the record.

use std::marker::PhantomData;

use crate::buffer::WriteBuffer;
use crate::cube::Dims;
use crate::dtype::{Compression, DataType, OmArrayElement, OmScalar};
use crate::encoder::OmEncoder;
use crate::error::{OmError, OmResult};
use crate::header;
use crate::io::OmWriteBackend;
use crate::variable::{self, ArrayInfo, OmOffsetSize};

pub struct OmFileWriter<B: OmWriteBackend> {
    buffer: WriteBuffer<B>,
    header_written: bool,
}

impl<B: OmWriteBackend> OmFileWriter<B> {
    pub fn new(backend: B, initial_capacity: usize) -> Self {
        Self {
            buffer: WriteBuffer::new(backend, initial_capacity),
            header_written: false,
        }
    }

    async fn write_header_if_needed(&mut self) -> OmResult<()> {
        if !self.header_written {
            self.buffer.write_bytes(&header::write_header()).await?;
            self.header_written = true;
        }
        Ok(())
    }

    /// Write a scalar variable record and return its location.
    pub async fn write_scalar<T: OmScalar>(
        &mut self,
        value: &T,
        name: &str,
        children: &[OmOffsetSize],
    ) -> OmResult<OmOffsetSize> {
        self.write_header_if_needed().await?;
        self.buffer.align_to(8).await?;
        let record = variable::encode_scalar_record(T::DATA_TYPE, &value.to_payload(), name, children)?;
        let offset = self.buffer.total_bytes_written();
        self.buffer.write_bytes(&record).await?;
        Ok(OmOffsetSize {
            offset,
            size: record.len() as u64,
        })
    }

    /// Start streaming one array variable's chunks.
    ///
    /// The returned handle borrows the writer exclusively, so nothing else
    /// can interleave bytes with the chunk stream.
    pub async fn prepare_array<T: OmArrayElement>(
        &mut self,
        dimensions: &[u64],
        chunks: &[u64],
        compression: Compression,
        scale_factor: f32,
        add_offset: f32,
    ) -> OmResult<OmFileWriterArray<'_, T, B>> {
        self.write_header_if_needed().await?;
        let encoder = OmEncoder::new(
            T::ARRAY_DATA_TYPE,
            compression,
            scale_factor,
            add_offset,
            dimensions,
            chunks,
        )?;
        let total_chunks = encoder.number_of_chunks();
        let mut lut = Vec::with_capacity(total_chunks as usize + 1);
        // Entry 0 is where chunk 0 will land.
        lut.push(self.buffer.total_bytes_written());
        Ok(OmFileWriterArray {
            dimensions: Dims::from_slice(dimensions),
            chunks: Dims::from_slice(chunks),
            compression,
            scale_factor,
            add_offset,
            encoder,
            lut,
            chunk_index: 0,
            writer: self,
            _element: PhantomData,
        })
    }

    /// Write the record of a finalized array and return its location.
    pub async fn write_array(
        &mut self,
        array: FinalizedArray,
        name: &str,
        children: &[OmOffsetSize],
    ) -> OmResult<OmOffsetSize> {
        self.buffer.align_to(64).await?;
        let info = ArrayInfo {
            compression: array.compression,
            scale_factor: array.scale_factor,
            add_offset: array.add_offset,
            dimensions: array.dimensions,
            chunks: array.chunks,
            lut_size: array.lut_size,
            lut_offset: array.lut_offset,
            lut_chunk_element_count: crate::consts::LUT_CHUNK_ELEMENT_COUNT,
        };
        let record = variable::encode_array_record(array.data_type, &info, name, children)?;
        let offset = self.buffer.total_bytes_written();
        self.buffer.write_bytes(&record).await?;
        Ok(OmOffsetSize {
            offset,
            size: record.len() as u64,
        })
    }

    /// Seal the file: emit the trailer pointing at `root` and flush.
    pub async fn write_trailer(&mut self, root: OmOffsetSize) -> OmResult<()> {
        self.write_header_if_needed().await?;
        self.buffer.write_bytes(&header::write_trailer(root)).await?;
        self.buffer.synchronize().await
    }
}

/// An array variable whose LUT has been written; consumed by
/// [`OmFileWriter::write_array`].
#[derive(Debug)]
pub struct FinalizedArray {
    data_type: DataType,
    compression: Compression,
    scale_factor: f32,
    add_offset: f32,
    dimensions: Dims,
    chunks: Dims,
    lut_size: u64,
    lut_offset: u64,
}

/// Streaming chunk writer for one array variable.
pub struct OmFileWriterArray<'a, T: OmArrayElement, B: OmWriteBackend> {
    writer: &'a mut OmFileWriter<B>,
    encoder: OmEncoder,
    dimensions: Dims,
    chunks: Dims,
    compression: Compression,
    scale_factor: f32,
    add_offset: f32,
    lut: Vec<u64>,
    chunk_index: u64,
    _element: PhantomData<T>,
}

impl<T: OmArrayElement, B: OmWriteBackend> OmFileWriterArray<'_, T, B> {
    /// Compress and append every chunk covered by `array_count`.
    ///
    /// `data` is the caller's cube shaped `array_dims`; the written region
    /// starts at `array_offset`. Chunks must arrive in canonical chunk-major
    /// order across calls, and each call must cover whole chunks.
    pub async fn write_data(
        &mut self,
        data: &[T],
        array_dims: &[u64],
        array_offset: &[u64],
        array_count: &[u64],
    ) -> OmResult<()> {
        let rank = self.dimensions.len();
        if array_dims.len() != rank || array_offset.len() != rank || array_count.len() != rank {
            return Err(OmError::InvalidArgument(format!(
                "cube rank does not match array rank {rank}"
            )));
        }
        let cube_elements: u64 = array_dims.iter().product();
        if data.len() as u64 != cube_elements {
            return Err(OmError::InvalidArgument(format!(
                "cube holds {} elements, dimensions need {cube_elements}",
                data.len()
            )));
        }
        for i in 0..rank {
            if array_offset[i] + array_count[i] > array_dims[i] {
                return Err(OmError::InvalidArgument(format!(
                    "written region exceeds the supplied cube on axis {i}"
                )));
            }
        }
        let n_chunks = self.encoder.number_of_chunks_in_array(array_count);
        if self.chunk_index + n_chunks > self.encoder.number_of_chunks() {
            return Err(OmError::InvalidArgument(
                "more chunks written than the array holds".to_string(),
            ));
        }

        // Lanes are written as stored; the convert callbacks read
        // little-endian lanes straight out of this view.
        let bytes: &[u8] = unsafe {
            std::slice::from_raw_parts(data.as_ptr().cast(), std::mem::size_of_val(data))
        };
        let mut scratch = vec![0u8; self.encoder.chunk_buffer_size()];
        let bound = self.encoder.compressed_chunk_buffer_size();
        let start_index = self.chunk_index;

        for i in 0..n_chunks {
            self.writer.buffer.reallocate(bound).await?;
            let out = self.writer.buffer.buffer_at_write_position(bound);
            let written = self.encoder.compress_chunk(
                bytes,
                array_dims,
                array_offset,
                array_count,
                start_index + i,
                i,
                out,
                &mut scratch,
            )?;
            self.writer.buffer.increment_write_position(written);
            self.lut.push(self.writer.buffer.total_bytes_written());
        }
        self.chunk_index += n_chunks;
        Ok(())
    }

    /// Emit the compressed LUT. Fails unless every chunk has been written.
    pub async fn finalize(self) -> OmResult<FinalizedArray> {
        let total_chunks = self.encoder.number_of_chunks();
        if self.chunk_index != total_chunks {
            return Err(OmError::InvalidArgument(format!(
                "array finalized after {} of {total_chunks} chunks",
                self.chunk_index
            )));
        }
        let lut_offset = self.writer.buffer.total_bytes_written();
        let bound = self.encoder.lut_buffer_size(&self.lut);
        self.writer.buffer.reallocate(bound).await?;
        let out = self.writer.buffer.buffer_at_write_position(bound);
        let lut_size = self.encoder.compress_lut(&self.lut, out);
        self.writer.buffer.increment_write_position(lut_size);

        Ok(FinalizedArray {
            data_type: T::ARRAY_DATA_TYPE,
            compression: self.compression,
            scale_factor: self.scale_factor,
            add_offset: self.add_offset,
            dimensions: self.dimensions,
            chunks: self.chunks,
            lut_size: lut_size as u64,
            lut_offset,
        })
    }
}
