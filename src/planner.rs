//! Read planning.
//!
//! Two cursor state machines translate a sub-cube request into coalesced
//! backend reads: first over the compressed LUT (group granular), then over
//! the chunk data addressed by the decoded LUT entries. Both merge adjacent
//! ranges whose gap is below `io_size_merge` and split ranges growing past
//! `io_size_max` — LUT ranges on group boundaries, data ranges on chunk
//! boundaries. Emission order is file order, so a spinning disk or a
//! prefetching kernel sees strictly forward reads.

use std::iter::Peekable;

use crate::cube::ChunkIndexIter;
use crate::decoder::{LutWindow, OmDecoder};
use crate::error::{OmError, OmResult};

/// One coalesced read of the compressed LUT.
pub(crate) struct IndexRead {
    /// Absolute byte range to fetch.
    pub offset: u64,
    pub count: u64,
    /// First LUT group inside the range.
    pub first_group: u64,
    /// Chunks whose LUT entries the range covers, in increasing order.
    pub chunk_batch: Vec<u64>,
}

/// One coalesced read of compressed chunk data.
#[derive(Debug)]
pub(crate) struct DataRead {
    pub offset: u64,
    pub count: u64,
    /// Chunks fully contained in the range, in increasing order.
    pub chunks: Vec<u64>,
}

pub(crate) struct IndexReadCursor {
    chunks: Peekable<ChunkIndexIter>,
    lut_offset: u64,
    lut_elements_per_group: u64,
    stride: u64,
    io_size_merge: u64,
    io_size_max: u64,
}

impl IndexReadCursor {
    pub(crate) fn new(decoder: &OmDecoder) -> OmResult<Self> {
        Ok(Self {
            chunks: decoder.chunk_indices().peekable(),
            lut_offset: decoder.lut_offset,
            lut_elements_per_group: decoder.lut_chunk_element_count,
            stride: decoder.lut_stride()?,
            io_size_merge: decoder.io_size_merge,
            io_size_max: decoder.io_size_max,
        })
    }

    /// Next coalesced LUT range, or `None` when all chunks are planned.
    pub(crate) fn next(&mut self) -> Option<IndexRead> {
        let first = self.chunks.next()?;
        // Chunk `c` needs LUT entries `c` and `c + 1`.
        let group_start = first / self.lut_elements_per_group;
        let mut group_end = (first + 1) / self.lut_elements_per_group;
        let mut batch = vec![first];

        while let Some(&next) = self.chunks.peek() {
            let next_start = next / self.lut_elements_per_group;
            let next_end = (next + 1) / self.lut_elements_per_group;
            let gap = next_start.saturating_sub(group_end + 1) * self.stride;
            let merged = (next_end - group_start + 1) * self.stride;
            if gap > self.io_size_merge || merged > self.io_size_max {
                break;
            }
            group_end = next_end;
            batch.push(next);
            self.chunks.next();
        }

        Some(IndexRead {
            offset: self.lut_offset + group_start * self.stride,
            count: (group_end - group_start + 1) * self.stride,
            first_group: group_start,
            chunk_batch: batch,
        })
    }
}

pub(crate) struct DataReadCursor {
    batch: Vec<u64>,
    pos: usize,
}

impl DataReadCursor {
    pub(crate) fn new(batch: Vec<u64>) -> Self {
        Self { batch, pos: 0 }
    }

    /// Next coalesced data range within the current LUT window.
    ///
    /// A single chunk larger than `io_size_max` is emitted alone; it cannot
    /// be split below chunk granularity.
    pub(crate) fn next(
        &mut self,
        decoder: &OmDecoder,
        lut: &LutWindow,
    ) -> OmResult<Option<DataRead>> {
        let Some(&first) = self.batch.get(self.pos) else {
            return Ok(None);
        };
        let start = lut.entry(first)?;
        let mut end = lut.entry(first + 1)?;
        if end < start {
            return Err(OmError::OutOfBoundRead);
        }
        let mut chunks = vec![first];
        self.pos += 1;

        while let Some(&next) = self.batch.get(self.pos) {
            let chunk_start = lut.entry(next)?;
            let chunk_end = lut.entry(next + 1)?;
            if chunk_start < end || chunk_end < chunk_start {
                return Err(OmError::OutOfBoundRead);
            }
            if chunk_start - end > decoder.io_size_merge
                || chunk_end - start > decoder.io_size_max
            {
                break;
            }
            end = chunk_end;
            chunks.push(next);
            self.pos += 1;
        }

        Ok(Some(DataRead {
            offset: start,
            count: end - start,
            chunks,
        }))
    }
}
