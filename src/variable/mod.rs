//! Variable records.
//!
//! A variable is one node of the file's tree: a scalar with an inline
//! payload, or an array whose compressed chunks and LUT live elsewhere in the
//! file. Records are immutable once written and reference their children by
//! absolute `(offset, size)` pairs, so children are always written first.
//!
//! On-disk layout (all integers little-endian):
//!
//! ```text
//! scalar record                      array record
//! +0  data_type: u8                  +0  data_type: u8
//! +1  reserved: u8                   +1  compression: u8
//! +2  children_count: u32            +2  reserved: u16
//! +6  name_length: u16               +4  scale_factor: f32
//! +8  name bytes                     +8  add_offset: f32
//!     child_offsets: u64 * k         +12 reserved: u32
//!     child_sizes: u64 * k           +16 rank: u64
//!     payload bytes                  +24 dimensions: u64 * rank
//!                                        chunks: u64 * rank
//!                                        lut_size: u64
//!                                        lut_offset: u64
//!                                        children_count: u32
//!                                        name_length: u16
//!                                        reserved: u16
//!                                        child_offsets: u64 * k
//!                                        child_sizes: u64 * k
//!                                        name bytes
//! ```
//!
//! Scalar records are padded to 8 bytes in the stream, array records to 64;
//! the recorded size excludes the padding.

use bytes::{BufMut, BytesMut};
use smol_str::SmolStr;

use crate::consts::MAX_NAME_LENGTH;
use crate::cube::Dims;
use crate::dtype::{Compression, DataType};
use crate::error::{OmError, OmResult};

/// Absolute location of a written variable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OmOffsetSize {
    pub offset: u64,
    pub size: u64,
}

/// Array metadata carried by an array record.
#[derive(Debug, Clone)]
pub struct ArrayInfo {
    pub compression: Compression,
    pub scale_factor: f32,
    pub add_offset: f32,
    pub dimensions: Dims,
    pub chunks: Dims,
    pub lut_size: u64,
    pub lut_offset: u64,
    /// 256 for v3 files, 1 for legacy files with a raw LUT.
    pub lut_chunk_element_count: u64,
}

#[derive(Debug, Clone)]
pub(crate) enum VariablePayload {
    None,
    Scalar(Vec<u8>),
    Array(ArrayInfo),
}

/// A parsed variable record. Owns all of its metadata, so it never borrows
/// the record bytes it came from.
#[derive(Debug, Clone)]
pub struct OmVariable {
    pub data_type: DataType,
    pub name: SmolStr,
    pub(crate) children: Vec<OmOffsetSize>,
    pub(crate) payload: VariablePayload,
}

impl OmVariable {
    pub fn children_count(&self) -> u32 {
        self.children.len() as u32
    }

    pub(crate) fn child(&self, index: u32) -> Option<OmOffsetSize> {
        self.children.get(index as usize).copied()
    }

    pub(crate) fn array_info(&self) -> Option<&ArrayInfo> {
        match &self.payload {
            VariablePayload::Array(info) => Some(info),
            _ => None,
        }
    }

    pub(crate) fn scalar_payload(&self) -> Option<&[u8]> {
        match &self.payload {
            VariablePayload::Scalar(payload) => Some(payload),
            _ => None,
        }
    }

    /// Parse a record fetched from the backend.
    pub(crate) fn from_record(bytes: &[u8]) -> OmResult<Self> {
        let mut cursor = RecordCursor::new(bytes);
        let data_type = DataType::try_from(cursor.take_u8()?)?;
        if data_type.is_array() {
            Self::parse_array(data_type, cursor)
        } else {
            Self::parse_scalar(data_type, cursor)
        }
    }

    fn parse_scalar(data_type: DataType, mut cursor: RecordCursor<'_>) -> OmResult<Self> {
        cursor.take_u8()?; // reserved
        let children_count = cursor.take_u32()?;
        let name_length = cursor.take_u16()? as usize;
        let name = cursor.take_name(name_length)?;
        let children = cursor.take_children(children_count)?;
        let payload = cursor.rest().to_vec();
        let payload = match data_type {
            DataType::None => VariablePayload::None,
            _ => VariablePayload::Scalar(payload),
        };
        Ok(Self {
            data_type,
            name,
            children,
            payload,
        })
    }

    fn parse_array(data_type: DataType, mut cursor: RecordCursor<'_>) -> OmResult<Self> {
        let compression = Compression::try_from(cursor.take_u8()?)?;
        cursor.take_u16()?; // reserved
        let scale_factor = cursor.take_f32()?;
        let add_offset = cursor.take_f32()?;
        cursor.take_u32()?; // reserved
        let rank = cursor.take_u64()? as usize;
        if rank == 0 || rank > 64 {
            return Err(OmError::OutOfBoundRead);
        }
        let mut dimensions = Dims::with_capacity(rank);
        for _ in 0..rank {
            dimensions.push(cursor.take_u64()?);
        }
        let mut chunks = Dims::with_capacity(rank);
        for _ in 0..rank {
            chunks.push(cursor.take_u64()?);
        }
        let lut_size = cursor.take_u64()?;
        let lut_offset = cursor.take_u64()?;
        let children_count = cursor.take_u32()?;
        let name_length = cursor.take_u16()? as usize;
        cursor.take_u16()?; // reserved
        let children = cursor.take_children(children_count)?;
        let name = cursor.take_name(name_length)?;

        Ok(Self {
            data_type,
            name,
            children,
            payload: VariablePayload::Array(ArrayInfo {
                compression,
                scale_factor,
                add_offset,
                dimensions,
                chunks,
                lut_size,
                lut_offset,
                lut_chunk_element_count: crate::consts::LUT_CHUNK_ELEMENT_COUNT,
            }),
        })
    }
}

/// Bounds-checked little-endian record reader.
struct RecordCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> RecordCursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> OmResult<&'a [u8]> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + len)
            .ok_or(OmError::OutOfBoundRead)?;
        self.pos += len;
        Ok(slice)
    }

    fn take_u8(&mut self) -> OmResult<u8> {
        Ok(self.take(1)?[0])
    }

    fn take_u16(&mut self) -> OmResult<u16> {
        Ok(u16::from_le_bytes(self.take(2)?.try_into().unwrap()))
    }

    fn take_u32(&mut self) -> OmResult<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn take_u64(&mut self) -> OmResult<u64> {
        Ok(u64::from_le_bytes(self.take(8)?.try_into().unwrap()))
    }

    fn take_f32(&mut self) -> OmResult<f32> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    fn take_name(&mut self, len: usize) -> OmResult<SmolStr> {
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(SmolStr::new)
            .map_err(|_| OmError::OutOfBoundRead)
    }

    fn take_children(&mut self, count: u32) -> OmResult<Vec<OmOffsetSize>> {
        let count = count as usize;
        // Offsets and sizes are two parallel u64 runs.
        let mut children = Vec::with_capacity(count.min(4096));
        for _ in 0..count {
            children.push(OmOffsetSize {
                offset: self.take_u64()?,
                size: 0,
            });
        }
        for child in children.iter_mut() {
            child.size = self.take_u64()?;
        }
        Ok(children)
    }

    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.pos..]
    }
}

/// Build a scalar record.
pub(crate) fn encode_scalar_record(
    data_type: DataType,
    payload: &[u8],
    name: &str,
    children: &[OmOffsetSize],
) -> OmResult<Vec<u8>> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(OmError::InvalidArgument(format!(
            "variable name of {} bytes exceeds the limit",
            name.len()
        )));
    }
    let mut out = BytesMut::with_capacity(8 + name.len() + children.len() * 16 + payload.len());
    out.put_u8(data_type as u8);
    out.put_u8(0);
    out.put_u32_le(children.len() as u32);
    out.put_u16_le(name.len() as u16);
    out.put_slice(name.as_bytes());
    for child in children {
        out.put_u64_le(child.offset);
    }
    for child in children {
        out.put_u64_le(child.size);
    }
    out.put_slice(payload);
    Ok(out.to_vec())
}

/// Build an array record.
pub(crate) fn encode_array_record(
    data_type: DataType,
    info: &ArrayInfo,
    name: &str,
    children: &[OmOffsetSize],
) -> OmResult<Vec<u8>> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(OmError::InvalidArgument(format!(
            "variable name of {} bytes exceeds the limit",
            name.len()
        )));
    }
    let rank = info.dimensions.len();
    let mut out =
        BytesMut::with_capacity(48 + rank * 16 + children.len() * 16 + name.len());
    out.put_u8(data_type as u8);
    out.put_u8(info.compression as u8);
    out.put_u16_le(0);
    out.put_f32_le(info.scale_factor);
    out.put_f32_le(info.add_offset);
    out.put_u32_le(0);
    out.put_u64_le(rank as u64);
    for &d in info.dimensions.iter() {
        out.put_u64_le(d);
    }
    for &c in info.chunks.iter() {
        out.put_u64_le(c);
    }
    out.put_u64_le(info.lut_size);
    out.put_u64_le(info.lut_offset);
    out.put_u32_le(children.len() as u32);
    out.put_u16_le(name.len() as u16);
    out.put_u16_le(0);
    for child in children {
        out.put_u64_le(child.offset);
    }
    for child in children {
        out.put_u64_le(child.size);
    }
    out.put_slice(name.as_bytes());
    Ok(out.to_vec())
}
