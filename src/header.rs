//! File header and trailer.
//!
//! v3 files carry an 8-byte magic header and locate their root variable
//! through a 24-byte trailer. Legacy (v1/v2) files instead describe a single
//! unnamed 2-D float array directly in a 40-byte header, followed by an
//! uncompressed LUT of absolute offsets; they are accepted on read only.

use smallvec::smallvec;

use crate::consts::{HEADER_SIZE, LEGACY_HEADER_SIZE, MAGIC_NUMBER, TRAILER_SIZE, VERSION};
use crate::cube;
use crate::dtype::{Compression, DataType};
use crate::error::{OmError, OmResult};
use crate::variable::{ArrayInfo, OmOffsetSize, OmVariable, VariablePayload};

/// What the first bytes of a file identify it as.
pub(crate) enum FileHeader {
    /// v3: the root variable is found through the trailer.
    V3,
    /// Legacy: the file is one array variable, synthesized from the header.
    Legacy(OmVariable),
}

pub(crate) fn write_header() -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[..2].copy_from_slice(MAGIC_NUMBER);
    header[2] = VERSION;
    header
}

pub(crate) fn write_trailer(root: OmOffsetSize) -> [u8; TRAILER_SIZE] {
    let mut trailer = [0u8; TRAILER_SIZE];
    trailer[..2].copy_from_slice(MAGIC_NUMBER);
    trailer[2] = VERSION;
    trailer[8..16].copy_from_slice(&root.offset.to_le_bytes());
    trailer[16..24].copy_from_slice(&root.size.to_le_bytes());
    trailer
}

/// Validate the trailer magic and return the root location, or `None` so the
/// caller can fall back to the legacy header.
pub(crate) fn read_trailer(bytes: &[u8]) -> Option<OmOffsetSize> {
    if bytes.len() != TRAILER_SIZE || &bytes[..2] != MAGIC_NUMBER || bytes[2] != VERSION {
        return None;
    }
    Some(OmOffsetSize {
        offset: u64::from_le_bytes(bytes[8..16].try_into().ok()?),
        size: u64::from_le_bytes(bytes[16..24].try_into().ok()?),
    })
}

/// Identify the header at offset 0.
pub(crate) fn read_header(bytes: &[u8]) -> OmResult<FileHeader> {
    if bytes.len() < 3 || &bytes[..2] != MAGIC_NUMBER {
        return Err(OmError::NotAnOmFile);
    }
    match bytes[2] {
        VERSION => Ok(FileHeader::V3),
        1 | 2 => Ok(FileHeader::Legacy(parse_legacy_header(bytes)?)),
        _ => Err(OmError::NotAnOmFile),
    }
}

fn parse_legacy_header(bytes: &[u8]) -> OmResult<OmVariable> {
    if bytes.len() < LEGACY_HEADER_SIZE {
        return Err(OmError::NotAnOmFile);
    }
    let compression = Compression::try_from(bytes[3])?;
    let dim0 = u64::from_le_bytes(bytes[4..12].try_into().unwrap());
    let dim1 = u64::from_le_bytes(bytes[12..20].try_into().unwrap());
    let chunk0 = u64::from_le_bytes(bytes[20..28].try_into().unwrap());
    let chunk1 = u64::from_le_bytes(bytes[28..36].try_into().unwrap());
    let scale_factor = f32::from_le_bytes(bytes[36..40].try_into().unwrap());
    if chunk0 == 0 || chunk1 == 0 {
        return Err(OmError::NotAnOmFile);
    }

    let dimensions = smallvec![dim0, dim1];
    let chunks = smallvec![chunk0, chunk1];
    let total_chunks = cube::total_chunks(&dimensions, &chunks);

    Ok(OmVariable {
        data_type: DataType::FloatArray,
        name: Default::default(),
        children: Vec::new(),
        payload: VariablePayload::Array(ArrayInfo {
            compression,
            scale_factor,
            add_offset: 0.0,
            dimensions,
            chunks,
            // The raw LUT sits directly behind the header, one absolute
            // offset per entry.
            lut_offset: LEGACY_HEADER_SIZE as u64,
            lut_size: (total_chunks + 1) * 8,
            lut_chunk_element_count: 1,
        }),
    })
}
