//! Data type and compression tags.
//!
//! Both enums are stored as single bytes inside variable records, so the
//! discriminants are part of the on-disk format and must never be reordered.

use crate::error::OmError;

/// Logical type of a variable.
///
/// Scalar tags (1..=11) describe a single value carried inline in the record;
/// array tags (12..=22) describe a chunked, compressed n-dimensional payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataType {
    None = 0,
    Int8 = 1,
    Uint8 = 2,
    Int16 = 3,
    Uint16 = 4,
    Int32 = 5,
    Uint32 = 6,
    Int64 = 7,
    Uint64 = 8,
    Float = 9,
    Double = 10,
    String = 11,
    Int8Array = 12,
    Uint8Array = 13,
    Int16Array = 14,
    Uint16Array = 15,
    Int32Array = 16,
    Uint32Array = 17,
    Int64Array = 18,
    Uint64Array = 19,
    FloatArray = 20,
    DoubleArray = 21,
    StringArray = 22,
}

impl DataType {
    pub const fn is_array(&self) -> bool {
        (*self as u8) >= DataType::Int8Array as u8
    }
}

impl TryFrom<u8> for DataType {
    type Error = OmError;

    fn try_from(value: u8) -> Result<Self, OmError> {
        Ok(match value {
            0 => DataType::None,
            1 => DataType::Int8,
            2 => DataType::Uint8,
            3 => DataType::Int16,
            4 => DataType::Uint16,
            5 => DataType::Int32,
            6 => DataType::Uint32,
            7 => DataType::Int64,
            8 => DataType::Uint64,
            9 => DataType::Float,
            10 => DataType::Double,
            11 => DataType::String,
            12 => DataType::Int8Array,
            13 => DataType::Uint8Array,
            14 => DataType::Int16Array,
            15 => DataType::Uint16Array,
            16 => DataType::Int32Array,
            17 => DataType::Uint32Array,
            18 => DataType::Int64Array,
            19 => DataType::Uint64Array,
            20 => DataType::FloatArray,
            21 => DataType::DoubleArray,
            22 => DataType::StringArray,
            other => return Err(OmError::InvalidDataType(other)),
        })
    }
}

/// How an array payload is filtered and entropy coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Compression {
    /// Scale floats to 16-bit integers, 2-D delta filter, zigzag-delta packer.
    PforDelta2dInt16 = 0,
    /// 2-D XOR filter over the raw float bits, XOR block packer.
    FpxXor2d = 1,
    /// `log10(1+x)` scaling to 16-bit integers, otherwise as `PforDelta2dInt16`.
    PforDelta2dInt16Logarithmic = 2,
    /// Native-width integers, 2-D delta filter, delta/zigzag block packer.
    PforDelta2d = 3,
}

impl TryFrom<u8> for Compression {
    type Error = OmError;

    fn try_from(value: u8) -> Result<Self, OmError> {
        Ok(match value {
            0 => Compression::PforDelta2dInt16,
            1 => Compression::FpxXor2d,
            2 => Compression::PforDelta2dInt16Logarithmic,
            3 => Compression::PforDelta2d,
            other => return Err(OmError::InvalidCompressionType(other)),
        })
    }
}

/// A value that can be stored as (or read back from) a scalar variable.
pub trait OmScalar: Sized {
    const DATA_TYPE: DataType;

    fn to_payload(&self) -> Vec<u8>;
    fn from_payload(payload: &[u8]) -> Option<Self>;
}

macro_rules! impl_om_scalar_numeric {
    ($ty:ty, $dtype:ident) => {
        impl OmScalar for $ty {
            const DATA_TYPE: DataType = DataType::$dtype;

            fn to_payload(&self) -> Vec<u8> {
                self.to_le_bytes().to_vec()
            }

            fn from_payload(payload: &[u8]) -> Option<Self> {
                Some(<$ty>::from_le_bytes(payload.try_into().ok()?))
            }
        }
    };
}

impl_om_scalar_numeric!(i8, Int8);
impl_om_scalar_numeric!(u8, Uint8);
impl_om_scalar_numeric!(i16, Int16);
impl_om_scalar_numeric!(u16, Uint16);
impl_om_scalar_numeric!(i32, Int32);
impl_om_scalar_numeric!(u32, Uint32);
impl_om_scalar_numeric!(i64, Int64);
impl_om_scalar_numeric!(u64, Uint64);
impl_om_scalar_numeric!(f32, Float);
impl_om_scalar_numeric!(f64, Double);

impl OmScalar for String {
    const DATA_TYPE: DataType = DataType::String;

    fn to_payload(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.len());
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());
        out.extend_from_slice(self.as_bytes());
        out
    }

    fn from_payload(payload: &[u8]) -> Option<Self> {
        let len = u64::from_le_bytes(payload.get(..8)?.try_into().ok()?) as usize;
        let bytes = payload.get(8..8 + len)?;
        String::from_utf8(bytes.to_vec()).ok()
    }
}

/// An element type that can back an array variable.
pub trait OmArrayElement: Copy + Default + Send + Sync + 'static {
    /// The array-variant tag written to the variable record.
    const ARRAY_DATA_TYPE: DataType;
}

macro_rules! impl_om_array_element {
    ($ty:ty, $dtype:ident) => {
        impl OmArrayElement for $ty {
            const ARRAY_DATA_TYPE: DataType = DataType::$dtype;
        }
    };
}

impl_om_array_element!(i8, Int8Array);
impl_om_array_element!(u8, Uint8Array);
impl_om_array_element!(i16, Int16Array);
impl_om_array_element!(u16, Uint16Array);
impl_om_array_element!(i32, Int32Array);
impl_om_array_element!(u32, Uint32Array);
impl_om_array_element!(i64, Int64Array);
impl_om_array_element!(u64, Uint64Array);
impl_om_array_element!(f32, FloatArray);
impl_om_array_element!(f64, DoubleArray);
