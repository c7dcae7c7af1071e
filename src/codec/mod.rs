//! Chunk codec selection.
//!
//! A [`Codec`] is the function-pointer triple driving one array variable:
//! element conversion, 2-D filter and entropy stage, picked once at init time
//! from the `(data_type, compression)` pair. Readers and writers must resolve
//! the same pair to the same triple, otherwise the stored bytes are garbage —
//! the table below is part of the on-disk contract.

pub mod bitpack;
pub mod delta2d;
pub mod fpxor;
pub mod pfor;
pub mod scale;

use crate::dtype::{Compression, DataType};
use crate::error::OmError;
pub use scale::ConvertFn;

/// In-place 2-D filter over a `(rows, cols)` reshape of the chunk buffer.
pub type FilterFn = fn(rows: usize, cols: usize, buf: &mut [u8]);

/// Entropy-code `n` stored lanes from `src` into `out`; returns bytes written.
pub type CompressFn = fn(src: &[u8], n: usize, out: &mut [u8]) -> usize;

/// Decode `n` stored lanes from `src` into `dst`; returns bytes consumed, or
/// `None` when `src` is truncated or malformed.
pub type DecompressFn = fn(src: &[u8], n: usize, dst: &mut [u8]) -> Option<usize>;

/// The resolved per-variable codec.
#[derive(Clone, Copy, Debug)]
pub struct Codec {
    /// Element width on the user side of `convert`.
    pub bytes_per_element: usize,
    /// Element width inside the chunk buffer and entropy stage.
    pub bytes_per_element_stored: usize,
    pub encode_convert: ConvertFn,
    pub decode_convert: ConvertFn,
    pub encode_filter: FilterFn,
    pub decode_filter: FilterFn,
    pub compress: CompressFn,
    pub decompress: DecompressFn,
}

impl Codec {
    /// Resolve the codec for an array variable.
    ///
    /// `data_type` must be an array tag. Pairs outside the table fail with
    /// `InvalidDataType`, unknown compression tags with
    /// `InvalidCompressionType`.
    pub fn select(data_type: DataType, compression: Compression) -> Result<Codec, OmError> {
        use DataType::*;

        let codec = match compression {
            Compression::PforDelta2dInt16 => match data_type {
                FloatArray => Codec {
                    bytes_per_element: 4,
                    bytes_per_element_stored: 2,
                    encode_convert: scale::float_to_int16,
                    decode_convert: scale::int16_to_float,
                    encode_filter: delta2d::delta2d_encode16,
                    decode_filter: delta2d::delta2d_decode16,
                    compress: pfor::compress_zigzag16,
                    decompress: pfor::decompress_zigzag16,
                },
                _ => return Err(OmError::InvalidDataType(data_type as u8)),
            },
            Compression::PforDelta2dInt16Logarithmic => match data_type {
                FloatArray => Codec {
                    bytes_per_element: 4,
                    bytes_per_element_stored: 2,
                    encode_convert: scale::float_to_int16_log10,
                    decode_convert: scale::int16_to_float_log10,
                    encode_filter: delta2d::delta2d_encode16,
                    decode_filter: delta2d::delta2d_decode16,
                    compress: pfor::compress_zigzag16,
                    decompress: pfor::decompress_zigzag16,
                },
                _ => return Err(OmError::InvalidDataType(data_type as u8)),
            },
            Compression::FpxXor2d => match data_type {
                FloatArray => Codec {
                    bytes_per_element: 4,
                    bytes_per_element_stored: 4,
                    encode_convert: scale::copy32,
                    decode_convert: scale::copy32,
                    encode_filter: delta2d::xor2d_encode32,
                    decode_filter: delta2d::xor2d_decode32,
                    compress: fpxor::compress_xor32,
                    decompress: fpxor::decompress_xor32,
                },
                DoubleArray => Codec {
                    bytes_per_element: 8,
                    bytes_per_element_stored: 8,
                    encode_convert: scale::copy64,
                    decode_convert: scale::copy64,
                    encode_filter: delta2d::xor2d_encode64,
                    decode_filter: delta2d::xor2d_decode64,
                    compress: fpxor::compress_xor64,
                    decompress: fpxor::decompress_xor64,
                },
                _ => return Err(OmError::InvalidDataType(data_type as u8)),
            },
            Compression::PforDelta2d => match data_type {
                FloatArray => Codec {
                    bytes_per_element: 4,
                    bytes_per_element_stored: 4,
                    encode_convert: scale::float_to_int32,
                    decode_convert: scale::int32_to_float,
                    encode_filter: delta2d::delta2d_encode32,
                    decode_filter: delta2d::delta2d_decode32,
                    compress: pfor::compress_zigzag32,
                    decompress: pfor::decompress_zigzag32,
                },
                DoubleArray => Codec {
                    bytes_per_element: 8,
                    bytes_per_element_stored: 8,
                    encode_convert: scale::double_to_int64,
                    decode_convert: scale::int64_to_double,
                    encode_filter: delta2d::delta2d_encode64,
                    decode_filter: delta2d::delta2d_decode64,
                    compress: pfor::compress_zigzag64,
                    decompress: pfor::decompress_zigzag64,
                },
                Int8Array => Codec {
                    bytes_per_element: 1,
                    bytes_per_element_stored: 1,
                    encode_convert: scale::copy8,
                    decode_convert: scale::copy8,
                    encode_filter: delta2d::delta2d_encode8,
                    decode_filter: delta2d::delta2d_decode8,
                    compress: pfor::compress_zigzag8,
                    decompress: pfor::decompress_zigzag8,
                },
                Uint8Array => Codec {
                    bytes_per_element: 1,
                    bytes_per_element_stored: 1,
                    encode_convert: scale::copy8,
                    decode_convert: scale::copy8,
                    encode_filter: delta2d::delta2d_encode8,
                    decode_filter: delta2d::delta2d_decode8,
                    compress: pfor::compress_delta8,
                    decompress: pfor::decompress_delta8,
                },
                Int16Array => Codec {
                    bytes_per_element: 2,
                    bytes_per_element_stored: 2,
                    encode_convert: scale::copy16,
                    decode_convert: scale::copy16,
                    encode_filter: delta2d::delta2d_encode16,
                    decode_filter: delta2d::delta2d_decode16,
                    compress: pfor::compress_zigzag16,
                    decompress: pfor::decompress_zigzag16,
                },
                Uint16Array => Codec {
                    bytes_per_element: 2,
                    bytes_per_element_stored: 2,
                    encode_convert: scale::copy16,
                    decode_convert: scale::copy16,
                    encode_filter: delta2d::delta2d_encode16,
                    decode_filter: delta2d::delta2d_decode16,
                    compress: pfor::compress_delta16,
                    decompress: pfor::decompress_delta16,
                },
                Int32Array => Codec {
                    bytes_per_element: 4,
                    bytes_per_element_stored: 4,
                    encode_convert: scale::copy32,
                    decode_convert: scale::copy32,
                    encode_filter: delta2d::delta2d_encode32,
                    decode_filter: delta2d::delta2d_decode32,
                    compress: pfor::compress_zigzag32,
                    decompress: pfor::decompress_zigzag32,
                },
                Uint32Array => Codec {
                    bytes_per_element: 4,
                    bytes_per_element_stored: 4,
                    encode_convert: scale::copy32,
                    decode_convert: scale::copy32,
                    encode_filter: delta2d::delta2d_encode32,
                    decode_filter: delta2d::delta2d_decode32,
                    compress: pfor::compress_delta32,
                    decompress: pfor::decompress_delta32,
                },
                Int64Array => Codec {
                    bytes_per_element: 8,
                    bytes_per_element_stored: 8,
                    encode_convert: scale::copy64,
                    decode_convert: scale::copy64,
                    encode_filter: delta2d::delta2d_encode64,
                    decode_filter: delta2d::delta2d_decode64,
                    compress: pfor::compress_zigzag64,
                    decompress: pfor::decompress_zigzag64,
                },
                Uint64Array => Codec {
                    bytes_per_element: 8,
                    bytes_per_element_stored: 8,
                    encode_convert: scale::copy64,
                    decode_convert: scale::copy64,
                    encode_filter: delta2d::delta2d_encode64,
                    decode_filter: delta2d::delta2d_decode64,
                    compress: pfor::compress_delta64,
                    decompress: pfor::decompress_delta64,
                },
                _ => return Err(OmError::InvalidDataType(data_type as u8)),
            },
        };
        Ok(codec)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_int16_codec_widths() {
        let codec = Codec::select(DataType::FloatArray, Compression::PforDelta2dInt16).unwrap();
        assert_eq!(codec.bytes_per_element, 4);
        assert_eq!(codec.bytes_per_element_stored, 2);
    }

    #[test]
    fn int16_with_int16_compression_is_rejected() {
        let err = Codec::select(DataType::Int16Array, Compression::PforDelta2dInt16).unwrap_err();
        assert!(matches!(err, OmError::InvalidDataType(_)));
    }

    #[test]
    fn scalar_tag_is_rejected() {
        let err = Codec::select(DataType::Float, Compression::PforDelta2d).unwrap_err();
        assert!(matches!(err, OmError::InvalidDataType(_)));
    }

    #[test]
    fn every_numeric_array_supports_pfor_delta2d() {
        for tag in 12u8..=21 {
            let dtype = DataType::try_from(tag).unwrap();
            assert!(Codec::select(dtype, Compression::PforDelta2d).is_ok());
        }
    }
}
