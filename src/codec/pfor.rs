//! Integer stream codecs over the block bit packer.
//!
//! Two transforms feed [`crate::codec::bitpack`]:
//! - signed lanes: wrapping delta followed by zigzag, so small oscillating
//!   residues pack into few bits;
//! - unsigned lanes: plain wrapping delta, cheap for monotone streams.
//!
//! All arithmetic stays in the native lane width, which keeps every
//! transformed value within `lane_bits` bits and bounds the packed output.

use crate::codec::bitpack::{decode_blocks, encode_blocks};

macro_rules! impl_zigzag_codec {
    ($compress:ident, $decompress:ident, $ty:ty, $uty:ty) => {
        /// Delta + zigzag compress `n` little-endian lanes from `src`.
        pub fn $compress(src: &[u8], n: usize, out: &mut [u8]) -> usize {
            const SIZE: usize = std::mem::size_of::<$ty>();
            const BITS: u32 = <$ty>::BITS;
            let mut transformed = Vec::with_capacity(n);
            let mut prev: $ty = 0;
            for lane in src[..n * SIZE].chunks_exact(SIZE) {
                let v = <$ty>::from_le_bytes(lane.try_into().unwrap());
                let d = v.wrapping_sub(prev);
                prev = v;
                transformed.push(((d << 1) ^ (d >> (BITS - 1))) as $uty as u64);
            }
            encode_blocks(&transformed, out)
        }

        /// Inverse of the compressor above. Returns bytes consumed.
        pub fn $decompress(src: &[u8], n: usize, dst: &mut [u8]) -> Option<usize> {
            const SIZE: usize = std::mem::size_of::<$ty>();
            let mut values = vec![0u64; n];
            let consumed = decode_blocks(src, n, &mut values)?;
            let mut prev: $ty = 0;
            for (lane, &z) in dst[..n * SIZE].chunks_exact_mut(SIZE).zip(values.iter()) {
                let z = z as $uty;
                let d = ((z >> 1) ^ (0 as $uty).wrapping_sub(z & 1)) as $ty;
                prev = prev.wrapping_add(d);
                lane.copy_from_slice(&prev.to_le_bytes());
            }
            Some(consumed)
        }
    };
}

macro_rules! impl_delta_codec {
    ($compress:ident, $decompress:ident, $ty:ty) => {
        /// Wrapping-delta compress `n` little-endian lanes from `src`.
        pub fn $compress(src: &[u8], n: usize, out: &mut [u8]) -> usize {
            const SIZE: usize = std::mem::size_of::<$ty>();
            let mut transformed = Vec::with_capacity(n);
            let mut prev: $ty = 0;
            for lane in src[..n * SIZE].chunks_exact(SIZE) {
                let v = <$ty>::from_le_bytes(lane.try_into().unwrap());
                transformed.push(v.wrapping_sub(prev) as u64);
                prev = v;
            }
            encode_blocks(&transformed, out)
        }

        /// Inverse of the compressor above. Returns bytes consumed.
        pub fn $decompress(src: &[u8], n: usize, dst: &mut [u8]) -> Option<usize> {
            const SIZE: usize = std::mem::size_of::<$ty>();
            let mut values = vec![0u64; n];
            let consumed = decode_blocks(src, n, &mut values)?;
            let mut prev: $ty = 0;
            for (lane, &d) in dst[..n * SIZE].chunks_exact_mut(SIZE).zip(values.iter()) {
                prev = prev.wrapping_add(d as $ty);
                lane.copy_from_slice(&prev.to_le_bytes());
            }
            Some(consumed)
        }
    };
}

impl_zigzag_codec!(compress_zigzag8, decompress_zigzag8, i8, u8);
impl_zigzag_codec!(compress_zigzag16, decompress_zigzag16, i16, u16);
impl_zigzag_codec!(compress_zigzag32, decompress_zigzag32, i32, u32);
impl_zigzag_codec!(compress_zigzag64, decompress_zigzag64, i64, u64);

impl_delta_codec!(compress_delta8, decompress_delta8, u8);
impl_delta_codec!(compress_delta16, decompress_delta16, u16);
impl_delta_codec!(compress_delta32, decompress_delta32, u32);
impl_delta_codec!(compress_delta64, decompress_delta64, u64);

/// Compress one LUT group of absolute byte offsets.
///
/// Offsets are monotone, so a plain delta keeps every block narrow. Groups are
/// compressed independently to stay seekable.
pub fn compress_lut_group(entries: &[u64], out: &mut [u8]) -> usize {
    let mut transformed = Vec::with_capacity(entries.len());
    let mut prev = 0u64;
    for &v in entries {
        transformed.push(v.wrapping_sub(prev));
        prev = v;
    }
    encode_blocks(&transformed, out)
}

/// Decompress one LUT group of `n` absolute byte offsets.
pub fn decompress_lut_group(src: &[u8], n: usize, dst: &mut [u64]) -> Option<usize> {
    let consumed = decode_blocks(src, n, dst)?;
    let mut prev = 0u64;
    for slot in dst[..n].iter_mut() {
        prev = prev.wrapping_add(*slot);
        *slot = prev;
    }
    Some(consumed)
}
