//! Floating-point XOR codecs.
//!
//! Neighboring floats share sign, exponent and high mantissa bits, so XORing
//! each value with its predecessor leaves mostly low-entropy words. The XORed
//! lanes go through the same block bit packer as the integer codecs. Lossless:
//! the raw bit patterns round-trip exactly, including NaN payloads.

use crate::codec::bitpack::{decode_blocks, encode_blocks};

macro_rules! impl_xor_codec {
    ($compress:ident, $decompress:ident, $uty:ty) => {
        /// XOR-with-previous compress `n` little-endian lanes from `src`.
        pub fn $compress(src: &[u8], n: usize, out: &mut [u8]) -> usize {
            const SIZE: usize = std::mem::size_of::<$uty>();
            let mut transformed = Vec::with_capacity(n);
            let mut prev: $uty = 0;
            for lane in src[..n * SIZE].chunks_exact(SIZE) {
                let v = <$uty>::from_le_bytes(lane.try_into().unwrap());
                transformed.push((v ^ prev) as u64);
                prev = v;
            }
            encode_blocks(&transformed, out)
        }

        /// Inverse of the compressor above. Returns bytes consumed.
        pub fn $decompress(src: &[u8], n: usize, dst: &mut [u8]) -> Option<usize> {
            const SIZE: usize = std::mem::size_of::<$uty>();
            let mut values = vec![0u64; n];
            let consumed = decode_blocks(src, n, &mut values)?;
            let mut prev: $uty = 0;
            for (lane, &x) in dst[..n * SIZE].chunks_exact_mut(SIZE).zip(values.iter()) {
                prev ^= x as $uty;
                lane.copy_from_slice(&prev.to_le_bytes());
            }
            Some(consumed)
        }
    };
}

impl_xor_codec!(compress_xor32, decompress_xor32, u32);
impl_xor_codec!(compress_xor64, decompress_xor64, u64);
