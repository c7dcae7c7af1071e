//! 2-D chunk filters.
//!
//! A chunk buffer is reshaped as `(rows, cols)` where `cols` is the extent of
//! the fastest axis. Encoding subtracts (or XORs) each row's predecessor row
//! in place; decoding inverts it. Rows of one leave the buffer untouched.
//!
//! Filters operate on raw little-endian bytes so chunk buffers never need
//! alignment. Signed and unsigned lanes of the same width share a filter:
//! wrapping subtraction is bit-identical for both.

macro_rules! impl_delta2d {
    ($encode:ident, $decode:ident, $ty:ty) => {
        pub fn $encode(rows: usize, cols: usize, buf: &mut [u8]) {
            const SIZE: usize = std::mem::size_of::<$ty>();
            if rows <= 1 {
                return;
            }
            for d0 in (1..rows).rev() {
                for d1 in 0..cols {
                    let cur = (d0 * cols + d1) * SIZE;
                    let prev = ((d0 - 1) * cols + d1) * SIZE;
                    let a = <$ty>::from_le_bytes(buf[cur..cur + SIZE].try_into().unwrap());
                    let b = <$ty>::from_le_bytes(buf[prev..prev + SIZE].try_into().unwrap());
                    buf[cur..cur + SIZE].copy_from_slice(&a.wrapping_sub(b).to_le_bytes());
                }
            }
        }

        pub fn $decode(rows: usize, cols: usize, buf: &mut [u8]) {
            const SIZE: usize = std::mem::size_of::<$ty>();
            if rows <= 1 {
                return;
            }
            for d0 in 1..rows {
                for d1 in 0..cols {
                    let cur = (d0 * cols + d1) * SIZE;
                    let prev = ((d0 - 1) * cols + d1) * SIZE;
                    let a = <$ty>::from_le_bytes(buf[cur..cur + SIZE].try_into().unwrap());
                    let b = <$ty>::from_le_bytes(buf[prev..prev + SIZE].try_into().unwrap());
                    buf[cur..cur + SIZE].copy_from_slice(&a.wrapping_add(b).to_le_bytes());
                }
            }
        }
    };
}

macro_rules! impl_xor2d {
    ($encode:ident, $decode:ident, $ty:ty) => {
        pub fn $encode(rows: usize, cols: usize, buf: &mut [u8]) {
            const SIZE: usize = std::mem::size_of::<$ty>();
            if rows <= 1 {
                return;
            }
            for d0 in (1..rows).rev() {
                for d1 in 0..cols {
                    let cur = (d0 * cols + d1) * SIZE;
                    let prev = ((d0 - 1) * cols + d1) * SIZE;
                    let a = <$ty>::from_le_bytes(buf[cur..cur + SIZE].try_into().unwrap());
                    let b = <$ty>::from_le_bytes(buf[prev..prev + SIZE].try_into().unwrap());
                    buf[cur..cur + SIZE].copy_from_slice(&(a ^ b).to_le_bytes());
                }
            }
        }

        // XOR is self-inverse; only the row order differs.
        pub fn $decode(rows: usize, cols: usize, buf: &mut [u8]) {
            const SIZE: usize = std::mem::size_of::<$ty>();
            if rows <= 1 {
                return;
            }
            for d0 in 1..rows {
                for d1 in 0..cols {
                    let cur = (d0 * cols + d1) * SIZE;
                    let prev = ((d0 - 1) * cols + d1) * SIZE;
                    let a = <$ty>::from_le_bytes(buf[cur..cur + SIZE].try_into().unwrap());
                    let b = <$ty>::from_le_bytes(buf[prev..prev + SIZE].try_into().unwrap());
                    buf[cur..cur + SIZE].copy_from_slice(&(a ^ b).to_le_bytes());
                }
            }
        }
    };
}

impl_delta2d!(delta2d_encode8, delta2d_decode8, i8);
impl_delta2d!(delta2d_encode16, delta2d_decode16, i16);
impl_delta2d!(delta2d_encode32, delta2d_decode32, i32);
impl_delta2d!(delta2d_encode64, delta2d_decode64, i64);

impl_xor2d!(xor2d_encode32, xor2d_decode32, u32);
impl_xor2d!(xor2d_encode64, xor2d_decode64, u64);
