//! Element conversion between user values and stored lanes.
//!
//! Lossy integer modes quantize with `stored = round(value * scale + offset)`,
//! rounding half away from zero, clamping to the stored range and mapping NaN
//! to the signed maximum of the stored type. Decoding maps the sentinel back
//! to NaN. The logarithmic mode stores `round(log10(1 + value) * scale)`.
//!
//! All converters work on raw little-endian bytes with an element count, so
//! the same function-pointer shape covers every (user, stored) pairing.

/// `n` elements from `src` into `dst`, possibly changing element width.
pub type ConvertFn = fn(n: usize, scale_factor: f32, add_offset: f32, src: &[u8], dst: &mut [u8]);

pub fn copy8(n: usize, _scale_factor: f32, _add_offset: f32, src: &[u8], dst: &mut [u8]) {
    dst[..n].copy_from_slice(&src[..n]);
}

pub fn copy16(n: usize, _scale_factor: f32, _add_offset: f32, src: &[u8], dst: &mut [u8]) {
    dst[..n * 2].copy_from_slice(&src[..n * 2]);
}

pub fn copy32(n: usize, _scale_factor: f32, _add_offset: f32, src: &[u8], dst: &mut [u8]) {
    dst[..n * 4].copy_from_slice(&src[..n * 4]);
}

pub fn copy64(n: usize, _scale_factor: f32, _add_offset: f32, src: &[u8], dst: &mut [u8]) {
    dst[..n * 8].copy_from_slice(&src[..n * 8]);
}

pub fn float_to_int16(n: usize, scale_factor: f32, add_offset: f32, src: &[u8], dst: &mut [u8]) {
    for i in 0..n {
        let v = f32::from_le_bytes(src[i * 4..i * 4 + 4].try_into().unwrap());
        let stored = if v.is_nan() {
            i16::MAX
        } else {
            let scaled = (v * scale_factor + add_offset).round();
            scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
        };
        dst[i * 2..i * 2 + 2].copy_from_slice(&stored.to_le_bytes());
    }
}

pub fn int16_to_float(n: usize, scale_factor: f32, add_offset: f32, src: &[u8], dst: &mut [u8]) {
    for i in 0..n {
        let stored = i16::from_le_bytes(src[i * 2..i * 2 + 2].try_into().unwrap());
        let v = if stored == i16::MAX {
            f32::NAN
        } else {
            stored as f32 / scale_factor - add_offset
        };
        dst[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
    }
}

pub fn float_to_int16_log10(
    n: usize,
    scale_factor: f32,
    _add_offset: f32,
    src: &[u8],
    dst: &mut [u8],
) {
    for i in 0..n {
        let v = f32::from_le_bytes(src[i * 4..i * 4 + 4].try_into().unwrap());
        let stored = if v.is_nan() {
            i16::MAX
        } else {
            let scaled = ((1.0 + v).log10() * scale_factor).round();
            scaled.clamp(i16::MIN as f32, i16::MAX as f32) as i16
        };
        dst[i * 2..i * 2 + 2].copy_from_slice(&stored.to_le_bytes());
    }
}

pub fn int16_to_float_log10(
    n: usize,
    scale_factor: f32,
    _add_offset: f32,
    src: &[u8],
    dst: &mut [u8],
) {
    for i in 0..n {
        let stored = i16::from_le_bytes(src[i * 2..i * 2 + 2].try_into().unwrap());
        let v = if stored == i16::MAX {
            f32::NAN
        } else {
            10f32.powf(stored as f32 / scale_factor) - 1.0
        };
        dst[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
    }
}

pub fn float_to_int32(n: usize, scale_factor: f32, add_offset: f32, src: &[u8], dst: &mut [u8]) {
    for i in 0..n {
        let v = f32::from_le_bytes(src[i * 4..i * 4 + 4].try_into().unwrap());
        let stored = if v.is_nan() {
            i32::MAX
        } else {
            let scaled = (v * scale_factor + add_offset).round();
            scaled.clamp(i32::MIN as f32, i32::MAX as f32) as i32
        };
        dst[i * 4..i * 4 + 4].copy_from_slice(&stored.to_le_bytes());
    }
}

pub fn int32_to_float(n: usize, scale_factor: f32, add_offset: f32, src: &[u8], dst: &mut [u8]) {
    for i in 0..n {
        let stored = i32::from_le_bytes(src[i * 4..i * 4 + 4].try_into().unwrap());
        let v = if stored == i32::MAX {
            f32::NAN
        } else {
            stored as f32 / scale_factor - add_offset
        };
        dst[i * 4..i * 4 + 4].copy_from_slice(&v.to_le_bytes());
    }
}

pub fn double_to_int64(n: usize, scale_factor: f32, add_offset: f32, src: &[u8], dst: &mut [u8]) {
    for i in 0..n {
        let v = f64::from_le_bytes(src[i * 8..i * 8 + 8].try_into().unwrap());
        let stored = if v.is_nan() {
            i64::MAX
        } else {
            let scaled = (v * scale_factor as f64 + add_offset as f64).round();
            scaled.clamp(i64::MIN as f64, i64::MAX as f64) as i64
        };
        dst[i * 8..i * 8 + 8].copy_from_slice(&stored.to_le_bytes());
    }
}

pub fn int64_to_double(n: usize, scale_factor: f32, add_offset: f32, src: &[u8], dst: &mut [u8]) {
    for i in 0..n {
        let stored = i64::from_le_bytes(src[i * 8..i * 8 + 8].try_into().unwrap());
        let v = if stored == i64::MAX {
            f64::NAN
        } else {
            stored as f64 / scale_factor as f64 - add_offset as f64
        };
        dst[i * 8..i * 8 + 8].copy_from_slice(&v.to_le_bytes());
    }
}
