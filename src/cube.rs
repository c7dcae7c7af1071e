//! Chunk geometry shared by the encoder and decoder.
//!
//! A chunk is a rectangular tile of the array; edge chunks are clamped to the
//! array bounds, so a chunk buffer is row-major over the *clamped* extents.
//! Copying between a chunk buffer and a caller cube walks an odometer across
//! the copied span and moves the longest contiguous run per step. Encoder and
//! decoder use the same walk in opposite directions, which is what keeps
//! partial edge chunks, multi-chunk requests and sub-chunk requests mutually
//! consistent.

use smallvec::SmallVec;

pub(crate) type Dims = SmallVec<[u64; 4]>;

/// Number of chunks along each axis.
pub(crate) fn chunks_per_dim(dims: &[u64], chunks: &[u64]) -> Dims {
    dims.iter()
        .zip(chunks.iter())
        .map(|(&d, &c)| d.div_ceil(c))
        .collect()
}

/// Total number of chunks in the array.
pub(crate) fn total_chunks(dims: &[u64], chunks: &[u64]) -> u64 {
    chunks_per_dim(dims, chunks).iter().product()
}

/// Multi-index of a linear chunk index, row-major over `radix`.
pub(crate) fn chunk_coords(mut index: u64, radix: &[u64]) -> Dims {
    let mut coords: Dims = SmallVec::from_elem(0, radix.len());
    for i in (0..radix.len()).rev() {
        coords[i] = index % radix[i];
        index /= radix[i];
    }
    coords
}

/// Clamped per-axis extent of the chunk at `coords`.
pub(crate) fn chunk_extent(coords: &[u64], dims: &[u64], chunks: &[u64]) -> Dims {
    coords
        .iter()
        .zip(dims.iter().zip(chunks.iter()))
        .map(|(&c, (&d, &k))| ((c + 1) * k).min(d) - c * k)
        .collect()
}

fn strides(extents: &[u64]) -> Dims {
    let mut strides: Dims = SmallVec::from_elem(1, extents.len());
    for i in (0..extents.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * extents[i + 1];
    }
    strides
}

/// Walk every contiguous run of the span shared by a chunk buffer and a cube.
///
/// - `span`: elements copied per axis.
/// - `buf_extent` / `buf_origin`: chunk-buffer shape and the span's start in it.
/// - `cube_dims` / `cube_origin`: cube shape and the span's start in it.
///
/// `f(run_len, buf_elem_offset, cube_elem_offset)` is invoked once per run.
/// Trailing axes where the span covers both the chunk buffer and the cube
/// entirely collapse into one longer run.
pub(crate) fn for_each_run(
    span: &[u64],
    buf_extent: &[u64],
    buf_origin: &[u64],
    cube_dims: &[u64],
    cube_origin: &[u64],
    mut f: impl FnMut(usize, usize, usize),
) {
    let n = span.len();
    debug_assert!(n > 0);
    if span.iter().any(|&s| s == 0) {
        return;
    }

    let mut run = 1u64;
    let mut split = n;
    for i in (0..n).rev() {
        if span[i] == buf_extent[i] && span[i] == cube_dims[i] {
            run *= span[i];
            split = i;
        } else {
            if i == n - 1 {
                run = span[i];
                split = i;
            }
            break;
        }
    }

    let buf_strides = strides(buf_extent);
    let cube_strides = strides(cube_dims);
    let buf_base: u64 = buf_origin
        .iter()
        .zip(buf_strides.iter())
        .map(|(&o, &s)| o * s)
        .sum();
    let cube_base: u64 = cube_origin
        .iter()
        .zip(cube_strides.iter())
        .map(|(&o, &s)| o * s)
        .sum();

    let mut idx: Dims = SmallVec::from_elem(0, split);
    'outer: loop {
        let mut buf_off = buf_base;
        let mut cube_off = cube_base;
        for i in 0..split {
            buf_off += idx[i] * buf_strides[i];
            cube_off += idx[i] * cube_strides[i];
        }
        f(run as usize, buf_off as usize, cube_off as usize);

        let mut axis = split;
        while axis > 0 {
            axis -= 1;
            idx[axis] += 1;
            if idx[axis] < span[axis] {
                continue 'outer;
            }
            idx[axis] = 0;
        }
        break;
    }
}

/// Yields, in increasing order, the linear indices of all chunks intersecting
/// a sub-cube request.
#[derive(Clone)]
pub(crate) struct ChunkIndexIter {
    radix: Dims,
    lo: Dims,
    hi: Dims,
    cur: Dims,
    done: bool,
}

impl ChunkIndexIter {
    pub(crate) fn new(dims: &[u64], chunks: &[u64], offset: &[u64], count: &[u64]) -> Self {
        let radix = chunks_per_dim(dims, chunks);
        let empty = count.iter().any(|&c| c == 0) || dims.is_empty();
        let lo: Dims = offset
            .iter()
            .zip(chunks.iter())
            .map(|(&o, &c)| o / c)
            .collect();
        let hi: Dims = offset
            .iter()
            .zip(count.iter().zip(chunks.iter()))
            .map(|(&o, (&n, &c))| if n == 0 { 0 } else { (o + n - 1) / c })
            .collect();
        Self {
            cur: lo.clone(),
            radix,
            lo,
            hi,
            done: empty,
        }
    }
}

impl Iterator for ChunkIndexIter {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        if self.done {
            return None;
        }
        let mut linear = 0u64;
        for i in 0..self.radix.len() {
            linear = linear * self.radix[i] + self.cur[i];
        }

        let mut axis = self.cur.len();
        loop {
            if axis == 0 {
                self.done = true;
                break;
            }
            axis -= 1;
            self.cur[axis] += 1;
            if self.cur[axis] <= self.hi[axis] {
                break;
            }
            self.cur[axis] = self.lo[axis];
        }
        Some(linear)
    }
}
