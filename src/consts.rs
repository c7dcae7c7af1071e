/// Shared magic prefix of every OM file ("OM").
pub const MAGIC_NUMBER: &[u8; 2] = b"OM";

/// Format version written by this crate.
pub const VERSION: u8 = 3;

/// Size of the v3 file header: magic, version, five reserved zero bytes.
pub const HEADER_SIZE: usize = 8;

/// Size of the legacy (v1/v2) header. The whole file is a single 2-D float
/// array whose metadata lives in this header; an uncompressed LUT follows.
pub const LEGACY_HEADER_SIZE: usize = 40;

/// Size of the v3 trailer: magic, version, reserved, root offset, root size.
pub const TRAILER_SIZE: usize = 24;

/// Number of LUT entries compressed together into one seekable group.
pub const LUT_CHUNK_ELEMENT_COUNT: u64 = 256;

/// Gap threshold below which adjacent backend reads are merged.
pub const IO_SIZE_MERGE_DEFAULT: u64 = 512;

/// Size threshold above which a coalesced backend read is split.
pub const IO_SIZE_MAX_DEFAULT: u64 = 65_536;

/// Longest accepted variable name in bytes.
pub const MAX_NAME_LENGTH: usize = u16::MAX as usize;
