//! RFC 1952 container framing: the fixed member header and the CRC/ISIZE trailer.

/// Gzip magic bytes
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression method identifier for DEFLATE (CM field)
pub const CM_DEFLATE: u8 = 0x08;

/// Operating system field: unknown
pub const OS_UNKNOWN: u8 = 0xff;

pub const HEADER_LEN: usize = 10;
pub const TRAILER_LEN: usize = 8;

/// Fixed header: no FEXTRA/FNAME/FCOMMENT, MTIME unset, no extra flags.
pub const GZIP_HEADER: [u8; HEADER_LEN] = [
    GZIP_MAGIC[0],
    GZIP_MAGIC[1],
    CM_DEFLATE, // CM
    0x00,       // FLG
    0,
    0,
    0,
    0,    // MTIME
    0x00, // XFL
    OS_UNKNOWN,
];

/// A complete deflate stream with no content: one empty final fixed-Huffman block.
pub const EMPTY_DEFLATE_STREAM: [u8; 2] = [0x03, 0x00];

/// Gzip trailer: CRC32 of the uncompressed data and its length mod 2^32
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GzipTrailer {
    pub crc32: u32,
    pub isize: u32,
}

impl GzipTrailer {
    pub fn new(crc32: u32, total_len: u64) -> Self {
        Self {
            crc32,
            // ISIZE keeps only the low 32 bits
            isize: total_len as u32,
        }
    }

    pub fn to_bytes(&self) -> [u8; TRAILER_LEN] {
        let mut out = [0u8; TRAILER_LEN];
        out[..4].copy_from_slice(&self.crc32.to_le_bytes());
        out[4..].copy_from_slice(&self.isize.to_le_bytes());
        out
    }
}
