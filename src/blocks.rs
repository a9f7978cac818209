//! Input splitting and per-block dictionary capture
//!
//! The whole input is read before any compression starts. While splitting we
//! accumulate the CRC32 and length of the raw stream, and each block gets its
//! own copy of the previous block's tail as a deflate dictionary.

use crate::error::{PargzError, PargzResult};
use std::io::Read;
use tracing::debug;

/// Default block size (matches pigz)
pub const DEFAULT_BLOCK_SIZE: usize = 128 * 1024;

/// Dictionary size (DEFLATE maximum is 32KB)
pub const DICT_SIZE: usize = 32 * 1024;

/// One unit of parallel compression.
///
/// Owns both its input bytes and its dictionary, so a worker never observes
/// data that the splitter or another worker can still change.
#[derive(Clone, Debug)]
pub struct Block {
    pub index: usize,
    pub raw: Vec<u8>,
    /// Last <= 32KB of the previous block's raw bytes (empty for block 0)
    pub dictionary: Vec<u8>,
    pub is_first: bool,
    pub is_last: bool,
}

/// Result of splitting an input stream
#[derive(Debug)]
pub struct SplitInput {
    pub blocks: Vec<Block>,
    /// CRC32 of the raw input
    pub crc32: u32,
    /// Raw bytes consumed
    pub total_len: u64,
}

/// Dictionary for the block following `prev`: a copy of its trailing 32KB.
pub fn dictionary_for(prev: &[u8]) -> Vec<u8> {
    let start = prev.len().saturating_sub(DICT_SIZE);
    prev[start..].to_vec()
}

pub struct BlockSplitter {
    block_size: usize,
}

impl BlockSplitter {
    pub fn new(block_size: usize) -> Self {
        assert!(block_size > 0, "block size must be non-zero");
        Self { block_size }
    }

    /// Read `reader` to EOF and cut it into fixed-size blocks.
    ///
    /// Short reads are retried until a block is full, so only the final block
    /// can be smaller than `block_size`.
    pub fn split<R: Read>(&self, mut reader: R) -> PargzResult<SplitInput> {
        let mut hasher = crc32fast::Hasher::new();
        let mut total_len = 0u64;
        let mut chunks: Vec<Vec<u8>> = Vec::new();

        loop {
            let mut chunk = Vec::with_capacity(self.block_size);
            let n = (&mut reader)
                .take(self.block_size as u64)
                .read_to_end(&mut chunk)
                .map_err(PargzError::Input)?;
            if n == 0 {
                break;
            }

            hasher.update(&chunk);
            total_len += n as u64;
            chunks.push(chunk);

            if n < self.block_size {
                break;
            }
        }

        let num_blocks = chunks.len();
        let mut blocks = Vec::with_capacity(num_blocks);
        let mut dictionary = Vec::new();

        for (index, raw) in chunks.into_iter().enumerate() {
            // Snapshot taken now, moved into the block; nothing else holds it
            let next_dictionary = dictionary_for(&raw);
            blocks.push(Block {
                index,
                dictionary: std::mem::replace(&mut dictionary, next_dictionary),
                raw,
                is_first: index == 0,
                is_last: index + 1 == num_blocks,
            });
        }

        let crc32 = hasher.finalize();
        debug!(
            blocks = num_blocks,
            block_size = self.block_size,
            total_len,
            crc32 = format_args!("{:08x}", crc32),
            "split input"
        );

        Ok(SplitInput {
            blocks,
            crc32,
            total_len,
        })
    }
}
