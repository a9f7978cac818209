//! Parallel gzip compression with dictionary-chained blocks
//!
//! The input is read completely, cut into fixed blocks (128KB by default), and
//! each block is compressed on the worker pool with the previous block's last
//! 32KB as its preset dictionary. The block outputs are sync-flushed (the last
//! one finished), so their concatenation is a single deflate stream. The
//! result is one gzip member, the same shape a sequential compressor produces.
//!
//! Nothing reaches the writer until every block has compressed successfully:
//! the container is assembled in memory and written with one `write_all` and
//! one `flush`.

use crate::blocks::{Block, BlockSplitter, DEFAULT_BLOCK_SIZE};
use crate::deflate::compress_block;
use crate::error::{PargzError, PargzResult};
use crate::format::{GzipTrailer, EMPTY_DEFLATE_STREAM, GZIP_HEADER, HEADER_LEN, TRAILER_LEN};
use crate::scheduler::{compress_blocks, CompressedBlock};
use std::io::{Read, Write};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info};

/// What one compression run consumed and produced
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CompressSummary {
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub blocks: usize,
}

/// Parallel gzip compression using the block scheduler
pub struct ParallelGzEncoder {
    compression_level: u32,
    num_threads: usize,
    block_size: usize,
    interrupt: Arc<AtomicBool>,
}

impl ParallelGzEncoder {
    pub fn new(compression_level: u32, num_threads: usize) -> Self {
        Self {
            compression_level,
            num_threads: num_threads.max(1),
            block_size: DEFAULT_BLOCK_SIZE,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_block_size(mut self, block_size: usize) -> Self {
        assert!(block_size > 0, "block size must be non-zero");
        self.block_size = block_size;
        self
    }

    /// Share a stop flag with the caller (e.g. a signal handler).
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Compress everything from `reader` into one gzip member on `writer`.
    pub fn compress<R: Read, W: Write>(
        &self,
        reader: R,
        writer: W,
    ) -> PargzResult<CompressSummary> {
        let level = self.compression_level;
        self.compress_with(reader, writer, |block| compress_block(block, level))
    }

    /// Same as `compress`, with the per-block deflate step supplied by the caller.
    pub fn compress_with<R, W, F>(
        &self,
        reader: R,
        mut writer: W,
        compress_fn: F,
    ) -> PargzResult<CompressSummary>
    where
        R: Read,
        W: Write,
        F: Fn(&Block) -> PargzResult<Vec<u8>> + Sync,
    {
        let split = BlockSplitter::new(self.block_size).split(reader)?;
        let trailer = GzipTrailer::new(split.crc32, split.total_len);
        let num_blocks = split.blocks.len();

        info!(
            "compressing {} bytes in {} blocks of {}KB with {} threads",
            split.total_len,
            num_blocks,
            self.block_size / 1024,
            self.num_threads.min(num_blocks.max(1))
        );

        let compressed = compress_blocks(
            &split.blocks,
            self.num_threads,
            &self.interrupt,
            compress_fn,
        )?;
        let container = assemble_container(&compressed, &trailer);

        writer.write_all(&container).map_err(PargzError::Output)?;
        writer.flush().map_err(PargzError::Output)?;

        debug!(bytes = container.len(), "container written");

        Ok(CompressSummary {
            bytes_in: split.total_len,
            bytes_out: container.len() as u64,
            blocks: num_blocks,
        })
    }
}

/// Number of workers when none is requested: one per available CPU
pub fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Frame compressed blocks as a gzip member.
///
/// `blocks` must be in index order (as returned by the scheduler). With no
/// blocks the payload is the empty deflate stream so the member still decodes.
pub fn assemble_container(blocks: &[CompressedBlock], trailer: &GzipTrailer) -> Vec<u8> {
    let payload_len: usize = if blocks.is_empty() {
        EMPTY_DEFLATE_STREAM.len()
    } else {
        blocks.iter().map(|b| b.bytes.len()).sum()
    };

    let mut out = Vec::with_capacity(HEADER_LEN + payload_len + TRAILER_LEN);
    out.extend_from_slice(&GZIP_HEADER);

    if blocks.is_empty() {
        out.extend_from_slice(&EMPTY_DEFLATE_STREAM);
    }
    for (position, block) in blocks.iter().enumerate() {
        debug_assert_eq!(block.index, position, "blocks out of order");
        out.extend_from_slice(&block.bytes);
    }

    out.extend_from_slice(&trailer.to_bytes());
    out
}
