//! Single-block raw deflate with a preset dictionary
//!
//! Each call uses a fresh compressor, primes it with the block's dictionary and
//! flushes so the outputs of consecutive blocks concatenate into one valid
//! deflate stream:
//! - non-last blocks: `FlushCompress::Sync` (byte aligned, stream left open)
//! - last block: `FlushCompress::Finish` (final block bit set)

use crate::blocks::Block;
use crate::error::{PargzError, PargzResult};
use flate2::{Compress, Compression, FlushCompress, Status};

/// Default compression level (fastest)
pub const DEFAULT_LEVEL: u32 = 1;

/// Conservative output size for one block, including flush markers.
#[inline]
fn output_capacity(input_len: usize) -> usize {
    input_len + (input_len >> 8) + 64
}

/// Compress one block into raw deflate bytes.
pub fn compress_block(block: &Block, level: u32) -> PargzResult<Vec<u8>> {
    let mut compress = Compress::new(Compression::new(level), false);

    if !block.is_first && !block.dictionary.is_empty() {
        compress
            .set_dictionary(&block.dictionary)
            .map_err(|e| PargzError::compression(block.index, format!("set_dictionary: {}", e)))?;
    }

    let flush = if block.is_last {
        FlushCompress::Finish
    } else {
        FlushCompress::Sync
    };

    let mut output = Vec::with_capacity(output_capacity(block.raw.len()));
    let mut input = &block.raw[..];

    loop {
        if output.len() == output.capacity() {
            output.reserve(output.capacity().max(4096));
        }

        let before_in = compress.total_in();
        let status = compress
            .compress_vec(input, &mut output, flush)
            .map_err(|e| PargzError::compression(block.index, e))?;
        let consumed = (compress.total_in() - before_in) as usize;
        input = &input[consumed..];

        match status {
            Status::StreamEnd => break,
            // A sync flush is complete once all input is in and the
            // compressor stopped short of filling the output.
            Status::Ok | Status::BufError
                if flush == FlushCompress::Sync
                    && input.is_empty()
                    && output.len() < output.capacity() =>
            {
                break
            }
            _ => {}
        }
    }

    Ok(output)
}
