//! Pigz-style block scheduler
//!
//! N scoped worker threads claim blocks through an atomic counter and write
//! each result into the slot for that block index. The coordinator joins the
//! scope and then reads the slots in index order, so completion order never
//! affects output order.
//!
//! Any failed task aborts the whole run: the first error is kept, the abort
//! flag stops workers from claiming more blocks, and no partial result is
//! returned. The external interrupt flag is honoured the same way.

use crate::blocks::Block;
use crate::error::{PargzError, PargzResult};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};
use std::thread;
use tracing::{debug, warn};

/// Compressed output for one block
#[derive(Debug)]
pub struct CompressedBlock {
    pub index: usize,
    pub bytes: Vec<u8>,
}

/// Output slot for one block, filled by exactly one worker
struct BlockSlot {
    data: OnceLock<Vec<u8>>,
}

impl BlockSlot {
    fn new() -> Self {
        Self {
            data: OnceLock::new(),
        }
    }

    fn fill(&self, bytes: Vec<u8>) {
        // Indices are claimed once, so the slot is always empty here
        let _ = self.data.set(bytes);
    }

    fn into_inner(self) -> Option<Vec<u8>> {
        self.data.into_inner()
    }
}

/// State shared by the workers of one run
struct RunState<'a> {
    blocks: &'a [Block],
    slots: &'a [BlockSlot],
    next_block: AtomicUsize,
    abort: AtomicBool,
    interrupt: &'a AtomicBool,
    first_error: Mutex<Option<PargzError>>,
}

impl RunState<'_> {
    fn should_stop(&self) -> bool {
        self.abort.load(Ordering::Acquire) || self.interrupt.load(Ordering::Acquire)
    }

    fn fail(&self, err: PargzError) {
        let mut slot = match self.first_error.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if slot.is_none() {
            warn!("aborting: {}", err);
            *slot = Some(err);
        }
        self.abort.store(true, Ordering::Release);
    }
}

/// Compress `blocks` on up to `num_threads` workers.
///
/// Returns one `CompressedBlock` per input block, in index order, or the first
/// failure. `compress_fn` must not depend on anything but the block it is given.
pub fn compress_blocks<F>(
    blocks: &[Block],
    num_threads: usize,
    interrupt: &AtomicBool,
    compress_fn: F,
) -> PargzResult<Vec<CompressedBlock>>
where
    F: Fn(&Block) -> PargzResult<Vec<u8>> + Sync,
{
    let num_blocks = blocks.len();
    if num_blocks == 0 {
        return Ok(Vec::new());
    }

    let slots: Vec<BlockSlot> = (0..num_blocks).map(|_| BlockSlot::new()).collect();
    let state = RunState {
        blocks,
        slots: &slots,
        next_block: AtomicUsize::new(0),
        abort: AtomicBool::new(false),
        interrupt,
        first_error: Mutex::new(None),
    };

    let workers = num_threads.clamp(1, num_blocks);
    debug!(workers, blocks = num_blocks, "starting compression workers");

    let panicked = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| scope.spawn(|| worker_loop(&state, &compress_fn)))
            .collect();

        // Join point: every worker has stopped before we look at any slot
        handles
            .into_iter()
            .map(|handle| handle.join())
            .filter(|joined| joined.is_err())
            .count()
    });

    let first_error = match state.first_error.into_inner() {
        Ok(err) => err,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(err) = first_error {
        return Err(err);
    }
    if panicked > 0 {
        return Err(PargzError::thread(format!(
            "{} compression worker(s) panicked",
            panicked
        )));
    }
    if interrupt.load(Ordering::Acquire) {
        return Err(PargzError::Interrupted);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.into_inner()
                .map(|bytes| CompressedBlock { index, bytes })
                .ok_or_else(|| PargzError::thread(format!("block {} was never compressed", index)))
        })
        .collect()
}

/// Worker loop: claims blocks via atomic counter and compresses them
fn worker_loop<F>(state: &RunState<'_>, compress_fn: &F)
where
    F: Fn(&Block) -> PargzResult<Vec<u8>>,
{
    let num_blocks = state.blocks.len();
    loop {
        if state.should_stop() {
            break;
        }

        let block_idx = state.next_block.fetch_add(1, Ordering::Relaxed);
        if block_idx >= num_blocks {
            break;
        }

        let block = &state.blocks[block_idx];
        match compress_fn(block) {
            Ok(bytes) => {
                debug!(
                    block = block_idx,
                    raw = block.raw.len(),
                    compressed = bytes.len(),
                    "block done"
                );
                state.slots[block_idx].fill(bytes);
            }
            Err(err) => {
                state.fail(err);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockSplitter;
    use std::io::Cursor;
    use std::time::Duration;

    fn split(data: &[u8], block_size: usize) -> Vec<Block> {
        BlockSplitter::new(block_size)
            .split(Cursor::new(data))
            .unwrap()
            .blocks
    }

    fn concat(results: &[CompressedBlock]) -> Vec<u8> {
        results.iter().flat_map(|r| r.bytes.iter().copied()).collect()
    }

    #[test]
    fn test_parallel_basic() {
        let input = b"Hello, world! ".repeat(1000);
        let blocks = split(&input, 1024);
        let never = AtomicBool::new(false);

        let results = compress_blocks(&blocks, 4, &never, |block| Ok(block.raw.clone())).unwrap();

        assert_eq!(results.len(), blocks.len());
        assert_eq!(concat(&results), input);
    }

    #[test]
    fn test_parallel_ordering() {
        // Early blocks are slowest, so completion order is roughly reversed
        let input: Vec<u8> = (0..100).collect();
        let blocks = split(&input, 10);
        let never = AtomicBool::new(false);

        let results = compress_blocks(&blocks, 4, &never, |block| {
            thread::sleep(Duration::from_millis((10 - block.index as u64) * 3));
            Ok(block.raw.clone())
        })
        .unwrap();

        for (i, result) in results.iter().enumerate() {
            assert_eq!(result.index, i);
        }
        assert_eq!(concat(&results), input);
    }

    #[test]
    fn test_single_block() {
        let input = b"small";
        let blocks = split(input, 1024);
        let never = AtomicBool::new(false);

        let results = compress_blocks(&blocks, 4, &never, |block| Ok(block.raw.clone())).unwrap();
        assert_eq!(concat(&results), input.as_slice());
    }

    #[test]
    fn test_no_blocks() {
        let never = AtomicBool::new(false);
        let results = compress_blocks(&[], 4, &never, |_| unreachable!()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_failure_aborts_run() {
        let input = vec![0u8; 64 * 1024];
        let blocks = split(&input, 1024);
        let never = AtomicBool::new(false);
        let attempted = AtomicUsize::new(0);

        let err = compress_blocks(&blocks, 2, &never, |block| {
            attempted.fetch_add(1, Ordering::Relaxed);
            if block.index == 3 {
                Err(PargzError::compression(block.index, "backend failure"))
            } else {
                thread::sleep(Duration::from_millis(2));
                Ok(block.raw.clone())
            }
        })
        .unwrap_err();

        match err {
            PargzError::Compression { block, .. } => assert_eq!(block, 3),
            other => panic!("unexpected error: {other}"),
        }
        assert!(
            attempted.load(Ordering::Relaxed) < blocks.len(),
            "workers should stop claiming blocks after a failure"
        );
    }

    #[test]
    fn test_interrupt_stops_workers() {
        let input = vec![1u8; 16 * 1024];
        let blocks = split(&input, 1024);
        let interrupt = AtomicBool::new(false);

        let err = compress_blocks(&blocks, 2, &interrupt, |block| {
            if block.index == 1 {
                interrupt.store(true, Ordering::Release);
            }
            Ok(block.raw.clone())
        })
        .unwrap_err();

        assert!(matches!(err, PargzError::Interrupted));
    }

    #[test]
    fn test_worker_panic_is_reported() {
        let input = vec![1u8; 4096];
        let blocks = split(&input, 1024);
        let never = AtomicBool::new(false);

        let err = compress_blocks(&blocks, 2, &never, |block| {
            if block.index == 2 {
                panic!("boom");
            }
            Ok(block.raw.clone())
        })
        .unwrap_err();

        assert!(matches!(err, PargzError::Thread(_)));
    }
}
