//! Standard input to standard output compression

use std::io::{self, stdin, stdout, BufWriter, IsTerminal};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::cli::CompressConfig;
use crate::error::PargzResult;
use crate::parallel_compress::{CompressSummary, ParallelGzEncoder};
use tracing::info;

pub fn compress_stdin(config: &CompressConfig, interrupt: Arc<AtomicBool>) -> PargzResult<i32> {
    // Refuse to write compressed binary data to a terminal (unless -f)
    if !config.force && io::stdout().is_terminal() {
        eprintln!("pargz: compressed data not written to a terminal. Use -f to force compression.");
        return Ok(1);
    }

    let encoder = ParallelGzEncoder::new(config.level, config.processes)
        .with_block_size(config.block_size)
        .with_interrupt(interrupt);

    let input = stdin().lock();
    let output = BufWriter::with_capacity(1024 * 1024, stdout().lock());
    let summary = encoder.compress(input, output)?;

    print_compression_stats(&summary, config.processes);
    Ok(0)
}

fn print_compression_stats(summary: &CompressSummary, processes: usize) {
    let ratio = if summary.bytes_in > 0 {
        summary.bytes_out as f64 / summary.bytes_in as f64
    } else {
        1.0
    };
    let saved_pct = (1.0 - ratio) * 100.0;

    let (in_size, in_unit) = format_size(summary.bytes_in);
    let (out_size, out_unit) = format_size(summary.bytes_out);

    info!(
        "stdin: {:.1}{} → {:.1}{} ({:.1}% saved, {} blocks, {} threads)",
        in_size, in_unit, out_size, out_unit, saved_pct, summary.blocks, processes
    );
}

fn format_size(bytes: u64) -> (f64, &'static str) {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    const GB: u64 = 1024 * 1024 * 1024;

    if bytes >= GB {
        (bytes as f64 / GB as f64, "GB")
    } else if bytes >= MB {
        (bytes as f64 / MB as f64, "MB")
    } else if bytes >= KB {
        (bytes as f64 / KB as f64, "KB")
    } else {
        (bytes as f64, "B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_units() {
        assert_eq!(format_size(512), (512.0, "B"));
        assert_eq!(format_size(2048), (2.0, "KB"));
        assert_eq!(format_size(3 * 1024 * 1024), (3.0, "MB"));
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), (5.0, "GB"));
    }
}
