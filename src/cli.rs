//! Command-line arguments and validated compression settings

use crate::blocks::DEFAULT_BLOCK_SIZE;
use crate::deflate::DEFAULT_LEVEL;
use crate::error::{PargzError, PargzResult};
use crate::parallel_compress::default_thread_count;
use clap::{ArgAction, Parser};

/// Upper bound on worker threads accepted from the command line
pub const MAX_PROCESSES: usize = 4096;

/// Block size limits in KiB (pigz: at least 32K)
pub const MIN_BLOCK_KIB: usize = 32;
pub const MAX_BLOCK_KIB: usize = 512 * 1024;

#[derive(Parser, Debug)]
#[command(name = "pargz")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Compress standard input to standard output as gzip, using multiple processors",
    long_about = None
)]
pub struct Args {
    /// Number of compression threads (default: all CPUs)
    #[arg(short = 'p', long = "processes", value_name = "N")]
    pub processes: Option<usize>,

    /// Compression block size in KiB
    #[arg(
        short = 'b',
        long = "blocksize",
        value_name = "KIB",
        default_value_t = DEFAULT_BLOCK_SIZE / 1024
    )]
    pub blocksize: usize,

    /// Compression level (0 = store, 1 = fastest, 9 = best)
    #[arg(short = 'l', long = "level", value_name = "N", default_value_t = DEFAULT_LEVEL)]
    pub level: u32,

    /// Write compressed data even if stdout is a terminal
    #[arg(short, long)]
    pub force: bool,

    /// More output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only report errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Args {
    /// Default tracing filter for the chosen verbosity
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Settings for one compression run
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressConfig {
    pub processes: usize,
    pub block_size: usize,
    pub level: u32,
    pub force: bool,
}

impl CompressConfig {
    /// Build and validate settings. Runs before any input is read.
    pub fn from_args(args: &Args) -> PargzResult<Self> {
        let config = CompressConfig {
            processes: args.processes.unwrap_or_else(default_thread_count),
            block_size: args.blocksize.saturating_mul(1024),
            level: args.level,
            force: args.force,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> PargzResult<()> {
        if self.processes == 0 || self.processes > MAX_PROCESSES {
            return Err(PargzError::invalid_argument(format!(
                "number of processes must be between 1 and {}, got {}",
                MAX_PROCESSES, self.processes
            )));
        }

        let kib = self.block_size / 1024;
        if self.block_size % 1024 != 0 || !(MIN_BLOCK_KIB..=MAX_BLOCK_KIB).contains(&kib) {
            return Err(PargzError::invalid_argument(format!(
                "block size must be between {}K and {}K, got {} bytes",
                MIN_BLOCK_KIB, MAX_BLOCK_KIB, self.block_size
            )));
        }

        if self.level > 9 {
            return Err(PargzError::invalid_argument(format!(
                "compression level must be 0-9, got {}",
                self.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("pargz").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = CompressConfig::from_args(&parse(&[])).unwrap();
        assert_eq!(config.block_size, 128 * 1024);
        assert_eq!(config.level, 1);
        assert_eq!(config.processes, default_thread_count());
        assert!(!config.force);
    }

    #[test]
    fn test_processes_flag() {
        for argv in [&["-p", "3"][..], &["--processes", "3"][..], &["-p3"][..]] {
            let config = CompressConfig::from_args(&parse(argv)).unwrap();
            assert_eq!(config.processes, 3, "{:?}", argv);
        }
    }

    #[test]
    fn test_non_numeric_processes_is_usage_error() {
        assert!(Args::try_parse_from(["pargz", "-p", "many"]).is_err());
        assert!(Args::try_parse_from(["pargz", "-p", "-2"]).is_err());
    }

    #[test]
    fn test_out_of_range_processes() {
        for value in ["0", "4097"] {
            let err = CompressConfig::from_args(&parse(&["-p", value])).unwrap_err();
            assert!(matches!(err, PargzError::InvalidArgument(_)), "{}", value);
        }
        assert!(CompressConfig::from_args(&parse(&["-p", "4096"])).is_ok());
    }

    #[test]
    fn test_blocksize_limits() {
        let config = CompressConfig::from_args(&parse(&["-b", "64"])).unwrap();
        assert_eq!(config.block_size, 64 * 1024);

        let err = CompressConfig::from_args(&parse(&["-b", "16"])).unwrap_err();
        assert!(matches!(err, PargzError::InvalidArgument(_)));
    }

    #[test]
    fn test_level_limits() {
        assert!(CompressConfig::from_args(&parse(&["-l", "9"])).is_ok());
        assert!(CompressConfig::from_args(&parse(&["--level", "0"])).is_ok());
        assert!(CompressConfig::from_args(&parse(&["-l", "10"])).is_err());
    }

    #[test]
    fn test_log_filter() {
        assert_eq!(parse(&[]).log_filter(), "warn");
        assert_eq!(parse(&["-v"]).log_filter(), "info");
        assert_eq!(parse(&["-vv"]).log_filter(), "debug");
        assert_eq!(parse(&["-q"]).log_filter(), "error");
        assert!(Args::try_parse_from(["pargz", "-q", "-v"]).is_err());
    }
}
