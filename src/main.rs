//! pargz - parallel gzip
//!
//! Compresses standard input into a single gzip member on standard output,
//! splitting the input into blocks that are deflated concurrently. Each block
//! is primed with the tail of the block before it, pigz style.

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use clap::Parser;

mod blocks;
mod cli;
mod compression;
mod deflate;
mod error;
mod format;
mod parallel_compress;
mod scheduler;

use cli::{Args, CompressConfig};
use error::{PargzError, PargzResult};

/// Stop flag shared with the workers. Set from the signal handler.
static INTERRUPTED: OnceLock<Arc<AtomicBool>> = OnceLock::new();

fn install_signal_handlers() {
    unsafe {
        // SIGINT (Ctrl-C), SIGTERM, SIGHUP: stop workers and exit without output
        for &sig in &[libc::SIGINT, libc::SIGTERM, libc::SIGHUP] {
            libc::signal(sig, signal_handler as *const () as libc::sighandler_t);
        }
        // SIGPIPE: exit quietly (e.g., piping to head)
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

extern "C" fn signal_handler(sig: libc::c_int) {
    // Atomic store only; the flag was initialised before handlers were installed
    if let Some(flag) = INTERRUPTED.get() {
        flag.store(true, Ordering::SeqCst);
    }

    // A second signal terminates immediately
    unsafe {
        libc::signal(sig, libc::SIG_DFL);
    }
}

fn init_tracing(args: &Args) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log_filter())),
        )
        .init();
}

fn main() {
    let args = Args::parse();
    init_tracing(&args);

    let interrupt = INTERRUPTED
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone();
    install_signal_handlers();

    match run(&args, interrupt) {
        Ok(exit_code) => process::exit(exit_code),
        Err(PargzError::Interrupted) => {
            eprintln!("pargz: interrupted");
            process::exit(130);
        }
        Err(e) => {
            eprintln!("pargz: {}", e);
            process::exit(1);
        }
    }
}

fn run(args: &Args, interrupt: Arc<AtomicBool>) -> PargzResult<i32> {
    // Validate before touching stdin
    let config = CompressConfig::from_args(args)?;
    tracing::debug!(?config, "configuration");

    compression::compress_stdin(&config, interrupt)
}
