use std::path::PathBuf;

use clap::Parser;
use log::debug;

mod check;
mod diff;
mod error;
mod fuzz;
mod logger;
mod run;
mod source;

use error::Result;
use fr::DEFAULT_FUEL;

#[derive(Debug, Parser)]
#[command(name = "fr", author, version, about = "FeatherweightRust: a mechanised core of Rust's borrow-checking discipline")]
enum Command {
    /// Parse and borrow-check a program without running it.
    Check {
        /// Path to the source file, or `-` for stdin.
        #[arg(value_name = "FILE")]
        path: String,
    },
    /// Parse, borrow-check and execute a program.
    Run {
        /// Path to the source file, or `-` for stdin.
        #[arg(value_name = "FILE")]
        path: String,
        /// Maximum number of reduction steps before giving up.
        #[arg(long, default_value_t = DEFAULT_FUEL)]
        fuel: u64,
    },
    /// Exhaustively (or by sample) scan a bounded program space for
    /// soundness violations.
    Fuzz {
        /// Number of distinct integer literals in scope.
        #[arg(long, default_value_t = 2)]
        ints: usize,
        /// Number of distinct variable names in scope.
        #[arg(long, default_value_t = 2)]
        vars: usize,
        /// Maximum nesting depth of the generated terms.
        #[arg(long, default_value_t = 2)]
        depth: usize,
        /// Maximum number of statements per block.
        #[arg(long, default_value_t = 2)]
        width: usize,
        /// Index of the first candidate to scan, in enumeration order.
        #[arg(long, default_value_t = 0)]
        start: usize,
        /// Number of candidates to scan, starting at `--start`. Scans to
        /// the end of the space when omitted.
        #[arg(long)]
        count: Option<usize>,
        /// Number of worker threads to scan with.
        #[arg(long, default_value_t = 1)]
        threads: usize,
    },
    /// Run the differential driver against an external `rustc` for one
    /// program.
    Diff {
        /// Path to the source file, or `-` for stdin.
        #[arg(value_name = "FILE")]
        path: String,
        /// Path to the `rustc` binary to compare against.
        #[arg(long, default_value = "rustc")]
        rustc: PathBuf,
        /// Wall-clock timeout for the `rustc` invocation, in milliseconds.
        #[arg(long, default_value_t = 5_000)]
        timeout_ms: u64,
    },
}

fn exec(command: Command) -> Result<()> {
    match command {
        Command::Check { path } => check::exec(path),
        Command::Run { path, fuel } => run::exec(path, fuel),
        Command::Fuzz { ints, vars, depth, width, start, count, threads } => {
            fuzz::exec(ints, vars, depth, width, start, count, threads)
        }
        Command::Diff { path, rustc, timeout_ms } => diff::exec(path, rustc, timeout_ms),
    }
}

fn main() {
    logger::init_logger();

    let command = Command::parse();

    debug!("Command: {:?}", command);

    if let Err(err) = exec(command) {
        error::print(&err);
        std::process::exit(1);
    }
}
