//! `fr fuzz --ints I --vars V --depth D --width W [--start N] [--count N]
//! [--threads N]`: enumerate a (possibly sliced) bounded program space and
//! report any soundness violation found by [`fr_fuzz::soundness`].

use fr_fuzz::{enumerate, scan, SpaceParams};
use log::info;

use crate::error::Result;

#[allow(clippy::too_many_arguments)]
pub fn exec(
    ints: usize,
    vars: usize,
    depth: usize,
    width: usize,
    start: usize,
    count: Option<usize>,
    threads: usize,
) -> Result<()> {
    let params = SpaceParams { ints, vars, depth, width };
    let mut candidates = enumerate(&params);
    let total = candidates.len();
    let start = start.min(total);
    candidates.drain(..start);
    if let Some(count) = count {
        candidates.truncate(count);
    }
    let slice_len = candidates.len();
    info!("scanning {slice_len}/{total} candidates from P({ints},{vars},{depth},{width}) starting at {start}");

    let report = scan(candidates, threads);
    println!(
        "scanned {} (accept: {}, reject: {}, false-negative: {})",
        report.scanned, report.both_accept, report.both_reject, report.false_negatives
    );
    if report.is_sound() {
        println!("no soundness violation found");
    } else {
        println!("{} SOUNDNESS VIOLATION(S) FOUND:", report.violations.len());
        for violation in &report.violations {
            println!("  {} -> {}", violation.term, violation.sem_error);
        }
        anyhow::bail!("soundness violated by {} candidate(s)", report.violations.len());
    }
    Ok(())
}
