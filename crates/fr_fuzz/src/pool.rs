//! The enumerator's worker pool: batches
//! of independent program instances processed by a fixed number of scoped
//! OS threads, with a shared aggregate combined by an associative reduction
//! at batch boundaries. No channel or async runtime: the workload is
//! CPU-bound and every candidate is independent by construction.

use std::sync::Arc;

use parking_lot::Mutex;

use fr_syntax::FrError;

use crate::enumerate::Candidate;
use crate::soundness::{check_soundness, Verdict};

/// One falsifying candidate, recorded with enough context to reproduce it
/// without keeping the whole `Candidate` (and its lifetime arena) alive.
#[derive(Debug, Clone)]
pub struct Violation {
    pub term: String,
    pub sem_error: FrError,
}

/// The aggregate a batch of candidates reduces to. Associative and
/// commutative (`merge` does not care which side ran first), so threads can
/// fold their own slice locally and merge once at the end.
#[derive(Debug, Clone, Default)]
pub struct PoolReport {
    pub scanned: usize,
    pub both_accept: usize,
    pub both_reject: usize,
    pub false_negatives: usize,
    pub violations: Vec<Violation>,
}

impl PoolReport {
    fn record(&mut self, candidate: &Candidate, verdict: Verdict) {
        self.scanned += 1;
        match verdict {
            Verdict::BothAccept => self.both_accept += 1,
            Verdict::BothReject { .. } => self.both_reject += 1,
            Verdict::FalseNegative { .. } => self.false_negatives += 1,
            Verdict::FalsePositive { sem_error } => self.violations.push(Violation {
                term: candidate.term.to_string(),
                sem_error,
            }),
        }
    }

    /// The associative reduction combining two batches' aggregates into
    /// one.
    pub fn merge(mut self, mut other: PoolReport) -> PoolReport {
        self.scanned += other.scanned;
        self.both_accept += other.both_accept;
        self.both_reject += other.both_reject;
        self.false_negatives += other.false_negatives;
        self.violations.append(&mut other.violations);
        self
    }

    pub fn is_sound(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Scan `candidates` across `threads` worker threads, each draining an
/// independent contiguous slice, and merge their reports into one.
/// `threads == 0` is treated as `1`.
pub fn scan(candidates: Vec<Candidate>, threads: usize) -> PoolReport {
    let threads = threads.max(1);
    if candidates.is_empty() {
        return PoolReport::default();
    }
    let chunk_size = candidates.len().div_ceil(threads);
    let aggregate = Arc::new(Mutex::new(PoolReport::default()));

    std::thread::scope(|scope| {
        for chunk in candidates.chunks(chunk_size) {
            let aggregate = Arc::clone(&aggregate);
            scope.spawn(move || {
                let mut local = PoolReport::default();
                for candidate in chunk {
                    let verdict = check_soundness(candidate);
                    log::trace!("scanned candidate `{}`", candidate.term);
                    local.record(candidate, verdict);
                }
                let mut guard = aggregate.lock();
                *guard = std::mem::take(&mut *guard).merge(local);
            });
        }
    });

    Arc::try_unwrap(aggregate)
        .unwrap_or_else(|_| panic!("all scoped threads have joined"))
        .into_inner()
}
