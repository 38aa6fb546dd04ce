//! Differential testing against an external `rustc`: generate a Rust source file for a
//! candidate, invoke `rustc` with a wall-clock timeout, and compare its
//! verdict against the checker's.
//!
//! The driver only ever *describes* this interface: it is exercised by
//! `fr_cli`'s `diff` subcommand and by `fr_fuzz`'s own tests, which are
//! gated behind `FR_TEST_RUSTC` and skipped rather than failed when no
//! external compiler is configured.

use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use fr_syntax::{FrError, LifetimeArena, Term};
use tempfile::NamedTempFile;

use crate::codegen::{to_rust_source, CodegenError};

/// The outcome of comparing the checker's verdict on a candidate against
/// `rustc`'s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOutcome {
    /// Both accepted, or both rejected.
    Agree { accepted: bool },
    /// The checker and `rustc` disagree. `diagnostic_codes` holds every
    /// `Ennnn` diagnostic code scraped from `rustc`'s stderr, for
    /// partitioning disagreements by cause.
    Disagree {
        fr_accepted: bool,
        rustc_accepted: bool,
        diagnostic_codes: Vec<String>,
    },
    /// The comparison could not be completed: codegen doesn't cover this
    /// candidate (e.g. it uses function declarations), or the `rustc`
    /// subprocess timed out.
    Inconclusive { reason: String },
}

/// Run the checker on `term` and compare its verdict against `rustc`'s,
/// spawning `rustc_path` with a `timeout` wall-clock budget.
pub fn run_diff(
    arena: &LifetimeArena,
    term: &Term,
    rustc_path: &Path,
    timeout: Duration,
) -> Result<DiffOutcome, FrError> {
    let fr_accepted = fr_borrowck::check(arena, term).is_ok();

    let source = match to_rust_source(term) {
        Ok(src) => src,
        Err(CodegenError::UnsupportedFunctionCall) => {
            return Ok(DiffOutcome::Inconclusive {
                reason: "codegen does not support function declarations/calls".into(),
            })
        }
    };

    let mut file = NamedTempFile::with_suffix(".rs").map_err(|e| io_error(term, e))?;
    file.write_all(source.as_bytes()).map_err(|e| io_error(term, e))?;
    file.flush().map_err(|e| io_error(term, e))?;

    match invoke_rustc(rustc_path, file.path(), timeout) {
        RustcOutcome::Ran { success, stderr } => {
            let diagnostic_codes = scrape_diagnostic_codes(&stderr);
            if success == fr_accepted {
                Ok(DiffOutcome::Agree { accepted: fr_accepted })
            } else {
                Ok(DiffOutcome::Disagree {
                    fr_accepted,
                    rustc_accepted: success,
                    diagnostic_codes,
                })
            }
        }
        RustcOutcome::TimedOut => Ok(DiffOutcome::Inconclusive {
            reason: format!("rustc exceeded the {timeout:?} timeout"),
        }),
        RustcOutcome::SpawnFailed(reason) => Ok(DiffOutcome::Inconclusive { reason }),
    }
}

enum RustcOutcome {
    Ran { success: bool, stderr: String },
    TimedOut,
    SpawnFailed(String),
}

/// Spawn `rustc`, poll it with [`Child::try_wait`] until it exits or
/// `timeout` elapses, and kill the process on timeout. Synchronous and
/// poll-based rather than a dedicated async runtime: the rest of the driver
/// is plain OS threads, so a wait-with-timeout here would be
/// the only async code in the crate.
fn invoke_rustc(rustc_path: &Path, source: &Path, timeout: Duration) -> RustcOutcome {
    let mut child = match Command::new(rustc_path)
        .arg("--edition=2021")
        .arg("--crate-type=bin")
        .arg("--emit=metadata")
        .arg("-o")
        .arg(scratch_output_path(source))
        .arg(source)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => return RustcOutcome::SpawnFailed(format!("failed to spawn rustc: {e}")),
    };

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => {
                let stderr = read_stderr(&mut child);
                return RustcOutcome::Ran { success: status.success(), stderr };
            }
            Ok(None) => {
                if Instant::now() >= deadline {
                    let _ = child.kill();
                    let _ = child.wait();
                    return RustcOutcome::TimedOut;
                }
                std::thread::sleep(Duration::from_millis(20));
            }
            Err(e) => return RustcOutcome::SpawnFailed(format!("failed to poll rustc: {e}")),
        }
    }
}

fn read_stderr(child: &mut Child) -> String {
    use std::io::Read;
    let mut buf = String::new();
    if let Some(mut stderr) = child.stderr.take() {
        let _ = stderr.read_to_string(&mut buf);
    }
    buf
}

fn scratch_output_path(source: &Path) -> std::path::PathBuf {
    source.with_extension("out")
}

/// Scrape every `error[Ennnn]` / `warning[Ennnn]` diagnostic code out of
/// `rustc`'s stderr.
fn scrape_diagnostic_codes(stderr: &str) -> Vec<String> {
    let mut codes = Vec::new();
    for marker in ["error[", "warning["] {
        let mut rest = stderr;
        while let Some(start) = rest.find(marker) {
            let after = &rest[start + marker.len()..];
            if let Some(end) = after.find(']') {
                codes.push(after[..end].to_string());
                rest = &after[end + 1..];
            } else {
                break;
            }
        }
    }
    codes
}

fn io_error(term: &Term, e: std::io::Error) -> FrError {
    FrError::semantics(term.span, fr_syntax::SemErrorKind::Stuck, format!("diff driver I/O error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrapes_diagnostic_codes_from_stderr() {
        let stderr = "error[E0502]: cannot borrow `x` as mutable\nwarning[E0162]: unreachable pattern\n";
        let codes = scrape_diagnostic_codes(stderr);
        assert_eq!(codes, vec!["E0502".to_string(), "E0162".to_string()]);
    }

    #[test]
    fn no_diagnostics_is_an_empty_list() {
        assert!(scrape_diagnostic_codes("warning: unused variable\n").is_empty());
    }

    /// Gated behind `FR_TEST_RUSTC` (the path to a real `rustc`); skipped,
    /// not failed, when absent.
    #[test]
    fn seed_1_agrees_with_a_real_rustc_when_configured() {
        let Ok(rustc_path) = std::env::var("FR_TEST_RUSTC") else {
            eprintln!("skipping: FR_TEST_RUSTC not set");
            return;
        };
        let (arena, term) = fr_parser::parse("{ let mut x = 123; x }").unwrap();
        let outcome = run_diff(&arena, &term, Path::new(&rustc_path), Duration::from_secs(10)).unwrap();
        assert_eq!(outcome, DiffOutcome::Agree { accepted: true });
    }
}
