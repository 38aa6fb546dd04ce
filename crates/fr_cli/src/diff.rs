//! `fr diff <FILE|--> [--rustc PATH] [--timeout-ms N]`: run the
//! differential driver against an external `rustc` for one program.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;
use fr_fuzz::{run_diff, DiffOutcome};

use crate::error::Result;
use crate::source;

pub fn exec(path: String, rustc: PathBuf, timeout_ms: u64) -> Result<()> {
    let src = source::read(&path)?;
    let (arena, term) = fr::parse(&src).map_err(|e| anyhow!("{e}"))?;
    let outcome = run_diff(&arena, &term, &rustc, Duration::from_millis(timeout_ms)).map_err(|e| anyhow!("{e}"))?;
    match outcome {
        DiffOutcome::Agree { accepted } => {
            println!("agree: both {} this program", if accepted { "accept" } else { "reject" });
            Ok(())
        }
        DiffOutcome::Disagree { fr_accepted, rustc_accepted, diagnostic_codes } => {
            println!(
                "disagree: fr {} / rustc {} (diagnostics: {})",
                verdict(fr_accepted),
                verdict(rustc_accepted),
                if diagnostic_codes.is_empty() { "none".to_string() } else { diagnostic_codes.join(", ") }
            );
            anyhow::bail!("checker and rustc disagree on this program")
        }
        DiffOutcome::Inconclusive { reason } => {
            println!("inconclusive: {reason}");
            Ok(())
        }
    }
}

fn verdict(accepted: bool) -> &'static str {
    if accepted {
        "accepts"
    } else {
        "rejects"
    }
}
