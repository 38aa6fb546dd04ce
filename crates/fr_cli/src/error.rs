//! The CLI's error handling: every subcommand returns `anyhow::Result`, so
//! parse/check/semantic failures and I/O failures can all be propagated with
//! `?` and printed uniformly by `main`.

pub type Result<T> = anyhow::Result<T>;

pub fn print(err: &anyhow::Error) {
    eprintln!("error: {err:#}");
}
