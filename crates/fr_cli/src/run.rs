//! `fr run <FILE|-->`: parse, borrow-check and execute.

use anyhow::anyhow;

use crate::error::Result;
use crate::source;

pub fn exec(path: String, fuel: u64) -> Result<()> {
    let src = source::read(&path)?;
    match fr::run(&src, fuel) {
        Ok((_state, value)) => {
            println!("{value}");
            Ok(())
        }
        Err(err) => Err(anyhow!("{err}")),
    }
}
