//! `fr check <FILE|-->`: parse and borrow-check only.

use anyhow::anyhow;

use crate::error::Result;
use crate::source;

pub fn exec(path: String) -> Result<()> {
    let src = source::read(&path)?;
    match fr::check(&src) {
        Ok(ty) => {
            println!("ok: {ty}");
            Ok(())
        }
        Err(err) => Err(anyhow!("{err}")),
    }
}
