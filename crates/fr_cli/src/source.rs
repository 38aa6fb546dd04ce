//! Reading a program's source text from a file path or, when the path is
//! `-`, from stdin.

use std::io::Read;
use std::path::Path;

use crate::error::Result;

pub fn read(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        Ok(std::fs::read_to_string(Path::new(path))?)
    }
}
