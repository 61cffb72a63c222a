//! JSON input and output helpers.

use std::{fs, io::Read, path::Path};

use serde::{de::DeserializeOwned, Serialize};

use super::Result;

/// Reads and parses a JSON document. A path of `-` reads from stdin.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(path)?
    };
    Ok(serde_json::from_str(&content)?)
}

/// Writes `value` as pretty JSON to `output`, or to stdout when no file is given.
pub fn write_json<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}
