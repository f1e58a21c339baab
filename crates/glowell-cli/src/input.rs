//! Reading JSON documents from a file argument or stdin.

use std::io::Read;

use anyhow::{Context, Result};
use serde_json::Value;

/// Read and parse JSON from `source`, where `-` means stdin.
pub fn read_json(source: &str) -> Result<Value> {
    let text = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read {source}"))?
    };
    let label = if source == "-" { "stdin" } else { source };
    serde_json::from_str(&text).with_context(|| format!("{label} is not valid JSON"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("intake.json");
        std::fs::write(&path, r#"{"name":"Asha"}"#).unwrap();
        let value = read_json(path.to_str().unwrap()).unwrap();
        assert_eq!(value["name"], "Asha");
    }

    #[test]
    fn invalid_json_names_the_source() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "{ nope").unwrap();
        let err = read_json(path.to_str().unwrap()).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }
}
