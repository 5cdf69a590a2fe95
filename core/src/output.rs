//! JSON output for the index, the per-location counts, and query results.

use crate::index::InvertedIndex;
use crate::results::ResultMap;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::Path;

fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let mut f = File::create(path).with_context(|| format!("cannot create {}", path.display()))?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

/// word -> { location -> [positions] }
pub fn index_json(index: &InvertedIndex) -> Result<String> {
    Ok(serde_json::to_string_pretty(index.entries())?)
}

pub fn save_index(index: &InvertedIndex, path: &Path) -> Result<()> {
    write_json(index.entries(), path)
}

/// location -> total word count
pub fn save_counts(index: &InvertedIndex, path: &Path) -> Result<()> {
    write_json(index.counts(), path)
}

/// query -> [ { where, count, score } ]
pub fn save_results(results: &ResultMap, path: &Path) -> Result<()> {
    write_json(results, path)
}
