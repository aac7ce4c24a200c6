//! JSON Lines reading and writing.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use locitorium_core::{GoldDoc, InputDoc, PredDoc, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Parse one record per non-blank line.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let reader = BufReader::new(File::open(path)?);
    let mut items = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let item = serde_json::from_str(line).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}:{}: {}", path.display(), idx + 1, e),
            )
        })?;
        items.push(item);
    }
    debug!("Read {} records from {}", items.len(), path.display());
    Ok(items)
}

/// Write one record per line, creating parent directories as needed.
pub fn write_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_gold(path: &Path) -> Result<Vec<GoldDoc>> {
    read_jsonl(path)
}

pub fn load_predictions(path: &Path) -> Result<Vec<PredDoc>> {
    read_jsonl(path)
}

/// Documents to run; gold files qualify since extra fields are ignored.
pub fn load_inputs(path: &Path) -> Result<Vec<InputDoc>> {
    read_jsonl(path)
}
