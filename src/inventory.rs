//! Inventory sink adapter: batched, idempotent appends to the metadata table.
//!
//! The inventory is an append-only JSON Lines file, one [`ImageRecord`] per
//! line — the local stand-in for the warehouse table the records ultimately
//! land in. The adapter reproduces the warehouse write contract:
//!
//! - **Batching**: records buffer in memory and flush every `batch_size`
//!   rows to keep write amplification down.
//! - **Idempotence**: each record carries a stable dedupe key (source URI,
//!   falling back to content hash). Keys already present in the file are
//!   skipped on flush, so re-delivery of a batch — or re-running a whole
//!   ingestion — creates zero net new rows.
//! - **Coercion**: timestamps serialize as canonical UTC RFC 3339; rows
//!   already in the file that don't parse cleanly are tolerated (their key
//!   is still honored when recoverable) rather than failing the run.

use crate::types::ImageRecord;
use std::collections::HashSet;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InventoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Running totals for a writer's lifetime.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InventoryStats {
    /// Rows appended to the file.
    pub appended: usize,
    /// Rows skipped because their key was already present.
    pub deduplicated: usize,
}

impl fmt::Display for InventoryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.deduplicated > 0 {
            write!(
                f,
                "{} rows appended, {} already indexed",
                self.appended, self.deduplicated
            )
        } else {
            write!(f, "{} rows appended", self.appended)
        }
    }
}

/// Batched writer over the inventory file.
pub struct InventoryWriter {
    file: File,
    batch_size: usize,
    buffer: Vec<ImageRecord>,
    seen: HashSet<String>,
    stats: InventoryStats,
}

impl InventoryWriter {
    /// Open (or create) an inventory file for appending.
    ///
    /// Existing rows are scanned once to seed the dedupe key set; rows that
    /// don't parse as full records still contribute a key when one can be
    /// recovered from the raw JSON.
    pub fn open(path: &Path, batch_size: usize) -> Result<Self, InventoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let seen = load_existing_keys(path)?;
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file,
            batch_size: batch_size.max(1),
            buffer: Vec::new(),
            seen,
            stats: InventoryStats::default(),
        })
    }

    /// Buffer one record, flushing when the batch fills.
    pub fn append(&mut self, record: ImageRecord) -> Result<(), InventoryError> {
        self.buffer.push(record);
        if self.buffer.len() >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Write out the buffered batch, skipping records whose dedupe key is
    /// already present. At-least-once safe: re-delivering the same records
    /// later is a no-op.
    pub fn flush(&mut self) -> Result<(), InventoryError> {
        for record in self.buffer.drain(..) {
            match record.dedupe_key() {
                Some(key) if self.seen.contains(&key) => {
                    self.stats.deduplicated += 1;
                    continue;
                }
                Some(key) => {
                    self.seen.insert(key);
                }
                // No key to deduplicate on; append unconditionally.
                None => {}
            }
            let line = serde_json::to_string(&record)?;
            writeln!(self.file, "{}", line)?;
            self.stats.appended += 1;
        }
        self.file.flush()?;
        Ok(())
    }

    /// Flush the remaining partial batch and return lifetime totals.
    pub fn finish(mut self) -> Result<InventoryStats, InventoryError> {
        self.flush()?;
        Ok(self.stats)
    }
}

/// Collect dedupe keys from an existing inventory file.
///
/// Lines are parsed as raw JSON so a row written by an older schema (or a
/// row with out-of-range metrics) still yields its key; lines that aren't
/// JSON objects at all are skipped.
fn load_existing_keys(path: &Path) -> Result<HashSet<String>, InventoryError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashSet::new()),
        Err(e) => return Err(e.into()),
    };
    let mut keys = HashSet::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let Ok(value) = serde_json::from_str::<serde_json::Value>(&line) else {
            log::warn!("inventory: skipping unparseable row in {}", path.display());
            continue;
        };
        let key = value
            .get("source_uri")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .or_else(|| value.get("sha256").and_then(|v| v.as_str()));
        if let Some(key) = key {
            keys.insert(key.to_string());
        }
    }
    Ok(keys)
}
