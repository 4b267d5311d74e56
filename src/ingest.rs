//! Pipeline orchestration: one full ingestion run over a single source.
//!
//! A run moves through a fixed sequence of phases:
//!
//! ```text
//! Idle → Scanning → PerEntryProcessing → BatchFlushing → Done
//!                 ↘ Failed (missing root / corrupted container only)
//! ```
//!
//! Per-entry failures never fail the run. Each one is captured as a
//! (path, message) pair on the run's error list and processing moves to the
//! next entry; only a source that cannot be opened at all is fatal. Every
//! run — however many entries failed — ends with a [`RunSummary`] that is
//! printed and persisted as a JSON run log.
//!
//! Two run shapes share the same scan/classify core:
//!
//! - **Extract** ([`run_extract`]): validate each payload by full decode and
//!   place it into the canonical namespace through the collision-safe placer.
//! - **Index** ([`run_index`]): probe dimensions (prefix first, full read as
//!   fallback), stream a content digest, and append one inventory row per
//!   entry.
//!
//! Re-running either shape over an unchanged source is safe: placement
//! checks existence before writing, and the inventory deduplicates on its
//! stable per-record key.

use crate::classify::classify_path;
use crate::config::PipelineConfig;
use crate::inventory::{InventoryError, InventoryWriter};
use crate::metadata::{self, ArchiveInfo};
use crate::place::Placer;
use crate::sink::Sink;
use crate::source::{eligible_entries, extension_of, Source, SourceError};
use crate::types::ImageRecord;
use crate::validate::{is_valid_image, probe_dimensions, DimensionProbe};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Orchestrator phase, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunPhase {
    Scanning,
    PerEntryProcessing,
    BatchFlushing,
    Done,
}

fn enter(phase: RunPhase, source_name: &str) {
    debug!("{}: entering {:?}", source_name, phase);
}

/// One per-entry failure, keyed by the entry's original path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryError {
    pub path: String,
    pub error: String,
}

/// Machine-readable result of one run: persisted as `log_<source>.json`
/// and rendered for the terminal by the output module.
#[derive(Debug, Serialize, Deserialize)]
pub struct RunSummary {
    /// Archive or directory the run ingested.
    pub archive: String,
    /// UTC timestamp of the run itself.
    pub ts_run: DateTime<Utc>,
    /// Entries successfully placed or indexed.
    pub processed: usize,
    /// Ordered per-entry failures.
    pub errors: Vec<EntryError>,
    /// Side-channel catalog metadata, when the archive name matched a key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_info: Option<ArchiveInfo>,
}

impl RunSummary {
    fn new(archive: String) -> Self {
        Self {
            archive,
            ts_run: Utc::now(),
            processed: 0,
            errors: Vec::new(),
            archive_info: None,
        }
    }

    fn record_error(&mut self, path: &str, error: impl ToString) {
        self.errors.push(EntryError {
            path: path.to_string(),
            error: error.to_string(),
        });
    }

    /// Run log filename for a source name.
    pub fn log_filename(archive: &str) -> String {
        format!("log_{}.json", archive)
    }

    /// Persist the summary as a pretty-printed JSON run log.
    pub fn persist(&self, logs_dir: &Path) -> Result<PathBuf, IngestError> {
        std::fs::create_dir_all(logs_dir)?;
        let path = logs_dir.join(Self::log_filename(&self.archive));
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

/// Whether a run log already exists for a source — the rerun guard used by
/// the extract command.
pub fn already_ingested(logs_dir: &Path, archive: &str) -> bool {
    logs_dir.join(RunSummary::log_filename(archive)).exists()
}

/// Attach catalog metadata to a summary when its archive name matches.
fn enrich_from_catalog(summary: &mut RunSummary, config: &PipelineConfig) {
    let Some(catalog_path) = config.catalog.as_deref() else {
        return;
    };
    let catalog = metadata::load_catalog(catalog_path);
    summary.archive_info = catalog.get(&summary.archive).cloned();
}

/// Extraction run: unpack every eligible image from `source` into the
/// canonical namespace under `sink`, then persist the run log.
pub fn run_extract(
    source: &mut dyn Source,
    sink: &mut dyn Sink,
    config: &PipelineConfig,
) -> Result<RunSummary, IngestError> {
    let mut summary = RunSummary::new(source.name());

    enter(RunPhase::Scanning, &summary.archive);
    let listing = source.list()?;
    for (path, error) in listing.errors {
        summary.record_error(&path, error);
    }
    let entries = eligible_entries(listing.entries, &config.extensions);

    enter(RunPhase::PerEntryProcessing, &summary.archive);
    let mut placer = Placer::new();
    for entry in &entries {
        let classification = classify_path(&entry.rel_path);
        if !classification.is_classified() {
            summary.record_error(
                &entry.rel_path,
                "path does not classify into a dataset key",
            );
            continue;
        }

        let payload = match source.read_all(&entry.rel_path) {
            Ok(bytes) => bytes,
            Err(e) => {
                summary.record_error(&entry.rel_path, e);
                continue;
            }
        };
        if !is_valid_image(&payload) {
            summary.record_error(&entry.rel_path, "invalid or corrupt image payload");
            continue;
        }

        let ext = extension_of(&entry.rel_path).unwrap_or_default();
        match placer.place(sink, &classification, &ext, &mut payload.as_slice()) {
            Ok(dest) => {
                debug!("{} -> {}", entry.rel_path, dest);
                summary.processed += 1;
            }
            Err(e) => summary.record_error(&entry.rel_path, e),
        }
    }

    enrich_from_catalog(&mut summary, config);
    summary.persist(&config.logs_dir)?;
    enter(RunPhase::Done, &summary.archive);
    Ok(summary)
}

/// Indexing run: build one inventory row per eligible image in `source` and
/// append it through the batched, idempotent inventory writer, then persist
/// the run log.
pub fn run_index(
    source: &mut dyn Source,
    inventory: &mut InventoryWriter,
    config: &PipelineConfig,
) -> Result<RunSummary, IngestError> {
    let mut summary = RunSummary::new(source.name());

    enter(RunPhase::Scanning, &summary.archive);
    let listing = source.list()?;
    for (path, error) in listing.errors {
        summary.record_error(&path, error);
    }
    let entries = eligible_entries(listing.entries, &config.extensions);

    enter(RunPhase::PerEntryProcessing, &summary.archive);
    for entry in &entries {
        let classification = classify_path(&entry.rel_path);
        let Some(dataset) = classification.dataset.clone() else {
            summary.record_error(
                &entry.rel_path,
                "path does not classify into a dataset key",
            );
            continue;
        };

        // Dimensions: header prefix first, full payload only when needed.
        // Hash and dimensions fail independently to null, never fatally.
        let dimensions = extract_dimensions(source, entry, config.dimension_probe_bytes);
        let sha256 = match source.open(&entry.rel_path) {
            Ok(reader) => match crate::digest::sha256_stream(reader) {
                Ok(hash) => Some(hash),
                Err(e) => {
                    warn!("{}: hashing failed: {}", entry.rel_path, e);
                    None
                }
            },
            Err(e) => {
                warn!("{}: unreadable for hashing: {}", entry.rel_path, e);
                None
            }
        };

        let archive_name = metadata::archive_name_for(
            &dataset,
            classification.scenario.as_deref(),
            config.archive_dir.as_deref(),
        );

        let filename = entry
            .rel_path
            .rsplit('/')
            .next()
            .unwrap_or(&entry.rel_path)
            .to_string();
        let record = ImageRecord {
            source_uri: source.uri(&entry.rel_path),
            origin: classification
                .origin
                .clone()
                .unwrap_or_else(|| crate::classify::RAW_MARKER.to_string()),
            visibility: classification.visibility.clone(),
            dataset,
            scenario: classification.scenario.clone(),
            split: classification.split_or_default(),
            ext: extension_of(&entry.rel_path).unwrap_or_default(),
            filename,
            width: dimensions.map(|(w, _)| w),
            height: dimensions.map(|(_, h)| h),
            sha256,
            archive_name,
            ts_ingest: entry.modified.unwrap_or_else(Utc::now),
        };
        inventory.append(record)?;
        summary.processed += 1;
    }

    enter(RunPhase::BatchFlushing, &summary.archive);
    inventory.flush()?;

    enrich_from_catalog(&mut summary, config);
    summary.persist(&config.logs_dir)?;
    enter(RunPhase::Done, &summary.archive);
    Ok(summary)
}

/// Two-phase dimension extraction for one entry.
fn extract_dimensions(
    source: &mut dyn Source,
    entry: &crate::source::SourceEntry,
    probe_bytes: u64,
) -> Option<(u32, u32)> {
    let prefix = match source.read_prefix(&entry.rel_path, probe_bytes) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("{}: unreadable for dimensions: {}", entry.rel_path, e);
            return None;
        }
    };
    let prefix_complete = entry.size <= probe_bytes;
    match probe_dimensions(&prefix, prefix_complete) {
        DimensionProbe::Known(w, h) => Some((w, h)),
        DimensionProbe::Unreadable => None,
        DimensionProbe::NeedsFullRead => {
            let full = match source.read_all(&entry.rel_path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("{}: unreadable for dimensions: {}", entry.rel_path, e);
                    return None;
                }
            };
            match probe_dimensions(&full, true) {
                DimensionProbe::Known(w, h) => Some((w, h)),
                _ => None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::FsSink;
    use crate::source::DirSource;
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([10, 20, 30]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn write_source_file(root: &Path, rel: &str, bytes: &[u8]) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, bytes).unwrap();
    }

    fn test_config(tmp: &TempDir) -> PipelineConfig {
        PipelineConfig {
            logs_dir: tmp.path().join("logs"),
            ..PipelineConfig::default()
        }
    }

    // =========================================================================
    // Extraction runs
    // =========================================================================

    #[test]
    fn extract_places_valid_images_and_isolates_corrupt_ones() {
        let tmp = TempDir::new().unwrap();
        let src_root = tmp.path().join("incoming");
        for i in 0..3 {
            write_source_file(
                &src_root,
                &format!("raw/public/acdc/night/train/frame{}.png", i),
                &png_bytes(8, 6),
            );
        }
        // Valid header, broken body
        let mut corrupt = png_bytes(8, 6);
        corrupt.truncate(corrupt.len() / 2);
        write_source_file(
            &src_root,
            "raw/public/acdc/night/train/broken.png",
            &corrupt,
        );

        let config = test_config(&tmp);
        let dest = tmp.path().join("storage");
        let mut source = DirSource::open(&src_root).unwrap();
        let mut sink = FsSink::new(&dest);
        let summary = run_extract(&mut source, &mut sink, &config).unwrap();

        assert_eq!(summary.processed, 3);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(
            summary.errors[0].path,
            "raw/public/acdc/night/train/broken.png"
        );
        assert!(summary.errors[0].error.contains("invalid or corrupt"));

        // Placed files follow the canonical layout with sequential stems
        let placed = dest.join("raw/public/acdc/night/train");
        let mut names: Vec<String> = std::fs::read_dir(&placed)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "acdc_night_train_00001.png",
                "acdc_night_train_00002.png",
                "acdc_night_train_00003.png"
            ]
        );
    }

    #[test]
    fn extract_records_unclassifiable_paths() {
        let tmp = TempDir::new().unwrap();
        let src_root = tmp.path().join("incoming");
        write_source_file(&src_root, "somewhere/else/img.png", &png_bytes(4, 4));

        let config = test_config(&tmp);
        let mut source = DirSource::open(&src_root).unwrap();
        let mut sink = FsSink::new(&tmp.path().join("storage"));
        let summary = run_extract(&mut source, &mut sink, &config).unwrap();

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.errors.len(), 1);
        assert!(summary.errors[0].error.contains("does not classify"));
    }

    #[test]
    fn extract_persists_a_run_log() {
        let tmp = TempDir::new().unwrap();
        let src_root = tmp.path().join("incoming");
        write_source_file(
            &src_root,
            "raw/public/acdc/train/img.png",
            &png_bytes(4, 4),
        );

        let config = test_config(&tmp);
        let mut source = DirSource::open(&src_root).unwrap();
        let mut sink = FsSink::new(&tmp.path().join("storage"));
        let summary = run_extract(&mut source, &mut sink, &config).unwrap();

        let log_path = config.logs_dir.join(RunSummary::log_filename("incoming"));
        assert!(log_path.exists());
        let logged: RunSummary =
            serde_json::from_str(&std::fs::read_to_string(&log_path).unwrap()).unwrap();
        assert_eq!(logged.processed, summary.processed);
        assert!(already_ingested(&config.logs_dir, "incoming"));
        assert!(!already_ingested(&config.logs_dir, "other"));
    }

    #[test]
    fn extract_rerun_never_overwrites_placed_files() {
        let tmp = TempDir::new().unwrap();
        let src_root = tmp.path().join("incoming");
        write_source_file(
            &src_root,
            "raw/public/acdc/train/img.png",
            &png_bytes(4, 4),
        );

        let config = test_config(&tmp);
        let dest = tmp.path().join("storage");
        {
            let mut source = DirSource::open(&src_root).unwrap();
            let mut sink = FsSink::new(&dest);
            run_extract(&mut source, &mut sink, &config).unwrap();
        }
        let first = dest.join("raw/public/acdc/train/acdc_none_train_00001.png");
        let original = std::fs::read(&first).unwrap();

        let mut source = DirSource::open(&src_root).unwrap();
        let mut sink = FsSink::new(&dest);
        let summary = run_extract(&mut source, &mut sink, &config).unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(std::fs::read(&first).unwrap(), original);
        let renamed = dest.join("raw/public/acdc/train/acdc_none_train_00001_1.png");
        assert!(renamed.exists());
    }

    #[test]
    fn extract_missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let result = DirSource::open(&tmp.path().join("absent"));
        assert!(matches!(result, Err(SourceError::MissingRoot(_))));
    }

    #[test]
    fn extract_merges_catalog_metadata() {
        let tmp = TempDir::new().unwrap();
        let src_root = tmp.path().join("incoming");
        write_source_file(
            &src_root,
            "raw/public/acdc/train/img.png",
            &png_bytes(4, 4),
        );
        let catalog_path = tmp.path().join("catalog.json");
        std::fs::write(
            &catalog_path,
            r#"{"incoming": {"title": "Test batch", "url": "https://example.com"}}"#,
        )
        .unwrap();

        let mut config = test_config(&tmp);
        config.catalog = Some(catalog_path);
        let mut source = DirSource::open(&src_root).unwrap();
        let mut sink = FsSink::new(&tmp.path().join("storage"));
        let summary = run_extract(&mut source, &mut sink, &config).unwrap();

        let info = summary.archive_info.unwrap();
        assert_eq!(info.title.as_deref(), Some("Test batch"));
    }

    // =========================================================================
    // Indexing runs
    // =========================================================================

    #[test]
    fn index_builds_rows_with_taxonomy_hash_and_dimensions() {
        let tmp = TempDir::new().unwrap();
        let raw_root = tmp.path().join("raw-root");
        let payload = png_bytes(32, 16);
        write_source_file(
            &raw_root,
            "raw/public/acdc/night/train/img.png",
            &payload,
        );

        let config = test_config(&tmp);
        let inventory_path = tmp.path().join("outputs/inventory.jsonl");
        let mut source = DirSource::open(&raw_root).unwrap();
        let mut inventory = InventoryWriter::open(&inventory_path, 10).unwrap();
        let summary = run_index(&mut source, &mut inventory, &config).unwrap();
        inventory.finish().unwrap();

        assert_eq!(summary.processed, 1);
        assert!(summary.errors.is_empty());

        let content = std::fs::read_to_string(&inventory_path).unwrap();
        let row: ImageRecord = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(row.dataset, "acdc");
        assert_eq!(row.visibility.as_deref(), Some("public"));
        assert_eq!(row.scenario.as_deref(), Some("night"));
        assert_eq!(row.split, crate::types::Split::Train);
        assert_eq!(row.filename, "img.png");
        assert_eq!(row.ext, "png");
        assert_eq!((row.width, row.height), (Some(32), Some(16)));
        assert_eq!(row.sha256.as_deref(), Some(crate::digest::sha256_hex(&payload).as_str()));
        assert_eq!(row.archive_name.as_deref(), Some("acdc_images.zip"));
        assert!(row.source_uri.starts_with("file://"));
    }

    #[test]
    fn index_emits_rows_with_null_metrics_for_undecodable_payloads() {
        let tmp = TempDir::new().unwrap();
        let raw_root = tmp.path().join("raw-root");
        write_source_file(
            &raw_root,
            "raw/public/acdc/train/junk.jpg",
            b"not an image but has the right extension",
        );

        let config = test_config(&tmp);
        let inventory_path = tmp.path().join("outputs/inventory.jsonl");
        let mut source = DirSource::open(&raw_root).unwrap();
        let mut inventory = InventoryWriter::open(&inventory_path, 10).unwrap();
        let summary = run_index(&mut source, &mut inventory, &config).unwrap();
        inventory.finish().unwrap();

        // Hash and dimensions fail independently: dims null, hash present
        assert_eq!(summary.processed, 1);
        let content = std::fs::read_to_string(&inventory_path).unwrap();
        let row: ImageRecord = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(row.width, None);
        assert_eq!(row.height, None);
        assert!(row.sha256.is_some());
    }

    #[test]
    fn index_rerun_adds_zero_net_rows() {
        let tmp = TempDir::new().unwrap();
        let raw_root = tmp.path().join("raw-root");
        write_source_file(
            &raw_root,
            "raw/public/acdc/train/a.png",
            &png_bytes(4, 4),
        );
        write_source_file(
            &raw_root,
            "raw/simulated/hudv2/test/b.png",
            &png_bytes(6, 2),
        );

        let config = test_config(&tmp);
        let inventory_path = tmp.path().join("outputs/inventory.jsonl");
        for _ in 0..2 {
            let mut source = DirSource::open(&raw_root).unwrap();
            let mut inventory = InventoryWriter::open(&inventory_path, 10).unwrap();
            run_index(&mut source, &mut inventory, &config).unwrap();
            inventory.finish().unwrap();
        }

        let rows = std::fs::read_to_string(&inventory_path).unwrap();
        assert_eq!(rows.lines().count(), 2);
    }

    #[test]
    fn index_skips_unclassifiable_and_non_image_entries() {
        let tmp = TempDir::new().unwrap();
        let raw_root = tmp.path().join("raw-root");
        write_source_file(&raw_root, "stray/img.png", &png_bytes(4, 4));
        write_source_file(&raw_root, "raw/public/acdc/train/notes.txt", b"text");

        let config = test_config(&tmp);
        let inventory_path = tmp.path().join("outputs/inventory.jsonl");
        let mut source = DirSource::open(&raw_root).unwrap();
        let mut inventory = InventoryWriter::open(&inventory_path, 10).unwrap();
        let summary = run_index(&mut source, &mut inventory, &config).unwrap();
        inventory.finish().unwrap();

        // notes.txt filtered by extension; stray/img.png fails classification
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.errors.len(), 1);
        assert_eq!(summary.errors[0].path, "stray/img.png");
    }
}
