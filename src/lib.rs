//! # hud-ingest
//!
//! Ingestion and cataloguing pipeline for labeled road-scene image archives.
//! Contributed imagery arrives as ZIP archives or raw directory trees whose
//! paths encode a taxonomy (`raw/<visibility>/<dataset>[/<scenario>]/<split>`);
//! this crate turns those payloads into a canonically named image store plus
//! an append-only inventory of per-image metadata rows.
//!
//! # Architecture: Two Run Shapes, One Core
//!
//! Every run scans a source, classifies each entry by its path, and then
//! branches:
//!
//! ```text
//! Extract   archive.zip → raw/<vis>/<dataset>[/<scenario>]/<split>/…   (validated, collision-safe)
//! Index     raw tree    → inventory.jsonl                              (dims + sha256 + taxonomy rows)
//! ```
//!
//! Per-entry failures never abort a run: each one is recorded on the run's
//! error list and processing continues, so a single corrupt frame can't sink
//! a 50k-image archive. Both shapes are idempotent — extraction never
//! overwrites an occupied destination and indexing deduplicates on a stable
//! per-record key — so re-running after a partial failure is always safe.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Shared vocabulary: the `Split` partition and the `ImageRecord` inventory row |
//! | [`classify`] | Path-based taxonomy extraction (origin, visibility, dataset, scenario, split) |
//! | [`source`] | Read-side abstraction over ZIP archives and directory trees |
//! | [`sink`] | Write-side abstraction: existence checks and never-overwrite writes |
//! | [`validate`] | Payload validation and the two-tier dimension probe |
//! | [`digest`] | Streaming SHA-256 content hashing |
//! | [`place`] | Collision-safe placement into the canonical namespace |
//! | [`inventory`] | Batched, idempotent appends to the inventory store |
//! | [`metadata`] | Companion-archive naming and the side-channel catalog |
//! | [`ingest`] | Run orchestration: phases, per-entry error isolation, run logs |
//! | [`config`] | Flat `ingest.toml` loading with stock defaults |
//! | [`output`] | CLI output formatting for run results |
//!
//! # Design Decisions
//!
//! ## Paths Are the Source of Truth
//!
//! There is no manifest inside an archive; the directory layout *is* the
//! metadata. Classification reads taxonomy straight from path segments, and
//! anything that doesn't match the expected shape simply classifies to
//! nothing — reported per entry, never fatal.
//!
//! ## Prefix-First Dimension Probing
//!
//! Most image formats carry their dimensions in the first few kilobytes.
//! Indexing reads a bounded prefix and only falls back to the full payload
//! when the header genuinely isn't enough, so a run over a large store
//! reads a fraction of its bytes.
//!
//! ## Append-Only, Key-Deduplicated Inventory
//!
//! The inventory is JSON Lines with one row per image and a stable dedupe
//! key per row (source URI, else content hash). Writers batch and skip keys
//! already present, so at-least-once delivery and whole-run reruns both
//! produce zero net new rows.

pub mod classify;
pub mod config;
pub mod digest;
pub mod ingest;
pub mod inventory;
pub mod metadata;
pub mod output;
pub mod place;
pub mod sink;
pub mod source;
pub mod types;
pub mod validate;
