//! Source containers: enumerating and reading ingestible entries.
//!
//! A [`Source`] is anything that can enumerate relative paths and hand back
//! byte streams for them — a directory tree on disk or a ZIP archive. The
//! orchestrator is written against this trait so the same classification,
//! placement, and hashing core serves every deployment shape.
//!
//! ## Failure model
//!
//! Opening a container that is structurally broken (missing root, corrupt
//! ZIP central directory) fails the whole scan with a distinguishable error.
//! A single unreadable entry inside an otherwise healthy container is
//! reported alongside the listing and does not abort the scan.

use chrono::{DateTime, Utc};
use log::warn;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source root does not exist: {0}")]
    MissingRoot(PathBuf),
    #[error("corrupted source container {path}: {reason}")]
    Corrupted { path: PathBuf, reason: String },
    #[error("no such entry in source: {0}")]
    NoSuchEntry(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One enumerated file inside a source container.
///
/// `rel_path` always uses forward slashes, matching both ZIP entry names and
/// the canonical namespace layout.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub rel_path: String,
    pub size: u64,
    /// Modification time where the container records one reliably.
    pub modified: Option<DateTime<Utc>>,
}

/// Result of enumerating a container: the readable entries plus per-entry
/// errors for anything that could be seen but not read.
#[derive(Debug, Default)]
pub struct Listing {
    pub entries: Vec<SourceEntry>,
    pub errors: Vec<(String, String)>,
}

/// Capability interface for ingestion inputs: enumerate + read.
pub trait Source {
    /// Human-readable name of the container (archive file name or directory).
    fn name(&self) -> String;

    /// Enumerate all file entries. Directories are excluded here; size and
    /// extension filtering is the caller's concern (see [`eligible_entries`]).
    fn list(&mut self) -> Result<Listing, SourceError>;

    /// Open a byte stream for one entry.
    fn open(&mut self, rel_path: &str) -> Result<Box<dyn Read + '_>, SourceError>;

    /// Source URI for an entry, used as the inventory record key.
    fn uri(&self, rel_path: &str) -> String;

    /// Read at most `limit` leading bytes of an entry. Used by the two-phase
    /// dimension probe so the common case never reads the full payload.
    fn read_prefix(&mut self, rel_path: &str, limit: u64) -> Result<Vec<u8>, SourceError> {
        let mut buf = Vec::new();
        self.open(rel_path)?.take(limit).read_to_end(&mut buf)?;
        Ok(buf)
    }

    /// Read one entry in full.
    fn read_all(&mut self, rel_path: &str) -> Result<Vec<u8>, SourceError> {
        let mut buf = Vec::new();
        self.open(rel_path)?.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

/// Filter a listing down to ingestible image entries: drops directory-like
/// names, zero-byte entries, and extensions outside the allow-list
/// (case-insensitive).
pub fn eligible_entries(entries: Vec<SourceEntry>, allowed_exts: &[String]) -> Vec<SourceEntry> {
    entries
        .into_iter()
        .filter(|e| !e.rel_path.ends_with('/') && e.size > 0)
        .filter(|e| match extension_of(&e.rel_path) {
            Some(ext) => allowed_exts.iter().any(|a| a.eq_ignore_ascii_case(&ext)),
            None => false,
        })
        .collect()
}

/// Lowercase extension of a relative path, without the dot.
pub fn extension_of(rel_path: &str) -> Option<String> {
    let filename = rel_path.rsplit('/').next()?;
    let (stem, ext) = filename.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

// ============================================================================
// Directory source
// ============================================================================

/// A directory tree on local disk, walked recursively.
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    /// Open a directory root. A missing or non-directory root is fatal.
    pub fn open(root: &Path) -> Result<Self, SourceError> {
        if !root.is_dir() {
            return Err(SourceError::MissingRoot(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn abs(&self, rel_path: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in rel_path.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }
}

impl Source for DirSource {
    fn name(&self) -> String {
        self.root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.root.display().to_string())
    }

    fn list(&mut self) -> Result<Listing, SourceError> {
        let mut listing = Listing::default();
        for entry in WalkDir::new(&self.root) {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| self.root.display().to_string());
                    warn!("skipping unreadable entry {}: {}", path, e);
                    listing.errors.push((path, e.to_string()));
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(&self.root)
                .unwrap_or(entry.path());
            let rel_path = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let (size, modified) = match entry.metadata() {
                Ok(meta) => {
                    let modified = meta.modified().ok().map(DateTime::<Utc>::from);
                    (meta.len(), modified)
                }
                Err(e) => {
                    listing.errors.push((rel_path.clone(), e.to_string()));
                    continue;
                }
            };
            listing.entries.push(SourceEntry {
                rel_path,
                size,
                modified,
            });
        }
        listing.entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        Ok(listing)
    }

    fn open(&mut self, rel_path: &str) -> Result<Box<dyn Read + '_>, SourceError> {
        let path = self.abs(rel_path);
        match File::open(&path) {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SourceError::NoSuchEntry(rel_path.to_string()))
            }
            Err(e) => Err(SourceError::Io(e)),
        }
    }

    fn uri(&self, rel_path: &str) -> String {
        let abs = self.abs(rel_path);
        let abs = abs.canonicalize().unwrap_or(abs);
        format!("file://{}", abs.display())
    }
}

// ============================================================================
// ZIP archive source
// ============================================================================

/// A ZIP archive file. Entries are read through the central directory, so a
/// container whose directory cannot be parsed is rejected up front.
pub struct ZipSource {
    path: PathBuf,
    archive: zip::ZipArchive<File>,
}

impl ZipSource {
    /// Open an archive. A missing file is a missing root; a file the ZIP
    /// reader cannot parse is a corrupted container — both fatal.
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SourceError::MissingRoot(path.to_path_buf()));
            }
            Err(e) => return Err(SourceError::Io(e)),
        };
        let archive = zip::ZipArchive::new(file).map_err(|e| SourceError::Corrupted {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }
}

impl Source for ZipSource {
    fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    fn list(&mut self) -> Result<Listing, SourceError> {
        let mut listing = Listing::default();
        for i in 0..self.archive.len() {
            let entry = match self.archive.by_index(i) {
                Ok(e) => e,
                Err(e) => {
                    warn!("zip: skipping entry {}: {}", i, e);
                    listing.errors.push((format!("entry #{}", i), e.to_string()));
                    continue;
                }
            };
            if entry.is_dir() {
                continue;
            }
            listing.entries.push(SourceEntry {
                rel_path: entry.name().to_string(),
                size: entry.size(),
                // MS-DOS timestamps are local-time and unreliable; indexing
                // happens from the placed files where mtime is authoritative.
                modified: None,
            });
        }
        listing.entries.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        Ok(listing)
    }

    fn open(&mut self, rel_path: &str) -> Result<Box<dyn Read + '_>, SourceError> {
        match self.archive.by_name(rel_path) {
            Ok(entry) => Ok(Box::new(entry)),
            Err(zip::result::ZipError::FileNotFound) => {
                Err(SourceError::NoSuchEntry(rel_path.to_string()))
            }
            Err(e) => Err(SourceError::Corrupted {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn uri(&self, rel_path: &str) -> String {
        format!("zip://{}!/{}", self.path.display(), rel_path)
    }
}
