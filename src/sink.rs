//! Destination namespaces: existence checks and byte writes.
//!
//! A [`Sink`] is the write-side capability interface the placer works
//! against: check whether a destination identifier is occupied, and write a
//! payload to one. Overwrite protection lives in the placer — a sink write
//! to an occupied identifier is a caller bug, so [`FsSink`] creates files
//! with `create_new` and surfaces the conflict as an error instead of
//! clobbering existing content.

use std::fs::{self, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("destination already occupied: {0}")]
    Occupied(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Capability interface for ingestion outputs: exists + write.
pub trait Sink {
    /// Whether the destination identifier is already occupied.
    fn exists(&self, rel_path: &str) -> bool;

    /// Write a payload to an unoccupied destination identifier. Never
    /// overwrites: writing to an occupied identifier is an error.
    fn write(&mut self, rel_path: &str, reader: &mut dyn Read) -> Result<(), SinkError>;
}

/// A directory tree on local disk. Parent directories are created on demand.
pub struct FsSink {
    root: PathBuf,
}

impl FsSink {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn abs(&self, rel_path: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in rel_path.split('/').filter(|s| !s.is_empty()) {
            path.push(segment);
        }
        path
    }
}

impl Sink for FsSink {
    fn exists(&self, rel_path: &str) -> bool {
        self.abs(rel_path).exists()
    }

    fn write(&mut self, rel_path: &str, reader: &mut dyn Read) -> Result<(), SinkError> {
        let path = self.abs(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(SinkError::Occupied(rel_path.to_string()));
            }
            Err(e) => return Err(SinkError::Io(e)),
        };
        io::copy(reader, &mut file)?;
        file.flush()?;
        Ok(())
    }
}
