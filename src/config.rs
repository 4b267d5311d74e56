//! Pipeline configuration loading.
//!
//! Configuration is a single flat `ingest.toml`. Every field has a default,
//! so the file is optional — a missing file yields the stock configuration,
//! while a present-but-malformed file is an error (silently ignoring a typo
//! in a real config is worse than failing).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Pipeline settings. All fields optional in the TOML; defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Image extension allow-list, lowercase, no dots.
    pub extensions: Vec<String>,
    /// Inventory rows per flush.
    pub batch_size: usize,
    /// Leading byte budget for the dimension probe before a full read.
    pub dimension_probe_bytes: u64,
    /// Directory run logs are persisted to.
    pub logs_dir: PathBuf,
    /// Directory holding the original archives, used to verify derived
    /// archive names. Optional: without it names are kept as derived.
    pub archive_dir: Option<PathBuf>,
    /// Side-channel archive catalog (JSON). Optional.
    pub catalog: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extensions: ["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            batch_size: 500,
            dimension_probe_bytes: 64 * 1024,
            logs_dir: PathBuf::from("logs"),
            archive_dir: None,
            catalog: None,
        }
    }
}

impl PipelineConfig {
    fn validate(self) -> Result<Self, ConfigError> {
        if self.extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "extensions allow-list must not be empty".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.dimension_probe_bytes == 0 {
            return Err(ConfigError::Invalid(
                "dimension_probe_bytes must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Load configuration from a TOML file, using stock defaults when the file
/// does not exist.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(PipelineConfig::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: PipelineConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()
}

/// A documented stock `ingest.toml` with every option at its default.
pub fn stock_config_toml() -> &'static str {
    r#"# hud-ingest configuration. Every setting is optional; the values below
# are the defaults.

# Image extension allow-list (lowercase, no dots).
extensions = ["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"]

# Inventory rows buffered before each flush.
batch_size = 500

# Leading bytes fetched for the dimension probe before falling back to a
# full read.
dimension_probe_bytes = 65536

# Directory run logs are persisted to (one JSON document per archive).
logs_dir = "logs"

# Directory holding the original archives. When set, derived archive names
# are verified against its listing (case-insensitive); unmatched names are
# recorded as null.
#archive_dir = "archive"

# Side-channel archive catalog: JSON map of archive name to
# {title, url, description}, merged into run summaries.
#catalog = "archive/config/youtube_metadata.json"
"#
}
