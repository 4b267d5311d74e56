//! Shared types used across all pipeline stages.
//!
//! An [`ImageRecord`] is built once per eligible file during a run, buffered
//! in memory, and flushed in batches by the inventory writer. Records are
//! never mutated after construction — hash, dimensions, and archive name are
//! filled in during the same pass that creates them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Train/test membership parsed from a path segment.
///
/// Absence of a recognized split token in the path defaults to [`Split::Unknown`]
/// so the file stays classifiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
    #[default]
    Unknown,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Test => "test",
            Split::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Split {
    type Err = ();

    /// Case-insensitive; only the fixed split vocabulary parses.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "train" => Ok(Split::Train),
            "test" => Ok(Split::Test),
            "unknown" => Ok(Split::Unknown),
            _ => Err(()),
        }
    }
}

/// One inventory row per ingested image.
///
/// Field names follow the warehouse table schema: `source_uri` is the origin
/// location (a `file://` path or scheme-prefixed object URI), `ext` is
/// lowercase without the dot, `sha256` is a 64-hex-char digest or null when
/// the payload was unreadable, and `ts_ingest` is the UTC creation or
/// modification time of the source object. Sources that record no reliable
/// per-entry timestamp (ZIP archives, whose entry times are local-time
/// MS-DOS fields) fall back to the time of ingestion itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageRecord {
    pub source_uri: String,
    pub origin: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    pub dataset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<String>,
    pub split: Split,
    pub filename: String,
    pub ext: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archive_name: Option<String>,
    pub ts_ingest: DateTime<Utc>,
}

impl ImageRecord {
    /// Stable key the inventory sink deduplicates on: the source URI, falling
    /// back to the content hash when the URI is empty. Re-delivery of a batch
    /// with the same keys must not create duplicate rows.
    pub fn dedupe_key(&self) -> Option<String> {
        if !self.source_uri.is_empty() {
            return Some(self.source_uri.clone());
        }
        self.sha256.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_parses_case_insensitive() {
        assert_eq!("train".parse::<Split>(), Ok(Split::Train));
        assert_eq!("TEST".parse::<Split>(), Ok(Split::Test));
        assert_eq!("Unknown".parse::<Split>(), Ok(Split::Unknown));
    }

    #[test]
    fn split_rejects_other_tokens() {
        assert!("validation".parse::<Split>().is_err());
        assert!("".parse::<Split>().is_err());
    }

    #[test]
    fn split_default_is_unknown() {
        assert_eq!(Split::default(), Split::Unknown);
    }

    #[test]
    fn split_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Split::Train).unwrap(), "\"train\"");
        assert_eq!(
            serde_json::to_string(&Split::Unknown).unwrap(),
            "\"unknown\""
        );
    }

    fn sample_record() -> ImageRecord {
        ImageRecord {
            source_uri: "file:///data/raw/public/acdc/night/train/img.jpg".to_string(),
            origin: "raw".to_string(),
            visibility: Some("public".to_string()),
            dataset: "acdc".to_string(),
            scenario: Some("night".to_string()),
            split: Split::Train,
            filename: "img.jpg".to_string(),
            ext: "jpg".to_string(),
            width: Some(1920),
            height: Some(1080),
            sha256: Some("ab".repeat(32)),
            archive_name: Some("acdc_images.zip".to_string()),
            ts_ingest: Utc::now(),
        }
    }

    #[test]
    fn dedupe_key_prefers_source_uri() {
        let record = sample_record();
        assert_eq!(
            record.dedupe_key().as_deref(),
            Some(record.source_uri.as_str())
        );
    }

    #[test]
    fn dedupe_key_falls_back_to_hash() {
        let mut record = sample_record();
        record.source_uri = String::new();
        assert_eq!(record.dedupe_key(), record.sha256);
    }

    #[test]
    fn dedupe_key_none_when_neither_present() {
        let mut record = sample_record();
        record.source_uri = String::new();
        record.sha256 = None;
        assert_eq!(record.dedupe_key(), None);
    }

    #[test]
    fn record_roundtrips_through_json() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let back: ImageRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.source_uri, record.source_uri);
        assert_eq!(back.split, Split::Train);
        assert_eq!(back.width, Some(1920));
    }

    #[test]
    fn optional_taxonomy_fields_omitted_from_json() {
        let mut record = sample_record();
        record.visibility = None;
        record.scenario = None;
        record.archive_name = None;
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("visibility"));
        assert!(!json.contains("scenario"));
        assert!(!json.contains("archive_name"));
    }

    #[test]
    fn nullable_metrics_stay_present_as_nulls() {
        // The tabular schema wants explicit nulls for width/height/sha256
        let mut record = sample_record();
        record.width = None;
        record.sha256 = None;
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"width\":null"));
        assert!(json.contains("\"sha256\":null"));
    }
}
