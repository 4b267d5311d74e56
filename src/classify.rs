//! Centralized path classification for the raw storage taxonomy.
//!
//! Every object under the canonical namespace follows the same layout:
//! an origin marker, a visibility tier, a dataset, an optional scenario,
//! and a split token somewhere below the dataset. This module provides a
//! single pure function that extracts all taxonomy fields consistently.
//!
//! ## Layout
//!
//! ```text
//! raw/<visibility>/<dataset>/<scenario?>/<split>/<...>/filename
//! ```
//!
//! Examples:
//! - `raw/public/acdc/night/train/img.jpg` → visibility=public, dataset=acdc,
//!   scenario=night, split=train
//! - `raw/simulated/hudv2/test/img.png` → dataset=hudv2, no scenario, split=test
//! - `raw/real/acdc/train/img.jpg` → dataset=acdc, no scenario, split=train
//!
//! Classification is a pure function of the segment sequence: no I/O, no
//! external state, identical input always produces an identical result.

use crate::types::Split;

/// Root marker segment that anchors the canonical namespace.
pub const RAW_MARKER: &str = "raw";

/// Taxonomy fields extracted from a relative path's directory segments.
///
/// All fields are optional: a path outside the namespace classifies to
/// all-None rather than an error. A classification is usable for placement
/// and indexing only when [`dataset`](Classification::dataset) is present.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    /// Root marker (`raw`) when the path is inside the namespace.
    pub origin: Option<String>,
    /// Tier directly under the marker: public / simulated / real.
    pub visibility: Option<String>,
    /// Dataset name, e.g. `acdc` or `hudv2`.
    pub dataset: Option<String>,
    /// Segment strictly between the dataset and the split token, if any.
    pub scenario: Option<String>,
    /// First case-insensitive match against the split vocabulary.
    pub split: Option<Split>,
}

impl Classification {
    /// Whether the path classified into a usable dataset key.
    pub fn is_classified(&self) -> bool {
        self.dataset.is_some()
    }

    /// Split with the no-signal default applied.
    pub fn split_or_default(&self) -> Split {
        self.split.unwrap_or_default()
    }
}

/// Classify a sequence of directory segments (filename excluded).
///
/// If the first segment is not the `raw` marker the whole path is
/// unclassifiable and an all-None result is returned — non-fatal, the
/// caller decides whether that is an error. Otherwise the marker,
/// visibility, and dataset are taken positionally; the remaining segments
/// are scanned for the first split-vocabulary token, and the segment
/// immediately preceding it becomes the scenario when it sits strictly
/// between the dataset and the split.
pub fn classify(segments: &[&str]) -> Classification {
    if segments.first() != Some(&RAW_MARKER) {
        return Classification::default();
    }

    let visibility = segments.get(1).map(|s| s.to_string());
    let dataset = segments.get(2).map(|s| s.to_string());

    let mut split = None;
    let mut split_idx = None;
    for (i, segment) in segments.iter().enumerate().skip(3) {
        if let Ok(s) = segment.parse::<Split>() {
            split = Some(s);
            split_idx = Some(i);
            break;
        }
    }

    // Scenario is the segment just before the split, and only when that
    // segment sits strictly between the dataset (index 2) and the split.
    let scenario = match split_idx {
        Some(idx) if idx > 3 => segments.get(idx - 1).map(|s| s.to_string()),
        _ => None,
    };

    Classification {
        origin: Some(RAW_MARKER.to_string()),
        visibility,
        dataset,
        scenario,
        split,
    }
}

/// Classify a relative path string, splitting on `/` and dropping the
/// final segment (the filename).
pub fn classify_path(rel_path: &str) -> Classification {
    let segments: Vec<&str> = rel_path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.split_last() {
        Some((_filename, dirs)) => classify(dirs),
        None => Classification::default(),
    }
}
