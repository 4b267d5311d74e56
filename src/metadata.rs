//! Archive metadata: companion-archive naming and the side-channel catalog.
//!
//! Each dataset's images originally arrive in a ZIP whose name follows a
//! fixed convention, so an indexed image can be traced back to its archive
//! without any lookup table:
//!
//! - dataset `youtube` → `<scenario>.zip` (one archive per scenario; no
//!   scenario means no derivable name)
//! - any other dataset → `<dataset>_images.zip`
//!
//! When an archive directory is available the derived name is resolved
//! case-insensitively against its actual listing — archives uploaded with
//! odd casing keep their real name, and a derived name with no matching
//! archive becomes a null enrichment field rather than an error.
//!
//! Separately, an optional catalog file (JSON map: archive name →
//! title/url/description) enriches run summaries. A missing or unreadable
//! catalog is a soft warning; ingestion proceeds without enrichment.

use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Dataset whose archives are named per scenario instead of per dataset.
const SCENARIO_NAMED_DATASET: &str = "youtube";

/// Descriptive metadata for one archive, from the side-channel catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Archive name → descriptive metadata.
pub type ArchiveCatalog = HashMap<String, ArchiveInfo>;

/// Load the side-channel catalog. Any failure — missing file, bad JSON —
/// is a soft warning and yields an empty catalog.
pub fn load_catalog(path: &Path) -> ArchiveCatalog {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("archive catalog unreadable at {}: {}", path.display(), e);
            return ArchiveCatalog::new();
        }
    };
    match serde_json::from_str(&content) {
        Ok(catalog) => catalog,
        Err(e) => {
            warn!("archive catalog malformed at {}: {}", path.display(), e);
            ArchiveCatalog::new()
        }
    }
}

/// Derive the companion archive name for a classified image.
pub fn derive_archive_name(dataset: &str, scenario: Option<&str>) -> Option<String> {
    if dataset.eq_ignore_ascii_case(SCENARIO_NAMED_DATASET) {
        return scenario.map(|s| format!("{}.zip", s));
    }
    Some(format!("{}_images.zip", dataset))
}

/// Resolve a derived archive name against the actual archive directory.
///
/// Matching is case-insensitive and returns the name as it exists on disk.
/// With no directory configured there is nothing to verify against and the
/// derived name is kept; with a directory that lacks a match (or cannot be
/// listed) the enrichment is null.
pub fn resolve_archive_name(derived: &str, archive_dir: Option<&Path>) -> Option<String> {
    let Some(dir) = archive_dir else {
        return Some(derived.to_string());
    };
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("archive directory unreadable at {}: {}", dir.display(), e);
            return None;
        }
    };
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.eq_ignore_ascii_case(derived) {
            return Some(name);
        }
    }
    None
}

/// Full derivation + resolution for a classified image.
pub fn archive_name_for(
    dataset: &str,
    scenario: Option<&str>,
    archive_dir: Option<&Path>,
) -> Option<String> {
    let derived = derive_archive_name(dataset, scenario)?;
    resolve_archive_name(&derived, archive_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn dataset_archives_use_images_suffix() {
        assert_eq!(
            derive_archive_name("acdc", Some("night")).as_deref(),
            Some("acdc_images.zip")
        );
        assert_eq!(
            derive_archive_name("hudv2", None).as_deref(),
            Some("hudv2_images.zip")
        );
    }

    #[test]
    fn youtube_archives_are_named_by_scenario() {
        assert_eq!(
            derive_archive_name("youtube", Some("highway")).as_deref(),
            Some("highway.zip")
        );
        assert_eq!(
            derive_archive_name("YouTube", Some("highway")).as_deref(),
            Some("highway.zip")
        );
    }

    #[test]
    fn youtube_without_scenario_has_no_name() {
        assert_eq!(derive_archive_name("youtube", None), None);
    }

    #[test]
    fn resolution_without_directory_keeps_derived_name() {
        assert_eq!(
            resolve_archive_name("acdc_images.zip", None).as_deref(),
            Some("acdc_images.zip")
        );
    }

    #[test]
    fn resolution_matches_case_insensitively() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("ACDC_Images.zip"), b"zip").unwrap();

        assert_eq!(
            resolve_archive_name("acdc_images.zip", Some(tmp.path())).as_deref(),
            Some("ACDC_Images.zip")
        );
    }

    #[test]
    fn resolution_misses_are_null_enrichment() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(resolve_archive_name("gone_images.zip", Some(tmp.path())), None);
    }

    #[test]
    fn unreadable_archive_dir_is_null_enrichment() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("no-such-dir");
        assert_eq!(resolve_archive_name("acdc_images.zip", Some(&missing)), None);
    }

    #[test]
    fn catalog_loads_matching_entries() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.json");
        std::fs::write(
            &path,
            r#"{"highway.zip": {"title": "Highway run", "url": "https://example.com/v/1", "description": "dashcam"}}"#,
        )
        .unwrap();

        let catalog = load_catalog(&path);
        let info = catalog.get("highway.zip").unwrap();
        assert_eq!(info.title.as_deref(), Some("Highway run"));
        assert_eq!(info.description.as_deref(), Some("dashcam"));
    }

    #[test]
    fn missing_catalog_is_soft() {
        let tmp = TempDir::new().unwrap();
        let catalog = load_catalog(&tmp.path().join("absent.json"));
        assert!(catalog.is_empty());
    }

    #[test]
    fn malformed_catalog_is_soft() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("catalog.json");
        std::fs::write(&path, "{ this is not json").unwrap();
        assert!(load_catalog(&path).is_empty());
    }
}
