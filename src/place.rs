//! Collision-safe placement into the canonical namespace.
//!
//! The placer owns the per-run naming state: a counter per classification
//! key (dataset, scenario-or-"none", split) that produces zero-padded
//! sequential filename stems. Counters are explicit, run-scoped state — a
//! fresh run starts every key at 1 and relies on the sink's existence check
//! for uniqueness against files placed by earlier runs.
//!
//! ## Destination layout
//!
//! ```text
//! {origin}/{visibility?}/{dataset}/{scenario?}/{split}/{stem}.{ext}
//! ```
//!
//! where `stem` is `{dataset}_{scenario-or-none}_{split}_{NNNNN}`. When the
//! generated identifier is already occupied, a numeric disambiguator is
//! appended to the stem (`_1`, `_2`, …) until an unoccupied identifier is
//! found. Occupied destinations are never overwritten.

use crate::classify::Classification;
use crate::sink::{Sink, SinkError};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlaceError {
    #[error("path did not classify into a usable dataset key")]
    Unclassified,
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Scenario placeholder used in filename stems when the path had none.
const NO_SCENARIO: &str = "none";

/// Per-run placement state: one sequence counter per classification key.
#[derive(Debug, Default)]
pub struct Placer {
    counters: HashMap<String, u32>,
}

impl Placer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a payload under the canonical namespace for its classification.
    ///
    /// Returns the destination identifier actually written. Fails with
    /// [`PlaceError::Unclassified`] when the classification carries no
    /// dataset; sink failures (including the defensive occupied-after-
    /// disambiguation case) pass through as per-entry errors.
    pub fn place(
        &mut self,
        sink: &mut dyn Sink,
        classification: &Classification,
        ext: &str,
        payload: &mut dyn std::io::Read,
    ) -> Result<String, PlaceError> {
        let dest = self.next_destination(sink, classification, ext)?;
        sink.write(&dest, payload)?;
        Ok(dest)
    }

    /// Resolve the next unoccupied destination identifier for a key without
    /// writing. Advances the key's sequence counter.
    pub fn next_destination(
        &mut self,
        sink: &dyn Sink,
        classification: &Classification,
        ext: &str,
    ) -> Result<String, PlaceError> {
        let dataset = classification
            .dataset
            .as_deref()
            .ok_or(PlaceError::Unclassified)?;
        let scenario = classification.scenario.as_deref();
        let split = classification.split_or_default();

        let key = format!("{}/{}/{}", dataset, scenario.unwrap_or(NO_SCENARIO), split);
        let seq = self.counters.entry(key).or_insert(0);
        *seq += 1;

        let stem = format!(
            "{}_{}_{}_{:05}",
            dataset,
            scenario.unwrap_or(NO_SCENARIO),
            split,
            seq
        );

        let mut dir = String::new();
        dir.push_str(
            classification
                .origin
                .as_deref()
                .unwrap_or(crate::classify::RAW_MARKER),
        );
        if let Some(visibility) = classification.visibility.as_deref() {
            dir.push('/');
            dir.push_str(visibility);
        }
        dir.push('/');
        dir.push_str(dataset);
        if let Some(scenario) = scenario {
            dir.push('/');
            dir.push_str(scenario);
        }
        dir.push('/');
        dir.push_str(split.as_str());

        // Deterministic rename on collision: keep appending a numeric
        // disambiguator until the identifier is unoccupied.
        let mut candidate = format!("{}/{}.{}", dir, stem, ext);
        let mut bump = 0u32;
        while sink.exists(&candidate) {
            bump += 1;
            candidate = format!("{}/{}_{}.{}", dir, stem, bump, ext);
        }
        Ok(candidate)
    }
}
