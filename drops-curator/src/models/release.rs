//! Release and track values
//!
//! A [`Release`] is created when the catalog reports it and is never mutated
//! afterwards; attaching tracks produces a new value.

use super::category::BaseCategory;
use chrono::NaiveDate;
use drops_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single track of a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub duration_millis: u64,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, duration_millis: u64) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            duration_millis,
        }
    }
}

/// A discovered catalog entry from a tracked artist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Opaque external identifier
    pub id: String,
    pub title: String,
    /// Category as reported by the source
    pub base_category: BaseCategory,
    /// Never empty
    pub artist_ids: BTreeSet<String>,
    /// Empty until the track fetch attaches the listing
    #[serde(default)]
    pub tracks: Vec<Track>,
    pub release_date: NaiveDate,
}

impl Release {
    /// Build a release without tracks
    ///
    /// Fails with [`Error::InvalidInput`] when no artist id is given.
    pub fn new<I, S>(
        id: impl Into<String>,
        title: impl Into<String>,
        base_category: BaseCategory,
        artist_ids: I,
        release_date: NaiveDate,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let release = Self {
            id: id.into(),
            title: title.into(),
            base_category,
            artist_ids: artist_ids.into_iter().map(Into::into).collect(),
            tracks: Vec::new(),
            release_date,
        };
        release.validate()?;
        Ok(release)
    }

    /// Check the invariants a deserialized release may violate
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidInput("Release id is empty".to_string()));
        }
        if self.artist_ids.is_empty() {
            return Err(Error::InvalidInput(format!(
                "Release {} has no artists",
                self.id
            )));
        }
        Ok(())
    }

    /// Copy of this release carrying the given track listing
    pub fn with_tracks(&self, tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            ..self.clone()
        }
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn total_duration_millis(&self) -> u64 {
        self.tracks.iter().map(|t| t.duration_millis).sum()
    }
}
