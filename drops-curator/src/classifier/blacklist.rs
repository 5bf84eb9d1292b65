//! Per-artist category blacklist

use crate::models::{ExtendedCategory, Release};
use std::collections::{BTreeSet, HashMap};

/// Categories each artist does not want curated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blacklist {
    entries: HashMap<String, BTreeSet<ExtendedCategory>>,
}

impl Blacklist {
    pub fn insert(&mut self, artist_id: impl Into<String>, categories: BTreeSet<ExtendedCategory>) {
        self.entries.insert(artist_id.into(), categories);
    }

    pub fn categories_for(&self, artist_id: &str) -> Option<&BTreeSet<ExtendedCategory>> {
        self.entries.get(artist_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// A release is blacklisted only if EVERY one of its artists blacklists
    /// `category`. One artist without the entry keeps the release eligible.
    pub fn is_blacklisted(&self, release: &Release, category: ExtendedCategory) -> bool {
        !release.artist_ids.is_empty()
            && release.artist_ids.iter().all(|artist| {
                self.entries
                    .get(artist)
                    .is_some_and(|categories| categories.contains(&category))
            })
    }
}
