//! Destination collections per category

use super::category::ExtendedCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where releases of one category are curated into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionTarget {
    pub category: ExtendedCategory,
    /// `None` (or blank) leaves the category inert
    pub collection_id: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl CollectionTarget {
    pub fn new(category: ExtendedCategory, collection_id: impl Into<String>) -> Self {
        Self {
            category,
            collection_id: Some(collection_id.into()),
            last_update: None,
        }
    }

    /// Destination id, if one is configured and not blank
    pub fn destination(&self) -> Option<&str> {
        self.collection_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Category → target mapping; ordered by default group processing order
pub type CollectionTargets = BTreeMap<ExtendedCategory, CollectionTarget>;
