//! Release categories
//!
//! [`BaseCategory`] is what the catalog source reports. [`ExtendedCategory`]
//! adds the refinements produced by the remap rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse category as reported by the upstream catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BaseCategory {
    Album,
    Single,
    Compilation,
    AppearsOn,
}

/// Effective category of a release after remapping
///
/// Declaration order is the default group processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtendedCategory {
    Album,
    Single,
    Ep,
    Remix,
    Live,
    Rerelease,
    Compilation,
    AppearsOn,
}

impl ExtendedCategory {
    /// Every category, in default processing order
    pub const ALL: [ExtendedCategory; 8] = [
        ExtendedCategory::Album,
        ExtendedCategory::Single,
        ExtendedCategory::Ep,
        ExtendedCategory::Remix,
        ExtendedCategory::Live,
        ExtendedCategory::Rerelease,
        ExtendedCategory::Compilation,
        ExtendedCategory::AppearsOn,
    ];

    /// Upper-case name used in the database and CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtendedCategory::Album => "ALBUM",
            ExtendedCategory::Single => "SINGLE",
            ExtendedCategory::Ep => "EP",
            ExtendedCategory::Remix => "REMIX",
            ExtendedCategory::Live => "LIVE",
            ExtendedCategory::Rerelease => "RERELEASE",
            ExtendedCategory::Compilation => "COMPILATION",
            ExtendedCategory::AppearsOn => "APPEARS_ON",
        }
    }
}

impl From<BaseCategory> for ExtendedCategory {
    fn from(base: BaseCategory) -> Self {
        match base {
            BaseCategory::Album => ExtendedCategory::Album,
            BaseCategory::Single => ExtendedCategory::Single,
            BaseCategory::Compilation => ExtendedCategory::Compilation,
            BaseCategory::AppearsOn => ExtendedCategory::AppearsOn,
        }
    }
}

impl fmt::Display for ExtendedCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExtendedCategory {
    type Err = String;

    /// Case-insensitive; accepts `appears_on`, `appears-on` and `APPEARS_ON`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        ExtendedCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("Unknown category: {}", s.trim()))
    }
}
