//! Remap rules
//!
//! Each rule is a pure predicate over a [`Release`] plus the category it
//! remaps to. The set of rule kinds is closed; patterns for the title based
//! rules come from settings.

use crate::models::{BaseCategory, ExtendedCategory, Release};
use crate::services::fingerprint::normalize_title;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// "EP" as a standalone token, optionally dotted ("E.P.", "E-P")
static EP_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bE\W?P\W?\b").expect("EP pattern is valid"));

const EP_SONG_COUNT_THRESHOLD: usize = 5;
const EP_DURATION_THRESHOLD_MS: u64 = 20 * 60 * 1000;
const EP_SONG_COUNT_THRESHOLD_LESSER: usize = 3;
const EP_DURATION_THRESHOLD_LESSER_MS: u64 = 10 * 60 * 1000;

pub const DEFAULT_REMIX_PATTERN: &str = r"(?i)\b(?:re-?mix(?:es|ed)?|rmx)\b";
pub const DEFAULT_LIVE_PATTERN: &str =
    r"(?i)(?:[\(\[]|\s[-–]\s)\s*live\b|\blive\s+(?:at|from|in)\b";
pub const DEFAULT_RERELEASE_PATTERN: &str =
    r"(?i)\b(?:remaster(?:ed)?|re-?issue|re-?release|anniversary|deluxe)\b";

/// Kinds of remap rules, used for settings and priority lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Ep,
    Remix,
    Live,
    Rerelease,
}

impl RuleKind {
    /// Default evaluation priority
    pub const DEFAULT_PRIORITY: [RuleKind; 4] =
        [RuleKind::Ep, RuleKind::Remix, RuleKind::Live, RuleKind::Rerelease];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Ep => "ep",
            RuleKind::Remix => "remix",
            RuleKind::Live => "live",
            RuleKind::Rerelease => "rerelease",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ep" => Ok(RuleKind::Ep),
            "remix" => Ok(RuleKind::Remix),
            "live" => Ok(RuleKind::Live),
            "rerelease" => Ok(RuleKind::Rerelease),
            other => Err(format!("Unknown remap rule: {}", other)),
        }
    }
}

/// A configured remap rule
#[derive(Debug, Clone)]
pub enum RemapRule {
    /// Singles that are really EPs
    Ep,
    /// Remix releases; title or most tracks match `pattern`
    Remix { pattern: Regex },
    /// Live recordings; title or most tracks match `pattern`
    Live { pattern: Regex },
    /// Remasters and reissues; title matches `pattern`
    Rerelease { pattern: Regex },
}

impl RemapRule {
    /// Build a rule, compiling `pattern` for the title based kinds
    pub fn build(kind: RuleKind, pattern: &str) -> Result<Self, regex::Error> {
        Ok(match kind {
            RuleKind::Ep => RemapRule::Ep,
            RuleKind::Remix => RemapRule::Remix {
                pattern: Regex::new(pattern)?,
            },
            RuleKind::Live => RemapRule::Live {
                pattern: Regex::new(pattern)?,
            },
            RuleKind::Rerelease => RemapRule::Rerelease {
                pattern: Regex::new(pattern)?,
            },
        })
    }

    /// Rule with its built-in pattern
    pub fn with_default_pattern(kind: RuleKind) -> Self {
        let pattern = match kind {
            RuleKind::Ep => "",
            RuleKind::Remix => DEFAULT_REMIX_PATTERN,
            RuleKind::Live => DEFAULT_LIVE_PATTERN,
            RuleKind::Rerelease => DEFAULT_RERELEASE_PATTERN,
        };
        Self::build(kind, pattern).expect("built-in remap patterns are valid")
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            RemapRule::Ep => RuleKind::Ep,
            RemapRule::Remix { .. } => RuleKind::Remix,
            RemapRule::Live { .. } => RuleKind::Live,
            RemapRule::Rerelease { .. } => RuleKind::Rerelease,
        }
    }

    pub fn target_category(&self) -> ExtendedCategory {
        match self {
            RemapRule::Ep => ExtendedCategory::Ep,
            RemapRule::Remix { .. } => ExtendedCategory::Remix,
            RemapRule::Live { .. } => ExtendedCategory::Live,
            RemapRule::Rerelease { .. } => ExtendedCategory::Rerelease,
        }
    }

    /// Whether the rule is consulted for releases of this base category
    pub fn applies_to_base(&self, base: BaseCategory) -> bool {
        match self {
            RemapRule::Ep => base == BaseCategory::Single,
            RemapRule::Remix { .. } | RemapRule::Live { .. } => {
                matches!(base, BaseCategory::Album | BaseCategory::Single)
            }
            RemapRule::Rerelease { .. } => matches!(
                base,
                BaseCategory::Album | BaseCategory::Single | BaseCategory::Compilation
            ),
        }
    }

    pub fn matches(&self, release: &Release) -> bool {
        match self {
            RemapRule::Ep => qualifies_as_ep(release),
            RemapRule::Remix { pattern } | RemapRule::Live { pattern } => {
                pattern.is_match(&release.title) || most_tracks_match(release, pattern)
            }
            RemapRule::Rerelease { pattern } => pattern.is_match(&release.title),
        }
    }
}

/// A single counts as EP if ANY of these holds:
/// - "EP" appears in the title as its own token
/// - at least 5 tracks
/// - at least 20 minutes
/// - at least 3 tracks AND at least 10 minutes AND no title track
///
/// The last case catches EPs that look like a fancy single by the numbers
/// but have no track named after the release.
fn qualifies_as_ep(release: &Release) -> bool {
    if EP_TITLE.is_match(&release.title) {
        return true;
    }

    let track_count = release.track_count();
    let total_ms = release.total_duration_millis();
    if track_count >= EP_SONG_COUNT_THRESHOLD || total_ms >= EP_DURATION_THRESHOLD_MS {
        return true;
    }

    if track_count >= EP_SONG_COUNT_THRESHOLD_LESSER
        && total_ms >= EP_DURATION_THRESHOLD_LESSER_MS
    {
        let release_title = normalize_title(&release.title);
        return !release
            .tracks
            .iter()
            .any(|t| normalize_title(&t.title) == release_title);
    }

    false
}

/// At least half of the tracks match (and there is at least one track)
fn most_tracks_match(release: &Release, pattern: &Regex) -> bool {
    if release.tracks.is_empty() {
        return false;
    }
    let matching = release
        .tracks
        .iter()
        .filter(|t| pattern.is_match(&t.title))
        .count();
    matching * 2 >= release.tracks.len()
}
