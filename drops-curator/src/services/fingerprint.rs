//! Release name fingerprints
//!
//! Reissues often come back under a new id with a decorated title
//! ("Album (Deluxe Edition)", "Album - Remastered 2011"). The fingerprint
//! strips those decorations so the identity cache still recognizes them.
//!
//! All functions here are pure and total: malformed input never fails, at
//! worst the lower-cased original comes back.

use crate::models::Release;
use once_cell::sync::Lazy;
use regex::Regex;

/// Words marking an edition decoration rather than part of the title
const EDITION_WORDS: &str = r"deluxe|remaster(?:ed)?|edition|expanded|anniversary|bonus|re-?issue|special|collector'?s|explicit|clean|version|feat\.?|ft\.";

/// `( ... )` or `[ ... ]` groups that mention an edition word
static EDITION_GROUP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"[\(\[][^\)\]]*\b(?:{})[^\)\]]*[\)\]]", EDITION_WORDS))
        .expect("edition group pattern is valid")
});

/// ` - Remastered 2009` style suffixes
static EDITION_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\s[-–—]\s.*\b(?:{}).*$", EDITION_WORDS))
        .expect("edition suffix pattern is valid")
});

static PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s]+").expect("punctuation pattern is valid"));

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Normalize a release or track title for comparison
///
/// **Algorithm:**
/// 1. Lower-case
/// 2. Drop bracketed groups and dash suffixes carrying edition markers
/// 3. Drop apostrophes, turn remaining punctuation into spaces
/// 4. Collapse whitespace and trim
///
/// If nothing is left, the lower-cased original is returned instead.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();

    let stripped = EDITION_GROUP.replace_all(&lowered, " ");
    let stripped = EDITION_SUFFIX.replace(&stripped, "");
    let stripped = stripped.replace(['\'', '’'], "");
    let stripped = PUNCTUATION.replace_all(&stripped, " ");
    let collapsed = WHITESPACE.replace_all(stripped.trim(), " ").into_owned();

    if collapsed.is_empty() {
        lowered
    } else {
        collapsed
    }
}

/// Fingerprint of a release: normalized title plus its sorted artist ids
pub fn release_fingerprint(release: &Release) -> String {
    let artists: Vec<&str> = release.artist_ids.iter().map(String::as_str).collect();
    format!("{}|{}", normalize_title(&release.title), artists.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BaseCategory;
    use chrono::NaiveDate;

    #[test]
    fn test_strips_edition_markers() {
        assert_eq!(normalize_title("Midnight City (Deluxe Edition)"), "midnight city");
        assert_eq!(normalize_title("Midnight City - Remastered 2011"), "midnight city");
        assert_eq!(normalize_title("Midnight City [2021 Remaster]"), "midnight city");
    }

    #[test]
    fn test_keeps_plain_parentheses() {
        assert_eq!(normalize_title("Song (Interlude)"), "song interlude");
    }

    #[test]
    fn test_punctuation_and_whitespace() {
        assert_eq!(normalize_title("  Don't   Stop, Me!  "), "dont stop me");
        assert_eq!(normalize_title("E.P."), "e p");
    }

    #[test]
    fn test_total_on_degenerate_input() {
        assert_eq!(normalize_title(""), "");
        assert_eq!(normalize_title("!!!"), "!!!");
        assert_eq!(normalize_title("(Deluxe)"), "(deluxe)");
    }

    #[test]
    fn test_fingerprint_ignores_artist_order_and_edition() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let a = Release::new("id-1", "Hurry Up", BaseCategory::Album, ["b", "a"], date).unwrap();
        let b = Release::new("id-2", "Hurry Up (Deluxe)", BaseCategory::Album, ["a", "b"], date)
            .unwrap();
        assert_eq!(release_fingerprint(&a), release_fingerprint(&b));
        assert_eq!(release_fingerprint(&a), "hurry up|a,b");
    }
}
