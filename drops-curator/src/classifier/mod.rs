//! Release classification
//!
//! Maps each release (with tracks attached) to exactly one
//! [`ExtendedCategory`] and applies the per-artist blacklist.
//!
//! **Algorithm:**
//! 1. Walk the enabled remap rules in priority order
//! 2. Skip rules that do not apply to the release's base category
//! 3. First rule that matches decides the category
//! 4. No match: the base category is kept
//! 5. Blacklist gate: if every artist of the release blacklists the
//!    resulting category, the release is marked inert

pub mod blacklist;
pub mod rules;

pub use blacklist::Blacklist;
pub use rules::{RemapRule, RuleKind};

use crate::config::RemapSettings;
use crate::models::{ExtendedCategory, Release};
use drops_common::{Error, Result};
use serde::Serialize;
use tracing::debug;

/// A release together with its effective category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedRelease {
    pub release: Release,
    pub category: ExtendedCategory,
    /// Blacklisted for `category`: never written, still committed as seen
    pub inert: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ClassificationEngine {
    rules: Vec<RemapRule>,
    blacklist: Blacklist,
}

impl ClassificationEngine {
    /// Engine with an explicit rule list (already in priority order)
    pub fn new(rules: Vec<RemapRule>, blacklist: Blacklist) -> Self {
        Self { rules, blacklist }
    }

    /// Build the enabled rules from settings
    ///
    /// Disabled rules are left out entirely. An invalid pattern is a
    /// configuration error.
    pub fn from_settings(settings: &RemapSettings, blacklist: Blacklist) -> Result<Self> {
        let mut rules = Vec::with_capacity(settings.priority.len());
        for kind in &settings.priority {
            if !settings.is_enabled(*kind) {
                continue;
            }
            let rule = RemapRule::build(*kind, settings.pattern(*kind)).map_err(|e| {
                Error::Config(format!("Invalid {} pattern: {}", kind, e))
            })?;
            rules.push(rule);
        }
        Ok(Self::new(rules, blacklist))
    }

    pub fn rules(&self) -> &[RemapRule] {
        &self.rules
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Effective category of one release
    pub fn classify(&self, release: &Release) -> ExtendedCategory {
        self.rules
            .iter()
            .filter(|rule| rule.applies_to_base(release.base_category))
            .find(|rule| rule.matches(release))
            .map(RemapRule::target_category)
            .unwrap_or_else(|| release.base_category.into())
    }

    /// Classify and apply the blacklist gate
    pub fn classify_release(&self, release: Release) -> ClassifiedRelease {
        let category = self.classify(&release);
        let inert = self.blacklist.is_blacklisted(&release, category);
        if inert {
            debug!(release_id = %release.id, category = %category, "Release blacklisted");
        }
        ClassifiedRelease {
            release,
            category,
            inert,
        }
    }

    pub fn classify_all(&self, releases: Vec<Release>) -> Vec<ClassifiedRelease> {
        releases
            .into_iter()
            .map(|release| self.classify_release(release))
            .collect()
    }
}
