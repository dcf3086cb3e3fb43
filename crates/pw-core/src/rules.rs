//! Builtin rule lists and the user's editable rule sets
//!
//! Builtin lists are compiled in and never change at runtime. User rules are
//! sets: adding a duplicate is a no-op and iteration order is stable.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{Rule, RuleKind};

// =============================================================================
// Builtin Lists
// =============================================================================

/// URL substrings that are always admitted (bot challenges must load).
pub const BUILTIN_WHITELIST: &[&str] = &["cloudflare", "challenge"];

/// URL substrings of known ad, popup and tracking networks.
pub const BUILTIN_BLACKLIST: &[&str] = &[
    "doubleclick.net",
    "googlesyndication",
    "facebook.com/tr",
    "google-analytics",
    "adnxs",
    "popcash",
    "popads",
    "mc.yandex.ru",
    "gemini",
    "exoclick",
    "propellerads",
    "juicyads",
    "adsterra",
    "trafficjunky",
];

/// Selectors hidden by the injected stylesheet on every page.
pub const CSS_KILL_LIST: &[&str] = &[
    ".ad",
    ".ads",
    ".banner",
    "[id^=\"ad-\"]",
    "[class^=\"ad-\"]",
    ".overlay",
    "#overlay",
    ".popup",
    "#popup",
    "[class*=\"floating\"]",
    "[style*=\"position: fixed\"][style*=\"bottom\"]",
    "[style*=\"z-index: 99999\"]",
    "iframe[src*=\"ads\"]",
    "iframe[src*=\"doubleclick\"]",
];

/// Words that mark a short text block as an ad or gambling lure.
pub const TEXT_FILTERS: &[&str] = &[
    "skip ad",
    "تخطي الاعلان",
    "advertisement",
    "sponsored",
    "bc.game",
    "bet",
    "casino",
    "bonus",
    "deposit",
    "spin",
    "win",
    "تحميل التطبيق",
];

/// Link targets that get neutralized by the filter loop.
pub const BAD_LINK_PATTERNS: &[&str] = &["bc.game", "bet", "pop"];

/// Every builtin rule, tagged by kind.
pub fn builtin_rules() -> impl Iterator<Item = Rule> {
    let whitelist = BUILTIN_WHITELIST
        .iter()
        .map(|p| Rule::builtin(*p, RuleKind::DomainWhitelist));
    let blacklist = BUILTIN_BLACKLIST
        .iter()
        .map(|p| Rule::builtin(*p, RuleKind::DomainBlacklist));
    let css = CSS_KILL_LIST
        .iter()
        .map(|p| Rule::builtin(*p, RuleKind::CssSelector));
    let text = TEXT_FILTERS
        .iter()
        .map(|p| Rule::builtin(*p, RuleKind::TextFilter));
    whitelist.chain(blacklist).chain(css).chain(text)
}

// =============================================================================
// User Rules
// =============================================================================

/// The user's custom hide selectors and blocked domains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserRules {
    selectors: BTreeSet<String>,
    blocked_domains: BTreeSet<String>,
}

impl UserRules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        selectors: impl IntoIterator<Item = String>,
        blocked_domains: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut rules = Self::new();
        for s in selectors {
            rules.add_selector(&s);
        }
        for d in blocked_domains {
            rules.add_blocked_domain(&d);
        }
        rules
    }

    /// Add a hide selector. Returns the stored selector if it was new.
    pub fn add_selector(&mut self, selector: &str) -> Option<&str> {
        let selector = selector.trim();
        if selector.is_empty() || !self.selectors.insert(selector.to_string()) {
            return None;
        }
        self.selectors.get(selector).map(String::as_str)
    }

    pub fn remove_selector(&mut self, selector: &str) -> bool {
        self.selectors.remove(selector.trim())
    }

    /// Add a blocked domain (trimmed and lowercased). Empty input is ignored.
    pub fn add_blocked_domain(&mut self, domain: &str) -> bool {
        let domain = domain.trim().to_lowercase();
        if domain.is_empty() {
            return false;
        }
        self.blocked_domains.insert(domain)
    }

    pub fn remove_blocked_domain(&mut self, domain: &str) -> bool {
        self.blocked_domains.remove(&domain.trim().to_lowercase())
    }

    pub fn selectors(&self) -> impl Iterator<Item = &str> {
        self.selectors.iter().map(String::as_str)
    }

    pub fn blocked_domains(&self) -> impl Iterator<Item = &str> {
        self.blocked_domains.iter().map(String::as_str)
    }

    pub fn selector_count(&self) -> usize {
        self.selectors.len()
    }

    pub fn blocked_domain_count(&self) -> usize {
        self.blocked_domains.len()
    }

    /// User rules as tagged [`Rule`] values.
    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        let css = self
            .selectors()
            .map(|s| Rule::user(s, RuleKind::CssSelector));
        let domains = self
            .blocked_domains()
            .map(|d| Rule::user(d, RuleKind::DomainBlacklist));
        css.chain(domains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_rules_cover_every_list() {
        let rules: Vec<Rule> = builtin_rules().collect();
        let expected = BUILTIN_WHITELIST.len()
            + BUILTIN_BLACKLIST.len()
            + CSS_KILL_LIST.len()
            + TEXT_FILTERS.len();
        assert_eq!(rules.len(), expected);
        assert!(rules.iter().all(|r| r.builtin));
        assert!(rules
            .iter()
            .any(|r| r.kind == RuleKind::DomainWhitelist && r.pattern == "cloudflare"));
    }

    #[test]
    fn selectors_are_deduplicated() {
        let mut rules = UserRules::new();
        assert_eq!(rules.add_selector(".promo"), Some(".promo"));
        assert_eq!(rules.add_selector("  .promo  "), None);
        assert_eq!(rules.add_selector("   "), None);
        assert_eq!(rules.selector_count(), 1);
        assert!(rules.remove_selector(".promo"));
        assert!(!rules.remove_selector(".promo"));
    }

    #[test]
    fn domains_are_trimmed_and_lowercased() {
        let mut rules = UserRules::new();
        assert!(rules.add_blocked_domain("  Tracker.Example  "));
        assert!(!rules.add_blocked_domain("tracker.example"));
        assert!(!rules.add_blocked_domain(""));
        assert_eq!(rules.blocked_domains().collect::<Vec<_>>(), vec!["tracker.example"]);
        assert!(rules.remove_blocked_domain("TRACKER.example"));
        assert_eq!(rules.blocked_domain_count(), 0);
    }

    #[test]
    fn user_rules_are_tagged() {
        let rules = UserRules::from_parts(vec![".x".to_string()], vec!["a.com".to_string()]);
        let tagged: Vec<Rule> = rules.rules().collect();
        assert_eq!(tagged.len(), 2);
        assert!(tagged.iter().all(|r| !r.builtin));
    }
}
