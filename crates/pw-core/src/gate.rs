//! Request admission control
//!
//! Every resource request the renderer wants to make is checked here before
//! it leaves the renderer. The check is a pure function of the URL and the
//! user's blocked domains and does no I/O. Only the user-domain step
//! allocates: it lowercases the URL and each entry with full Unicode case
//! folding. The builtin lists are ASCII and compare without allocating.
//!
//! Precedence, first match wins:
//!
//! 1. User-blocked domain found in the normalized URL: block
//! 2. Builtin whitelist entry found in the URL: allow
//! 3. Builtin blacklist entry found in the URL: block
//! 4. Otherwise: allow

use std::sync::atomic::{AtomicU64, Ordering};

use crate::rules::{BUILTIN_BLACKLIST, BUILTIN_WHITELIST};
use crate::types::Decision;
use crate::url::{contains_case_insensitive, strip_scheme_and_www};

/// Decide whether a request may proceed.
///
/// User domains win over the builtin whitelist, so a user can block a
/// whitelisted host outright. The URL and each domain entry are lowercased
/// and have their scheme and `www.` prefix stripped before comparison.
///
/// An entry that is empty after this normalization (`""`, `"https://"`,
/// `"www."`) is skipped rather than treated as a substring of every URL, so
/// a blank entry never blocks all traffic.
pub fn decide<I, S>(url: &str, user_blocked_domains: I) -> Decision
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut domains = user_blocked_domains.into_iter().peekable();
    if domains.peek().is_some() {
        let lowered = url.to_lowercase();
        let body = strip_scheme_and_www(&lowered);
        for domain in domains {
            let entry = domain.as_ref().trim().to_lowercase();
            let entry = strip_scheme_and_www(&entry);
            if !entry.is_empty() && body.contains(entry) {
                return Decision::Block;
            }
        }
    }

    if BUILTIN_WHITELIST
        .iter()
        .any(|w| contains_case_insensitive(url, w))
    {
        return Decision::Allow;
    }

    if BUILTIN_BLACKLIST
        .iter()
        .any(|b| contains_case_insensitive(url, b))
    {
        return Decision::Block;
    }

    Decision::Allow
}

/// Admission gate with a running count of blocked requests.
#[derive(Debug, Default)]
pub struct RequestGate {
    blocked: AtomicU64,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide and count. Blocked requests increment the counter.
    pub fn check<I, S>(&self, url: &str, user_blocked_domains: I) -> Decision
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let decision = decide(url, user_blocked_domains);
        if decision.is_block() {
            self.blocked.fetch_add(1, Ordering::Relaxed);
            log::trace!("blocked {url}");
        }
        decision
    }

    pub fn blocked_count(&self) -> u64 {
        self.blocked.load(Ordering::Relaxed)
    }

    pub fn reset_count(&self) {
        self.blocked.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONE: [&str; 0] = [];

    #[test]
    fn allows_ordinary_pages() {
        assert_eq!(decide("https://example.com/article", NONE), Decision::Allow);
    }

    #[test]
    fn blocks_builtin_blacklist() {
        assert_eq!(
            decide("https://ad.doubleclick.net/pixel", NONE),
            Decision::Block
        );
        assert_eq!(
            decide("https://www.Google-Analytics.com/collect", NONE),
            Decision::Block
        );
    }

    #[test]
    fn whitelist_beats_blacklist() {
        // Contains both "challenge" and "popads"
        let url = "https://challenges.example/popads/check";
        assert_eq!(decide(url, NONE), Decision::Allow);
    }

    #[test]
    fn user_domain_beats_whitelist() {
        let url = "https://challenges.cloudflare.com/turnstile";
        assert_eq!(decide(url, ["cloudflare.com"]), Decision::Block);
        assert_eq!(decide(url, NONE), Decision::Allow);
    }

    #[test]
    fn user_domains_are_normalized() {
        let url = "https://www.tracker.example/beacon";
        assert_eq!(decide(url, ["https://www.tracker.example"]), Decision::Block);
        assert_eq!(decide(url, ["  TRACKER.example "]), Decision::Block);
        assert_eq!(decide("http://tracker.example", ["www.tracker.example"]), Decision::Block);
    }

    #[test]
    fn user_domains_fold_non_ascii_case() {
        let mut rules = crate::rules::UserRules::new();
        rules.add_blocked_domain("ÉCOLE.fr");
        let stored: Vec<&str> = rules.blocked_domains().collect();
        assert_eq!(stored, ["école.fr"]);
        assert_eq!(decide("https://ÉCOLE.fr/x", &stored), Decision::Block);
        assert_eq!(decide("https://www.École.FR/", ["ÉCOLE.FR"]), Decision::Block);
    }

    #[test]
    fn empty_user_domains_are_ignored() {
        assert_eq!(decide("https://example.com", ["", "  ", "https://"]), Decision::Allow);
    }

    #[test]
    fn gate_counts_blocks() {
        let gate = RequestGate::new();
        gate.check("https://example.com", NONE);
        gate.check("https://popcash.net/x", NONE);
        gate.check("https://evil.example", ["evil.example"]);
        assert_eq!(gate.blocked_count(), 2);
        gate.reset_count();
        assert_eq!(gate.blocked_count(), 0);
    }
}
