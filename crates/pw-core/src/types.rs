//! Core type definitions for PageWarden
//!
//! These types are shared by the gate, the session and the envelope
//! dispatcher.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Admission Decision
// =============================================================================

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Decision {
    /// The renderer may fulfill the request
    Allow,
    /// The request is cancelled before it leaves the renderer
    Block,
}

impl Decision {
    #[inline]
    pub fn is_block(self) -> bool {
        self == Decision::Block
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::Block => "block",
        }
    }
}

// =============================================================================
// Rules
// =============================================================================

/// What a rule pattern is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    /// Hidden by the injected stylesheet
    CssSelector,
    /// Substring of a request URL that blocks it
    DomainBlacklist,
    /// Substring of a request URL that admits it
    DomainWhitelist,
    /// Substring of short page text that removes its container
    TextFilter,
}

/// A single rule: a pattern plus the kind of match it drives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rule {
    pub pattern: Cow<'static, str>,
    pub kind: RuleKind,
    /// Builtin rules are static; user rules are editable
    pub builtin: bool,
}

impl Rule {
    pub const fn builtin(pattern: &'static str, kind: RuleKind) -> Self {
        Self {
            pattern: Cow::Borrowed(pattern),
            kind,
            builtin: true,
        }
    }

    pub fn user(pattern: impl Into<String>, kind: RuleKind) -> Self {
        Self {
            pattern: Cow::Owned(pattern.into()),
            kind,
            builtin: false,
        }
    }
}

// =============================================================================
// Feature Flags
// =============================================================================

bitflags::bitflags! {
    /// Transient per-tab feature state. Cleared on every tab switch.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FeatureFlags: u8 {
        /// Element inspector listeners are installed in the page
        const INSPECTOR = 1 << 0;
        /// Translation widget is requested for page loads
        const TRANSLATOR = 1 << 1;
        /// Intercepted network calls produce NETWORK_LOG envelopes
        const NETWORK_CAPTURE = 1 << 2;
    }
}

// =============================================================================
// Tab Identity
// =============================================================================

/// Opaque tab identifier (a v4 UUID for tabs created by this host).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TabId(String);

impl TabId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TabId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TabId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tab_ids_are_unique() {
        let a = TabId::generate();
        let b = TabId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn tab_id_serializes_as_plain_string() {
        let id = TabId::from("tab-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tab-1\"");
    }

    #[test]
    fn feature_flags_default_empty() {
        let flags = FeatureFlags::default();
        assert!(flags.is_empty());
        assert!(!flags.contains(FeatureFlags::INSPECTOR));
    }

    #[test]
    fn rule_kind_uses_kebab_case() {
        let json = serde_json::to_string(&RuleKind::DomainBlacklist).unwrap();
        assert_eq!(json, "\"domain-blacklist\"");
    }
}
