//! User data owned by the session
//!
//! Rules, scripts, preferences, bookmarks and history live next to the tab
//! list in [`SessionStore`]. Settings-like data (rules, scripts, preferences,
//! bookmarks) persists even in incognito; browsing traces (history, search
//! queries) are neither recorded nor persisted there.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::history::{History, HistoryEntry, SearchHistory};
use crate::protocol::GuestCommand;
use crate::rules::UserRules;
use crate::scripts::{InjectedScript, ScriptLibrary};
use crate::session::SessionStore;
use crate::store::{self, keys, KeyValueStore};
use crate::url::{encode_component, ensure_scheme, looks_like_url};

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 10; K) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36";

// =============================================================================
// Preferences
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchEngine {
    #[default]
    Google,
    DuckDuckGo,
    Bing,
}

impl SearchEngine {
    pub fn search_url(self, query: &str) -> String {
        let q = encode_component(query);
        match self {
            SearchEngine::Google => format!("https://www.google.com/search?q={q}"),
            SearchEngine::DuckDuckGo => format!("https://duckduckgo.com/?q={q}"),
            SearchEngine::Bing => format!("https://www.bing.com/search?q={q}"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub dark_mode: bool,
    pub desktop_mode: bool,
    pub search_engine: SearchEngine,
}

impl Preferences {
    pub fn user_agent(&self) -> &'static str {
        if self.desktop_mode {
            DESKTOP_USER_AGENT
        } else {
            MOBILE_USER_AGENT
        }
    }
}

/// A saved website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(rename = "dateAdded")]
    pub date_added: DateTime<Utc>,
}

// =============================================================================
// Profile
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub rules: UserRules,
    pub scripts: ScriptLibrary,
    pub prefs: Preferences,
    pub history: History,
    pub searches: SearchHistory,
    pub bookmarks: Vec<Bookmark>,
}

impl Profile {
    /// Load every section; missing or undecodable sections fall back to
    /// their defaults.
    pub fn load(store: &impl KeyValueStore) -> Self {
        let selectors: Vec<String> = store::load(store, keys::BLOCK_RULES).unwrap_or_default();
        let domains: Vec<String> = store::load(store, keys::BLOCKED_DOMAINS).unwrap_or_default();
        Self {
            rules: UserRules::from_parts(selectors, domains),
            scripts: store::load(store, keys::SCRIPTS).unwrap_or_default(),
            prefs: Preferences {
                dark_mode: store::load(store, keys::DARK_MODE).unwrap_or_default(),
                desktop_mode: store::load(store, keys::DESKTOP_MODE).unwrap_or_default(),
                search_engine: store::load(store, keys::SEARCH_ENGINE).unwrap_or_default(),
            },
            history: store::load(store, keys::HISTORY).unwrap_or_default(),
            searches: store::load(store, keys::SEARCH_HISTORY).unwrap_or_default(),
            bookmarks: store::load(store, keys::BOOKMARKS).unwrap_or_default(),
        }
    }
}

// =============================================================================
// Session operations on profile data
// =============================================================================

impl<S: KeyValueStore> SessionStore<S> {
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    // -------------------------------------------------------------------------
    // Block rules
    // -------------------------------------------------------------------------

    /// Add a custom hide selector. Returns the command that hides it on the
    /// live page, or `None` if the selector was empty or already present.
    pub fn add_block_rule(&mut self, selector: &str) -> Option<GuestCommand> {
        let stored = self.profile.rules.add_selector(selector)?.to_string();
        self.persist_rules();
        Some(GuestCommand::AddHideRule { selector: stored })
    }

    /// Remove a custom selector. Pages keep hiding it until they reload.
    pub fn remove_block_rule(&mut self, selector: &str) -> bool {
        let removed = self.profile.rules.remove_selector(selector);
        if removed {
            self.persist_rules();
        }
        removed
    }

    pub fn add_blocked_domain(&mut self, domain: &str) -> bool {
        let added = self.profile.rules.add_blocked_domain(domain);
        if added {
            self.persist_domains();
        }
        added
    }

    pub fn remove_blocked_domain(&mut self, domain: &str) -> bool {
        let removed = self.profile.rules.remove_blocked_domain(domain);
        if removed {
            self.persist_domains();
        }
        removed
    }

    fn persist_rules(&mut self) {
        let selectors: Vec<String> = self.profile.rules.selectors().map(String::from).collect();
        self.persist_setting(keys::BLOCK_RULES, &selectors);
    }

    fn persist_domains(&mut self) {
        let domains: Vec<String> = self
            .profile
            .rules
            .blocked_domains()
            .map(String::from)
            .collect();
        self.persist_setting(keys::BLOCKED_DOMAINS, &domains);
    }

    // -------------------------------------------------------------------------
    // User scripts
    // -------------------------------------------------------------------------

    /// Create an active script. Returns its id.
    ///
    /// Script changes take effect on the next page load; the caller reloads
    /// the active tab.
    pub fn create_script(&mut self, name: &str, domain: &str, code: &str) -> Result<String, Error> {
        let script = InjectedScript::new(name, domain, code)?;
        let id = self.profile.scripts.add(script).id.clone();
        self.persist_scripts();
        Ok(id)
    }

    pub fn edit_script(&mut self, id: &str, name: &str, domain: &str, code: &str) -> Result<(), Error> {
        self.profile.scripts.edit(id, name, domain, code)?;
        self.persist_scripts();
        Ok(())
    }

    pub fn toggle_script(&mut self, id: &str) -> Result<bool, Error> {
        let active = self.profile.scripts.toggle(id)?;
        self.persist_scripts();
        Ok(active)
    }

    pub fn delete_script(&mut self, id: &str) -> Result<(), Error> {
        self.profile.scripts.remove(id)?;
        self.persist_scripts();
        Ok(())
    }

    fn persist_scripts(&mut self) {
        let scripts = self.profile.scripts.clone();
        self.persist_setting(keys::SCRIPTS, &scripts);
    }

    // -------------------------------------------------------------------------
    // Preferences
    // -------------------------------------------------------------------------

    /// Flip forced dark mode. The returned command applies it to the live
    /// page; later loads get it from `finish_load`.
    pub fn toggle_dark_mode(&mut self) -> GuestCommand {
        self.profile.prefs.dark_mode = !self.profile.prefs.dark_mode;
        let enabled = self.profile.prefs.dark_mode;
        self.persist_setting(keys::DARK_MODE, &enabled);
        GuestCommand::DarkMode { enabled }
    }

    /// Flip desktop mode. The caller reloads with the new user agent.
    pub fn toggle_desktop_mode(&mut self) -> bool {
        self.profile.prefs.desktop_mode = !self.profile.prefs.desktop_mode;
        let enabled = self.profile.prefs.desktop_mode;
        self.persist_setting(keys::DESKTOP_MODE, &enabled);
        enabled
    }

    pub fn set_search_engine(&mut self, engine: SearchEngine) {
        self.profile.prefs.search_engine = engine;
        self.persist_setting(keys::SEARCH_ENGINE, &engine);
    }

    // -------------------------------------------------------------------------
    // Address bar, history and bookmarks
    // -------------------------------------------------------------------------

    /// Turn address-bar input into a location: URL-like input gains a scheme,
    /// anything else becomes a search with the preferred engine.
    pub fn resolve_input(&mut self, input: &str) -> String {
        let input = input.trim();
        self.record_search(input);
        if looks_like_url(input) {
            ensure_scheme(input)
        } else {
            self.profile.prefs.search_engine.search_url(input)
        }
    }

    pub fn record_search(&mut self, query: &str) {
        if self.incognito() || !self.profile.searches.record(query) {
            return;
        }
        let searches = self.profile.searches.clone();
        self.persist_private(keys::SEARCH_HISTORY, &searches);
    }

    pub fn remove_search(&mut self, query: &str) -> bool {
        let removed = self.profile.searches.remove(query);
        if removed {
            let searches = self.profile.searches.clone();
            self.persist_private(keys::SEARCH_HISTORY, &searches);
        }
        removed
    }

    pub(crate) fn record_visit(&mut self, title: &str, url: &str) {
        if self.incognito() {
            return;
        }
        let start_page = self.start_page().to_string();
        if self.profile.history.record(title, url, &start_page, Utc::now()) {
            self.persist_history();
        }
    }

    pub fn history(&self) -> &[HistoryEntry] {
        self.profile.history.entries()
    }

    pub fn delete_history_item(&mut self, id: &str) -> bool {
        let removed = self.profile.history.remove(id);
        if removed {
            self.persist_history();
        }
        removed
    }

    pub fn clear_history(&mut self) {
        self.profile.history.clear();
        self.persist_history();
    }

    fn persist_history(&mut self) {
        let history = self.profile.history.clone();
        self.persist_private(keys::HISTORY, &history);
    }

    /// Save a website, newest first. A missing scheme becomes `https://`.
    pub fn add_bookmark(&mut self, name: &str, url: &str) -> &Bookmark {
        let bookmark = Bookmark {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            url: ensure_scheme(url),
            date_added: Utc::now(),
        };
        self.profile.bookmarks.insert(0, bookmark);
        let bookmarks = self.profile.bookmarks.clone();
        self.persist_setting(keys::BOOKMARKS, &bookmarks);
        &self.profile.bookmarks[0]
    }

    pub fn delete_bookmark(&mut self, id: &str) -> bool {
        let before = self.profile.bookmarks.len();
        self.profile.bookmarks.retain(|b| b.id != id);
        if self.profile.bookmarks.len() == before {
            return false;
        }
        let bookmarks = self.profile.bookmarks.clone();
        self.persist_setting(keys::BOOKMARKS, &bookmarks);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn session() -> SessionStore<MemoryStore> {
        SessionStore::new(MemoryStore::new())
    }

    #[test]
    fn add_block_rule_returns_live_command() {
        let mut s = session();
        assert_eq!(
            s.add_block_rule(" .promo "),
            Some(GuestCommand::AddHideRule {
                selector: ".promo".to_string()
            })
        );
        assert_eq!(s.add_block_rule(".promo"), None);
        assert_eq!(s.store().get(keys::BLOCK_RULES), Some(json!([".promo"])));
        assert!(s.remove_block_rule(".promo"));
        assert_eq!(s.store().get(keys::BLOCK_RULES), Some(json!([])));
    }

    #[test]
    fn settings_persist_in_incognito() {
        let mut s = session();
        s.set_incognito(true);
        s.add_blocked_domain("Ads.Example");
        assert_eq!(s.store().get(keys::BLOCKED_DOMAINS), Some(json!(["ads.example"])));
    }

    #[test]
    fn script_lifecycle_persists() {
        let mut s = session();
        let id = s.create_script("hello", "*", "console.log(1)").unwrap();
        assert!(!s.toggle_script(&id).unwrap());
        let stored = s.store().get(keys::SCRIPTS).unwrap();
        assert_eq!(stored[0]["active"], json!(false));
        assert_eq!(stored[0]["domain"], json!("*"));

        s.delete_script(&id).unwrap();
        assert!(s.profile().scripts.is_empty());
        assert!(matches!(s.delete_script(&id), Err(Error::UnknownScript(_))));
    }

    #[test]
    fn resolve_input_searches_or_navigates() {
        let mut s = session();
        assert_eq!(s.resolve_input("example.com"), "https://example.com");
        assert_eq!(
            s.resolve_input("rust traits"),
            "https://www.google.com/search?q=rust%20traits"
        );
        s.set_search_engine(SearchEngine::DuckDuckGo);
        assert_eq!(s.resolve_input("x y"), "https://duckduckgo.com/?q=x%20y");
        assert_eq!(s.profile().searches.queries()[0], "x y");
    }

    #[test]
    fn preferences_survive_restore() {
        let mut s = session();
        s.toggle_dark_mode();
        assert!(s.toggle_desktop_mode());
        s.set_search_engine(SearchEngine::Bing);
        s.add_bookmark("Docs", "docs.rs");

        let restored = SessionStore::new(s.store().clone());
        let prefs = &restored.profile().prefs;
        assert!(prefs.dark_mode);
        assert_eq!(prefs.user_agent(), DESKTOP_USER_AGENT);
        assert_eq!(prefs.search_engine, SearchEngine::Bing);
        assert_eq!(restored.profile().bookmarks[0].url, "https://docs.rs");
    }

    #[test]
    fn history_items_can_be_deleted() {
        let mut s = session();
        s.record_visit("A", "https://a.test");
        let id = s.history()[0].id.clone();
        assert!(s.delete_history_item(&id));
        assert!(s.history().is_empty());
        s.record_visit("B", "https://b.test");
        s.clear_history();
        assert_eq!(s.store().get(keys::HISTORY), Some(json!([])));
    }
}
