//! Tab lifecycle, feature flags and per-tab diagnostics
//!
//! [`SessionStore`] owns every tab record and the transient state of the
//! active tab. Two invariants hold after every public call:
//!
//! - the tab list is never empty, and
//! - the active id names a tab in the list.
//!
//! Each tab moves `Created → Loading → Loaded`, re-entering `Loading` on every
//! navigation. Mutations persist the tab list and active id through the
//! [`KeyValueStore`], except in incognito mode where persistence of session
//! data is skipped and in-memory state carries on unchanged.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::capture::{CaptureBuffer, CONSOLE_CAPACITY, NETWORK_CAPACITY};
use crate::error::Error;
use crate::gate::RequestGate;
use crate::profile::Profile;
use crate::protocol::{ConsoleEntry, GuestCommand, InspectedElement, NetworkEntry, StorageSnapshot};
use crate::store::{self, keys, FileStore, KeyValueStore};
use crate::types::{Decision, FeatureFlags, TabId};

/// Sentinel location of a fresh tab.
pub const DEFAULT_START_PAGE: &str = "warden://home";

/// Title shown for a tab that has not loaded anything yet.
pub const NEW_TAB_TITLE: &str = "Home";

// =============================================================================
// Tabs
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Created,
    Loading,
    Loaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabSession {
    pub id: TabId,
    pub title: String,
    pub url: String,
    pub state: LoadState,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

impl TabSession {
    fn new(url: &str) -> Self {
        Self {
            id: TabId::generate(),
            title: NEW_TAB_TITLE.to_string(),
            url: url.to_string(),
            state: LoadState::Created,
            can_go_back: false,
            can_go_forward: false,
        }
    }

    pub fn loading(&self) -> bool {
        self.state == LoadState::Loading
    }
}

/// What survives a restart: identity and location only.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedTab {
    id: TabId,
    #[serde(default)]
    title: String,
    url: String,
}

impl From<PersistedTab> for TabSession {
    fn from(saved: PersistedTab) -> Self {
        Self {
            id: saved.id,
            title: saved.title,
            url: saved.url,
            state: LoadState::Created,
            can_go_back: false,
            can_go_forward: false,
        }
    }
}

/// Navigation state reported by the renderer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationUpdate {
    pub url: String,
    pub title: String,
    pub loading: bool,
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

// =============================================================================
// Diagnostics
// =============================================================================

/// Transient developer-tools state of the active tab.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub console: CaptureBuffer<ConsoleEntry>,
    pub network: CaptureBuffer<NetworkEntry>,
    pub inspected: Option<InspectedElement>,
    pub storage: Option<StorageSnapshot>,
    pub find_matches: Option<usize>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            console: CaptureBuffer::with_capacity(CONSOLE_CAPACITY),
            network: CaptureBuffer::with_capacity(NETWORK_CAPACITY),
            inspected: None,
            storage: None,
            find_matches: None,
        }
    }
}

// =============================================================================
// Session Store
// =============================================================================

pub struct SessionStore<S: KeyValueStore> {
    store: S,
    start_page: String,
    tabs: Vec<TabSession>,
    active: TabId,
    flags: FeatureFlags,
    diagnostics: Diagnostics,
    incognito: bool,
    gate: RequestGate,
    pub(crate) profile: Profile,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Restore a session from `store` with the default start page.
    pub fn new(store: S) -> Self {
        Self::with_start_page(store, DEFAULT_START_PAGE)
    }

    /// Restore a session from `store`.
    ///
    /// Saved tabs come back in the `Created` state with the saved active tab
    /// selected (or the first tab if that id is gone). With no saved tabs, a
    /// single fresh tab is created.
    pub fn with_start_page(store: S, start_page: impl Into<String>) -> Self {
        let start_page = start_page.into();
        let profile = Profile::load(&store);

        let tabs: Vec<TabSession> = store::load::<Vec<PersistedTab>>(&store, keys::TABS)
            .unwrap_or_default()
            .into_iter()
            .map(TabSession::from)
            .collect();
        let saved_active: Option<TabId> = store::load(&store, keys::ACTIVE_TAB);

        let mut session = Self {
            store,
            start_page,
            tabs,
            active: TabId::from(""),
            flags: FeatureFlags::empty(),
            diagnostics: Diagnostics::default(),
            incognito: false,
            gate: RequestGate::new(),
            profile,
        };

        if session.tabs.is_empty() {
            session.add_tab(None);
        } else {
            session.active = match saved_active {
                Some(id) if session.tabs.iter().any(|t| t.id == id) => id,
                _ => session.tabs[0].id.clone(),
            };
            log::info!("restored {} tab(s)", session.tabs.len());
        }
        session
    }

    // -------------------------------------------------------------------------
    // Tab lifecycle
    // -------------------------------------------------------------------------

    /// Open a tab at `url` (or the start page) and make it active.
    pub fn add_tab(&mut self, url: Option<&str>) -> TabId {
        let tab = TabSession::new(url.unwrap_or(&self.start_page));
        let id = tab.id.clone();
        self.tabs.push(tab);
        self.activate(id.clone());
        log::debug!("added tab {id}");
        id
    }

    /// Close a tab. Closing the only tab or an unknown id does nothing.
    ///
    /// When the active tab closes, activation moves to the tab before it, or
    /// to the new first tab if the first tab was closed.
    pub fn close_tab(&mut self, id: &TabId) -> bool {
        if self.tabs.len() == 1 {
            return false;
        }
        let Some(index) = self.tabs.iter().position(|t| &t.id == id) else {
            return false;
        };

        self.tabs.remove(index);
        if &self.active == id {
            let next = index.saturating_sub(1);
            let next_id = self.tabs[next].id.clone();
            self.activate(next_id);
        } else {
            self.persist_tabs();
        }
        log::debug!("closed tab {id}");
        true
    }

    /// Make `id` active. Transient diagnostics and feature flags always reset,
    /// even when `id` is already active.
    pub fn select_tab(&mut self, id: &TabId) -> Result<(), Error> {
        if !self.tabs.iter().any(|t| &t.id == id) {
            return Err(Error::UnknownTab(id.clone()));
        }
        self.activate(id.clone());
        Ok(())
    }

    fn activate(&mut self, id: TabId) {
        self.active = id;
        self.reset_transient();
        self.persist_tabs();
    }

    fn reset_transient(&mut self) {
        self.diagnostics = Diagnostics::default();
        self.flags = FeatureFlags::empty();
    }

    /// Point a tab at a new location and mark it loading.
    pub fn begin_load(&mut self, id: &TabId, url: &str) -> Result<(), Error> {
        let tab = self.tab_mut(id)?;
        tab.url = url.to_string();
        tab.state = LoadState::Loading;
        Ok(())
    }

    /// Apply a navigation report from the renderer.
    ///
    /// A report with `loading == false` completes the load: the visit is
    /// recorded in history and the tab list is persisted.
    pub fn update_navigation(&mut self, id: &TabId, update: NavigationUpdate) -> Result<(), Error> {
        let tab = self.tab_mut(id)?;
        tab.url = update.url;
        if !update.title.is_empty() {
            tab.title = update.title;
        }
        tab.can_go_back = update.can_go_back;
        tab.can_go_forward = update.can_go_forward;
        tab.state = if update.loading {
            LoadState::Loading
        } else {
            LoadState::Loaded
        };

        if !update.loading {
            let (title, url) = (tab.title.clone(), tab.url.clone());
            self.record_visit(&title, &url);
            self.persist_tabs();
        }
        Ok(())
    }

    /// Mark the load complete and return the commands that must run once the
    /// page DOM exists.
    pub fn finish_load(&mut self, id: &TabId) -> Result<Vec<GuestCommand>, Error> {
        self.tab_mut(id)?.state = LoadState::Loaded;
        let mut commands = Vec::new();
        if self.profile.prefs.dark_mode {
            commands.push(GuestCommand::DarkMode { enabled: true });
        }
        Ok(commands)
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn tabs(&self) -> &[TabSession] {
        &self.tabs
    }

    pub fn tab(&self, id: &TabId) -> Option<&TabSession> {
        self.tabs.iter().find(|t| &t.id == id)
    }

    fn tab_mut(&mut self, id: &TabId) -> Result<&mut TabSession, Error> {
        self.tabs
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| Error::UnknownTab(id.clone()))
    }

    pub fn active_id(&self) -> &TabId {
        &self.active
    }

    pub fn active_tab(&self) -> &TabSession {
        let index = self
            .tabs
            .iter()
            .position(|t| t.id == self.active)
            .unwrap_or(0);
        &self.tabs[index]
    }

    pub fn is_active(&self, id: &TabId) -> bool {
        &self.active == id
    }

    pub fn start_page(&self) -> &str {
        &self.start_page
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // -------------------------------------------------------------------------
    // Feature flags
    // -------------------------------------------------------------------------

    pub fn flags(&self) -> FeatureFlags {
        self.flags
    }

    /// Flip inspector mode and return the command that applies it.
    pub fn toggle_inspector(&mut self) -> GuestCommand {
        self.flags.toggle(FeatureFlags::INSPECTOR);
        GuestCommand::Inspector {
            enabled: self.flags.contains(FeatureFlags::INSPECTOR),
        }
    }

    pub(crate) fn clear_inspector(&mut self) {
        self.flags.remove(FeatureFlags::INSPECTOR);
    }

    pub fn set_network_capture(&mut self, enabled: bool) -> GuestCommand {
        self.flags.set(FeatureFlags::NETWORK_CAPTURE, enabled);
        GuestCommand::NetworkCapture { enabled }
    }

    /// Flip the translator and return the command that applies it.
    pub fn toggle_translator(&mut self) -> GuestCommand {
        self.flags.toggle(FeatureFlags::TRANSLATOR);
        GuestCommand::Translation {
            enabled: self.flags.contains(FeatureFlags::TRANSLATOR),
        }
    }

    pub fn translator_active(&self) -> bool {
        self.flags.contains(FeatureFlags::TRANSLATOR)
    }

    // -------------------------------------------------------------------------
    // Diagnostics
    // -------------------------------------------------------------------------

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub(crate) fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    pub fn clear_console(&mut self) {
        self.diagnostics.console.clear();
    }

    pub fn clear_network(&mut self) {
        self.diagnostics.network.clear();
    }

    // -------------------------------------------------------------------------
    // Incognito
    // -------------------------------------------------------------------------

    pub fn incognito(&self) -> bool {
        self.incognito
    }

    /// Enter or leave incognito. Nothing skipped while incognito is written
    /// retroactively on leaving.
    pub fn set_incognito(&mut self, on: bool) {
        if self.incognito != on {
            log::info!("incognito {}", if on { "on" } else { "off" });
        }
        self.incognito = on;
    }

    pub fn toggle_incognito(&mut self) -> bool {
        self.set_incognito(!self.incognito);
        self.incognito
    }

    // -------------------------------------------------------------------------
    // Admission
    // -------------------------------------------------------------------------

    /// Admission check for one resource request, counted on block.
    pub fn admit(&self, url: &str) -> Decision {
        self.gate.check(url, self.profile.rules.blocked_domains())
    }

    pub fn blocked_count(&self) -> u64 {
        self.gate.blocked_count()
    }

    // -------------------------------------------------------------------------
    // Persistence
    // -------------------------------------------------------------------------

    fn persist_tabs(&mut self) {
        if self.incognito {
            log::trace!("incognito: tab list not persisted");
            return;
        }
        let saved: Vec<PersistedTab> = self
            .tabs
            .iter()
            .map(|t| PersistedTab {
                id: t.id.clone(),
                title: t.title.clone(),
                url: t.url.clone(),
            })
            .collect();
        let tabs_ok = store::save(&mut self.store, keys::TABS, &saved);
        let active_ok = store::save(&mut self.store, keys::ACTIVE_TAB, &self.active);
        if !(tabs_ok && active_ok) {
            log::warn!("tab list not persisted; continuing in memory");
        }
    }

    /// Write browsing data (history, searches). Skipped in incognito.
    pub(crate) fn persist_private<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        if self.incognito {
            log::trace!("incognito: {key} not persisted");
            return;
        }
        self.persist_setting(key, value);
    }

    /// Write user settings and rule data. Written even in incognito.
    pub(crate) fn persist_setting<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) {
        if !store::save(&mut self.store, key, value) {
            log::warn!("{key} not persisted; continuing in memory");
        }
    }
}

impl SessionStore<FileStore> {
    /// Restore the session kept in the JSON document at `path`.
    ///
    /// A missing file starts a fresh session; an unreadable or malformed one
    /// is an error so the caller never overwrites data it could not read.
    pub fn open(path: impl Into<PathBuf>, start_page: impl Into<String>) -> Result<Self, Error> {
        let store = FileStore::open(path)?;
        Ok(Self::with_start_page(store, start_page))
    }
}
