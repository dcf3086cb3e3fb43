//! Browsing and search history
//!
//! Both lists are kept newest first and bounded.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Maximum browsing history entries.
pub const HISTORY_CAPACITY: usize = 1000;

/// Maximum remembered search queries.
pub const SEARCH_HISTORY_CAPACITY: usize = 20;

/// A repeat visit to the newest entry's URL within this window is not recorded.
pub const REVISIT_WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub url: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished page load. Returns `true` if an entry was added.
    ///
    /// Blank titles, blank pages, `start_page` and quick repeats of the most
    /// recent URL are skipped.
    pub fn record(&mut self, title: &str, url: &str, start_page: &str, now: DateTime<Utc>) -> bool {
        if title.is_empty() || url.is_empty() || url == "about:blank" || url == start_page {
            return false;
        }
        if let Some(newest) = self.entries.first() {
            if newest.url == url && now - newest.date < Duration::seconds(REVISIT_WINDOW_SECS) {
                return false;
            }
        }

        self.entries.insert(
            0,
            HistoryEntry {
                id: uuid::Uuid::new_v4().to_string(),
                title: title.to_string(),
                url: url.to_string(),
                date: now,
            },
        );
        self.entries.truncate(HISTORY_CAPACITY);
        true
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        self.entries.len() != before
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recent unique search queries, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchHistory {
    queries: Vec<String>,
}

impl SearchHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `query` to the front. Blank queries are ignored.
    pub fn record(&mut self, query: &str) -> bool {
        if query.trim().is_empty() {
            return false;
        }
        self.queries.retain(|q| q != query);
        self.queries.insert(0, query.to_string());
        self.queries.truncate(SEARCH_HISTORY_CAPACITY);
        true
    }

    pub fn remove(&mut self, query: &str) -> bool {
        let before = self.queries.len();
        self.queries.retain(|q| q != query);
        self.queries.len() != before
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }
}
