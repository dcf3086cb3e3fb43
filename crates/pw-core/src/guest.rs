//! Tunables for guest-side behavior
//!
//! The guest scripts are generated from these values, so thresholds and word
//! lists live in one typed place instead of being scattered through script
//! text. Every field has a default; a config file only names what it changes.

use serde::{Deserialize, Serialize};

use crate::rules::{BAD_LINK_PATTERNS, TEXT_FILTERS};

/// All guest tunables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestProfile {
    pub filter: FilterProfile,
    pub reader: ReaderProfile,
    pub images: ImageProfile,
    pub translate: TranslateProfile,
}

// =============================================================================
// Active Filter Loop
// =============================================================================

/// Thresholds for the page-side cleaning pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterProfile {
    /// Quiet period after the last DOM mutation before a scan runs
    pub debounce_ms: u32,
    /// Positioned elements above this z-index are overlay candidates
    pub z_index_threshold: i32,
    /// Overlay candidates must be taller than this (px)
    pub min_overlay_height: u32,
    /// Overlay candidates must start below this offset from the top (px)
    pub min_overlay_top: u32,
    /// Inclusive text length range for the bad-word check
    pub min_text_len: u32,
    pub max_text_len: u32,
    pub bad_words: Vec<String>,
    pub bad_links: Vec<String>,
}

impl Default for FilterProfile {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            z_index_threshold: 900,
            min_overlay_height: 100,
            min_overlay_top: 50,
            min_text_len: 4,
            max_text_len: 99,
            bad_words: TEXT_FILTERS.iter().map(|s| s.to_string()).collect(),
            bad_links: BAD_LINK_PATTERNS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// =============================================================================
// Reader Extraction
// =============================================================================

/// Parameters for reader-mode text extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderProfile {
    /// Inclusive code point ranges of the target script
    pub script_ranges: Vec<[u32; 2]>,
    /// A candidate container needs at least this many target-script chars
    pub min_script_chars: u32,
    /// Containers never considered as the main content
    pub excluded_selector: String,
    /// Lines containing any of these phrases are dropped
    pub forbidden_phrases: Vec<String>,
}

impl Default for ReaderProfile {
    fn default() -> Self {
        Self {
            // Arabic block
            script_ranges: vec![[0x0600, 0x06FF]],
            min_script_chars: 50,
            excluded_selector: "header, footer, nav, aside, .sidebar, .menu, .ads".to_string(),
            forbidden_phrases: [
                "kolnovel",
                "kol-novel",
                "ملوك الروايات",
                "إقرأ رواياتنا",
                "م*وقع",
                "رواياتنا",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

// =============================================================================
// Image Extraction
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageProfile {
    /// An image qualifies when its width or height exceeds this (px)
    pub min_dimension: u32,
}

impl Default for ImageProfile {
    fn default() -> Self {
        Self { min_dimension: 150 }
    }
}

// =============================================================================
// Translation
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateProfile {
    /// Language code the widget translates into
    pub target_language: String,
    /// Whether translated pages are laid out right-to-left
    pub right_to_left: bool,
}

impl Default for TranslateProfile {
    fn default() -> Self {
        Self {
            target_language: "ar".to_string(),
            right_to_left: true,
        }
    }
}
