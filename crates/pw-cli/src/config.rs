//! TOML configuration for the CLI host.
//!
//! Every struct implements `Default`, so a missing or partial file behaves
//! like the builtin settings.
//!
//! ## Config file search order
//!
//! 1. `PAGEWARDEN_CONFIG` environment variable
//! 2. Platform config directory (`$XDG_CONFIG_HOME/pagewarden/config.toml`,
//!    `%APPDATA%\PageWarden\config.toml` on Windows)
//! 3. Current working directory (`./config.toml`)
//! 4. No file found → `Config::default()`

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use pw_compiler::agent::DEFAULT_POST_MESSAGE;
use pw_compiler::Bridge;
use pw_core::guest::{FilterProfile, ImageProfile, ReaderProfile, TranslateProfile};
use pw_core::session::DEFAULT_START_PAGE;
use pw_core::GuestProfile;

const SESSION_FILE: &str = "session.json";

// =============================================================================
// Config structs
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub bridge: BridgeConfig,
    pub filter: FilterProfile,
    pub reader: ReaderProfile,
    pub images: ImageProfile,
    pub translate: TranslateProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Location new tabs open at
    pub start_page: String,
    /// Directory holding the persisted session. Empty = platform data dir.
    pub data_dir: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Guest expression that receives one envelope string
    pub post_message: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            start_page: DEFAULT_START_PAGE.to_string(),
            data_dir: String::new(),
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            post_message: DEFAULT_POST_MESSAGE.to_string(),
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

impl Config {
    /// Load from `explicit` if given, else from the standard locations.
    /// Never fails: unreadable or invalid files fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Self {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => find_config_path(),
        };
        let Some(path) = path else {
            log::info!("no config file found, using defaults");
            return Config::default();
        };
        match fs::read_to_string(&path) {
            Ok(content) => match Self::parse(&content) {
                Ok(config) => {
                    log::info!("configuration loaded from {}", path.display());
                    config
                }
                Err(e) => {
                    log::warn!("invalid config {}, using defaults: {e}", path.display());
                    Config::default()
                }
            },
            Err(e) => {
                log::warn!("cannot read config {}, using defaults: {e}", path.display());
                Config::default()
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn guest_profile(&self) -> GuestProfile {
        GuestProfile {
            filter: self.filter.clone(),
            reader: self.reader.clone(),
            images: self.images.clone(),
            translate: self.translate.clone(),
        }
    }

    pub fn bridge(&self) -> Bridge {
        Bridge::new(self.bridge.post_message.as_str())
    }

    /// Path of the file-backed session store.
    pub fn session_path(&self) -> PathBuf {
        let dir = match self.general.data_dir.trim() {
            "" => platform_data_dir().unwrap_or_else(|| PathBuf::from(".")),
            dir => PathBuf::from(dir),
        };
        dir.join(SESSION_FILE)
    }
}

fn find_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("PAGEWARDEN_CONFIG") {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Some(p);
        }
    }

    if let Some(dir) = platform_config_dir() {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    let p = PathBuf::from("config.toml");
    if p.is_file() {
        return Some(p);
    }

    None
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join("PageWarden"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .or_else(|| std::env::var("HOME").ok().map(|h| format!("{h}/.config")))
            .map(|dir| PathBuf::from(dir).join("pagewarden"))
    }
}

fn platform_data_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("LOCALAPPDATA")
            .ok()
            .map(|dir| PathBuf::from(dir).join("PageWarden"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("XDG_DATA_HOME")
            .ok()
            .or_else(|| std::env::var("HOME").ok().map(|h| format!("{h}/.local/share")))
            .map(|dir| PathBuf::from(dir).join("pagewarden"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.general.start_page, "warden://home");
        assert_eq!(config.bridge().post_message(), "window.ipc.postMessage");
        assert_eq!(config.guest_profile(), GuestProfile::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = Config::parse(
            r#"
            [general]
            data_dir = "/tmp/pw"

            [bridge]
            post_message = "window.chrome.webview.postMessage"

            [filter]
            debounce_ms = 200
            bad_words = ["casino"]

            [images]
            min_dimension = 300

            [translate]
            target_language = "fa"
            "#,
        )
        .unwrap();

        assert_eq!(config.general.start_page, "warden://home");
        assert_eq!(config.session_path(), PathBuf::from("/tmp/pw/session.json"));
        assert_eq!(config.bridge().post_message(), "window.chrome.webview.postMessage");

        let profile = config.guest_profile();
        assert_eq!(profile.filter.debounce_ms, 200);
        assert_eq!(profile.filter.z_index_threshold, 900);
        assert_eq!(profile.filter.bad_words, vec!["casino".to_string()]);
        assert_eq!(profile.images.min_dimension, 300);
        assert_eq!(profile.translate.target_language, "fa");
        assert!(profile.translate.right_to_left);
        assert_eq!(profile.reader.min_script_chars, 50);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(Config::parse("[filter]\ndebounce_ms = \"soon\"").is_err());
    }

    #[test]
    fn missing_explicit_file_falls_back() {
        let config = Config::load(Some(Path::new("/nonexistent/pagewarden.toml")));
        assert_eq!(config, Config::default());
    }
}
