//! Envelope protocol between the guest agent and the host
//!
//! Guest→host traffic is a stream of self-contained JSON objects of the form
//! `{"type": "...", "payload": ...}`. The channel is best-effort: no ordering
//! across types, no acknowledgement, no replay. Anything that does not parse
//! into a known [`Envelope`] is dropped.
//!
//! Host→guest traffic is one-way code injection. [`GuestCommand`] names each
//! command; `pw-compiler` turns a command into the script that performs it.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Envelope Kinds
// =============================================================================

/// The closed set of envelope type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnvelopeKind {
    ConsoleLog,
    NetworkLog,
    ElementInspected,
    StorageData,
    ReaderExtracted,
    ReaderError,
    ImagesExtracted,
    FindResult,
    ViewSource,
    SpeakText,
    ActionComplete,
}

impl EnvelopeKind {
    pub const ALL: [EnvelopeKind; 11] = [
        EnvelopeKind::ConsoleLog,
        EnvelopeKind::NetworkLog,
        EnvelopeKind::ElementInspected,
        EnvelopeKind::StorageData,
        EnvelopeKind::ReaderExtracted,
        EnvelopeKind::ReaderError,
        EnvelopeKind::ImagesExtracted,
        EnvelopeKind::FindResult,
        EnvelopeKind::ViewSource,
        EnvelopeKind::SpeakText,
        EnvelopeKind::ActionComplete,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EnvelopeKind::ConsoleLog => "CONSOLE_LOG",
            EnvelopeKind::NetworkLog => "NETWORK_LOG",
            EnvelopeKind::ElementInspected => "ELEMENT_INSPECTED",
            EnvelopeKind::StorageData => "STORAGE_DATA",
            EnvelopeKind::ReaderExtracted => "READER_EXTRACTED",
            EnvelopeKind::ReaderError => "READER_ERROR",
            EnvelopeKind::ImagesExtracted => "IMAGES_EXTRACTED",
            EnvelopeKind::FindResult => "FIND_RESULT",
            EnvelopeKind::ViewSource => "VIEW_SOURCE",
            EnvelopeKind::SpeakText => "SPEAK_TEXT",
            EnvelopeKind::ActionComplete => "ACTION_COMPLETE",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == tag)
    }
}

impl fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payloads
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Debug,
    Info,
    Warn,
    Error,
    #[default]
    #[serde(other)]
    Log,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    #[serde(default)]
    pub level: ConsoleLevel,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestType {
    Fetch,
    Xhr,
}

/// HTTP status, or the guest's failure marker (`"ERR"`) when the call never
/// produced a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetworkStatus {
    Code(u16),
    Failed(String),
}

impl NetworkStatus {
    pub fn is_failure(&self) -> bool {
        match self {
            NetworkStatus::Code(code) => *code == 0 || *code >= 400,
            NetworkStatus::Failed(_) => true,
        }
    }
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkStatus::Code(code) => write!(f, "{code}"),
            NetworkStatus::Failed(marker) => f.write_str(marker),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEntry {
    pub id: String,
    pub timestamp: String,
    pub request_type: RequestType,
    pub method: String,
    pub url: String,
    pub status: NetworkStatus,
    /// Response body, truncated by the guest
    #[serde(default)]
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InspectedElement {
    pub tag_name: String,
    pub id: String,
    pub class_name: String,
    pub css_selector: String,
    /// Outer markup, truncated by the guest
    pub html: String,
}

/// Full snapshot of the page's three key-value stores.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSnapshot {
    pub local: BTreeMap<String, String>,
    pub session: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
}

impl StorageSnapshot {
    pub fn area(&self, area: StorageArea) -> &BTreeMap<String, String> {
        match area {
            StorageArea::Local => &self.local,
            StorageArea::Session => &self.session,
            StorageArea::Cookies => &self.cookies,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderArticle {
    pub title: String,
    pub content: Vec<String>,
}

// =============================================================================
// Envelope
// =============================================================================

/// One typed guest→host message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Envelope {
    ConsoleLog(ConsoleEntry),
    NetworkLog(NetworkEntry),
    ElementInspected(InspectedElement),
    StorageData(StorageSnapshot),
    ReaderExtracted(ReaderArticle),
    ReaderError,
    ImagesExtracted(Vec<String>),
    /// Total match count
    FindResult(usize),
    /// Truncated document markup
    ViewSource(String),
    SpeakText(String),
    ActionComplete(String),
}

/// Wire shape before the tag is resolved.
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    payload: Value,
}

impl Envelope {
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Envelope::ConsoleLog(_) => EnvelopeKind::ConsoleLog,
            Envelope::NetworkLog(_) => EnvelopeKind::NetworkLog,
            Envelope::ElementInspected(_) => EnvelopeKind::ElementInspected,
            Envelope::StorageData(_) => EnvelopeKind::StorageData,
            Envelope::ReaderExtracted(_) => EnvelopeKind::ReaderExtracted,
            Envelope::ReaderError => EnvelopeKind::ReaderError,
            Envelope::ImagesExtracted(_) => EnvelopeKind::ImagesExtracted,
            Envelope::FindResult(_) => EnvelopeKind::FindResult,
            Envelope::ViewSource(_) => EnvelopeKind::ViewSource,
            Envelope::SpeakText(_) => EnvelopeKind::SpeakText,
            Envelope::ActionComplete(_) => EnvelopeKind::ActionComplete,
        }
    }

    /// Build a typed envelope from a resolved tag and its raw payload.
    pub fn from_parts(kind: EnvelopeKind, payload: Value) -> serde_json::Result<Self> {
        use serde_json::from_value;

        Ok(match kind {
            EnvelopeKind::ConsoleLog => Envelope::ConsoleLog(from_value(payload)?),
            EnvelopeKind::NetworkLog => Envelope::NetworkLog(from_value(payload)?),
            EnvelopeKind::ElementInspected => Envelope::ElementInspected(from_value(payload)?),
            EnvelopeKind::StorageData => Envelope::StorageData(from_value(payload)?),
            EnvelopeKind::ReaderExtracted => Envelope::ReaderExtracted(from_value(payload)?),
            // Any payload is ignored
            EnvelopeKind::ReaderError => Envelope::ReaderError,
            EnvelopeKind::ImagesExtracted => Envelope::ImagesExtracted(from_value(payload)?),
            EnvelopeKind::FindResult => Envelope::FindResult(from_value(payload)?),
            EnvelopeKind::ViewSource => Envelope::ViewSource(from_value(payload)?),
            EnvelopeKind::SpeakText => Envelope::SpeakText(from_value(payload)?),
            EnvelopeKind::ActionComplete => Envelope::ActionComplete(from_value(payload)?),
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Parse one raw channel message.
///
/// Returns `None` for anything that is not valid JSON, carries an unknown
/// `type`, or has a payload of the wrong shape.
pub fn parse_envelope(raw: &str) -> Option<Envelope> {
    let raw: RawEnvelope = match serde_json::from_str(raw) {
        Ok(raw) => raw,
        Err(e) => {
            log::debug!("dropping unparseable envelope: {e}");
            return None;
        }
    };

    let Some(kind) = EnvelopeKind::from_tag(&raw.kind) else {
        log::debug!("dropping envelope with unknown type {:?}", raw.kind);
        return None;
    };

    match Envelope::from_parts(kind, raw.payload) {
        Ok(envelope) => Some(envelope),
        Err(e) => {
            log::debug!("dropping {kind} envelope with malformed payload: {e}");
            None
        }
    }
}

// =============================================================================
// Host → Guest Commands
// =============================================================================

/// One of the page's three key-value stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageArea {
    /// Durable per-origin store
    Local,
    /// Store scoped to the browsing session
    Session,
    /// Cookie jar visible to page script
    Cookies,
}

impl StorageArea {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageArea::Local => "local",
            StorageArea::Session => "session",
            StorageArea::Cookies => "cookies",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StorageOp {
    Set { key: String, value: String },
    Delete { key: String },
    Clear,
}

/// A host→guest command. Each is delivered as a one-shot "run now" script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum GuestCommand {
    /// Gate NETWORK_LOG emission. Not retroactive.
    NetworkCapture { enabled: bool },
    /// Mutate one store, then emit a full STORAGE_DATA snapshot
    Storage { area: StorageArea, op: StorageOp },
    /// Emit a STORAGE_DATA snapshot without mutating
    ReadStorage,
    Inspector { enabled: bool },
    /// An empty query only clears previous markers
    Find { query: String },
    ExtractReader,
    ExtractImages,
    ViewSource,
    Speak,
    /// Clear every page store, confirm, then reload
    ClearSiteData,
    DarkMode { enabled: bool },
    /// Hide a selector on the live page without waiting for a reload
    AddHideRule { selector: String },
    /// Re-enable text selection and clipboard events
    EnableCopy,
    /// Set or expire the translation cookie, then reload
    Translation { enabled: bool },
}

impl GuestCommand {
    /// The envelope the guest is expected to volunteer in response, if any.
    pub fn expected_reply(&self) -> Option<EnvelopeKind> {
        match self {
            GuestCommand::Storage { .. } | GuestCommand::ReadStorage => {
                Some(EnvelopeKind::StorageData)
            }
            GuestCommand::Find { query } if !query.is_empty() => Some(EnvelopeKind::FindResult),
            GuestCommand::ExtractReader => Some(EnvelopeKind::ReaderExtracted),
            GuestCommand::ExtractImages => Some(EnvelopeKind::ImagesExtracted),
            GuestCommand::ViewSource => Some(EnvelopeKind::ViewSource),
            GuestCommand::Speak => Some(EnvelopeKind::SpeakText),
            GuestCommand::ClearSiteData | GuestCommand::EnableCopy => {
                Some(EnvelopeKind::ActionComplete)
            }
            GuestCommand::Inspector { enabled: true } => Some(EnvelopeKind::ElementInspected),
            _ => None,
        }
    }
}
