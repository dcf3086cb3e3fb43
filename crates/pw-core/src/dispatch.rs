//! Host-side envelope dispatch
//!
//! Each envelope is folded into the active tab's diagnostics and turned into
//! a [`HostEffect`] for the user interface. Dispatch is an exhaustive match
//! over [`Envelope`]; adding an envelope type without handling it here does
//! not compile.
//!
//! Envelopes from a tab that is no longer active are dropped; diagnostics
//! only ever describe the active tab's page.

use crate::protocol::{
    parse_envelope, ConsoleEntry, Envelope, GuestCommand, InspectedElement, ReaderArticle,
};
use crate::session::SessionStore;
use crate::store::KeyValueStore;
use crate::types::{FeatureFlags, TabId};

/// What the user interface should do after an envelope was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEffect {
    /// A console entry was captured
    ConsoleUpdated,
    /// A network entry was captured
    NetworkUpdated,
    /// Show the inspected element; inspector mode has been switched off
    ElementInspected(InspectedElement),
    /// A fresh storage snapshot is in the diagnostics
    StorageUpdated,
    ShowReader(ReaderArticle),
    ReaderFailed,
    ShowImages(Vec<String>),
    FindMatches(usize),
    ShowSource(String),
    /// Hand the text to the speech service
    Speak(String),
    /// Show a short confirmation
    Notify(String),
}

impl HostEffect {
    /// Command the host must inject as a consequence of this effect.
    pub fn follow_up(&self) -> Option<GuestCommand> {
        match self {
            HostEffect::ElementInspected(_) => Some(GuestCommand::Inspector { enabled: false }),
            _ => None,
        }
    }
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Parse and apply one raw channel message from tab `source`.
    pub fn handle_message(&mut self, source: &TabId, raw: &str) -> Option<HostEffect> {
        let envelope = parse_envelope(raw)?;
        self.handle_envelope(source, envelope)
    }

    /// Apply one typed envelope from tab `source`.
    pub fn handle_envelope(&mut self, source: &TabId, envelope: Envelope) -> Option<HostEffect> {
        if !self.is_active(source) {
            log::debug!(
                "dropping late {} envelope from background tab {source}",
                envelope.kind()
            );
            return None;
        }

        let effect = match envelope {
            Envelope::ConsoleLog(entry) => {
                self.capture_console(entry);
                HostEffect::ConsoleUpdated
            }
            Envelope::NetworkLog(entry) => {
                if !self.flags().contains(FeatureFlags::NETWORK_CAPTURE) {
                    log::trace!("network capture off; dropping {}", entry.url);
                    return None;
                }
                self.diagnostics_mut().network.push(entry);
                HostEffect::NetworkUpdated
            }
            Envelope::ElementInspected(element) => {
                self.clear_inspector();
                self.diagnostics_mut().inspected = Some(element.clone());
                HostEffect::ElementInspected(element)
            }
            Envelope::StorageData(snapshot) => {
                self.diagnostics_mut().storage = Some(snapshot);
                HostEffect::StorageUpdated
            }
            Envelope::ReaderExtracted(article) => HostEffect::ShowReader(article),
            Envelope::ReaderError => HostEffect::ReaderFailed,
            Envelope::ImagesExtracted(images) => HostEffect::ShowImages(images),
            Envelope::FindResult(count) => {
                self.diagnostics_mut().find_matches = Some(count);
                HostEffect::FindMatches(count)
            }
            Envelope::ViewSource(html) => HostEffect::ShowSource(html),
            Envelope::SpeakText(text) => HostEffect::Speak(text),
            Envelope::ActionComplete(message) => HostEffect::Notify(message),
        };
        Some(effect)
    }

    fn capture_console(&mut self, entry: ConsoleEntry) {
        self.diagnostics_mut().console.push(entry);
    }
}
