//! PageWarden Core Library
//!
//! This crate is the host side of PageWarden: the part of a browser shell that
//! sits between the user interface and an embedded renderer loading untrusted
//! pages.
//!
//! # Architecture
//!
//! Every resource request passes through the [`gate`] before the renderer may
//! fetch it. Guest code (built by `pw-compiler`) reports back over an
//! asynchronous envelope channel; the host parses each envelope with
//! [`protocol`] and folds it into the [`session`] state. Nothing on the
//! request path performs I/O.
//!
//! # Modules
//!
//! - `types`: Shared type definitions
//! - `url`: Allocation-free URL normalization for substring checks
//! - `rules`: Builtin rule lists and user rule sets
//! - `gate`: Request admission control
//! - `guest`: Tunables for guest-side behavior (filter loop, reader, images, translation)
//! - `protocol`: Envelope wire types and host→guest commands
//! - `capture`: Bounded FIFO capture buffers
//! - `scripts`: User script library
//! - `store`: Durable key-value store abstraction
//! - `history`: Browsing and search history
//! - `session`: Tab lifecycle, feature flags and diagnostics
//! - `profile`: User data owned by the session (rules, scripts, preferences)
//! - `dispatch`: Host-side envelope dispatch

pub mod capture;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod guest;
pub mod history;
pub mod profile;
pub mod protocol;
pub mod rules;
pub mod scripts;
pub mod session;
pub mod store;
pub mod types;
pub mod url;

// Re-export commonly used types
pub use capture::CaptureBuffer;
pub use dispatch::HostEffect;
pub use error::Error;
pub use gate::{decide, RequestGate};
pub use guest::GuestProfile;
pub use protocol::{parse_envelope, Envelope, GuestCommand};
pub use rules::UserRules;
pub use scripts::{InjectedScript, ScriptLibrary};
pub use session::{SessionStore, TabSession};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use types::{Decision, FeatureFlags, Rule, RuleKind, TabId};
