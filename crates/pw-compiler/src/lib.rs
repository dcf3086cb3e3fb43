//! PageWarden Guest Code Compiler
//!
//! This crate compiles user rules, user scripts and feature flags into the
//! JavaScript that runs inside the renderer: the bootstrap bundle delivered
//! before any page script, and one-shot command scripts for host→guest
//! commands.
//!
//! Guest code lives as templates under `js/` and is embedded at build time.
//! Every value spliced into a template goes through [`escape`], so rule text
//! and script bodies can never break out of their string literals.

pub mod agent;
pub mod bootstrap;
pub mod commands;
pub mod escape;
pub mod stylesheet;
pub mod template;

pub use agent::{Bridge, Guard};
pub use bootstrap::InjectionComposer;
pub use commands::command_script;
