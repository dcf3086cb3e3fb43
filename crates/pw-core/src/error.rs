//! Error type for session and library operations

use crate::store::StoreError;
use crate::types::TabId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown tab: {0}")]
    UnknownTab(TabId),

    #[error("Unknown script: {0}")]
    UnknownScript(String),

    #[error("Script needs both a name and code")]
    IncompleteScript,

    #[error(transparent)]
    Store(#[from] StoreError),
}
