//! Error handling for the replay binary.

use std::{result, time::Duration};

use thiserror::Error;

/// Convenient result type for replay operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while replaying input.
#[derive(Debug, Error)]
pub enum Error {
    /// Loading or saving the tree failed.
    #[error("Trigger tree error: {0}")]
    Triggers(#[from] triggers::Error),
    /// The dispatcher refused to start or send.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] dispatch::Error),
    /// Activating a menu pick failed.
    #[error("Expansion error: {0}")]
    Expander(#[from] expander::Error),
    /// The input names a key the scripted backend cannot press.
    #[error("Key {0} cannot be replayed")]
    UnsupportedKey(String),
    /// A menu offered fewer entries than the requested pick.
    #[error("Menu has {len} entries; cannot pick {index}")]
    PickOutOfRange {
        /// Requested index.
        index: usize,
        /// Entries offered.
        len: usize,
    },
    /// Typed keys were not dispatched in time.
    #[error("Input was not dispatched within {0:?}")]
    Timeout(Duration),
}
