//! triggers: configuration, tree and matching for text-expansion triggers.
//!
//! - [`Triggers`]: per-node bundle of enabled modes plus abbreviation, hotkey
//!   and window-filter settings.
//! - [`TriggerTree`]: arena of folders, phrases and scripts with usage,
//!   backspace and keystroke accounting up the ancestor chain.
//! - [`matching`]: the abbreviation partition and boundary rules.
//! - [`build_phrase`] / [`build_script`]: compute what to send once a node
//!   fires.
//! - [`persist`]: JSON load and save.

mod config;
mod error;
mod expansion;
pub mod matching;
pub mod persist;
mod tree;

pub use config::{
    AbbreviationConfig, DEFAULT_WORD_CHARS, HotkeyConfig, TitlePattern, TriggerMode, Triggers,
    WindowFilterConfig, WordChars,
};
pub use error::{Error, Result};
pub use expansion::{Expansion, build_phrase, build_script};
pub use tree::{Folder, Node, NodeId, NodeKind, Phrase, Script, SendMode, TriggerTree};
