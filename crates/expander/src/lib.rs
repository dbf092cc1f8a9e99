//! expander: the text-expansion service.
//!
//! [`Expander`] listens to the dispatcher, keeps an [`InputBuffer`] of what
//! was typed, fires the first matching trigger in the tree and replays the
//! expansion through an [`Output`].

mod buffer;
mod error;
mod output;
mod service;

pub use buffer::{Fed, InputBuffer};
pub use error::{Error, Result};
pub use output::Output;
pub use service::{Expander, ExpanderConfig, ExpanderEvent};
