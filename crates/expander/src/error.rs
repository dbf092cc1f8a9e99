//! Error types and result alias for the expander crate.
use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type used throughout this crate.
pub type Result<T> = StdResult<T, Error>;

/// Error variants produced by this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Tree lookup or expansion building failed.
    #[error(transparent)]
    Triggers(#[from] triggers::Error),
    /// An outbound send failed.
    #[error(transparent)]
    Dispatch(#[from] dispatch::Error),
    /// The dispatcher this expander sends through has been dropped.
    #[error("Output is no longer available")]
    OutputGone,
}
